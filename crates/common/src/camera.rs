use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World-space viewport supplied once per frame by the input layer.
///
/// `x`/`y` are the world-space top-left corner; `width`/`height` are the
/// viewport size in screen pixels. Camera motion is NOT deterministic ... it
/// exists outside the renderer boundary and is only ever read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
}

impl Camera {
    pub fn new(x: f32, y: f32, width: f32, height: f32, zoom: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            zoom,
        }
    }

    /// The world-space rectangle covered by the viewport at the current zoom.
    pub fn world_rect(&self) -> WorldRect {
        WorldRect {
            x: self.x,
            y: self.y,
            width: self.width / self.zoom,
            height: self.height / self.zoom,
        }
    }

    /// World-space center of the view, used to prioritize rebuild work.
    pub fn world_center(&self) -> Vec2 {
        let r = self.world_rect();
        Vec2::new(r.x + r.width * 0.5, r.y + r.height * 0.5)
    }

    /// Project a world-space point into screen pixels.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - Vec2::new(self.x, self.y)) * self.zoom
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
            zoom: 1.0,
        }
    }
}

/// An axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl WorldRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Normalized texture coordinates of a sprite within its atlas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    pub fn new(u0: f32, v0: f32, u1: f32, v1: f32) -> Self {
        Self { u0, v0, u1, v1 }
    }

    /// Swap the vertical orientation. Render-target textures store rows in
    /// the opposite order from uploaded images, so the blit path flips them.
    pub fn flipped_v(self) -> Self {
        Self {
            u0: self.u0,
            v0: self.v1,
            u1: self.u1,
            v1: self.v0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_rect_scales_with_zoom() {
        let cam = Camera::new(0.0, 0.0, 1000.0, 500.0, 2.0);
        let rect = cam.world_rect();
        assert_eq!(rect.width, 500.0);
        assert_eq!(rect.height, 250.0);
    }

    #[test]
    fn world_to_screen_applies_zoom() {
        let cam = Camera::new(100.0, 50.0, 800.0, 600.0, 2.0);
        let p = cam.world_to_screen(Vec2::new(110.0, 50.0));
        assert_eq!(p, Vec2::new(20.0, 0.0));
    }

    #[test]
    fn rect_overlap() {
        let a = WorldRect::new(0.0, 0.0, 10.0, 10.0);
        let b = WorldRect::new(5.0, 5.0, 10.0, 10.0);
        let c = WorldRect::new(20.0, 0.0, 5.0, 5.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = WorldRect::new(0.0, 0.0, 10.0, 10.0);
        let b = WorldRect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn uv_flip_swaps_v() {
        let uv = UvRect::new(0.1, 0.2, 0.3, 0.4).flipped_v();
        assert_eq!(uv.v0, 0.4);
        assert_eq!(uv.v1, 0.2);
        assert_eq!(uv.u0, 0.1);
    }
}
