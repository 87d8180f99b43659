use crate::handle::TextureHandle;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use hexfield_common::{AtlasId, UvRect, WorldRect};

/// Errors from GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("texture allocation failed: {0}")]
    AllocationFailed(String),
    #[error("requested texture size {requested} exceeds device limit {limit}")]
    TextureTooLarge { requested: u32, limit: u32 },
    #[error("unknown texture id {0}")]
    UnknownTexture(u64),
    #[error("GPU context is lost")]
    ContextLost,
}

/// A textured quad with explicit corners, so ribbons can run at any angle.
/// Corner order is top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Vec2; 4],
    pub uv: UvRect,
}

impl Quad {
    pub fn axis_aligned(rect: WorldRect, uv: UvRect) -> Self {
        Self {
            corners: [
                Vec2::new(rect.x, rect.y),
                Vec2::new(rect.right(), rect.y),
                Vec2::new(rect.right(), rect.bottom()),
                Vec2::new(rect.x, rect.bottom()),
            ],
            uv,
        }
    }

    /// A quad running from `a` to `b` with the given total width, the shape
    /// used for road/rail ribbons between tile centers.
    pub fn ribbon(a: Vec2, b: Vec2, width: f32, uv: UvRect) -> Self {
        let along = (b - a).normalize_or_zero();
        let across = Vec2::new(-along.y, along.x) * (width * 0.5);
        Self {
            corners: [a + across, b + across, b - across, a - across],
            uv,
        }
    }
}

/// Per-instance attributes for one sprite in an instanced draw.
///
/// `dest` is (x, y, w, h) in screen pixels, `uv` is (u0, v0, u1, v1). For
/// shadow instances the UV slot is unused and `opacity` carries the shadow
/// strength.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub dest: [f32; 4],
    pub uv: [f32; 4],
    pub flip: f32,
    pub opacity: f32,
}

/// The GPU operations the rendering pipeline needs.
///
/// All calls are synchronous and single-threaded; a backend may batch
/// internally but must preserve call order.
pub trait GpuDevice {
    /// Allocate an offscreen render target. Fails when the device cannot
    /// allocate or the size exceeds [`GpuDevice::max_texture_size`].
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<TextureHandle, GfxError>;

    /// Release a texture. Unknown handles are ignored (the backend may have
    /// dropped them already on context loss).
    fn delete_texture(&mut self, handle: &TextureHandle);

    /// Bind a render target and clear it, starting a bake.
    fn begin_target(&mut self, target: &TextureHandle) -> Result<(), GfxError>;

    /// Draw one batch of quads from a single atlas into the bound target.
    /// One call is one GPU draw.
    fn draw_quads(
        &mut self,
        target: &TextureHandle,
        atlas: AtlasId,
        quads: &[Quad],
    ) -> Result<(), GfxError>;

    /// Rebuild the mip chain of a multi-level render target.
    fn regenerate_mipmaps(&mut self, handle: &TextureHandle);

    /// Draw a cached texture to the screen at the given pixel rectangle.
    fn draw_texture(&mut self, handle: &TextureHandle, dest: WorldRect, uv: UvRect);

    /// Draw sprite instances from a single atlas to the screen in one
    /// instanced call.
    fn draw_sprites(&mut self, atlas: AtlasId, instances: &[SpriteInstance]);

    /// Whether instanced drawing is available. When false, sprite passes
    /// degrade by skipping their content entirely.
    fn supports_instancing(&self) -> bool {
        true
    }

    /// Largest texture edge the device can allocate.
    fn max_texture_size(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_aligned_corners_wind_clockwise() {
        let q = Quad::axis_aligned(WorldRect::new(1.0, 2.0, 10.0, 20.0), UvRect::FULL);
        assert_eq!(q.corners[0], Vec2::new(1.0, 2.0));
        assert_eq!(q.corners[1], Vec2::new(11.0, 2.0));
        assert_eq!(q.corners[2], Vec2::new(11.0, 22.0));
        assert_eq!(q.corners[3], Vec2::new(1.0, 22.0));
    }

    #[test]
    fn ribbon_width_is_perpendicular() {
        let q = Quad::ribbon(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 4.0, UvRect::FULL);
        // Horizontal ribbon: across axis is vertical.
        assert_eq!(q.corners[0], Vec2::new(0.0, 2.0));
        assert_eq!(q.corners[3], Vec2::new(0.0, -2.0));
        assert_eq!(q.corners[1].x, 10.0);
    }

    #[test]
    fn degenerate_ribbon_does_not_produce_nan() {
        let p = Vec2::new(5.0, 5.0);
        let q = Quad::ribbon(p, p, 4.0, UvRect::FULL);
        for c in q.corners {
            assert!(c.x.is_finite() && c.y.is_finite());
        }
    }

    #[test]
    fn sprite_instance_layout_is_packed() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 10 * 4);
    }
}
