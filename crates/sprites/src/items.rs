use crate::batch::InstanceBatcher;
use hexfield_assets::SpriteDef;
use hexfield_common::AtlasId;
use hexfield_gfx::{GpuDevice, SpriteInstance};
use glam::Vec2;

/// One gathered sprite occurrence, ready for depth sort and batching.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem {
    pub atlas: AtlasId,
    pub instance: SpriteInstance,
    pub shadow: Option<SpriteInstance>,
    /// Screen-space bottom edge; the painter-order depth proxy.
    pub sort_key: f32,
}

/// Build a sprite instance standing on the given screen anchor
/// (bottom-center of the sprite).
pub fn sprite_instance(
    def: &SpriteDef,
    anchor: Vec2,
    zoom: f32,
    flip: bool,
    opacity: f32,
) -> SpriteInstance {
    let w = def.size[0] * def.visual.scale * zoom;
    let h = def.size[1] * def.visual.scale * zoom;
    SpriteInstance {
        dest: [
            anchor.x - w * 0.5 + def.visual.shift[0] * zoom,
            anchor.y - h + def.visual.shift[1] * zoom,
            w,
            h,
        ],
        uv: [def.uv.u0, def.uv.v0, def.uv.u1, def.uv.v1],
        flip: if flip { 1.0 } else { 0.0 },
        opacity,
    }
}

/// Build the soft-ellipse shadow instance for a sprite at the given anchor.
///
/// Same per-instance layout as a sprite; the UV slot is zeroed (the shader
/// renders a procedural ellipse when it sees a zero-area UV) and the last
/// float carries the shadow opacity.
pub fn shadow_instance(def: &SpriteDef, anchor: Vec2, zoom: f32) -> SpriteInstance {
    let shadow = def.visual.shadow;
    let w = def.size[0] * def.visual.scale * shadow.scale * zoom;
    let h = w * 0.4;
    SpriteInstance {
        dest: [
            anchor.x - w * 0.5 + shadow.offset[0] * zoom,
            anchor.y - h * 0.5 + shadow.offset[1] * zoom,
            w,
            h,
        ],
        uv: [0.0; 4],
        flip: 0.0,
        opacity: shadow.opacity,
    }
}

/// Painter's algorithm: ascending bottom edge, so nearer (lower on screen)
/// sprites draw over farther ones.
pub fn painter_sort(items: &mut [RenderItem]) {
    items.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));
}

/// Submit sorted items: the shadow sub-pass first, then the sprites, each
/// through its own batcher so toggling shadows changes the draw-call count.
pub fn submit(
    gpu: &mut dyn GpuDevice,
    shadows: &mut InstanceBatcher,
    sprites: &mut InstanceBatcher,
    items: &[RenderItem],
) {
    shadows.begin_frame();
    sprites.begin_frame();
    for item in items {
        if let Some(shadow) = item.shadow {
            shadows.push(gpu, item.atlas, shadow);
        }
    }
    shadows.flush(gpu);
    for item in items {
        sprites.push(gpu, item.atlas, item.instance);
    }
    sprites.flush(gpu);
}
