use crate::batch::InstanceBatcher;
use crate::items::{self, RenderItem};
use crate::scatter::{self, RESOURCE_SALT};
use hexfield_assets::{QualitySettings, SpriteCatalog, SpriteDef};
use hexfield_common::{projection, Camera, ChunkKey, HexCoord, CHUNK_SIZE};
use hexfield_gfx::GpuDevice;
use hexfield_world::TileMap;
use glam::Vec2;

/// Per-frame overlay statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayStats {
    pub items: usize,
    pub draw_calls: usize,
    pub shadow_instances: usize,
}

/// Draws static per-frame content over the baked chunks: clumped resource
/// icons and building icons.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    shadows: InstanceBatcher,
    sprites: InstanceBatcher,
    unsupported: bool,
    stats: OverlayStats,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> OverlayStats {
        self.stats
    }

    /// Whether the pass degraded itself for lack of instancing support.
    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    pub fn render(
        &mut self,
        gpu: &mut dyn GpuDevice,
        map: &TileMap,
        catalog: &SpriteCatalog,
        quality: &QualitySettings,
        camera: &Camera,
        visible: &[ChunkKey],
    ) {
        self.stats = OverlayStats::default();
        if !gpu.supports_instancing() {
            if !self.unsupported {
                tracing::warn!("instancing unavailable; overlay pass disabled");
            }
            self.unsupported = true;
            return;
        }

        let mut gathered: Vec<RenderItem> = Vec::new();
        for key in visible {
            let origin = key.origin_tile();
            for dr in 0..CHUNK_SIZE {
                for dq in 0..CHUNK_SIZE {
                    let tile = HexCoord::new(origin.q + dq, origin.r + dr);
                    let Some(data) = map.get(tile) else {
                        continue;
                    };
                    if !data.visible {
                        continue;
                    }

                    if let Some(resource) = data.resource {
                        if !resource.is_animal() {
                            if let Some(def) = catalog.get(resource.icon_sprite()) {
                                self.gather_clump(
                                    &mut gathered,
                                    def,
                                    quality,
                                    camera,
                                    tile,
                                );
                            }
                        }
                    }

                    if let Some(icon) = data.improvement.and_then(|i| i.icon_sprite()) {
                        if let Some(def) = catalog.get(icon) {
                            let anchor = camera.world_to_screen(projection::tile_anchor(tile));
                            gathered.push(make_item(def, anchor, camera.zoom, quality));
                        }
                    }
                }
            }
        }

        items::painter_sort(&mut gathered);
        items::submit(gpu, &mut self.shadows, &mut self.sprites, &gathered);

        self.stats.items = gathered.len();
        self.stats.draw_calls =
            self.shadows.stats().draw_calls + self.sprites.stats().draw_calls;
        self.stats.shadow_instances = self.shadows.stats().instances;
    }

    fn gather_clump(
        &self,
        gathered: &mut Vec<RenderItem>,
        def: &SpriteDef,
        quality: &QualitySettings,
        camera: &Camera,
        tile: HexCoord,
    ) {
        let count = scatter::clump_count(&def.visual.clump, quality, tile, RESOURCE_SALT);
        for index in 0..count {
            let offset =
                scatter::clump_offset(tile, RESOURCE_SALT, index, def.visual.clump.spread);
            let anchor =
                camera.world_to_screen(projection::tile_anchor(tile) + offset);
            gathered.push(make_item(def, anchor, camera.zoom, quality));
        }
    }
}

fn make_item(
    def: &SpriteDef,
    anchor: Vec2,
    zoom: f32,
    quality: &QualitySettings,
) -> RenderItem {
    let instance = items::sprite_instance(def, anchor, zoom, false, 1.0);
    let shadow = (quality.shadows && def.visual.shadow.enabled)
        .then(|| items::shadow_instance(def, anchor, zoom));
    RenderItem {
        atlas: def.atlas,
        instance,
        shadow,
        sort_key: instance.dest[1] + instance.dest[3],
    }
}
