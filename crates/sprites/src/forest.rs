use crate::batch::InstanceBatcher;
use crate::items::{self, RenderItem};
use crate::scatter::{self, TREE_SALT};
use hexfield_assets::{QualitySettings, SpriteCatalog};
use hexfield_common::{projection, Camera, ChunkKey, HexCoord, CHUNK_SIZE};
use hexfield_gfx::GpuDevice;
use hexfield_world::{Terrain, TileMap};

/// Per-frame forest statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForestStats {
    pub trees: usize,
    pub draw_calls: usize,
}

/// Scatters tree sprites over forest tiles.
///
/// Trees are not baked into the base layer so their density can follow the
/// quality settings frame to frame; placement is still fully deterministic
/// per tile.
#[derive(Debug, Default)]
pub struct ForestRenderer {
    shadows: InstanceBatcher,
    sprites: InstanceBatcher,
    unsupported: bool,
    stats: ForestStats,
}

impl ForestRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ForestStats {
        self.stats
    }

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
        self.stats = ForestStats::default();
        if !gpu.supports_instancing() {
            if !self.unsupported {
                tracing::warn!("instancing unavailable; forest pass disabled");
            }
            self.unsupported = true;
            return;
        }
        let Some(def) = catalog.get("tree.pine") else {
            return;
        };

        let mut gathered: Vec<RenderItem> = Vec::new();
        for key in visible {
            let origin = key.origin_tile();
            for dr in 0..CHUNK_SIZE {
                for dq in 0..CHUNK_SIZE {
                    let tile = HexCoord::new(origin.q + dq, origin.r + dr);
                    let Some(data) = map.get(tile) else {
                        continue;
                    };
                    if data.terrain != Terrain::Forest || !data.visible {
                        continue;
                    }
                    let count =
                        scatter::clump_count(&def.visual.clump, quality, tile, TREE_SALT);
                    for index in 0..count {
                        let offset = scatter::clump_offset(
                            tile,
                            TREE_SALT,
                            index,
                            def.visual.clump.spread,
                        );
                        let anchor =
                            camera.world_to_screen(projection::tile_anchor(tile) + offset);
                        let instance =
                            items::sprite_instance(def, anchor, camera.zoom, false, 1.0);
                        let shadow = (quality.shadows && def.visual.shadow.enabled)
                            .then(|| items::shadow_instance(def, anchor, camera.zoom));
                        gathered.push(RenderItem {
                            atlas: def.atlas,
                            instance,
                            shadow,
                            sort_key: instance.dest[1] + instance.dest[3],
                        });
                    }
                }
            }
        }

        items::painter_sort(&mut gathered);
        items::submit(gpu, &mut self.shadows, &mut self.sprites, &gathered);
        self.stats.trees = gathered.len();
        self.stats.draw_calls =
            self.shadows.stats().draw_calls + self.sprites.stats().draw_calls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_gfx::RecordingDevice;

    fn forest_scene() -> (TileMap, SpriteCatalog, Camera, Vec<ChunkKey>) {
        let mut map = TileMap::new(16, 16);
        for q in 3..6 {
            map.set_terrain(HexCoord::new(q, 4), Terrain::Forest);
        }
        (
            map,
            SpriteCatalog::with_defaults(),
            Camera::default(),
            vec![ChunkKey::new(0, 0)],
        )
    }

    #[test]
    fn forest_tiles_grow_configured_clumps() {
        let (map, catalog, camera, visible) = forest_scene();
        let mut gpu = RecordingDevice::new();
        let mut forest = ForestRenderer::new();
        let quality = QualitySettings {
            shadows: false,
            max_clump: 0,
        };
        forest.render(&mut gpu, &map, &catalog, &quality, &camera, &visible);

        let clump = catalog.get("tree.pine").unwrap().visual.clump;
        let trees = forest.stats().trees;
        assert!(trees >= 3 * clump.min as usize);
        assert!(trees <= 3 * clump.max as usize);
        assert_eq!(gpu.sprite_count(), trees);
    }

    #[test]
    fn tree_layout_is_stable_across_frames() {
        let (map, catalog, camera, visible) = forest_scene();
        let quality = QualitySettings::default();
        let mut draws = Vec::new();
        for _ in 0..2 {
            let mut gpu = RecordingDevice::new();
            let mut forest = ForestRenderer::new();
            forest.render(&mut gpu, &map, &catalog, &quality, &camera, &visible);
            draws.push(gpu.take_calls());
        }
        assert_eq!(draws[0], draws[1]);
    }

    #[test]
    fn quality_cap_thins_the_forest() {
        let (map, catalog, camera, visible) = forest_scene();
        let mut gpu = RecordingDevice::new();
        let mut forest = ForestRenderer::new();
        let quality = QualitySettings {
            shadows: false,
            max_clump: 1,
        };
        forest.render(&mut gpu, &map, &catalog, &quality, &camera, &visible);
        assert_eq!(forest.stats().trees, 3);
    }

    #[test]
    fn plains_grow_nothing() {
        let map = TileMap::new(16, 16);
        let catalog = SpriteCatalog::with_defaults();
        let mut gpu = RecordingDevice::new();
        let mut forest = ForestRenderer::new();
        forest.render(
            &mut gpu,
            &map,
            &catalog,
            &QualitySettings::default(),
            &Camera::default(),
            &[ChunkKey::new(0, 0)],
        );
        assert_eq!(forest.stats().trees, 0);
        assert!(gpu.calls().is_empty());
    }
}
