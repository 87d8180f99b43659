use hexfield_assets::{CatalogEvent, QualitySettings, SpriteCatalog, SpriteGroup};
use hexfield_chunks::{ChunkConfig, ChunkManager, ChunkStats, Layer};
use hexfield_common::{projection, Camera, UvRect, WorldRect};
use hexfield_gfx::{GpuDevice, ResourceRegistry, TextureOrigin};
use hexfield_sprites::{
    AnimalRenderer, AnimalStats, ForestRenderer, ForestStats, OverlayRenderer, OverlayStats,
};
use hexfield_world::TileMap;
use std::time::{Duration, Instant};

/// Aggregated statistics for one rendered frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub visible_chunks: usize,
    pub layer_blits: usize,
    pub chunks: ChunkStats,
    pub overlay: OverlayStats,
    pub forest: ForestStats,
    pub animals: AnimalStats,
}

/// Owns every piece of the pipeline and runs it once per frame.
pub struct MapRenderer {
    chunks: ChunkManager,
    overlay: OverlayRenderer,
    forest: ForestRenderer,
    animals: AnimalRenderer,
    registry: ResourceRegistry,
    quality: QualitySettings,
    context_lost: bool,
    stats: FrameStats,
}

impl MapRenderer {
    pub fn new(config: ChunkConfig, quality: QualitySettings) -> Self {
        Self {
            chunks: ChunkManager::new(config),
            overlay: OverlayRenderer::new(),
            forest: ForestRenderer::new(),
            animals: AnimalRenderer::new(),
            registry: ResourceRegistry::new(),
            quality,
            context_lost: false,
            stats: FrameStats::default(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn quality(&self) -> QualitySettings {
        self.quality
    }

    /// Quality changes need no invalidation: dynamic content re-batches
    /// every frame anyway.
    pub fn set_quality(&mut self, quality: QualitySettings) {
        self.quality = quality;
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Mutable registry access for owners that allocate their own textures
    /// (atlas uploads) and need them in the same ledger.
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// The GPU context is gone: drop every handle atomically and suppress
    /// all further GPU calls until [`MapRenderer::on_backend_restored`].
    pub fn on_context_lost(&mut self) {
        self.context_lost = true;
        self.chunks.on_context_lost();
        self.registry.on_context_lost();
        self.animals.reset();
        tracing::warn!("GPU context lost; rendering suspended");
    }

    /// The owner has re-created the GPU backend; chunk content rebakes over
    /// the following frames.
    pub fn on_backend_restored(&mut self) {
        self.context_lost = false;
        tracing::info!("GPU backend restored");
    }

    /// Render one frame.
    pub fn render_frame(
        &mut self,
        gpu: &mut dyn GpuDevice,
        map: &mut TileMap,
        catalog: &mut SpriteCatalog,
        camera: &Camera,
        dt: Duration,
    ) {
        self.render_frame_at(gpu, map, catalog, camera, dt, Instant::now());
    }

    /// `render_frame` with an injectable timestamp for the scheduler.
    pub fn render_frame_at(
        &mut self,
        gpu: &mut dyn GpuDevice,
        map: &mut TileMap,
        catalog: &mut SpriteCatalog,
        camera: &Camera,
        dt: Duration,
        now: Instant,
    ) {
        if self.context_lost {
            return;
        }
        self.stats = FrameStats::default();

        for change in map.drain_events() {
            self.chunks.on_tile_changed(map, &change);
        }
        for event in catalog.drain_events() {
            match event {
                CatalogEvent::GroupChanged(SpriteGroup::Terrain) => {
                    self.chunks.invalidate_all(Layer::Base);
                }
                CatalogEvent::GroupChanged(SpriteGroup::Infra) => {
                    self.chunks.invalidate_all(Layer::Infra);
                }
                // Content sprites are re-gathered every frame; nothing to
                // invalidate.
                CatalogEvent::GroupChanged(SpriteGroup::Content) => {}
            }
        }

        self.chunks
            .update_at(gpu, &mut self.registry, map, catalog, camera, now);

        let visible = self.chunks.visible_chunks(map, camera);
        self.stats.visible_chunks = visible.len();

        for layer in Layer::ALL {
            for key in &visible {
                let Some(chunk) = self.chunks.chunk(*key) else {
                    continue;
                };
                let Some(texture) = chunk.texture(layer) else {
                    continue;
                };
                let world = projection::chunk_world_rect(*key);
                let dest = WorldRect::new(
                    (world.x - camera.x) * camera.zoom,
                    (world.y - camera.y) * camera.zoom,
                    world.width * camera.zoom,
                    world.height * camera.zoom,
                );
                // The single place that reconciles texture row order:
                // render targets blit flipped, uploads blit as-is.
                let uv = match texture.origin {
                    TextureOrigin::RenderTarget => UvRect::FULL.flipped_v(),
                    TextureOrigin::Uploaded => UvRect::FULL,
                };
                gpu.draw_texture(texture, dest, uv);
                self.stats.layer_blits += 1;
            }
        }

        self.overlay
            .render(gpu, map, catalog, &self.quality, camera, &visible);
        self.forest
            .render(gpu, map, catalog, &self.quality, camera, &visible);
        self.animals
            .render(gpu, map, catalog, &self.quality, camera, &visible, dt);

        self.stats.chunks = self.chunks.stats();
        self.stats.overlay = self.overlay.stats();
        self.stats.forest = self.forest.stats();
        self.stats.animals = self.animals.stats();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_common::HexCoord;
    use hexfield_gfx::{DrawCall, RecordingDevice};
    use hexfield_world::{Resource, Terrain};

    fn generous_config() -> ChunkConfig {
        ChunkConfig {
            interact_budget: Duration::from_secs(5),
            idle_budget: Duration::from_secs(5),
            ..ChunkConfig::default()
        }
    }

    struct Rig {
        gpu: RecordingDevice,
        renderer: MapRenderer,
        map: TileMap,
        catalog: SpriteCatalog,
        camera: Camera,
    }

    impl Rig {
        fn new() -> Self {
            let mut map = TileMap::new(32, 32);
            map.set_terrain(HexCoord::new(3, 3), Terrain::Forest);
            map.set_resource(HexCoord::new(5, 5), Some(Resource::Wheat));
            map.set_resource(HexCoord::new(7, 7), Some(Resource::Deer));
            map.drain_events();
            Self {
                gpu: RecordingDevice::new(),
                renderer: MapRenderer::new(generous_config(), QualitySettings::default()),
                map,
                catalog: SpriteCatalog::with_defaults(),
                camera: Camera::default(),
            }
        }

        fn frame(&mut self) {
            self.renderer.render_frame(
                &mut self.gpu,
                &mut self.map,
                &mut self.catalog,
                &self.camera,
                Duration::from_millis(16),
            );
        }
    }

    #[test]
    fn first_frame_bakes_blits_and_batches() {
        let mut rig = Rig::new();
        rig.frame();
        let stats = rig.renderer.stats();

        // Every chunk baked both layers under the generous budget.
        assert_eq!(stats.chunks.tasks_executed, 8);
        assert!(stats.visible_chunks > 0);
        // One blit per visible chunk per layer.
        assert_eq!(stats.layer_blits, stats.visible_chunks * 2);
        assert!(stats.overlay.items > 0);
        assert!(stats.forest.trees > 0);
        assert!(stats.animals.animals > 0);
    }

    #[test]
    fn blits_flip_render_target_textures() {
        let mut rig = Rig::new();
        rig.frame();
        let mut blits = 0;
        for call in rig.gpu.calls() {
            if let DrawCall::Blit { uv, .. } = call {
                assert!(uv.v0 > uv.v1, "render targets must blit V-flipped");
                blits += 1;
            }
        }
        assert!(blits > 0);
    }

    #[test]
    fn steady_state_frames_do_not_rebake() {
        let mut rig = Rig::new();
        rig.frame();
        rig.frame();
        let stats = rig.renderer.stats();
        assert_eq!(stats.chunks.tasks_executed, 0);
        assert_eq!(stats.layer_blits, stats.visible_chunks * 2);
    }

    #[test]
    fn terrain_sprite_edits_rebake_base_only() {
        let mut rig = Rig::new();
        rig.frame();

        let mut visual = rig.catalog.get("terrain.land").unwrap().visual;
        visual.scale = 1.5;
        rig.catalog.set_visual("terrain.land", visual).unwrap();
        rig.frame();
        // Base layer of all four chunks rebaked; infra untouched.
        assert_eq!(rig.renderer.stats().chunks.tasks_executed, 4);
    }

    #[test]
    fn content_sprite_edits_rebake_nothing() {
        let mut rig = Rig::new();
        rig.frame();

        let mut visual = rig.catalog.get("resource.wheat").unwrap().visual;
        visual.scale = 2.0;
        rig.catalog.set_visual("resource.wheat", visual).unwrap();
        rig.frame();
        assert_eq!(rig.renderer.stats().chunks.tasks_executed, 0);
    }

    #[test]
    fn shadow_toggle_needs_no_rebuild() {
        let mut rig = Rig::new();
        rig.frame();
        let with_shadows = rig.renderer.stats().overlay.shadow_instances;
        assert!(with_shadows > 0);

        rig.renderer.set_quality(QualitySettings {
            shadows: false,
            max_clump: 0,
        });
        rig.frame();
        let stats = rig.renderer.stats();
        assert_eq!(stats.overlay.shadow_instances, 0);
        assert_eq!(stats.chunks.tasks_executed, 0);
    }

    #[test]
    fn failed_rebakes_keep_showing_stale_textures() {
        let mut rig = Rig::new();
        rig.frame();
        let healthy_blits = rig.renderer.stats().layer_blits;

        // Force rebakes and make every allocation fail: output must stay
        // stale, never missing.
        let mut visual = rig.catalog.get("terrain.land").unwrap().visual;
        visual.scale = 0.9;
        rig.catalog.set_visual("terrain.land", visual).unwrap();
        rig.gpu.fail_allocations = true;
        rig.frame();
        let stats = rig.renderer.stats();
        assert!(stats.chunks.bakes_failed > 0);
        assert_eq!(stats.layer_blits, healthy_blits);
    }

    #[test]
    fn context_loss_suppresses_all_gpu_work_until_restore() {
        let mut rig = Rig::new();
        rig.frame();
        assert!(rig.renderer.registry().live_count() > 0);

        rig.renderer.on_context_lost();
        assert_eq!(rig.renderer.registry().live_count(), 0);
        rig.gpu.drop_all_textures();
        rig.gpu.take_calls();

        rig.frame();
        assert!(rig.gpu.calls().is_empty(), "lost context must stay silent");

        rig.renderer.on_backend_restored();
        rig.frame();
        let stats = rig.renderer.stats();
        assert_eq!(stats.chunks.tasks_executed, 8);
        assert_eq!(stats.layer_blits, stats.visible_chunks * 2);
    }
}
