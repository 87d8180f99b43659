use crate::builder::ChunkLayerBuilder;
use crate::chunk::{ChunkData, DirtyTask, Layer};
use crate::lod::ZoomBucket;
use crate::schedule::{ChunkConfig, RebuildQueue};
use hexfield_assets::SpriteCatalog;
use hexfield_common::{projection, Camera, ChunkKey};
use hexfield_gfx::{GpuDevice, ResourceRegistry};
use hexfield_world::{TileChange, TileMap};
use std::collections::HashMap;
use std::time::Instant;

/// Per-frame scheduling statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkStats {
    pub tasks_executed: usize,
    pub quads_baked: usize,
    pub bakes_failed: usize,
    pub queue_pending: usize,
    pub chunks_live: usize,
    /// Resource/visibility edits seen since startup; they never schedule a
    /// rebuild because the per-frame sprite passes read the map directly.
    pub content_changes: u64,
}

/// Owns the chunk cache: dirty tracking, zoom-bucket selection, and the
/// prioritized, time-budgeted rebuild queue.
pub struct ChunkManager {
    config: ChunkConfig,
    builder: ChunkLayerBuilder,
    chunks: HashMap<u64, ChunkData>,
    queue: RebuildQueue,
    bucket: ZoomBucket,
    last_camera: Option<Camera>,
    last_motion: Option<Instant>,
    frame: u64,
    content_changes: u64,
    stats: ChunkStats,
}

impl ChunkManager {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            builder: ChunkLayerBuilder::new(),
            chunks: HashMap::new(),
            queue: RebuildQueue::new(),
            bucket: ZoomBucket::Normal,
            last_camera: None,
            last_motion: None,
            frame: 0,
            content_changes: 0,
            stats: ChunkStats::default(),
        }
    }

    pub fn bucket(&self) -> ZoomBucket {
        self.bucket
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&ChunkData> {
        self.chunks.get(&key.pack())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn dirty_count(&self, layer: Layer) -> usize {
        self.chunks.values().filter(|c| c.is_dirty(layer)).count()
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }

    /// Mark the layer dirty on every existing chunk. Used for global
    /// asset/config changes and zoom-bucket switches.
    pub fn invalidate_all(&mut self, layer: Layer) {
        for chunk in self.chunks.values_mut() {
            chunk.mark_dirty(layer);
        }
        tracing::debug!(?layer, chunks = self.chunks.len(), "layer invalidated");
    }

    /// React to one tile edit from the map's change stream.
    pub fn on_tile_changed(&mut self, map: &TileMap, change: &TileChange) {
        match change {
            TileChange::Terrain { tile, .. } => {
                self.mark_chunk(map, tile.chunk(), Layer::Base);
            }
            TileChange::Improvement { tile, .. } => {
                self.mark_chunk(map, tile.chunk(), Layer::Infra);
                // Roads must render continuously across chunk seams, so a
                // border edit also re-bakes the adjacent chunks.
                if ChunkKey::is_border_tile(*tile) {
                    let home = tile.chunk();
                    for neighbor in tile.neighbors() {
                        let key = neighbor.chunk();
                        if key != home {
                            self.mark_chunk(map, key, Layer::Infra);
                        }
                    }
                }
            }
            TileChange::Resource { .. } | TileChange::Visibility { .. } => {
                self.content_changes += 1;
            }
        }
    }

    /// All chunks whose padded world rect overlaps the camera view.
    ///
    /// Walks the map's full chunk extent, materializing records on first
    /// touch. Eager bookkeeping across the whole map trades memory for
    /// simplicity; `last_used` is the seam if eviction ever becomes
    /// necessary.
    pub fn visible_chunks(&mut self, map: &TileMap, camera: &Camera) -> Vec<ChunkKey> {
        let view = camera.world_rect();
        let mut visible = Vec::new();
        for row in 0..map.chunk_rows() {
            for col in 0..map.chunk_cols() {
                let key = ChunkKey::new(col, row);
                let chunk = self
                    .chunks
                    .entry(key.pack())
                    .or_insert_with(|| ChunkData::new(key));
                if projection::chunk_world_rect(key).intersects(&view) {
                    chunk.last_used = self.frame;
                    visible.push(key);
                }
            }
        }
        visible
    }

    /// Per-frame scheduling entry point: applies any pending zoom-bucket
    /// switch, then drains rebuild work until the frame budget elapses.
    pub fn update(
        &mut self,
        gpu: &mut dyn GpuDevice,
        registry: &mut ResourceRegistry,
        map: &TileMap,
        catalog: &SpriteCatalog,
        camera: &Camera,
    ) {
        self.update_at(gpu, registry, map, catalog, camera, Instant::now());
    }

    /// `update` with an injectable timestamp for the stillness logic.
    pub fn update_at(
        &mut self,
        gpu: &mut dyn GpuDevice,
        registry: &mut ResourceRegistry,
        map: &TileMap,
        catalog: &SpriteCatalog,
        camera: &Camera,
        now: Instant,
    ) {
        let _span = tracing::info_span!("chunk_update").entered();
        self.frame += 1;

        if let Some(prev) = self.last_camera {
            let moved = (prev.x - camera.x).abs() > self.config.motion_epsilon
                || (prev.y - camera.y).abs() > self.config.motion_epsilon
                || (prev.zoom - camera.zoom).abs() > self.config.zoom_epsilon;
            if moved {
                self.last_motion = Some(now);
            }
        }
        self.last_camera = Some(*camera);

        let interacting = self
            .last_motion
            .is_some_and(|t| now.duration_since(t) < self.config.interaction_window);

        // Switching buckets invalidates every chunk, so wait until the
        // camera has settled rather than storming rebuilds mid-gesture.
        let desired = ZoomBucket::for_zoom(camera.zoom);
        if desired != self.bucket && !interacting {
            self.bucket = desired;
            self.invalidate_all(Layer::Base);
            self.invalidate_all(Layer::Infra);
            tracing::debug!(bucket = ?desired, "zoom bucket switched");
        }

        self.stats = ChunkStats::default();
        let budget = if interacting {
            self.config.interact_budget
        } else {
            self.config.idle_budget
        };

        let started = Instant::now();
        loop {
            // Budget is a gate between units, never mid-unit preemption: an
            // overrunning bake finishes, no further units start.
            if started.elapsed() >= budget {
                break;
            }
            if self.queue.is_drained() && !self.refill_queue(camera) {
                break;
            }
            let Some(task) = self.queue.pop(self.config.compact_threshold) else {
                break;
            };
            let Some(chunk) = self.chunks.get_mut(&task.key.pack()) else {
                continue;
            };
            // The dirty flag is the truth; a stale or duplicate queue entry
            // for a since-rebuilt chunk is skipped here.
            if !chunk.is_dirty(task.layer) {
                continue;
            }
            // Always bake at the live bucket: a task enqueued before a
            // bucket switch still produces a texture at the current bucket.
            match self
                .builder
                .bake(gpu, registry, map, catalog, chunk, task.layer, self.bucket)
            {
                Ok(bake) => {
                    chunk.clear_dirty(task.layer);
                    self.stats.tasks_executed += 1;
                    self.stats.quads_baked += bake.quads;
                }
                Err(e) => {
                    // Chunk stays dirty and is retried on a later pass.
                    tracing::warn!(key = ?task.key, layer = ?task.layer, error = %e, "bake failed");
                    self.stats.bakes_failed += 1;
                    break;
                }
            }
        }

        self.stats.queue_pending = self.queue.pending();
        self.stats.chunks_live = self.chunks.len();
        self.stats.content_changes = self.content_changes;
    }

    /// Drop every GPU handle without touching the device; the context that
    /// owned them is gone. The next frames re-bake everything.
    pub fn on_context_lost(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.reset_gpu_state();
        }
        self.queue.clear();
        tracing::info!(chunks = self.chunks.len(), "chunk cache reset on context loss");
    }

    fn mark_chunk(&mut self, map: &TileMap, key: ChunkKey, layer: Layer) {
        if !map.chunk_in_bounds(key) {
            return;
        }
        self.chunks
            .entry(key.pack())
            .or_insert_with(|| ChunkData::new(key))
            .mark_dirty(layer);
    }

    /// Build a fresh queue from every dirty (chunk, layer) pair, nearest to
    /// the camera center first. Returns false when nothing is dirty.
    fn refill_queue(&mut self, camera: &Camera) -> bool {
        let center = camera.world_center();
        let mut entries: Vec<(f32, DirtyTask)> = Vec::new();
        for chunk in self.chunks.values() {
            let dist = projection::chunk_world_rect(chunk.key)
                .center()
                .distance_squared(center);
            for layer in Layer::ALL {
                if chunk.is_dirty(layer) {
                    entries.push((
                        dist,
                        DirtyTask {
                            key: chunk.key,
                            layer,
                            bucket: self.bucket,
                        },
                    ));
                }
            }
        }
        if entries.is_empty() {
            return false;
        }
        // Distance sort with a packed-key tie-break so queue order is
        // deterministic regardless of hash-map iteration.
        entries.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.key.pack().cmp(&b.1.key.pack()))
                .then_with(|| a.1.layer.index().cmp(&b.1.layer.index()))
        });
        let tasks = entries.into_iter().map(|(_, task)| task).collect();
        self.queue.refill(tasks);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_common::HexCoord;
    use hexfield_gfx::RecordingDevice;
    use hexfield_world::{Improvement, Resource, Terrain};
    use std::time::Duration;

    fn generous_config() -> ChunkConfig {
        ChunkConfig {
            interact_budget: Duration::from_secs(5),
            idle_budget: Duration::from_secs(5),
            ..ChunkConfig::default()
        }
    }

    fn frozen_config() -> ChunkConfig {
        ChunkConfig {
            interact_budget: Duration::ZERO,
            idle_budget: Duration::ZERO,
            ..ChunkConfig::default()
        }
    }

    struct Rig {
        gpu: RecordingDevice,
        registry: ResourceRegistry,
        map: TileMap,
        catalog: SpriteCatalog,
        camera: Camera,
    }

    impl Rig {
        fn new(tiles: i32) -> Self {
            Self {
                gpu: RecordingDevice::new(),
                registry: ResourceRegistry::new(),
                map: TileMap::new(tiles, tiles),
                catalog: SpriteCatalog::with_defaults(),
                camera: Camera::default(),
            }
        }

        fn update(&mut self, manager: &mut ChunkManager, now: Instant) {
            manager.update_at(
                &mut self.gpu,
                &mut self.registry,
                &self.map,
                &self.catalog,
                &self.camera,
                now,
            );
        }
    }

    #[test]
    fn visible_chunks_materialize_lazily_and_cull() {
        let mut rig = Rig::new(48);
        let mut manager = ChunkManager::new(generous_config());
        assert_eq!(manager.chunk_count(), 0);

        let visible = manager.visible_chunks(&rig.map, &rig.camera);
        // Bookkeeping covers the whole 3×3 extent once touched.
        assert_eq!(manager.chunk_count(), 9);
        assert!(!visible.is_empty());
        assert!(visible.len() < 9, "default camera does not see every chunk");

        // Far camera sees nothing but keeps the records alive.
        rig.camera.x = 1.0e6;
        rig.camera.y = 1.0e6;
        assert!(manager.visible_chunks(&rig.map, &rig.camera).is_empty());
        assert_eq!(manager.chunk_count(), 9);
    }

    #[test]
    fn update_bakes_everything_under_a_generous_budget() {
        let mut rig = Rig::new(48);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);

        rig.update(&mut manager, Instant::now());
        let stats = manager.stats();
        // 9 chunks × 2 layers, each baked exactly once.
        assert_eq!(stats.tasks_executed, 18);
        assert_eq!(manager.dirty_count(Layer::Base), 0);
        assert_eq!(manager.dirty_count(Layer::Infra), 0);
        assert_eq!(rig.registry.owner_stats("chunks").count, 18);
    }

    #[test]
    fn invalidate_all_schedules_each_chunk_exactly_once_per_layer() {
        let mut rig = Rig::new(48);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());

        manager.invalidate_all(Layer::Base);
        assert_eq!(manager.dirty_count(Layer::Base), 9);
        assert_eq!(manager.dirty_count(Layer::Infra), 0);

        rig.update(&mut manager, Instant::now());
        assert_eq!(manager.stats().tasks_executed, 9);
        assert_eq!(manager.dirty_count(Layer::Base), 0);
    }

    #[test]
    fn zero_budget_executes_nothing() {
        let mut rig = Rig::new(48);
        let mut manager = ChunkManager::new(frozen_config());
        manager.visible_chunks(&rig.map, &rig.camera);

        rig.update(&mut manager, Instant::now());
        assert_eq!(manager.stats().tasks_executed, 0);
        assert_eq!(manager.dirty_count(Layer::Base), 9);
    }

    #[test]
    fn terrain_edits_dirty_base_only() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());

        rig.map.set_terrain(HexCoord::new(4, 4), Terrain::Desert);
        for change in rig.map.drain_events() {
            manager.on_tile_changed(&rig.map, &change);
        }
        assert_eq!(manager.dirty_count(Layer::Base), 1);
        assert_eq!(manager.dirty_count(Layer::Infra), 0);
    }

    #[test]
    fn border_improvement_edits_dirty_adjacent_chunks() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());

        // Rightmost column of chunk (0, 0): its east neighbor lives in
        // chunk (1, 0).
        rig.map
            .set_improvement(HexCoord::new(15, 8), Some(Improvement::Road));
        for change in rig.map.drain_events() {
            manager.on_tile_changed(&rig.map, &change);
        }
        assert!(manager
            .chunk(ChunkKey::new(0, 0))
            .unwrap()
            .is_dirty(Layer::Infra));
        assert!(manager
            .chunk(ChunkKey::new(1, 0))
            .unwrap()
            .is_dirty(Layer::Infra));
        assert_eq!(manager.dirty_count(Layer::Base), 0);
    }

    #[test]
    fn interior_improvement_edits_stay_local() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());

        rig.map
            .set_improvement(HexCoord::new(7, 7), Some(Improvement::Road));
        for change in rig.map.drain_events() {
            manager.on_tile_changed(&rig.map, &change);
        }
        assert_eq!(manager.dirty_count(Layer::Infra), 1);
    }

    #[test]
    fn resource_edits_never_schedule_rebuilds() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());

        rig.map
            .set_resource(HexCoord::new(3, 3), Some(Resource::Wheat));
        rig.map.set_visibility(HexCoord::new(4, 4), false);
        for change in rig.map.drain_events() {
            manager.on_tile_changed(&rig.map, &change);
        }
        assert_eq!(manager.dirty_count(Layer::Base), 0);
        assert_eq!(manager.dirty_count(Layer::Infra), 0);
        rig.update(&mut manager, Instant::now());
        assert_eq!(manager.stats().content_changes, 2);
    }

    #[test]
    fn bucket_switch_waits_for_stillness() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(frozen_config());
        manager.visible_chunks(&rig.map, &rig.camera);

        let t0 = Instant::now();
        rig.update(&mut manager, t0);
        assert_eq!(manager.bucket(), ZoomBucket::Normal);

        // Zooming marks the camera as interacting; no switch yet.
        rig.camera.zoom = 2.0;
        rig.update(&mut manager, t0 + Duration::from_millis(16));
        assert_eq!(manager.bucket(), ZoomBucket::Normal);

        // Still inside the interaction window.
        rig.update(&mut manager, t0 + Duration::from_millis(116));
        assert_eq!(manager.bucket(), ZoomBucket::Normal);

        // Past the stillness threshold: the switch lands and invalidates
        // both layers everywhere.
        rig.update(&mut manager, t0 + Duration::from_millis(416));
        assert_eq!(manager.bucket(), ZoomBucket::Fine);
        assert_eq!(manager.dirty_count(Layer::Base), manager.chunk_count());
        assert_eq!(manager.dirty_count(Layer::Infra), manager.chunk_count());
    }

    #[test]
    fn failed_bakes_retry_on_a_later_pass() {
        let mut rig = Rig::new(16);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);

        rig.gpu.fail_allocations = true;
        rig.update(&mut manager, Instant::now());
        assert!(manager.stats().bakes_failed > 0);
        assert_eq!(manager.dirty_count(Layer::Base), 1);

        rig.gpu.fail_allocations = false;
        rig.update(&mut manager, Instant::now());
        assert_eq!(manager.dirty_count(Layer::Base), 0);
        assert_eq!(manager.dirty_count(Layer::Infra), 0);
    }

    #[test]
    fn nearest_chunks_bake_first() {
        let mut rig = Rig::new(64);
        let mut manager = ChunkManager::new(frozen_config());
        manager.visible_chunks(&rig.map, &rig.camera);

        // Point the camera at the far corner chunk, then let one refill
        // happen by hand.
        rig.camera.x = 3.0 * 16.0 * 64.0;
        rig.camera.y = 3.0 * 16.0 * 48.0;
        assert!(manager.refill_queue(&rig.camera.clone()));
        let first = manager.queue.pop(2000).unwrap();
        assert_eq!(first.key, ChunkKey::new(3, 3));
    }

    #[test]
    fn context_loss_resets_every_chunk() {
        let mut rig = Rig::new(32);
        let mut manager = ChunkManager::new(generous_config());
        manager.visible_chunks(&rig.map, &rig.camera);
        rig.update(&mut manager, Instant::now());
        assert_eq!(manager.dirty_count(Layer::Base), 0);

        manager.on_context_lost();
        assert_eq!(manager.dirty_count(Layer::Base), manager.chunk_count());
        assert!(manager
            .chunk(ChunkKey::new(0, 0))
            .unwrap()
            .texture(Layer::Base)
            .is_none());
    }
}
