use hexfield_common::AtlasId;
use hexfield_gfx::{GpuDevice, SpriteInstance};

const INITIAL_CAPACITY: usize = 256;

/// Per-frame batching statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStats {
    pub draw_calls: usize,
    pub instances: usize,
    pub capacity_grown: usize,
}

/// Groups sprite instances sharing an atlas into single instanced draws.
///
/// Switching atlases forces a flush of the pending batch. The logical
/// capacity doubles when a frame outgrows it; the GPU backend reallocates
/// its instance buffer to match on the next draw.
#[derive(Debug)]
pub struct InstanceBatcher {
    atlas: Option<AtlasId>,
    pending: Vec<SpriteInstance>,
    capacity: usize,
    stats: BatchStats,
}

impl Default for InstanceBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBatcher {
    pub fn new() -> Self {
        Self {
            atlas: None,
            pending: Vec::with_capacity(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            stats: BatchStats::default(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.pending.clear();
        self.atlas = None;
        self.stats = BatchStats::default();
    }

    pub fn push(&mut self, gpu: &mut dyn GpuDevice, atlas: AtlasId, instance: SpriteInstance) {
        if self.atlas != Some(atlas) {
            self.flush(gpu);
            self.atlas = Some(atlas);
        }
        if self.pending.len() == self.capacity {
            self.capacity *= 2;
            self.pending.reserve(self.capacity - self.pending.len());
            self.stats.capacity_grown += 1;
        }
        self.pending.push(instance);
    }

    /// Issue the pending batch as one instanced draw.
    pub fn flush(&mut self, gpu: &mut dyn GpuDevice) {
        let Some(atlas) = self.atlas else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        gpu.draw_sprites(atlas, &self.pending);
        self.stats.draw_calls += 1;
        self.stats.instances += self.pending.len();
        self.pending.clear();
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_gfx::{DrawCall, RecordingDevice};

    fn instance(x: f32) -> SpriteInstance {
        SpriteInstance {
            dest: [x, 0.0, 8.0, 8.0],
            uv: [0.0, 0.0, 1.0, 1.0],
            flip: 0.0,
            opacity: 1.0,
        }
    }

    #[test]
    fn same_atlas_coalesces_into_one_draw() {
        let mut gpu = RecordingDevice::new();
        let mut batcher = InstanceBatcher::new();
        batcher.begin_frame();
        for i in 0..10 {
            batcher.push(&mut gpu, AtlasId(0), instance(i as f32));
        }
        batcher.flush(&mut gpu);
        assert_eq!(batcher.stats().draw_calls, 1);
        assert_eq!(gpu.sprite_count(), 10);
    }

    #[test]
    fn atlas_switch_forces_a_flush() {
        let mut gpu = RecordingDevice::new();
        let mut batcher = InstanceBatcher::new();
        batcher.begin_frame();
        batcher.push(&mut gpu, AtlasId(0), instance(0.0));
        batcher.push(&mut gpu, AtlasId(1), instance(1.0));
        batcher.push(&mut gpu, AtlasId(0), instance(2.0));
        batcher.flush(&mut gpu);
        assert_eq!(batcher.stats().draw_calls, 3);

        let atlases: Vec<AtlasId> = gpu
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Sprites { atlas, .. } => Some(*atlas),
                _ => None,
            })
            .collect();
        assert_eq!(atlases, vec![AtlasId(0), AtlasId(1), AtlasId(0)]);
    }

    #[test]
    fn empty_flush_emits_nothing() {
        let mut gpu = RecordingDevice::new();
        let mut batcher = InstanceBatcher::new();
        batcher.begin_frame();
        batcher.flush(&mut gpu);
        assert_eq!(batcher.stats().draw_calls, 0);
        assert!(gpu.calls().is_empty());
    }

    #[test]
    fn capacity_doubles_when_outgrown() {
        let mut gpu = RecordingDevice::new();
        let mut batcher = InstanceBatcher::new();
        batcher.begin_frame();
        let start = batcher.capacity();
        for i in 0..(start + 1) {
            batcher.push(&mut gpu, AtlasId(0), instance(i as f32));
        }
        assert_eq!(batcher.capacity(), start * 2);
        assert_eq!(batcher.stats().capacity_grown, 1);
        batcher.flush(&mut gpu);
        assert_eq!(gpu.sprite_count(), start + 1);
    }
}
