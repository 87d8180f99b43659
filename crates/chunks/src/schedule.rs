use crate::chunk::DirtyTask;
use std::time::Duration;

/// Scheduling configuration: per-frame rebuild budgets and debounce
/// windows. The defaults are tuned, not derived; treat them as knobs.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Rebuild budget per frame while the camera is moving.
    pub interact_budget: Duration,
    /// Rebuild budget per frame while the camera is at rest.
    pub idle_budget: Duration,
    /// How long the camera must be still before a zoom-bucket switch is
    /// applied (and before the idle budget kicks in).
    pub interaction_window: Duration,
    /// Camera position delta below which a frame counts as stationary.
    pub motion_epsilon: f32,
    /// Zoom delta below which a frame counts as stationary.
    pub zoom_epsilon: f32,
    /// Consumed-prefix length that triggers queue compaction.
    pub compact_threshold: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            interact_budget: Duration::from_millis(1),
            idle_budget: Duration::from_millis(8),
            interaction_window: Duration::from_millis(200),
            motion_epsilon: 0.25,
            zoom_epsilon: 0.001,
            compact_threshold: 2000,
        }
    }
}

/// The prioritized rebuild queue.
///
/// A cursor walks a sorted snapshot of tasks across frames; the consumed
/// prefix is dropped once it grows past the compaction threshold so a long
/// queue does not pin memory for the whole drain.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    tasks: Vec<DirtyTask>,
    cursor: usize,
}

impl RebuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drained(&self) -> bool {
        self.cursor >= self.tasks.len()
    }

    /// Tasks not yet consumed.
    pub fn pending(&self) -> usize {
        self.tasks.len() - self.cursor
    }

    /// Replace the queue with a freshly sorted snapshot.
    pub fn refill(&mut self, tasks: Vec<DirtyTask>) {
        self.tasks = tasks;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.cursor = 0;
    }

    /// Take the next task, compacting the consumed prefix when it has grown
    /// past `compact_threshold` entries.
    pub fn pop(&mut self, compact_threshold: usize) -> Option<DirtyTask> {
        if self.is_drained() {
            return None;
        }
        let task = self.tasks[self.cursor];
        self.cursor += 1;
        if self.cursor > compact_threshold {
            self.tasks.drain(..self.cursor);
            self.cursor = 0;
        }
        Some(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Layer;
    use crate::lod::ZoomBucket;
    use hexfield_common::ChunkKey;

    fn task(col: i32) -> DirtyTask {
        DirtyTask {
            key: ChunkKey::new(col, 0),
            layer: Layer::Base,
            bucket: ZoomBucket::Normal,
        }
    }

    #[test]
    fn config_defaults() {
        let config = ChunkConfig::default();
        assert_eq!(config.interact_budget, Duration::from_millis(1));
        assert_eq!(config.idle_budget, Duration::from_millis(8));
        assert_eq!(config.interaction_window, Duration::from_millis(200));
        assert_eq!(config.compact_threshold, 2000);
    }

    #[test]
    fn pop_preserves_order() {
        let mut queue = RebuildQueue::new();
        queue.refill((0..5).map(task).collect());
        for col in 0..5 {
            assert_eq!(queue.pop(2000).unwrap().key.col, col);
        }
        assert!(queue.pop(2000).is_none());
        assert!(queue.is_drained());
    }

    #[test]
    fn cursor_survives_partial_drains() {
        let mut queue = RebuildQueue::new();
        queue.refill((0..10).map(task).collect());
        queue.pop(2000);
        queue.pop(2000);
        assert_eq!(queue.pending(), 8);
        assert_eq!(queue.pop(2000).unwrap().key.col, 2);
    }

    #[test]
    fn compaction_drops_the_consumed_prefix() {
        let mut queue = RebuildQueue::new();
        queue.refill((0..100).map(task).collect());
        for _ in 0..10 {
            queue.pop(4);
        }
        // Compaction must not change what comes next.
        assert_eq!(queue.pop(4).unwrap().key.col, 10);
        assert_eq!(queue.pending(), 89);
    }
}
