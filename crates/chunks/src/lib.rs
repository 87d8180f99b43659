//! Chunked incremental rendering: a cache of per-region baked textures
//! rebuilt on demand under a per-frame time budget.
//!
//! # Invariants
//! - At most one chunk record exists per key.
//! - A layer texture, once present, was baked at exactly the bucket recorded
//!   for that layer; layers may lag at different buckets mid-transition.
//! - A failed bake leaves the chunk dirty so it is retried on a later pass.
//! - Rebuilds never preempt mid-unit; the budget gates between units only.

pub mod builder;
pub mod chunk;
pub mod lod;
pub mod manager;
pub mod schedule;

pub use builder::{BakeStats, ChunkLayerBuilder};
pub use chunk::{ChunkData, DirtyTask, Layer};
pub use lod::ZoomBucket;
pub use manager::{ChunkManager, ChunkStats};
pub use schedule::{ChunkConfig, RebuildQueue};

pub fn crate_info() -> &'static str {
    "hexfield-chunks v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("chunks"));
    }
}
