//! Per-frame instanced sprite passes.
//!
//! Content whose position, frame, or count cannot live in a baked chunk
//! texture (resource icons, building icons, trees, animals) is re-gathered
//! every frame over the visible chunks, depth-sorted, and drawn with
//! instanced batching.
//!
//! # Invariants
//! - Placement (clump counts, scatter offsets) is derived from tile
//!   coordinates only; frames without map changes reproduce the same layout.
//! - The global quality clump cap always wins over per-sprite maxima.
//! - Animal wandering deliberately uses real entropy and is NOT reproducible
//!   run-to-run.

pub mod animals;
pub mod batch;
pub mod forest;
pub mod items;
pub mod overlay;
pub mod scatter;

pub use animals::{AnimalRenderer, AnimalStats};
pub use batch::{BatchStats, InstanceBatcher};
pub use forest::{ForestRenderer, ForestStats};
pub use items::RenderItem;
pub use overlay::{OverlayRenderer, OverlayStats};

pub fn crate_info() -> &'static str {
    "hexfield-sprites v0.1.0"
}
