//! Shared types for the hexfield renderer.
//!
//! # Invariants
//! - Chunk key packing is bijective: `unpack(pack(k)) == k` for every key.
//! - The projection is the single source of truth for tile geometry; bakers
//!   and per-frame sprite passes must agree on it pixel-for-pixel.

pub mod camera;
pub mod coords;
pub mod projection;
pub mod seed;

pub use camera::{Camera, UvRect, WorldRect};
pub use coords::{AtlasId, ChunkKey, HexCoord, CHUNK_PADDING, CHUNK_SIZE};
pub use seed::{splitmix64, SeedStream};

pub fn crate_info() -> &'static str {
    "hexfield-common v0.1.0"
}
