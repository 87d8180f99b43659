//! Tile map model consumed by the renderer.
//!
//! # Invariants
//! - All tile mutations flow through explicit operations and append a
//!   `TileChange` event; the renderer drains the log once per frame.
//! - Tile queries are synchronous and never allocate.

pub mod map;
pub mod tile;

pub use map::{TileChange, TileMap};
pub use tile::{Improvement, Resource, Terrain, Tile};

pub fn crate_info() -> &'static str {
    "hexfield-world v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("world"));
    }
}
