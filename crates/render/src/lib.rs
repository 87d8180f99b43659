//! The owning map renderer.
//!
//! Ties the pipeline together once per frame: drain map and catalog change
//! streams, run the budgeted chunk scheduler, blit the cached layer
//! textures for the visible chunks in a fixed order, then draw the dynamic
//! sprite passes on top.
//!
//! # Invariants
//! - The renderer never mutates the map beyond draining its event log.
//! - After a failure anywhere in the frame, the prior textures remain
//!   displayed: degraded output is stale, never missing.
//! - Once the GPU context is flagged lost, no GPU call is made until the
//!   owner restores the backend.

mod renderer;

pub use renderer::{FrameStats, MapRenderer};

pub fn crate_info() -> &'static str {
    "hexfield-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
