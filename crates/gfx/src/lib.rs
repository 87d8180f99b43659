//! Backend-agnostic GPU interface.
//!
//! The chunk baker, the sprite passes, and the map renderer all speak to the
//! GPU through the [`GpuDevice`] trait. The wgpu backend implements it for
//! real hardware; [`RecordingDevice`] implements it for tests and headless
//! tooling. The trait is stable; swap in a backend without changing
//! consumers.
//!
//! # Invariants
//! - Every registered texture handle is unregistered exactly once.
//! - Registry misuse (duplicate register, double unregister) warns and never
//!   corrupts counters.

pub mod device;
pub mod handle;
pub mod recording;
pub mod registry;

pub use device::{GfxError, GpuDevice, Quad, SpriteInstance};
pub use handle::{TextureHandle, TextureOrigin};
pub use recording::{DrawCall, RecordingDevice};
pub use registry::{OwnerStats, ResourceRegistry};

pub fn crate_info() -> &'static str {
    "hexfield-gfx v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("gfx"));
    }
}
