//! wgpu backend for the hexfield renderer.
//!
//! Implements the backend-agnostic `hexfield_gfx::GpuDevice` trait on real
//! hardware: offscreen chunk bakes, screen blits, instanced sprite draws,
//! atlas uploads, and blit-based mip generation.
//!
//! # Invariants
//! - Bakes render into mip level 0 only; the rest of the chain comes from
//!   `regenerate_mipmaps`.
//! - Instance buffers grow, never shrink, and are reused across frames.

mod device;
mod mipgen;
mod shaders;

pub use device::WgpuDevice;
