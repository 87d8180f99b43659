//! Deterministic clumped placement.
//!
//! Instance counts and scatter offsets are mixed from tile coordinates so
//! that every frame (and every run) lays content out identically until the
//! map itself changes.

use hexfield_assets::{ClumpConfig, QualitySettings};
use hexfield_common::{projection, HexCoord, SeedStream};
use glam::Vec2;

/// Stream salts keeping each pass's placement independent.
pub const RESOURCE_SALT: u64 = 0x5265736f75726365;
pub const TREE_SALT: u64 = 0x5472656573;
pub const ANIMAL_SALT: u64 = 0x416e696d616c73;

/// Number of instances to place on a tile. The quality cap, when set,
/// always wins over the per-sprite configured range.
pub fn clump_count(
    clump: &ClumpConfig,
    quality: &QualitySettings,
    tile: HexCoord,
    salt: u64,
) -> u32 {
    let mut stream = SeedStream::for_tile(tile, salt);
    let count = stream.next_inclusive(clump.min, clump.max);
    if quality.max_clump > 0 {
        count.min(quality.max_clump)
    } else {
        count
    }
}

/// Scatter offset of one clump instance around the tile center, vertically
/// compressed to match the ground-plane projection.
pub fn clump_offset(tile: HexCoord, salt: u64, index: u32, spread: f32) -> Vec2 {
    let mut stream = SeedStream::for_tile(tile, salt.wrapping_add(1 + index as u64));
    let angle = stream.next_range(0.0, std::f32::consts::TAU);
    // Square-root radius for an even area distribution.
    let radius = stream.next_f32().sqrt() * spread;
    Vec2::new(
        angle.cos() * radius,
        angle.sin() * radius * projection::VERTICAL_SQUASH,
    )
}
