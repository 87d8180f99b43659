//! Tile-to-pixel projection shared by the chunk baker and the per-frame
//! sprite passes. Both must agree exactly, otherwise baked chunk content
//! drifts against live-drawn sprites when the camera moves.

use crate::camera::WorldRect;
use crate::coords::{ChunkKey, HexCoord, CHUNK_PADDING, CHUNK_SIZE};
use glam::Vec2;

/// Width of one tile cell in world pixels at zoom 1.0.
pub const TILE_WIDTH: f32 = 64.0;

/// Height of one tile sprite in world pixels at zoom 1.0.
pub const TILE_HEIGHT: f32 = 64.0;

/// Vertical advance between rows. Smaller than `TILE_HEIGHT`, so rows
/// overlap and taller sprites occlude the row behind them.
pub const ROW_STEP: f32 = 48.0;

/// Vertical compression of the ground plane relative to horizontal
/// distances, e.g. for animal wander targets around a tile center.
pub const VERTICAL_SQUASH: f32 = ROW_STEP / TILE_WIDTH;

/// World-pixel position of a tile cell's top-left corner. Odd rows are
/// shifted right by half a tile.
pub fn tile_origin(tile: HexCoord) -> Vec2 {
    let stagger = if tile.r & 1 != 0 { TILE_WIDTH * 0.5 } else { 0.0 };
    Vec2::new(
        tile.q as f32 * TILE_WIDTH + stagger,
        tile.r as f32 * ROW_STEP,
    )
}

/// World-pixel center of a tile's ground footprint.
pub fn tile_center(tile: HexCoord) -> Vec2 {
    tile_origin(tile) + Vec2::new(TILE_WIDTH * 0.5, TILE_HEIGHT * 0.5)
}

/// World-pixel anchor for sprites standing on a tile: bottom-center of the
/// cell. Doubles as the painter-order depth proxy.
pub fn tile_anchor(tile: HexCoord) -> Vec2 {
    tile_origin(tile) + Vec2::new(TILE_WIDTH * 0.5, TILE_HEIGHT)
}

/// World-pixel top-left of a chunk including its padding halo. The odd-row
/// stagger (half a tile) is absorbed by the halo.
pub fn chunk_origin(key: ChunkKey) -> Vec2 {
    let first = HexCoord::new(
        key.col * CHUNK_SIZE - CHUNK_PADDING,
        key.row * CHUNK_SIZE - CHUNK_PADDING,
    );
    Vec2::new(first.q as f32 * TILE_WIDTH, first.r as f32 * ROW_STEP)
}

/// World-space rectangle covered by a chunk's baked texture (chunk tiles
/// plus the padding halo).
pub fn chunk_world_rect(key: ChunkKey) -> WorldRect {
    let origin = chunk_origin(key);
    let span = (CHUNK_SIZE + 2 * CHUNK_PADDING) as f32;
    WorldRect::new(
        origin.x,
        origin.y,
        span * TILE_WIDTH,
        span * ROW_STEP + (TILE_HEIGHT - ROW_STEP),
    )
}

/// Pixel dimensions of a chunk texture baked at the given bucket scale.
pub fn chunk_texture_size(bucket_scale: f32) -> (u32, u32) {
    let rect = chunk_world_rect(ChunkKey::new(0, 0));
    (
        (rect.width * bucket_scale).ceil() as u32,
        (rect.height * bucket_scale).ceil() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_rows_are_staggered() {
        let even = tile_origin(HexCoord::new(3, 2));
        let odd = tile_origin(HexCoord::new(3, 3));
        assert_eq!(odd.x - even.x, TILE_WIDTH * 0.5);
        assert_eq!(odd.y - even.y, ROW_STEP);
    }

    #[test]
    fn chunk_rect_contains_all_member_tiles() {
        let key = ChunkKey::new(2, 3);
        let rect = chunk_world_rect(key);
        let origin = key.origin_tile();
        for dr in 0..CHUNK_SIZE {
            for dq in 0..CHUNK_SIZE {
                let o = tile_origin(HexCoord::new(origin.q + dq, origin.r + dr));
                assert!(o.x >= rect.x && o.x + TILE_WIDTH <= rect.right());
                assert!(o.y >= rect.y && o.y + TILE_HEIGHT <= rect.bottom());
            }
        }
    }

    #[test]
    fn adjacent_chunk_rects_overlap_by_halo() {
        let a = chunk_world_rect(ChunkKey::new(0, 0));
        let b = chunk_world_rect(ChunkKey::new(1, 0));
        assert!(a.intersects(&b));
        assert_eq!(b.x - a.x, CHUNK_SIZE as f32 * TILE_WIDTH);
    }

    #[test]
    fn texture_size_scales_with_bucket() {
        let (w1, h1) = chunk_texture_size(1.0);
        let (w2, h2) = chunk_texture_size(2.0);
        assert_eq!(w2, w1 * 2);
        assert_eq!(h2, h1 * 2);
        let (wh, _) = chunk_texture_size(0.5);
        assert_eq!(wh, w1 / 2);
    }

    #[test]
    fn anchor_sits_below_center() {
        let tile = HexCoord::new(5, 4);
        assert!(tile_anchor(tile).y > tile_center(tile).y);
        assert_eq!(tile_anchor(tile).x, tile_center(tile).x);
    }
}
