use serde::{Deserialize, Serialize};

/// Tiles along each side of a chunk.
pub const CHUNK_SIZE: i32 = 16;

/// Halo of extra tiles baked around each chunk so sprites that overflow
/// their own cell (tall terrain, road stubs) land without seams.
pub const CHUNK_PADDING: i32 = 2;

/// A tile position in odd-row offset coordinates: `q` is the column, `r` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The six adjacent tiles. Offset neighborhoods differ between even and
    /// odd rows; the returned order is fixed (E, W, NE, NW, SE, SW) so that
    /// iteration over neighbors is deterministic.
    pub fn neighbors(self) -> [HexCoord; 6] {
        let HexCoord { q, r } = self;
        if r & 1 == 0 {
            [
                HexCoord::new(q + 1, r),
                HexCoord::new(q - 1, r),
                HexCoord::new(q, r - 1),
                HexCoord::new(q - 1, r - 1),
                HexCoord::new(q, r + 1),
                HexCoord::new(q - 1, r + 1),
            ]
        } else {
            [
                HexCoord::new(q + 1, r),
                HexCoord::new(q - 1, r),
                HexCoord::new(q + 1, r - 1),
                HexCoord::new(q, r - 1),
                HexCoord::new(q + 1, r + 1),
                HexCoord::new(q, r + 1),
            ]
        }
    }

    /// Canonical ordering used to pick exactly one direction per tile pair:
    /// compare by (row, col).
    pub fn row_major_key(self) -> (i32, i32) {
        (self.r, self.q)
    }

    /// The chunk this tile belongs to.
    pub fn chunk(self) -> ChunkKey {
        ChunkKey::containing(self)
    }
}

/// Identifies one `CHUNK_SIZE` × `CHUNK_SIZE` block of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub col: i32,
    pub row: i32,
}

impl ChunkKey {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The chunk containing the given tile (floored division, so negative
    /// coordinates land in the correct chunk).
    pub fn containing(tile: HexCoord) -> Self {
        Self {
            col: tile.q.div_euclid(CHUNK_SIZE),
            row: tile.r.div_euclid(CHUNK_SIZE),
        }
    }

    /// First tile of the chunk (top-left, excluding the padding halo).
    pub fn origin_tile(self) -> HexCoord {
        HexCoord::new(self.col * CHUNK_SIZE, self.row * CHUNK_SIZE)
    }

    /// Packs (col, row) into a single u64. Bijective, so packed keys can
    /// index a hash map without string allocation.
    pub fn pack(self) -> u64 {
        ((self.col as u32 as u64) << 32) | (self.row as u32 as u64)
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            col: (packed >> 32) as u32 as i32,
            row: packed as u32 as i32,
        }
    }

    pub fn contains(self, tile: HexCoord) -> bool {
        ChunkKey::containing(tile) == self
    }

    /// True when the tile sits on the outer ring of its chunk. Edits to such
    /// tiles affect geometry baked by adjacent chunks as well.
    pub fn is_border_tile(tile: HexCoord) -> bool {
        let lq = tile.q.rem_euclid(CHUNK_SIZE);
        let lr = tile.r.rem_euclid(CHUNK_SIZE);
        lq == 0 || lr == 0 || lq == CHUNK_SIZE - 1 || lr == CHUNK_SIZE - 1
    }
}

/// Numeric id of an uploaded sprite atlas texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtlasId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrip() {
        for key in [
            ChunkKey::new(0, 0),
            ChunkKey::new(3, 7),
            ChunkKey::new(-1, -1),
            ChunkKey::new(i32::MAX, i32::MIN),
        ] {
            assert_eq!(ChunkKey::unpack(key.pack()), key);
        }
    }

    #[test]
    fn pack_is_injective_for_distinct_keys() {
        let a = ChunkKey::new(1, 2).pack();
        let b = ChunkKey::new(2, 1).pack();
        assert_ne!(a, b);
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(
            ChunkKey::containing(HexCoord::new(-1, -1)),
            ChunkKey::new(-1, -1)
        );
        assert_eq!(
            ChunkKey::containing(HexCoord::new(15, 15)),
            ChunkKey::new(0, 0)
        );
        assert_eq!(
            ChunkKey::containing(HexCoord::new(16, 31)),
            ChunkKey::new(1, 1)
        );
    }

    #[test]
    fn neighbors_differ_by_row_parity() {
        let even = HexCoord::new(4, 2).neighbors();
        let odd = HexCoord::new(4, 3).neighbors();
        assert!(even.contains(&HexCoord::new(3, 1)));
        assert!(odd.contains(&HexCoord::new(5, 2)));
        // All six neighbors are distinct.
        for coords in [even, odd] {
            for i in 0..6 {
                for j in (i + 1)..6 {
                    assert_ne!(coords[i], coords[j]);
                }
            }
        }
    }

    #[test]
    fn neighborhood_is_symmetric() {
        for r in -2..3 {
            for q in -2..3 {
                let tile = HexCoord::new(q, r);
                for n in tile.neighbors() {
                    assert!(n.neighbors().contains(&tile), "{n:?} missing {tile:?}");
                }
            }
        }
    }

    #[test]
    fn border_detection() {
        assert!(ChunkKey::is_border_tile(HexCoord::new(0, 5)));
        assert!(ChunkKey::is_border_tile(HexCoord::new(15, 5)));
        assert!(ChunkKey::is_border_tile(HexCoord::new(5, 0)));
        assert!(!ChunkKey::is_border_tile(HexCoord::new(5, 5)));
    }
}
