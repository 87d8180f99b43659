use crate::tile::{Improvement, Resource, Terrain, Tile};
use hexfield_common::{seed, ChunkKey, HexCoord, CHUNK_SIZE};

/// An event record produced by every mutation to the map.
///
/// The renderer drains the log once per frame to mark chunks dirty and to
/// refresh per-frame sprite content. Events carry old and new values so a
/// consumer can decide how much work the change actually requires.
#[derive(Debug, Clone, PartialEq)]
pub enum TileChange {
    Terrain {
        tile: HexCoord,
        old: Terrain,
        new: Terrain,
    },
    /// Improvement or upgrade-level change.
    Improvement {
        tile: HexCoord,
        old: Option<Improvement>,
        new: Option<Improvement>,
    },
    Resource {
        tile: HexCoord,
        old: Option<Resource>,
        new: Option<Resource>,
    },
    Visibility {
        tile: HexCoord,
        visible: bool,
    },
}

impl TileChange {
    pub fn tile(&self) -> HexCoord {
        match self {
            TileChange::Terrain { tile, .. }
            | TileChange::Improvement { tile, .. }
            | TileChange::Resource { tile, .. }
            | TileChange::Visibility { tile, .. } => *tile,
        }
    }
}

/// The authoritative tile map.
///
/// A dense rectangular grid of tiles, `width` columns by `height` rows,
/// starting at (0, 0). All mutations go through explicit operations that
/// append to the event log.
#[derive(Debug, Clone)]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    events: Vec<TileChange>,
}

impl TileMap {
    /// Create a map filled with default (plains) tiles.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "map extent must be positive");
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width * height) as usize],
            events: Vec::new(),
        }
    }

    /// Generate a map from a seed. Purely coordinate-driven, so the same
    /// seed always yields the same map on every platform.
    pub fn generate(width: i32, height: i32, world_seed: u64) -> Self {
        let mut map = Self::new(width, height);
        for r in 0..height {
            for q in 0..width {
                let tile = HexCoord::new(q, r);
                let mut s = seed::SeedStream::new(seed::tile_seed(tile, world_seed));
                let roll = s.next_f32();
                let terrain = if roll < 0.08 {
                    Terrain::Water
                } else if roll < 0.18 {
                    Terrain::Desert
                } else if roll < 0.26 {
                    Terrain::Mountain
                } else if roll < 0.45 {
                    Terrain::Forest
                } else {
                    Terrain::Plains
                };
                let resource = match (terrain, s.next_f32()) {
                    (Terrain::Plains, x) if x < 0.06 => Some(Resource::Wheat),
                    (Terrain::Plains, x) if x < 0.10 => Some(Resource::Cattle),
                    (Terrain::Plains, x) if x < 0.13 => Some(Resource::Deer),
                    (Terrain::Forest, x) if x < 0.10 => Some(Resource::Timber),
                    (Terrain::Forest, x) if x < 0.14 => Some(Resource::Deer),
                    (Terrain::Mountain, x) if x < 0.12 => Some(Resource::Iron),
                    (Terrain::Desert, x) if x < 0.06 => Some(Resource::Oil),
                    (Terrain::Water, x) if x < 0.08 => Some(Resource::Fish),
                    _ => None,
                };
                let idx = (r * width + q) as usize;
                map.tiles[idx].terrain = terrain;
                map.tiles[idx].resource = resource;
            }
        }
        tracing::debug!(width, height, world_seed, "generated map");
        map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Chunk columns covering the map extent.
    pub fn chunk_cols(&self) -> i32 {
        (self.width + CHUNK_SIZE - 1) / CHUNK_SIZE
    }

    /// Chunk rows covering the map extent.
    pub fn chunk_rows(&self) -> i32 {
        (self.height + CHUNK_SIZE - 1) / CHUNK_SIZE
    }

    pub fn in_bounds(&self, tile: HexCoord) -> bool {
        tile.q >= 0 && tile.q < self.width && tile.r >= 0 && tile.r < self.height
    }

    /// Synchronous tile query. Out-of-map coordinates return `None`.
    pub fn get(&self, tile: HexCoord) -> Option<&Tile> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some(&self.tiles[(tile.r * self.width + tile.q) as usize])
    }

    /// Drain and return the pending change log.
    pub fn drain_events(&mut self) -> Vec<TileChange> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[TileChange] {
        &self.events
    }

    pub fn set_terrain(&mut self, tile: HexCoord, terrain: Terrain) -> bool {
        let Some(idx) = self.index(tile) else {
            return false;
        };
        let old = self.tiles[idx].terrain;
        if old == terrain {
            return false;
        }
        self.tiles[idx].terrain = terrain;
        self.events.push(TileChange::Terrain {
            tile,
            old,
            new: terrain,
        });
        true
    }

    pub fn set_improvement(&mut self, tile: HexCoord, improvement: Option<Improvement>) -> bool {
        let Some(idx) = self.index(tile) else {
            return false;
        };
        let old = self.tiles[idx].improvement;
        if old == improvement {
            return false;
        }
        self.tiles[idx].improvement = improvement;
        if improvement.is_none() {
            self.tiles[idx].level = 0;
        }
        self.events.push(TileChange::Improvement {
            tile,
            old,
            new: improvement,
        });
        true
    }

    /// Upgrade an existing improvement's level. Reported as an improvement
    /// change because it alters ribbon rendering (road vs. rail).
    pub fn set_level(&mut self, tile: HexCoord, level: u8) -> bool {
        let Some(idx) = self.index(tile) else {
            return false;
        };
        if self.tiles[idx].improvement.is_none() || self.tiles[idx].level == level {
            return false;
        }
        self.tiles[idx].level = level;
        let imp = self.tiles[idx].improvement;
        self.events.push(TileChange::Improvement {
            tile,
            old: imp,
            new: imp,
        });
        true
    }

    pub fn set_resource(&mut self, tile: HexCoord, resource: Option<Resource>) -> bool {
        let Some(idx) = self.index(tile) else {
            return false;
        };
        let old = self.tiles[idx].resource;
        if old == resource {
            return false;
        }
        self.tiles[idx].resource = resource;
        self.events.push(TileChange::Resource {
            tile,
            old,
            new: resource,
        });
        true
    }

    pub fn set_visibility(&mut self, tile: HexCoord, visible: bool) -> bool {
        let Some(idx) = self.index(tile) else {
            return false;
        };
        if self.tiles[idx].visible == visible {
            return false;
        }
        self.tiles[idx].visible = visible;
        self.events.push(TileChange::Visibility { tile, visible });
        true
    }

    /// Whether a chunk key lies within the map's chunk grid.
    pub fn chunk_in_bounds(&self, key: ChunkKey) -> bool {
        key.col >= 0 && key.col < self.chunk_cols() && key.row >= 0 && key.row < self.chunk_rows()
    }

    fn index(&self, tile: HexCoord) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some((tile.r * self.width + tile.q) as usize)
    }
}
