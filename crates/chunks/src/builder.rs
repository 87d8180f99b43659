use crate::chunk::{ChunkData, Layer};
use crate::lod::ZoomBucket;
use hexfield_assets::SpriteCatalog;
use hexfield_common::{projection, AtlasId, HexCoord, WorldRect, CHUNK_PADDING, CHUNK_SIZE};
use hexfield_gfx::{GfxError, GpuDevice, Quad, ResourceRegistry};
use hexfield_world::{Tile, TileMap};
use std::collections::BTreeMap;

const REGISTRY_OWNER: &str = "chunks";

/// Counters from one completed bake.
#[derive(Debug, Clone, Copy, Default)]
pub struct BakeStats {
    pub quads: usize,
    pub draw_calls: usize,
}

/// Bakes one (chunk, layer) pair into an offscreen texture at a requested
/// zoom bucket.
///
/// The bake uses the same tile projection as live rendering, translated so
/// the chunk's padded top-left lands at the texture origin, so the result is
/// pixel-compatible when blitted at the live camera zoom. Bakes are
/// deterministic: tile iteration, neighbor tie-break, and batch ordering
/// depend only on coordinates.
#[derive(Debug, Clone)]
pub struct ChunkLayerBuilder {
    /// Ribbon width in world pixels at scale 1.0.
    pub ribbon_width: f32,
    /// Floor in texture pixels so ribbons stay visible at coarse buckets.
    pub ribbon_min_width: f32,
}

impl Default for ChunkLayerBuilder {
    fn default() -> Self {
        Self {
            ribbon_width: 10.0,
            ribbon_min_width: 3.0,
        }
    }
}

impl ChunkLayerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bake the layer and swap the result into the chunk. The old texture,
    /// if any, is deleted only after the new one is installed, so the chunk
    /// never displays a gap. On error the chunk is left untouched (and
    /// therefore still dirty).
    pub fn bake(
        &self,
        gpu: &mut dyn GpuDevice,
        registry: &mut ResourceRegistry,
        map: &TileMap,
        catalog: &SpriteCatalog,
        chunk: &mut ChunkData,
        layer: Layer,
        bucket: ZoomBucket,
    ) -> Result<BakeStats, GfxError> {
        let scale = bucket.scale();
        let (width, height) = projection::chunk_texture_size(scale);
        let mip_levels = mip_level_count(width, height);

        let target = gpu.create_render_target(width, height, mip_levels)?;
        registry.register(&target, REGISTRY_OWNER);

        let batches = self.gather(map, catalog, chunk.key, layer, scale);

        let mut stats = BakeStats::default();
        let result = (|| -> Result<(), GfxError> {
            gpu.begin_target(&target)?;
            for (atlas, quads) in &batches {
                gpu.draw_quads(&target, *atlas, quads)?;
                stats.draw_calls += 1;
                stats.quads += quads.len();
            }
            Ok(())
        })();

        if let Err(e) = result {
            gpu.delete_texture(&target);
            registry.unregister(&target);
            return Err(e);
        }

        if target.mip_levels > 1 {
            gpu.regenerate_mipmaps(&target);
        }

        if let Some(old) = chunk.install_texture(layer, target, bucket) {
            gpu.delete_texture(&old);
            registry.unregister(&old);
        }
        Ok(stats)
    }

    /// Collect the layer's quads grouped per atlas. BTreeMap keeps batch
    /// order independent of insertion history.
    fn gather(
        &self,
        map: &TileMap,
        catalog: &SpriteCatalog,
        key: hexfield_common::ChunkKey,
        layer: Layer,
        scale: f32,
    ) -> BTreeMap<AtlasId, Vec<Quad>> {
        let mut batches: BTreeMap<AtlasId, Vec<Quad>> = BTreeMap::new();
        let origin = projection::chunk_origin(key);
        let first = key.origin_tile();

        for r in (first.r - CHUNK_PADDING)..(first.r + CHUNK_SIZE + CHUNK_PADDING) {
            for q in (first.q - CHUNK_PADDING)..(first.q + CHUNK_SIZE + CHUNK_PADDING) {
                let tile = HexCoord::new(q, r);
                let Some(data) = map.get(tile) else {
                    continue;
                };
                match layer {
                    Layer::Base => {
                        self.emit_base(catalog, tile, data, origin, scale, &mut batches)
                    }
                    Layer::Infra => {
                        self.emit_infra(map, catalog, tile, data, origin, scale, &mut batches)
                    }
                }
            }
        }
        batches
    }

    fn emit_base(
        &self,
        catalog: &SpriteCatalog,
        tile: HexCoord,
        data: &Tile,
        origin: glam::Vec2,
        scale: f32,
        batches: &mut BTreeMap<AtlasId, Vec<Quad>>,
    ) {
        let cell_origin = (projection::tile_origin(tile) - origin) * scale;
        let cell = WorldRect::new(
            cell_origin.x,
            cell_origin.y,
            projection::TILE_WIDTH * scale,
            projection::TILE_HEIGHT * scale,
        );

        if let Some(def) = catalog.get(data.terrain.ground_sprite()) {
            batches
                .entry(def.atlas)
                .or_default()
                .push(Quad::axis_aligned(cell, def.uv));
        }

        if let Some(key) = data.terrain.overlay_sprite() {
            if let Some(def) = catalog.get(key) {
                let w = cell.width * def.visual.scale;
                let h = cell.height * def.visual.scale;
                // Anchored bottom-center so taller overlays grow upward.
                let rect = WorldRect::new(
                    cell.x + (cell.width - w) * 0.5 + def.visual.shift[0] * scale,
                    cell.bottom() - h + def.visual.shift[1] * scale,
                    w,
                    h,
                );
                batches
                    .entry(def.atlas)
                    .or_default()
                    .push(Quad::axis_aligned(rect, def.uv));
            }
        }
    }

    fn emit_infra(
        &self,
        map: &TileMap,
        catalog: &SpriteCatalog,
        tile: HexCoord,
        data: &Tile,
        origin: glam::Vec2,
        scale: f32,
        batches: &mut BTreeMap<AtlasId, Vec<Quad>>,
    ) {
        if !data.joins_transport_network() {
            return;
        }
        let from = (projection::tile_center(tile) - origin) * scale;
        for neighbor in tile.neighbors() {
            let Some(other) = map.get(neighbor) else {
                continue;
            };
            if !other.joins_transport_network() {
                continue;
            }
            // Each edge belongs to its (row, col)-smaller endpoint, so two
            // adjacent network tiles produce exactly one ribbon.
            if tile.row_major_key() >= neighbor.row_major_key() {
                continue;
            }
            // A segment runs as rail once both endpoints are upgraded.
            let sprite = if data.level >= 2 && other.level >= 2 {
                "infra.rail"
            } else {
                "infra.road"
            };
            let Some(def) = catalog.get(sprite) else {
                continue;
            };
            let to = (projection::tile_center(neighbor) - origin) * scale;
            let width = (self.ribbon_width * scale).max(self.ribbon_min_width);
            batches
                .entry(def.atlas)
                .or_default()
                .push(Quad::ribbon(from, to, width, def.uv));
        }
    }
}

/// Full mip chain length for a texture of the given size.
fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}
