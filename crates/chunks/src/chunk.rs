use crate::lod::ZoomBucket;
use hexfield_common::{projection, ChunkKey};
use hexfield_gfx::TextureHandle;

/// An independently cacheable sub-render pass of a chunk, drawn in
/// declaration order: ground terrain first, then the road/rail network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Base,
    Infra,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Base, Layer::Infra];

    pub fn index(self) -> usize {
        match self {
            Layer::Base => 0,
            Layer::Infra => 1,
        }
    }
}

/// A unit of scheduled rebuild work.
///
/// The bucket records the target density at enqueue time; execution always
/// bakes at the manager's live bucket, so a task that outlived a bucket
/// switch degenerates into a redundant but correct rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyTask {
    pub key: ChunkKey,
    pub layer: Layer,
    pub bucket: ZoomBucket,
}

/// Cached render state for one chunk of the map.
#[derive(Debug)]
pub struct ChunkData {
    pub key: ChunkKey,
    /// World-pixel top-left, including the padding halo.
    pub world_x: f32,
    pub world_y: f32,
    layers: [Option<TextureHandle>; 2],
    layer_zooms: [Option<ZoomBucket>; 2],
    dirty: [bool; 2],
    /// Frame number of the last visibility touch; the seam for future LRU
    /// eviction, unused by the current always-resident policy.
    pub last_used: u64,
}

impl ChunkData {
    /// A freshly materialized chunk starts with both layers dirty and no
    /// textures, so its first visible frame schedules both bakes.
    pub fn new(key: ChunkKey) -> Self {
        let origin = projection::chunk_origin(key);
        Self {
            key,
            world_x: origin.x,
            world_y: origin.y,
            layers: [None, None],
            layer_zooms: [None, None],
            dirty: [true, true],
            last_used: 0,
        }
    }

    pub fn is_dirty(&self, layer: Layer) -> bool {
        self.dirty[layer.index()]
    }

    pub fn mark_dirty(&mut self, layer: Layer) {
        self.dirty[layer.index()] = true;
    }

    pub fn clear_dirty(&mut self, layer: Layer) {
        self.dirty[layer.index()] = false;
    }

    pub fn texture(&self, layer: Layer) -> Option<&TextureHandle> {
        self.layers[layer.index()].as_ref()
    }

    /// Bucket the layer's current texture was baked at.
    pub fn baked_bucket(&self, layer: Layer) -> Option<ZoomBucket> {
        self.layer_zooms[layer.index()]
    }

    /// Install a freshly baked texture and return the one it replaces. The
    /// caller deletes the old texture only after this returns, so the layer
    /// is never without a displayable texture.
    pub fn install_texture(
        &mut self,
        layer: Layer,
        texture: TextureHandle,
        bucket: ZoomBucket,
    ) -> Option<TextureHandle> {
        let old = self.layers[layer.index()].replace(texture);
        self.layer_zooms[layer.index()] = Some(bucket);
        old
    }

    /// Forget all GPU state without touching the device. Used on context
    /// loss, when the underlying textures are already gone.
    pub fn reset_gpu_state(&mut self) {
        self.layers = [None, None];
        self.layer_zooms = [None, None];
        self.dirty = [true, true];
    }
}
