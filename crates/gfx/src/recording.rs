use crate::device::{GfxError, GpuDevice, Quad, SpriteInstance};
use crate::handle::{TextureHandle, TextureOrigin};
use hexfield_common::{AtlasId, UvRect, WorldRect};

/// One recorded draw submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    TargetCleared {
        target: u64,
    },
    Quads {
        target: u64,
        atlas: AtlasId,
        quads: Vec<Quad>,
    },
    MipmapsRegenerated {
        target: u64,
    },
    Blit {
        texture: u64,
        dest: WorldRect,
        uv: UvRect,
    },
    Sprites {
        atlas: AtlasId,
        instances: Vec<SpriteInstance>,
    },
}

/// In-memory [`GpuDevice`] that records every submission instead of
/// touching hardware. Backs the property tests and the headless CLI, and
/// doubles as a fault injector: allocations can be made to fail and
/// instancing support can be switched off.
#[derive(Debug)]
pub struct RecordingDevice {
    calls: Vec<DrawCall>,
    next_id: u64,
    live_textures: Vec<u64>,
    pub fail_allocations: bool,
    pub instancing: bool,
    pub texture_limit: u32,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            live_textures: Vec::new(),
            fail_allocations: false,
            instancing: true,
            texture_limit: 8192,
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    /// Total quads across recorded quad-batch draws.
    pub fn quad_count(&self) -> usize {
        self.calls
            .iter()
            .map(|c| match c {
                DrawCall::Quads { quads, .. } => quads.len(),
                _ => 0,
            })
            .sum()
    }

    /// Total instances across recorded instanced draws.
    pub fn sprite_count(&self) -> usize {
        self.calls
            .iter()
            .map(|c| match c {
                DrawCall::Sprites { instances, .. } => instances.len(),
                _ => 0,
            })
            .sum()
    }

    /// Simulate losing the GPU context: every live texture vanishes.
    pub fn drop_all_textures(&mut self) {
        self.live_textures.clear();
    }
}

impl GpuDevice for RecordingDevice {
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<TextureHandle, GfxError> {
        if self.fail_allocations {
            return Err(GfxError::AllocationFailed("injected failure".into()));
        }
        let limit = self.texture_limit;
        if width > limit || height > limit {
            return Err(GfxError::TextureTooLarge {
                requested: width.max(height),
                limit,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live_textures.push(id);
        Ok(TextureHandle {
            id,
            width,
            height,
            origin: TextureOrigin::RenderTarget,
            mip_levels,
        })
    }

    fn delete_texture(&mut self, handle: &TextureHandle) {
        self.live_textures.retain(|&id| id != handle.id);
    }

    fn begin_target(&mut self, target: &TextureHandle) -> Result<(), GfxError> {
        if !self.live_textures.contains(&target.id) {
            return Err(GfxError::UnknownTexture(target.id));
        }
        self.calls.push(DrawCall::TargetCleared { target: target.id });
        Ok(())
    }

    fn draw_quads(
        &mut self,
        target: &TextureHandle,
        atlas: AtlasId,
        quads: &[Quad],
    ) -> Result<(), GfxError> {
        self.calls.push(DrawCall::Quads {
            target: target.id,
            atlas,
            quads: quads.to_vec(),
        });
        Ok(())
    }

    fn regenerate_mipmaps(&mut self, handle: &TextureHandle) {
        self.calls.push(DrawCall::MipmapsRegenerated { target: handle.id });
    }

    fn draw_texture(&mut self, handle: &TextureHandle, dest: WorldRect, uv: UvRect) {
        self.calls.push(DrawCall::Blit {
            texture: handle.id,
            dest,
            uv,
        });
    }

    fn draw_sprites(&mut self, atlas: AtlasId, instances: &[SpriteInstance]) {
        self.calls.push(DrawCall::Sprites {
            atlas,
            instances: instances.to_vec(),
        });
    }

    fn supports_instancing(&self) -> bool {
        self.instancing
    }

    fn max_texture_size(&self) -> u32 {
        self.texture_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_allocation_and_deletion() {
        let mut gpu = RecordingDevice::new();
        let h = gpu.create_render_target(64, 64, 1).unwrap();
        assert_eq!(gpu.live_texture_count(), 1);
        assert_eq!(h.origin, TextureOrigin::RenderTarget);
        gpu.delete_texture(&h);
        assert_eq!(gpu.live_texture_count(), 0);
    }

    #[test]
    fn injected_allocation_failure() {
        let mut gpu = RecordingDevice::new();
        gpu.fail_allocations = true;
        assert!(matches!(
            gpu.create_render_target(64, 64, 1),
            Err(GfxError::AllocationFailed(_))
        ));
    }

    #[test]
    fn oversized_targets_are_rejected() {
        let mut gpu = RecordingDevice::new();
        gpu.texture_limit = 128;
        assert!(matches!(
            gpu.create_render_target(256, 64, 1),
            Err(GfxError::TextureTooLarge { .. })
        ));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut gpu = RecordingDevice::new();
        let a = gpu.create_render_target(8, 8, 1).unwrap();
        gpu.delete_texture(&a);
        let b = gpu.create_render_target(8, 8, 1).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn counts_quads_and_sprites() {
        let mut gpu = RecordingDevice::new();
        let target = gpu.create_render_target(32, 32, 1).unwrap();
        gpu.begin_target(&target).unwrap();
        let quad = Quad::axis_aligned(WorldRect::new(0.0, 0.0, 8.0, 8.0), UvRect::FULL);
        gpu.draw_quads(&target, AtlasId(0), &[quad, quad]).unwrap();
        gpu.draw_sprites(
            AtlasId(1),
            &[SpriteInstance {
                dest: [0.0; 4],
                uv: [0.0; 4],
                flip: 0.0,
                opacity: 1.0,
            }],
        );
        assert_eq!(gpu.quad_count(), 2);
        assert_eq!(gpu.sprite_count(), 1);
    }
}
