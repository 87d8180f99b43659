use crate::mipgen::MipGenerator;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use hexfield_common::{AtlasId, UvRect, WorldRect};
use hexfield_gfx::{GfxError, GpuDevice, Quad, SpriteInstance, TextureHandle, TextureOrigin};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Format for every offscreen chunk texture.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const INITIAL_INSTANCE_CAPACITY: usize = 1024;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct TargetInfo {
    size: [f32; 2],
    _pad: [f32; 2],
}

struct TextureEntry {
    texture: wgpu::Texture,
    /// Mip level 0, used as a render attachment.
    attach_view: wgpu::TextureView,
    /// Full mip chain, used for sampling.
    sample_view: wgpu::TextureView,
    handle: TextureHandle,
}

/// wgpu implementation of the backend-agnostic GPU device.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bake_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    sprite_pipeline: wgpu::RenderPipeline,
    quad_bind_layout: wgpu::BindGroupLayout,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    template_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    targets: HashMap<u64, TextureEntry>,
    atlases: HashMap<AtlasId, TextureEntry>,
    next_id: u64,
    frame_view: Option<wgpu::TextureView>,
    frame_size: (u32, u32),
    mipgen: MipGenerator,
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let quad_bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad_pipeline_layout"),
            bind_group_layouts: &[&quad_bind_layout],
            push_constant_ranges: &[],
        });

        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::QUAD_SHADER.into()),
        });
        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SPRITE_SHADER.into()),
        });

        let quad_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x2,
                1 => Float32x2,
            ],
        };

        let make_quad_pipeline = |label: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &quad_shader,
                    entry_point: Some("vs_quad"),
                    compilation_options: Default::default(),
                    buffers: std::slice::from_ref(&quad_vertex_layout),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &quad_shader,
                    entry_point: Some("fs_quad"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };

        let bake_pipeline = make_quad_pipeline("bake_pipeline", TARGET_FORMAT);
        let blit_pipeline = make_quad_pipeline("blit_pipeline", surface_format);

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sprite_shader,
                entry_point: Some("vs_sprite"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: (std::mem::size_of::<f32>() * 2) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<SpriteInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            1 => Float32x4,
                            2 => Float32x4,
                            3 => Float32x2,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &sprite_shader,
                entry_point: Some("fs_sprite"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nearest_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Unit quad template, two triangles over [0, 1]².
        let template: [[f32; 2]; 6] = [
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ];
        let template_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite_template"),
            contents: bytemuck::cast_slice(&template),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_instances"),
            size: (INITIAL_INSTANCE_CAPACITY * std::mem::size_of::<SpriteInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mipgen = MipGenerator::new(&device, TARGET_FORMAT);

        Self {
            device,
            queue,
            bake_pipeline,
            blit_pipeline,
            sprite_pipeline,
            quad_bind_layout,
            nearest_sampler,
            linear_sampler,
            template_buffer,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            targets: HashMap::new(),
            atlases: HashMap::new(),
            next_id: 1,
            frame_view: None,
            frame_size: (1, 1),
            mipgen,
        }
    }

    /// Point screen draws at the acquired surface view and clear it.
    pub fn set_frame_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.06,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.frame_view = Some(view);
        self.frame_size = (width.max(1), height.max(1));
    }

    /// Drop the surface view so the owner can present.
    pub fn end_frame(&mut self) {
        self.frame_view = None;
    }

    /// Upload a sprite atlas (RGBA8 pixels) and make it available to bakes
    /// and sprite draws under the given id.
    pub fn upload_atlas(
        &mut self,
        id: AtlasId,
        width: u32,
        height: u32,
        mip_levels: u32,
        pixels: &[u8],
    ) -> TextureHandle {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("atlas_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        if mip_levels > 1 {
            self.mipgen
                .generate(&self.device, &self.queue, &texture, mip_levels);
        }

        let handle = TextureHandle {
            id: self.next_id,
            width,
            height,
            origin: TextureOrigin::Uploaded,
            mip_levels: mip_levels.max(1),
        };
        self.next_id += 1;
        let entry = Self::make_entry(texture, handle);
        self.atlases.insert(id, entry);
        tracing::debug!(atlas = id.0, width, height, "atlas uploaded");
        handle
    }

    fn make_entry(texture: wgpu::Texture, handle: TextureHandle) -> TextureEntry {
        let attach_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("attach_view"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        TextureEntry {
            texture,
            attach_view,
            sample_view,
            handle,
        }
    }

    fn quad_bind_group(
        &self,
        target_size: (u32, u32),
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let info = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("target_info"),
                contents: bytemuck::bytes_of(&TargetInfo {
                    size: [target_size.0 as f32, target_size.1 as f32],
                    _pad: [0.0, 0.0],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad_bind_group"),
            layout: &self.quad_bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: info.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

impl GpuDevice for WgpuDevice {
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<TextureHandle, GfxError> {
        let limit = self.max_texture_size();
        if width > limit || height > limit {
            return Err(GfxError::TextureTooLarge {
                requested: width.max(height),
                limit,
            });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("chunk_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let handle = TextureHandle {
            id: self.next_id,
            width,
            height,
            origin: TextureOrigin::RenderTarget,
            mip_levels: mip_levels.max(1),
        };
        self.next_id += 1;
        self.targets.insert(handle.id, Self::make_entry(texture, handle));
        Ok(handle)
    }

    fn delete_texture(&mut self, handle: &TextureHandle) {
        if self.targets.remove(&handle.id).is_some() {
            return;
        }
        self.atlases.retain(|_, entry| entry.handle.id != handle.id);
    }

    fn begin_target(&mut self, target: &TextureHandle) -> Result<(), GfxError> {
        let entry = self
            .targets
            .get(&target.id)
            .ok_or(GfxError::UnknownTexture(target.id))?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bake_clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bake_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &entry.attach_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn draw_quads(
        &mut self,
        target: &TextureHandle,
        atlas: AtlasId,
        quads: &[Quad],
    ) -> Result<(), GfxError> {
        if quads.is_empty() {
            return Ok(());
        }
        let entry = self
            .targets
            .get(&target.id)
            .ok_or(GfxError::UnknownTexture(target.id))?;
        let Some(atlas_entry) = self.atlases.get(&atlas) else {
            tracing::warn!(atlas = atlas.0, "draw_quads against an unloaded atlas");
            return Ok(());
        };

        let mut vertices = Vec::with_capacity(quads.len() * 6);
        for quad in quads {
            let [tl, tr, br, bl] = quad.corners;
            let uv = quad.uv;
            let v = |p: glam::Vec2, u: f32, w: f32| QuadVertex {
                position: [p.x, p.y],
                uv: [u, w],
            };
            vertices.extend_from_slice(&[
                v(tl, uv.u0, uv.v0),
                v(tr, uv.u1, uv.v0),
                v(br, uv.u1, uv.v1),
                v(tl, uv.u0, uv.v0),
                v(br, uv.u1, uv.v1),
                v(bl, uv.u0, uv.v1),
            ]);
        }
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bake_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let bind_group = self.quad_bind_group(
            (target.width, target.height),
            &atlas_entry.sample_view,
            &self.nearest_sampler,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bake_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bake_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &entry.attach_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.bake_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..vertices.len() as u32, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn regenerate_mipmaps(&mut self, handle: &TextureHandle) {
        let Some(entry) = self.targets.get(&handle.id) else {
            return;
        };
        self.mipgen.generate(
            &self.device,
            &self.queue,
            &entry.texture,
            handle.mip_levels,
        );
    }

    fn draw_texture(&mut self, handle: &TextureHandle, dest: WorldRect, uv: UvRect) {
        let Some(view) = self.frame_view.as_ref() else {
            tracing::warn!("draw_texture outside a frame");
            return;
        };
        let entry = self
            .targets
            .get(&handle.id)
            .or_else(|| self.atlases.values().find(|e| e.handle.id == handle.id));
        let Some(entry) = entry else {
            return;
        };

        let quad = Quad::axis_aligned(dest, uv);
        let [tl, tr, br, bl] = quad.corners;
        let vertices = [
            QuadVertex {
                position: [tl.x, tl.y],
                uv: [uv.u0, uv.v0],
            },
            QuadVertex {
                position: [tr.x, tr.y],
                uv: [uv.u1, uv.v0],
            },
            QuadVertex {
                position: [br.x, br.y],
                uv: [uv.u1, uv.v1],
            },
            QuadVertex {
                position: [tl.x, tl.y],
                uv: [uv.u0, uv.v0],
            },
            QuadVertex {
                position: [br.x, br.y],
                uv: [uv.u1, uv.v1],
            },
            QuadVertex {
                position: [bl.x, bl.y],
                uv: [uv.u0, uv.v1],
            },
        ];
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("blit_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let bind_group =
            self.quad_bind_group(self.frame_size, &entry.sample_view, &self.linear_sampler);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blit_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_sprites(&mut self, atlas: AtlasId, instances: &[SpriteInstance]) {
        if instances.is_empty() {
            return;
        }
        let Some(view) = self.frame_view.as_ref() else {
            tracing::warn!("draw_sprites outside a frame");
            return;
        };
        let Some(atlas_entry) = self.atlases.get(&atlas) else {
            tracing::warn!(atlas = atlas.0, "draw_sprites against an unloaded atlas");
            return;
        };

        // Grow (reallocate) the GPU instance buffer when a frame outgrows it.
        if instances.len() > self.instance_capacity {
            let mut capacity = self.instance_capacity;
            while capacity < instances.len() {
                capacity *= 2;
            }
            self.instance_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("sprite_instances"),
                size: (capacity * std::mem::size_of::<SpriteInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.instance_capacity = capacity;
            tracing::debug!(capacity, "instance buffer grown");
        }
        self.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));

        let bind_group =
            self.quad_bind_group(self.frame_size, &atlas_entry.sample_view, &self.nearest_sampler);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sprite_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.sprite_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, self.template_buffer.slice(..));
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            pass.draw(0..6, 0..instances.len() as u32);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn supports_instancing(&self) -> bool {
        true
    }

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
