use anyhow::Result;
use clap::Parser;
use hexfield_assets::{QualitySettings, SpriteCatalog};
use hexfield_chunks::ChunkConfig;
use hexfield_common::{AtlasId, Camera};
use hexfield_render::MapRenderer;
use hexfield_render_wgpu::WgpuDevice;
use hexfield_world::TileMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "hexfield-viewer", about = "Hexfield map viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Map generation seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Map size in tiles per side
    #[arg(long, default_value = "96")]
    map_size: i32,
}

const PAN_SPEED: f32 = 600.0;

/// Application state independent of the GPU backend.
struct AppState {
    map: TileMap,
    catalog: SpriteCatalog,
    renderer: MapRenderer,
    camera: Camera,
    keys_held: HashSet<KeyCode>,
    last_frame: Instant,
    frame_count: u64,
}

impl AppState {
    fn new(seed: u64, map_size: i32) -> Self {
        Self {
            map: TileMap::generate(map_size, map_size, seed),
            catalog: SpriteCatalog::with_defaults(),
            renderer: MapRenderer::new(ChunkConfig::default(), QualitySettings::default()),
            camera: Camera::default(),
            keys_held: HashSet::new(),
            last_frame: Instant::now(),
            frame_count: 0,
        }
    }

    fn update(&mut self, dt: f32) {
        let step = PAN_SPEED * dt / self.camera.zoom;
        if self.keys_held.contains(&KeyCode::KeyW) || self.keys_held.contains(&KeyCode::ArrowUp) {
            self.camera.y -= step;
        }
        if self.keys_held.contains(&KeyCode::KeyS) || self.keys_held.contains(&KeyCode::ArrowDown)
        {
            self.camera.y += step;
        }
        if self.keys_held.contains(&KeyCode::KeyA) || self.keys_held.contains(&KeyCode::ArrowLeft)
        {
            self.camera.x -= step;
        }
        if self.keys_held.contains(&KeyCode::KeyD)
            || self.keys_held.contains(&KeyCode::ArrowRight)
        {
            self.camera.x += step;
        }
    }

    fn zoom_by(&mut self, factor: f32) {
        // Keep the view center fixed while zooming.
        let before = self.camera.world_rect();
        self.camera.zoom = (self.camera.zoom * factor).clamp(0.2, 4.0);
        let after = self.camera.world_rect();
        self.camera.x += (before.width - after.width) * 0.5;
        self.camera.y += (before.height - after.height) * 0.5;
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }
        if !pressed {
            return;
        }

        match key {
            KeyCode::Equal => self.zoom_by(1.25),
            KeyCode::Minus => self.zoom_by(0.8),
            KeyCode::Digit1 => {
                let mut quality = self.renderer.quality();
                quality.shadows = !quality.shadows;
                self.renderer.set_quality(quality);
                tracing::info!(shadows = quality.shadows, "toggled shadows");
            }
            KeyCode::Digit2 => {
                let mut quality = self.renderer.quality();
                quality.max_clump = match quality.max_clump {
                    0 => 1,
                    1 => 3,
                    _ => 0,
                };
                self.renderer.set_quality(quality);
                tracing::info!(max_clump = quality.max_clump, "cycled clump cap");
            }
            _ => {}
        }
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    gpu: Option<WgpuDevice>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            gpu: None,
        }
    }

    /// Build the backend device and upload the atlases it will sample.
    fn build_backend(&mut self, surface_format: wgpu::TextureFormat) {
        let (Some(device), Some(queue)) = (&self.device, &self.queue) else {
            return;
        };
        let mut gpu = WgpuDevice::new(device.clone(), queue.clone(), surface_format);
        for (id, info) in self.state.catalog.atlases() {
            let pixels = paint_atlas(*id, info.width, info.height);
            let handle = gpu.upload_atlas(*id, info.width, info.height, info.mip_levels, &pixels);
            self.state.renderer.registry_mut().register(&handle, "atlas");
        }
        self.gpu = Some(gpu);
    }

    /// Simulate a GPU context loss: every handle is dropped atomically and
    /// the backend is rebuilt from scratch.
    fn recycle_context(&mut self) {
        let Some(config) = &self.config else {
            return;
        };
        let format = config.format;
        self.state.renderer.on_context_lost();
        self.gpu = None;
        self.build_backend(format);
        self.state.renderer.on_backend_restored();
        tracing::info!("context recycled");
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Hexfield")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("hexfield_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.state.camera.width = size.width as f32;
        self.state.camera.height = size.height as f32;

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.build_backend(surface_format);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    self.state.camera.width = config.width as f32;
                    self.state.camera.height = config.height as f32;
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                if key == KeyCode::KeyF && pressed {
                    self.recycle_context();
                    return;
                }
                self.state.handle_key(key, pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                if lines.abs() > f32::EPSILON {
                    self.state.zoom_by(1.1_f32.powf(lines));
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.state.last_frame).min(Duration::from_millis(100));
                self.state.last_frame = now;
                self.state.update(dt.as_secs_f32());

                let (Some(surface), Some(device), Some(gpu)) =
                    (&self.surface, &self.device, &mut self.gpu)
                else {
                    return;
                };

                let output = match surface.get_current_texture() {
                    Ok(t) => t,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        if let Some(config) = &self.config {
                            surface.configure(device, config);
                        }
                        return;
                    }
                    Err(e) => {
                        tracing::error!("surface error: {e}");
                        return;
                    }
                };

                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let config = self.config.as_ref().unwrap();
                gpu.set_frame_target(view, config.width, config.height);

                self.state.renderer.render_frame(
                    gpu,
                    &mut self.state.map,
                    &mut self.state.catalog,
                    &self.state.camera,
                    dt,
                );
                gpu.end_frame();
                output.present();

                self.state.frame_count += 1;
                if self.state.frame_count % 240 == 0 {
                    let stats = self.state.renderer.stats();
                    tracing::info!(
                        visible = stats.visible_chunks,
                        baked = stats.chunks.tasks_executed,
                        pending = stats.chunks.queue_pending,
                        sprites = stats.overlay.items + stats.forest.trees + stats.animals.animals,
                        vram_mb = self.state.renderer.registry().total_bytes() / (1024 * 1024),
                        "frame stats"
                    );
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Paint a placeholder atlas: a grid of flat-colored cells with darker
/// borders, enough to see every sprite kind distinctly. Atlas 0 is the 4×4
/// terrain/infra grid, atlas 1 the 8×8 content grid matching the default
/// catalog layout.
fn paint_atlas(id: AtlasId, width: u32, height: u32) -> Vec<u8> {
    let (grid, filled): (u32, &[[u8; 4]]) = if id == AtlasId(0) {
        (
            4,
            &[
                [92, 148, 72, 255],   // land
                [52, 96, 160, 255],   // water
                [196, 172, 112, 255], // desert
                [128, 120, 116, 255], // mountain
                [116, 92, 60, 255],   // road
                [74, 70, 72, 255],    // rail
            ],
        )
    } else {
        (
            8,
            &[
                [228, 200, 92, 255],  // wheat
                [140, 100, 52, 255],  // timber
                [150, 150, 158, 255], // iron
                [40, 36, 40, 255],    // oil
                [96, 156, 196, 255],  // fish
                [208, 208, 216, 255], // city
                [168, 128, 88, 255],  // depot
                [88, 120, 160, 255],  // port
                [104, 96, 88, 255],   // mine
                [180, 168, 96, 255],  // farm
                [120, 88, 48, 255],   // lumber mill
                [160, 120, 96, 255],  // ranch
                [108, 144, 84, 255],  // plantation
                [64, 56, 48, 255],    // oil well
                [140, 132, 120, 255], // watchtower
            ],
        )
    };

    let cell_w = width / grid;
    let cell_h = height / grid;
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    for y in 0..height {
        for x in 0..width {
            let cell = ((y / cell_h).min(grid - 1) * grid + (x / cell_w).min(grid - 1)) as usize;
            let mut rgba = *filled.get(cell).unwrap_or(&[0, 0, 0, 0]);
            // Darken cell borders so tiling reads at a glance.
            let on_border = x % cell_w < 2
                || y % cell_h < 2
                || x % cell_w >= cell_w - 2
                || y % cell_h >= cell_h - 2;
            if on_border && rgba[3] > 0 {
                rgba = [rgba[0] / 2, rgba[1] / 2, rgba[2] / 2, rgba[3]];
            }
            let idx = ((y * width + x) * 4) as usize;
            pixels[idx..idx + 4].copy_from_slice(&rgba);
        }
    }

    // Tree and animal cells open the third content row; give them visible
    // shapes rather than flat fills.
    if id == AtlasId(1) {
        stamp_cell(&mut pixels, width, cell_w, cell_h, 0, 2, [40, 96, 48, 255]);
        stamp_cell(&mut pixels, width, cell_w, cell_h, 1, 2, [150, 110, 70, 255]);
        stamp_cell(&mut pixels, width, cell_w, cell_h, 2, 2, [210, 190, 170, 255]);
    }
    pixels
}

/// Fill the center disc of one atlas cell with a color.
fn stamp_cell(
    pixels: &mut [u8],
    width: u32,
    cell_w: u32,
    cell_h: u32,
    col: u32,
    row: u32,
    rgba: [u8; 4],
) {
    let cx = (col * cell_w + cell_w / 2) as f32;
    let cy = (row * cell_h + cell_h / 2) as f32;
    let radius = (cell_w.min(cell_h) as f32) * 0.35;
    for y in (row * cell_h)..((row + 1) * cell_h) {
        for x in (col * cell_w)..((col + 1) * cell_w) {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if (dx * dx + dy * dy).sqrt() <= radius {
                let idx = ((y * width + x) * 4) as usize;
                pixels[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!(seed = cli.seed, size = cli.map_size, "hexfield-viewer starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(AppState::new(cli.seed, cli.map_size));
    event_loop.run_app(&mut app)?;

    Ok(())
}
