use clap::{Parser, Subcommand};
use hexfield_assets::{QualitySettings, SpriteCatalog};
use hexfield_chunks::{ChunkConfig, ChunkData, ChunkLayerBuilder, Layer, ZoomBucket};
use hexfield_common::{Camera, ChunkKey};
use hexfield_gfx::{RecordingDevice, ResourceRegistry};
use hexfield_render::MapRenderer;
use hexfield_world::TileMap;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hexfield-cli", about = "Headless hexfield pipeline tooling")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info for every workspace member
    Info,
    /// Bake one chunk against the recording device and print draw stats
    Bake {
        /// Chunk column
        #[arg(long, default_value = "0")]
        col: i32,
        /// Chunk row
        #[arg(long, default_value = "0")]
        row: i32,
        /// Map size in tiles per side
        #[arg(long, default_value = "64")]
        map_size: i32,
        /// Map generation seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Camera zoom driving the bucket choice
        #[arg(long, default_value = "1.0")]
        zoom: f32,
    },
    /// Simulate frames of a panning camera and print scheduler stats
    Frames {
        /// Number of frames to simulate
        #[arg(short, long, default_value = "30")]
        frames: u32,
        /// Map size in tiles per side
        #[arg(long, default_value = "96")]
        map_size: i32,
        /// Map generation seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("hexfield-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common:  {}", hexfield_common::crate_info());
            println!("world:   {}", hexfield_world::crate_info());
            println!("assets:  {}", hexfield_assets::crate_info());
            println!("gfx:     {}", hexfield_gfx::crate_info());
            println!("chunks:  {}", hexfield_chunks::crate_info());
            println!("sprites: {}", hexfield_sprites::crate_info());
            println!("render:  {}", hexfield_render::crate_info());
        }
        Commands::Bake {
            col,
            row,
            map_size,
            seed,
            zoom,
        } => {
            let map = TileMap::generate(map_size, map_size, seed);
            let catalog = SpriteCatalog::with_defaults();
            let mut gpu = RecordingDevice::new();
            let mut registry = ResourceRegistry::new();
            let builder = ChunkLayerBuilder::new();
            let bucket = ZoomBucket::for_zoom(zoom);
            let mut chunk = ChunkData::new(ChunkKey::new(col, row));

            println!("Baking chunk ({col}, {row}) at bucket {bucket:?}");
            for layer in Layer::ALL {
                let stats = builder.bake(
                    &mut gpu,
                    &mut registry,
                    &map,
                    &catalog,
                    &mut chunk,
                    layer,
                    bucket,
                )?;
                println!(
                    "  {layer:?}: {} quads in {} draw calls",
                    stats.quads, stats.draw_calls
                );
            }
            println!(
                "Live textures: {} ({} bytes estimated)",
                registry.live_count(),
                registry.total_bytes()
            );
        }
        Commands::Frames {
            frames,
            map_size,
            seed,
        } => {
            let mut map = TileMap::generate(map_size, map_size, seed);
            let mut catalog = SpriteCatalog::with_defaults();
            let mut gpu = RecordingDevice::new();
            let mut renderer =
                MapRenderer::new(ChunkConfig::default(), QualitySettings::default());
            let mut camera = Camera::default();

            for frame in 0..frames {
                camera.x += 40.0;
                renderer.render_frame(
                    &mut gpu,
                    &mut map,
                    &mut catalog,
                    &camera,
                    Duration::from_millis(16),
                );
                let stats = renderer.stats();
                println!(
                    "frame {frame:3}: visible={} baked={} pending={} blits={} sprites={}",
                    stats.visible_chunks,
                    stats.chunks.tasks_executed,
                    stats.chunks.queue_pending,
                    stats.layer_blits,
                    stats.overlay.items + stats.forest.trees + stats.animals.animals,
                );
                gpu.take_calls();
            }
            println!(
                "Registry: {} live textures, {} bytes estimated",
                renderer.registry().live_count(),
                renderer.registry().total_bytes()
            );
        }
    }

    Ok(())
}
