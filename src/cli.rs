//! Command-line arguments for the `tessera` soak binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ClientMapConfig;

/// Streams generated terrain through a client map without a window.
///
/// CLI values override settings loaded from the config file.
#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Headless client map soak run")]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). RUST_LOG wins if set.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Frames to simulate.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Seconds per frame.
    #[arg(long, default_value_t = 1.0 / 30.0)]
    pub dt: f32,

    /// Terrain seed.
    #[arg(long, default_value_t = 1337)]
    pub seed: i32,

    /// Radius, in blocks, of the area fed around the camera.
    #[arg(long, default_value_t = 3)]
    pub radius: i16,

    /// Blocks fed per frame.
    #[arg(long, default_value_t = 24)]
    pub feed_budget: usize,

    /// Log stats every N frames.
    #[arg(long, default_value_t = 60)]
    pub stats_every: u32,

    /// Mesh-grid cell edge in blocks.
    #[arg(long)]
    pub mesh_chunk: Option<u16>,

    /// Resident-block cap; negative disables it.
    #[arg(long, allow_hyphen_values = true)]
    pub mapblock_limit: Option<i32>,

    /// Mesh worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Viewing range in nodes.
    #[arg(long)]
    pub viewing_range: Option<f32>,

    /// Seconds a block may stay unused before eviction.
    #[arg(long)]
    pub unload_timeout: Option<f32>,
}

impl ClientMapConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(c) = args.mesh_chunk {
            self.mesh_chunk = c;
        }
        if let Some(l) = args.mapblock_limit {
            self.mapblock_limit = l;
        }
        if let Some(t) = args.threads {
            self.mesh_generation_threads = t;
        }
        if let Some(r) = args.viewing_range {
            self.viewing_range = r;
        }
        if let Some(t) = args.unload_timeout {
            self.unload_unused_data_timeout = t;
        }
    }
}
