//! Command-line argument parsing for the headless driver.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// orbit-walk command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orbit-walk", about = "Planetary astronaut simulation (headless)")]
pub struct CliArgs {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Simulated frame time in milliseconds.
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    pub frame_ms: f32,

    /// RON input script to replay.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Radial gravity scale (multiplies the base gravity constant).
    #[arg(long)]
    pub gravity_scale: Option<f32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(scale) = args.gravity_scale {
            self.physics.g_force_scale = scale;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
