//! Configuration for the orbit-walk simulation.
//!
//! Tunables for gravity, locomotion, camera smoothing and the UFO persist to
//! disk as RON. Supports CLI overrides via clap, hot-reload detection, and
//! forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, PhysicsConfig, PlayerConfig, VehicleConfig,
    default_config_dir,
};
pub use error::ConfigError;
