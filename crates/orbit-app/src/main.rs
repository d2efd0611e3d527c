//! orbit-walk headless driver.
//!
//! Loads the config, builds the planet scene and plays an input session
//! (a RON script from `--script`, or the built-in demo walk) for a fixed
//! number of frames, logging mode changes and a final summary.
//!
//! Run with: `cargo run -p orbit-app -- --frames 600`

mod session;

use std::error::Error;

use clap::Parser;
use orbit_config::{CliArgs, Config, default_config_dir};
use orbit_input::{InputScript, ScriptedInput};
use orbit_world::SimContext;
use tracing::{info, warn};

use crate::session::{Session, demo_script};

/// Frames between two checks of `config.ron` for edits.
const RELOAD_INTERVAL: u32 = 120;

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(default_config_dir);
    let (mut config, load_error) = match &config_dir {
        Some(dir) => match Config::load_or_create(dir) {
            Ok(config) => (config, None),
            Err(error) => (Config::default(), Some(error)),
        },
        None => (Config::default(), None),
    };
    config.apply_cli_overrides(&args);

    orbit_log::init_logging(
        config.debug.log_dir.as_deref(),
        cfg!(debug_assertions),
        Some(&config),
    );
    if let Some(error) = load_error {
        warn!(%error, "config not loaded, using defaults");
    }

    info!("orbit-walk");
    info!(
        frames = args.frames,
        frame_ms = args.frame_ms,
        gravity_scale = config.physics.g_force_scale,
        "session settings"
    );

    let script = match &args.script {
        Some(path) => {
            info!(path = %path.display(), "replaying input script");
            InputScript::load(path)?
        }
        None => demo_script(),
    };
    let mut input = ScriptedInput::new(script);
    let mut session = Session::new(SimContext::new(&config));

    for frame in 1..=args.frames {
        session.step(args.frame_ms, &mut input);

        if frame % RELOAD_INTERVAL == 0 {
            if let Some(dir) = &config_dir {
                match config.reload(dir) {
                    Ok(Some(mut reloaded)) => {
                        reloaded.apply_cli_overrides(&args);
                        session.ctx_mut().apply_config(&reloaded);
                        config = reloaded;
                    }
                    Ok(None) => {}
                    Err(error) => warn!(%error, "config reload failed"),
                }
            }
        }
    }

    let summary = session.summary();
    info!(
        frames = summary.frames,
        mode_changes = summary.mode_changes,
        jumps = summary.jumps,
        goals = summary.goals,
        final_mode = %summary.final_mode,
        position = ?summary.astronaut_position,
        "session finished"
    );
    Ok(())
}
