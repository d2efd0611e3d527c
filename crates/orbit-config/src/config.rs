//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Gravity and stepping.
    pub physics: PhysicsConfig,
    /// Astronaut locomotion.
    pub player: PlayerConfig,
    /// Camera offsets and smoothing.
    pub camera: CameraConfig,
    /// UFO flight tuning.
    pub vehicle: VehicleConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Gravity shaping and fixed-step settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Base gravity constant. The engine's own world gravity is `(0, -g_force, 0)`.
    pub g_force: f32,
    /// Multiplier turning `g_force` into the radial pull toward the planet center.
    pub g_force_scale: f32,
    /// Bodies closer than this to the origin use this distance when normalizing.
    pub min_gravity_distance: f32,
    /// Fixed simulation step in seconds.
    pub fixed_dt: f32,
    /// Upper bound on fixed steps per rendered frame.
    pub max_substeps: u32,
    /// Friction of the default contact material.
    pub friction: f32,
    /// Restitution of the default contact material.
    pub restitution: f32,
}

/// Astronaut controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Forward speed along the steering frame's local forward axis (m/s).
    pub walk_speed: f32,
    /// Backward speed as a fraction of `walk_speed`.
    pub backward_ratio: f32,
    /// Steering-frame yaw applied per frame while a turn key is held (radians).
    pub turn_rate: f32,
    /// Jump velocity along the body's local up axis (m/s).
    pub jump_velocity: f32,
    /// Delay between consuming the jump key and applying the impulse.
    pub jump_delay_ms: f32,
    /// Cooldown after jump-key release before the key is accepted again.
    pub jump_cooldown_ms: f32,
    /// Minimum dot product between contact normal and local up to count as ground.
    pub ground_threshold: f32,
    /// Time without input before the idle camera and animation engage.
    pub idle_timeout_ms: f32,
}

/// Camera rig offsets (in the steering frame) and smoothing time constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Follow camera position relative to the astronaut.
    pub follow_offset: [f32; 3],
    /// Follow camera look-at point relative to the astronaut.
    pub follow_look_offset: [f32; 3],
    /// Idle side-view position relative to the astronaut.
    pub idle_offset: [f32; 3],
    /// Smoothing time constant in free-roam (ms).
    pub follow_time_constant_ms: f32,
    /// Smoothing time constant for shelf and kiosk shots (ms).
    pub inspect_time_constant_ms: f32,
    /// Smoothing time constant for the UFO chase camera (ms).
    pub vehicle_time_constant_ms: f32,
}

/// UFO flight settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VehicleConfig {
    /// Forward/backward thrust force (N).
    pub max_thrust: f32,
    /// Lift force along the vehicle's local up (N).
    pub max_lift: f32,
    /// Yaw torque (N·m).
    pub max_torque: f32,
    /// Linear damping while piloted.
    pub linear_damping: f32,
    /// Angular damping while piloted.
    pub angular_damping: f32,
    /// Height of the pilot seat above the vehicle origin along its local up.
    pub seat_height: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for the JSON log file written in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            g_force: 0.01,
            g_force_scale: 700.0,
            min_gravity_distance: 0.5,
            fixed_dt: 1.0 / 60.0,
            max_substeps: 3,
            friction: 1.5,
            restitution: 0.3,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            backward_ratio: 0.2,
            turn_rate: 0.024,
            jump_velocity: 4.0,
            jump_delay_ms: 200.0,
            jump_cooldown_ms: 400.0,
            ground_threshold: 0.5,
            idle_timeout_ms: 60_000.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_offset: [0.0, 7.5, -6.0],
            follow_look_offset: [0.0, 3.0, 0.0],
            idle_offset: [2.0, 0.5, 8.0],
            follow_time_constant_ms: 555.0,
            inspect_time_constant_ms: 300.0,
            vehicle_time_constant_ms: 200.0,
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_thrust: 20.0,
            max_lift: 14.0,
            max_torque: 6.0,
            linear_damping: 0.6,
            angular_damping: 2.0,
            seat_height: 3.5,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Platform config directory for the simulation (`<config_dir>/orbit-walk`).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("orbit-walk"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects values that would stall or destabilize the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let physics = &self.physics;
        if !(physics.fixed_dt > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "physics.fixed_dt",
                reason: format!("must be positive, got {}", physics.fixed_dt),
            });
        }
        if physics.max_substeps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "physics.max_substeps",
                reason: "at least one step per frame is required".to_string(),
            });
        }
        if !(physics.min_gravity_distance > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "physics.min_gravity_distance",
                reason: format!("must be positive, got {}", physics.min_gravity_distance),
            });
        }
        if physics.g_force_scale < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "physics.g_force_scale",
                reason: format!("must not be negative, got {}", physics.g_force_scale),
            });
        }
        let camera = &self.camera;
        for (field, tau) in [
            ("camera.follow_time_constant_ms", camera.follow_time_constant_ms),
            ("camera.inspect_time_constant_ms", camera.inspect_time_constant_ms),
            ("camera.vehicle_time_constant_ms", camera.vehicle_time_constant_ms),
        ] {
            if !(tau > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be positive, got {tau}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("g_force_scale: 700.0"));
        assert!(ron_str.contains("max_substeps: 3"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.debug.log_dir = Some(PathBuf::from("logs"));
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(physics: (g_force_scale: 350.0))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.physics.g_force_scale, 350.0);
        assert_eq!(config.physics.g_force, 0.01);
        assert_eq!(config.vehicle, VehicleConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_tuning_values() {
        let config = Config::default();
        assert_eq!(config.player.jump_cooldown_ms, 400.0);
        assert_eq!(config.player.idle_timeout_ms, 60_000.0);
        assert_eq!(config.player.ground_threshold, 0.5);
        assert!((config.physics.fixed_dt - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.physics.g_force_scale = 500.0;
        config.player.walk_speed = 6.0;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.camera.follow_time_constant_ms = 800.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().camera.follow_time_constant_ms, 800.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_zero_substeps_rejected() {
        let mut config = Config::default();
        config.physics.max_substeps = 0;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "physics.max_substeps")
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(physics: (fixed_dt: -1.0))",
        )
        .unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
