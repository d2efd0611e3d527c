//! Camera rig: follows the astronaut in free roam and frames props in the
//! inspection and pilot modes.
//!
//! Every target is approached with a first-order low-pass filter: each frame
//! the pose moves `min(dt / tau, 1)` of the way to the target. There is no
//! spring and no overshoot.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec2, Vec3};
use orbit_config::CameraConfig;
use tracing::trace;

/// Distance under which the return-to-follow glide counts as arrived.
const RETURN_EPSILON: f32 = 0.05;

/// Camera position, look-at point and up vector in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 18.0, 5.0),
            look_at: Vec3::new(0.0, 17.0, 0.0),
            up: Vec3::Y,
        }
    }
}

impl CameraPose {
    /// View orientation (camera looks down its local `-Z`).
    pub fn rotation(&self) -> Quat {
        let forward = (self.look_at - self.position).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(self.up).normalize_or(Vec3::X);
        let up = right.cross(forward);
        Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward))
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_through(&self, ndc: Vec2, fov_y: f32, aspect: f32) -> (Vec3, Vec3) {
        let half_h = (fov_y * 0.5).tan();
        let local = Vec3::new(ndc.x * half_h * aspect, ndc.y * half_h, -1.0);
        (self.position, (self.rotation() * local).normalize())
    }
}

/// Sub-state of the free-roam camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreeRoamPhase {
    /// Stays where it is.
    #[default]
    Hold,
    /// Glides behind the astronaut while the forward key is held.
    Follow,
    /// Orbits to a side view after a long stretch without input.
    Idle,
    /// Glides back behind the astronaut after leaving a mode.
    Return,
}

/// Inputs of one free-roam camera update.
#[derive(Debug, Clone, Copy)]
pub struct FollowInput {
    pub character_position: Vec3,
    pub steering: Quat,
    /// Negated gravity direction at the character.
    pub up: Vec3,
    pub forward_held: bool,
    /// Any key held or pointer moved this frame.
    pub any_input: bool,
    pub idle: bool,
}

/// Smoothing factor for one frame.
pub fn smoothing_factor(dt_ms: f32, time_constant_ms: f32) -> f32 {
    if time_constant_ms <= 0.0 {
        return 1.0;
    }
    (dt_ms / time_constant_ms).clamp(0.0, 1.0)
}

/// The camera rig state.
#[derive(Resource, Debug, Clone)]
pub struct CameraRig {
    pub config: CameraConfig,
    pub pose: CameraPose,
    pub phase: FreeRoamPhase,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            pose: CameraPose::default(),
            phase: FreeRoamPhase::Hold,
        }
    }

    /// Follow target for the given character frame.
    pub fn follow_target(&self, position: Vec3, steering: Quat) -> (Vec3, Vec3) {
        (
            position + steering * Vec3::from_array(self.config.follow_offset),
            position + steering * Vec3::from_array(self.config.follow_look_offset),
        )
    }

    /// Starts the glide back behind the astronaut.
    pub fn begin_return(&mut self) {
        self.phase = FreeRoamPhase::Return;
    }

    /// Free-roam update.
    pub fn update_free_roam(&mut self, dt_ms: f32, input: &FollowInput) {
        let (follow_pos, follow_look) = self.follow_target(input.character_position, input.steering);

        self.phase = if input.idle {
            FreeRoamPhase::Idle
        } else if input.forward_held {
            FreeRoamPhase::Follow
        } else if self.phase == FreeRoamPhase::Return
            && !input.any_input
            && self.pose.position.distance(follow_pos) > RETURN_EPSILON
        {
            FreeRoamPhase::Return
        } else {
            FreeRoamPhase::Hold
        };

        let tau = self.config.follow_time_constant_ms;
        match self.phase {
            FreeRoamPhase::Follow | FreeRoamPhase::Return => {
                self.approach(follow_pos, follow_look, tau, dt_ms);
            }
            FreeRoamPhase::Idle => {
                let idle_pos = input.character_position
                    + input.steering * Vec3::from_array(self.config.idle_offset);
                self.approach(idle_pos, input.character_position, tau, dt_ms);
            }
            FreeRoamPhase::Hold => {}
        }
        self.pose.up = input.up;
        trace!(phase = ?self.phase, position = %self.pose.position, "free-roam camera");
    }

    /// Glides to an inspection marker pose (shelf or kiosk).
    pub fn update_inspect(&mut self, dt_ms: f32, target: &CameraPose) {
        self.approach(target.position, target.look_at, self.config.inspect_time_constant_ms, dt_ms);
        self.pose.up = target.up;
    }

    /// Glides to the chase marker of the piloted vehicle.
    pub fn update_vehicle(&mut self, dt_ms: f32, target: &CameraPose) {
        self.approach(target.position, target.look_at, self.config.vehicle_time_constant_ms, dt_ms);
        self.pose.up = target.up;
    }

    fn approach(&mut self, position: Vec3, look_at: Vec3, tau: f32, dt_ms: f32) {
        let alpha = smoothing_factor(dt_ms, tau);
        self.pose.position = self.pose.position.lerp(position, alpha);
        self.pose.look_at = self.pose.look_at.lerp(look_at, alpha);
    }
}
