//! UFO flight controller.
//!
//! While piloted the UFO is flown with forces: forward/back thrust along its
//! local `+Z`, lift and descent along its local up, and a yaw torque. The
//! forces are added after the central gravity pass of each substep, so they
//! stack on top of gravity rather than replacing it.

use std::f32::consts::PI;

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use orbit_config::VehicleConfig;
use orbit_input::{Action, ActionState};
use orbit_physics::rapier3d::prelude::*;
use orbit_physics::{BodyBlueprint, DEFAULT_MATERIAL, PhysicsWorld, to_axis_angle, to_quat, to_vec3, to_vector};
use tracing::debug;

use crate::camera_rig::CameraPose;

/// Chase camera offset in the vehicle frame.
const CHASE_OFFSET: Vec3 = Vec3::new(0.0, 6.0, -12.0);
/// Chase camera look-at offset in the vehicle frame.
const CHASE_LOOK_OFFSET: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Where the UFO is parked at startup: under the planet, upside down so its
/// local up points away from the center.
pub fn ufo_spawn() -> (Vec3, Quat) {
    (Vec3::new(0.0, -17.0, 0.0), Quat::from_rotation_x(PI))
}

/// Saucer disc, three landing spheres and a cockpit dome, unit mass.
pub fn ufo_blueprint(position: Vec3, rotation: Quat) -> BodyBlueprint {
    let mut blueprint = BodyBlueprint::new(
        RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .rotation(to_axis_angle(rotation)),
    )
    .with_collider(ColliderBuilder::cylinder(0.25, 2.8).mass(0.6), DEFAULT_MATERIAL);
    for (x, z) in [(2.0, 0.0), (-1.0, 1.75), (-1.0, -1.75)] {
        blueprint = blueprint.with_collider(
            ColliderBuilder::ball(0.5)
                .translation(Vector::new(x, -0.2, z))
                .mass(0.1),
            DEFAULT_MATERIAL,
        );
    }
    blueprint.with_collider(
        ColliderBuilder::ball(0.9)
            .translation(Vector::new(0.0, 0.4, 0.0))
            .mass(0.1),
        DEFAULT_MATERIAL,
    )
}

/// Pilot commands for one frame, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleInput {
    pub thrust: f32,
    pub lift: f32,
    pub yaw: f32,
}

impl VehicleInput {
    pub fn from_actions(actions: &ActionState) -> Self {
        let axis = |pos: Action, neg: Action| {
            f32::from(u8::from(actions.is_action_active(pos)))
                - f32::from(u8::from(actions.is_action_active(neg)))
        };
        Self {
            thrust: axis(Action::MoveForward, Action::MoveBack),
            lift: axis(Action::Jump, Action::Descend),
            yaw: axis(Action::TurnLeft, Action::TurnRight),
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Flight state of the UFO.
#[derive(Component, Debug, Clone)]
pub struct VehicleController {
    pub config: VehicleConfig,
    pub piloted: bool,
    pub input: VehicleInput,
    saved_damping: Option<(f32, f32)>,
}

impl VehicleController {
    pub fn new(config: VehicleConfig) -> Self {
        Self {
            config,
            piloted: false,
            input: VehicleInput::default(),
            saved_damping: None,
        }
    }

    /// Raises damping so the UFO settles when the pilot lets go.
    pub fn begin_piloting(&mut self, physics: &mut PhysicsWorld, handle: RigidBodyHandle) {
        if let Some(body) = physics.rigid_body_set.get_mut(handle) {
            self.saved_damping = Some((body.linear_damping(), body.angular_damping()));
            body.set_linear_damping(self.config.linear_damping);
            body.set_angular_damping(self.config.angular_damping);
            body.wake_up(true);
        }
        self.piloted = true;
        debug!("vehicle piloting started");
    }

    /// Restores the damping saved by [`begin_piloting`](Self::begin_piloting).
    pub fn end_piloting(&mut self, physics: &mut PhysicsWorld, handle: RigidBodyHandle) {
        if let (Some((linear, angular)), Some(body)) =
            (self.saved_damping.take(), physics.rigid_body_set.get_mut(handle))
        {
            body.set_linear_damping(linear);
            body.set_angular_damping(angular);
        }
        self.piloted = false;
        self.input = VehicleInput::default();
        debug!("vehicle piloting ended");
    }

    /// Adds this frame's thrust, lift and yaw torque to the body. Must run
    /// after the gravity pass of the same substep, which resets forces.
    pub fn apply_thrust(&self, physics: &mut PhysicsWorld, handle: RigidBodyHandle) -> Option<Vec3> {
        if !self.piloted || self.input.is_idle() {
            return None;
        }
        let body = physics.rigid_body_set.get_mut(handle)?;
        let rotation = to_quat(*body.rotation());
        let force = rotation
            * Vec3::new(
                0.0,
                self.input.lift * self.config.max_lift,
                self.input.thrust * self.config.max_thrust,
            );
        let torque = rotation * Vec3::new(0.0, self.input.yaw * self.config.max_torque, 0.0);
        body.add_force(to_vector(force), true);
        body.add_torque(to_vector(torque), true);
        Some(force)
    }

    /// Pilot seat pose: `seat_height` above the vehicle along its local up.
    pub fn seat_pose(&self, physics: &PhysicsWorld, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let body = physics.rigid_body_set.get(handle)?;
        let rotation = to_quat(*body.rotation());
        let position = to_vec3(body.translation()) + rotation * Vec3::Y * self.config.seat_height;
        Some((position, rotation))
    }
}

/// Chase camera marker for a vehicle at `position` with `rotation`.
pub fn chase_marker(position: Vec3, rotation: Quat) -> CameraPose {
    CameraPose {
        position: position + rotation * CHASE_OFFSET,
        look_at: position + rotation * CHASE_LOOK_OFFSET,
        up: rotation * Vec3::Y,
    }
}
