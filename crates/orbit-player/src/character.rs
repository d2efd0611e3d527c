//! Astronaut character controller for walking on a spherical planet.
//!
//! Facing lives in a kinematic steering frame (a quaternion, local forward
//! `+Z`, local up `+Y`) that is never touched by the solver. Every frame the
//! steering frame is re-levelled to the radial up at the body position, turned
//! by the A/D keys, and copied onto the physics body, whose own rotations are
//! locked.

use std::f32::consts::FRAC_PI_2;

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use orbit_config::PlayerConfig;
use orbit_input::{Action, ActionState, JumpDebounce};
use orbit_physics::gravity::local_up;
use orbit_physics::rapier3d::prelude::*;
use orbit_physics::{BodyBlueprint, DEFAULT_MATERIAL, PhysicsWorld, to_rotation, to_vec3, to_vector};
use tracing::debug;

/// Planet surface radius used for spawning and the shadow fade.
pub const PLANET_RADIUS: f32 = 15.0;

/// Angles below this are treated as "up did not change".
const REORIENT_EPSILON: f32 = 1e-6;

/// Animation clip the renderer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationCue {
    #[default]
    Idle,
    /// Played after a long stretch without input.
    IdleLong,
    Walk,
    Run,
    Jump,
}

/// Body blueprint of the astronaut: a box torso plus three stacked spheres,
/// unit mass, rotations locked, never sleeps.
pub fn astronaut_blueprint(spawn: Vec3) -> BodyBlueprint {
    let mut blueprint = BodyBlueprint::new(
        RigidBodyBuilder::dynamic()
            .translation(to_vector(spawn))
            .lock_rotations()
            .can_sleep(false),
    );
    // Box plus spheres; densities split so the total mass is one.
    blueprint = blueprint.with_collider(
        ColliderBuilder::cuboid(0.75, 1.0, 0.75).mass(0.25),
        DEFAULT_MATERIAL,
    );
    for y in [-0.7, 0.0, 0.7] {
        blueprint = blueprint.with_collider(
            ColliderBuilder::ball(0.7)
                .translation(Vector::new(0.0, y, 0.0))
                .mass(0.25),
            DEFAULT_MATERIAL,
        );
    }
    blueprint
}

/// Default astronaut spawn point, 1.5 above the north pole of the planet.
pub fn astronaut_spawn() -> Vec3 {
    Vec3::new(0.0, PLANET_RADIUS + 1.5, 0.0)
}

/// New forward/backward velocity for one frame of input.
///
/// The forward key sets the velocity component along `forward` to
/// `walk_speed`, but only while the body is slower than that, so holding the
/// key never keeps accelerating a body that is already moving faster. The
/// backward key does the same in reverse at `walk_speed * backward_ratio`.
/// Other velocity components are kept.
pub fn movement_velocity(
    linvel: Vec3,
    forward: Vec3,
    forward_pressed: bool,
    back_pressed: bool,
    config: &PlayerConfig,
) -> Vec3 {
    let mut velocity = linvel;
    if forward_pressed {
        velocity = set_component_below(velocity, forward, config.walk_speed);
    }
    if back_pressed {
        velocity = set_component_below(velocity, -forward, config.walk_speed * config.backward_ratio);
    }
    velocity
}

fn set_component_below(velocity: Vec3, axis: Vec3, speed: f32) -> Vec3 {
    let current = velocity.dot(axis);
    if current < speed {
        velocity + axis * (speed - current)
    } else {
        velocity
    }
}

/// Turns the steering frame about its own up axis.
pub fn turn_steering(steering: Quat, left: bool, right: bool, turn_rate: f32) -> Quat {
    let mut angle = 0.0;
    if left {
        angle += turn_rate;
    }
    if right {
        angle -= turn_rate;
    }
    if angle == 0.0 {
        steering
    } else {
        (steering * Quat::from_rotation_y(angle)).normalize()
    }
}

/// Re-levels the steering frame so its local up matches `new_up`.
///
/// Two incremental rotations about the frame's own axes are applied: first
/// about local Z so the new up lies in the local YZ plane, then about local X
/// to bring local Y onto it. Neither touches the heading, so yaw stays
/// continuous while walking around the sphere. If the new up points below the
/// frame's horizon the angles are ambiguous and the shortest-arc rotation is
/// used instead.
pub fn reorient_to_local_up(steering: Quat, prev_up: Vec3, new_up: Vec3) -> Quat {
    let Some(new_up) = new_up.try_normalize() else {
        return steering;
    };
    if prev_up.angle_between(new_up) <= REORIENT_EPSILON {
        return steering;
    }

    let local = steering.inverse() * new_up;
    if local.y <= 1e-3 {
        let current_up = steering * Vec3::Y;
        return (Quat::from_rotation_arc(current_up, new_up) * steering).normalize();
    }

    // Up-right correction: angle of the up vector's XY projection from local X.
    let projected = Vec3::new(local.x, local.y, 0.0);
    let up_right = FRAC_PI_2 - projected.angle_between(Vec3::X);
    let steering = steering * Quat::from_rotation_z(-up_right);

    // Front-right correction: angle of the up vector from the new local Z.
    let local = steering.inverse() * new_up;
    let front_right = FRAC_PI_2 - local.angle_between(Vec3::Z);
    (steering * Quat::from_rotation_x(front_right)).normalize()
}

/// Whether any contact normal counts as standing on ground.
pub fn is_ground_contact(normals: &[Vec3], up: Vec3, threshold: f32) -> bool {
    normals.iter().any(|n| n.dot(up) > threshold)
}

/// Opacity of the blob shadow under the astronaut; fades out with height.
pub fn shadow_opacity(position: Vec3) -> f32 {
    (1.0 - (position.length() - PLANET_RADIUS) * 0.3).clamp(0.0, 1.0)
}

/// Per-astronaut controller state.
#[derive(Component, Debug, Clone)]
pub struct Character {
    pub config: PlayerConfig,
    /// Intended facing; the body's rotation is synced to this every frame.
    pub steering: Quat,
    /// Radial up recorded at the last reorientation.
    pub prev_up: Vec3,
    pub grounded: bool,
    pub jump: JumpDebounce,
    pending_jump_ms: Option<f32>,
    airborne_from_jump: bool,
    /// Time without any input, for the idle camera and animation.
    pub idle_ms: f32,
    pub animation: AnimationCue,
    /// Jumps applied so far.
    pub jumps: u32,
    min_gravity_distance: f32,
}

impl Character {
    pub fn new(config: PlayerConfig, min_gravity_distance: f32) -> Self {
        let jump = JumpDebounce::new(config.jump_cooldown_ms);
        Self {
            config,
            steering: Quat::IDENTITY,
            prev_up: Vec3::Y,
            grounded: false,
            jump,
            pending_jump_ms: None,
            airborne_from_jump: false,
            idle_ms: 0.0,
            animation: AnimationCue::Idle,
            jumps: 0,
            min_gravity_distance,
        }
    }

    /// Local forward axis of the steering frame in world space.
    pub fn forward(&self) -> Vec3 {
        self.steering * Vec3::Z
    }

    /// Local up axis of the steering frame in world space.
    pub fn up(&self) -> Vec3 {
        self.steering * Vec3::Y
    }

    /// Whether the idle camera/animation should engage.
    pub fn is_idle(&self) -> bool {
        self.idle_ms >= self.config.idle_timeout_ms
    }

    /// Resets or advances the idle timer.
    pub fn track_activity(&mut self, active: bool, dt_ms: f32) {
        if active {
            self.idle_ms = 0.0;
        } else {
            self.idle_ms += dt_ms;
        }
    }

    /// Re-levels the steering frame to the radial up at `position`.
    pub fn reorient(&mut self, position: Vec3) {
        let new_up = local_up(position, self.min_gravity_distance);
        self.steering = reorient_to_local_up(self.steering, self.prev_up, new_up);
        self.prev_up = new_up;
    }

    /// Turns the steering frame, writes the walking velocity and syncs the body
    /// rotation to the steering frame.
    pub fn apply_movement_input(
        &mut self,
        actions: &ActionState,
        physics: &mut PhysicsWorld,
        handle: RigidBodyHandle,
    ) {
        self.steering = turn_steering(
            self.steering,
            actions.is_action_active(Action::TurnLeft),
            actions.is_action_active(Action::TurnRight),
            self.config.turn_rate,
        );
        let forward = self.forward();
        let Some(body) = physics.rigid_body_set.get_mut(handle) else {
            return;
        };
        let velocity = movement_velocity(
            to_vec3(body.linvel()),
            forward,
            actions.is_action_active(Action::MoveForward),
            actions.is_action_active(Action::MoveBack),
            &self.config,
        );
        body.set_linvel(to_vector(velocity), true);
        body.set_rotation(to_rotation(self.steering), true);
    }

    /// Feeds the jump key through the debounce and, when grounded, schedules
    /// a jump `jump_delay_ms` later. Returns `true` on the frame a jump was
    /// consumed.
    pub fn update_jump(&mut self, actions: &ActionState, dt_ms: f32) -> bool {
        self.jump.update(
            actions.is_action_active(Action::Jump),
            actions.action_just_activated(Action::Jump),
            actions.action_just_deactivated(Action::Jump),
            dt_ms,
        );
        if self.jump.requested() && self.grounded && self.pending_jump_ms.is_none() {
            self.jump.consume();
            self.grounded = false;
            self.airborne_from_jump = true;
            self.pending_jump_ms = Some(self.config.jump_delay_ms);
            debug!("jump consumed");
            return true;
        }
        false
    }

    /// Counts down a scheduled jump and applies it once due: the jump velocity
    /// along the body's local up is added to the current velocity.
    pub fn tick_pending_jump(
        &mut self,
        dt_ms: f32,
        physics: &mut PhysicsWorld,
        handle: RigidBodyHandle,
    ) -> bool {
        let Some(remaining) = self.pending_jump_ms.as_mut() else {
            return false;
        };
        *remaining -= dt_ms;
        if *remaining > 0.0 {
            return false;
        }
        self.pending_jump_ms = None;
        let Some(body) = physics.rigid_body_set.get_mut(handle) else {
            return false;
        };
        let up = to_vec3(*body.rotation() * Vector::new(0.0, 1.0, 0.0));
        let velocity = to_vec3(body.linvel()) + up * self.config.jump_velocity;
        body.set_linvel(to_vector(velocity), true);
        self.jumps += 1;
        debug!(%velocity, "jump applied");
        true
    }

    /// Drops any scheduled jump, e.g. when the body leaves the simulation.
    pub fn cancel_pending_jump(&mut self) {
        self.pending_jump_ms = None;
    }

    /// Whether a jump has been consumed but not applied yet.
    pub fn jump_pending(&self) -> bool {
        self.pending_jump_ms.is_some()
    }

    /// Sets the grounded flag if any contact normal supports the body. The
    /// flag is only cleared by a jump.
    pub fn update_grounded(&mut self, normals: &[Vec3]) {
        if self.pending_jump_ms.is_some() {
            return;
        }
        if is_ground_contact(normals, self.up(), self.config.ground_threshold) {
            if !self.grounded {
                debug!("astronaut grounded");
            }
            self.grounded = true;
            self.airborne_from_jump = false;
        }
    }

    /// Picks the animation for this frame from the held actions.
    pub fn select_animation(&mut self, actions: &ActionState) -> AnimationCue {
        let moving_forward = actions.is_action_active(Action::MoveForward);
        let other_motion = [Action::MoveBack, Action::TurnLeft, Action::TurnRight]
            .into_iter()
            .any(|a| actions.is_action_active(a));
        let jump_held = actions.is_action_active(Action::Jump);

        self.animation = if self.airborne_from_jump {
            AnimationCue::Jump
        } else if moving_forward && !jump_held {
            AnimationCue::Run
        } else if other_motion && !jump_held {
            AnimationCue::Walk
        } else if moving_forward || other_motion || jump_held {
            self.animation
        } else if self.is_idle() {
            AnimationCue::IdleLong
        } else {
            AnimationCue::Idle
        };
        self.animation
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use orbit_input::{ActionResolver, InputMap, KeyCode, KeyboardState};

    use super::*;

    fn config() -> PlayerConfig {
        PlayerConfig::default()
    }

    fn actions(keys: &[KeyCode], kb: &mut KeyboardState) -> ActionState {
        let held: HashSet<KeyCode> = keys.iter().copied().collect();
        kb.apply_snapshot(&held);
        let mut state = ActionState::new();
        ActionResolver::resolve(&InputMap::default(), kb, &mut state);
        state
    }

    fn yaw_in_frame(steering: Quat) -> Vec3 {
        steering * Vec3::Z
    }

    #[test]
    fn test_forward_sets_speed_from_rest() {
        let v = movement_velocity(Vec3::ZERO, Vec3::Z, true, false, &config());
        assert!((v - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-6, "got {v}");
    }

    #[test]
    fn test_forward_does_not_reaccelerate_fast_body() {
        let fast = Vec3::new(0.0, -1.0, 9.0);
        let v = movement_velocity(fast, Vec3::Z, true, false, &config());
        assert_eq!(v, fast, "already above walk speed");
    }

    #[test]
    fn test_forward_keeps_lateral_components() {
        let v = movement_velocity(Vec3::new(2.0, -3.0, 1.0), Vec3::Z, true, false, &config());
        assert!((v - Vec3::new(2.0, -3.0, 4.0)).length() < 1e-6, "got {v}");
    }

    #[test]
    fn test_backward_is_slower() {
        let v = movement_velocity(Vec3::ZERO, Vec3::Z, false, true, &config());
        assert!((v.z + 0.8).abs() < 1e-6, "got {v}");
    }

    #[test]
    fn test_repeated_forward_converges() {
        let mut v = Vec3::ZERO;
        for _ in 0..100 {
            v = movement_velocity(v, Vec3::Z, true, false, &config());
        }
        assert!((v.z - 4.0).abs() < 1e-6, "got {v}");
    }

    #[test]
    fn test_turn_rotates_about_local_up() {
        let s = turn_steering(Quat::IDENTITY, true, false, 0.024);
        assert!(((s * Vec3::Y) - Vec3::Y).length() < 1e-6);
        let angle = yaw_in_frame(s).angle_between(Vec3::Z);
        assert!((angle - 0.024).abs() < 1e-5, "angle={angle}");
        assert_eq!(turn_steering(Quat::IDENTITY, true, true, 0.024), Quat::IDENTITY);
    }

    /// Sine of the angle between two steering frames' forward axes.
    fn heading_error(a: Quat, b: Quat) -> f32 {
        (a * Vec3::Z).cross(b * Vec3::Z).length()
    }

    #[test]
    fn test_reorient_frame_step_keeps_heading() {
        let start = Quat::from_rotation_y(0.7);
        let prev_up = Vec3::Y;
        // About one frame of walking at full speed, off the heading axis.
        let new_up = Vec3::new(0.004, 1.0, 0.003).normalize();
        let s = reorient_to_local_up(start, prev_up, new_up);

        let up = s * Vec3::Y;
        assert!((up - new_up).length() < 1e-4, "up={up} expected {new_up}");

        let untwisted = Quat::from_rotation_arc(prev_up, new_up) * start;
        let error = heading_error(s, untwisted);
        assert!(error < 1e-4, "heading drifted by {error}");
    }

    #[test]
    fn test_reorient_keeps_heading_over_a_long_walk() {
        let radius = 16.5;
        let step = 4.0 / 60.0;
        let mut steering = Quat::from_rotation_y(0.7);
        let mut untwisted = steering;
        let mut prev_up = Vec3::Y;
        let mut pos = Vec3::Y * radius;

        for frame in 0..600 {
            // Alternate straight stretches and left turns.
            let turning = (frame / 50) % 2 == 1;
            steering = turn_steering(steering, turning, false, 0.024);
            untwisted = turn_steering(untwisted, turning, false, 0.024);

            pos = (pos + steering * Vec3::Z * step).normalize() * radius;
            let new_up = pos.normalize();
            untwisted = (Quat::from_rotation_arc(prev_up, new_up) * untwisted).normalize();
            steering = reorient_to_local_up(steering, prev_up, new_up);
            prev_up = new_up;

            let up = steering * Vec3::Y;
            assert!((up - new_up).length() < 1e-4, "frame {frame}: up={up} expected {new_up}");
            let error = heading_error(steering, untwisted);
            assert!(error < 1e-4, "frame {frame}: heading drifted by {error}");
        }
    }

    #[test]
    fn test_reorient_walk_around_sphere_tracks_radial_up() {
        let mut character = Character::new(config(), 0.5);
        let radius = 16.5;
        for i in 0..=180 {
            let theta = i as f32 * 0.01;
            let pos = Vec3::new(0.0, theta.cos(), theta.sin()) * radius;
            character.reorient(pos);
            let up = character.up();
            let expected = pos.normalize();
            assert!(
                (up - expected).length() < 1e-3,
                "step {i}: up={up} expected {expected}"
            );
        }
        // Walking along +Z over the pole keeps facing along the motion.
        let forward = character.forward();
        let tangent = Vec3::new(0.0, -(1.8f32).sin(), (1.8f32).cos());
        assert!(forward.dot(tangent) > 0.99, "forward={forward}");
    }

    #[test]
    fn test_reorient_upside_down_uses_fallback() {
        let s = reorient_to_local_up(Quat::IDENTITY, Vec3::Y, Vec3::NEG_Y);
        assert!(((s * Vec3::Y) - Vec3::NEG_Y).length() < 1e-4);
    }

    #[test]
    fn test_reorient_noop_when_up_unchanged() {
        let s = Quat::from_rotation_y(1.0);
        assert_eq!(reorient_to_local_up(s, Vec3::Y, Vec3::Y), s);
    }

    #[test]
    fn test_ground_contact_threshold() {
        assert!(is_ground_contact(&[Vec3::new(0.0, 0.9, 0.1)], Vec3::Y, 0.5));
        assert!(!is_ground_contact(&[Vec3::X, Vec3::NEG_Y], Vec3::Y, 0.5));
        assert!(!is_ground_contact(&[], Vec3::Y, 0.5));
    }

    #[test]
    fn test_shadow_fades_with_height() {
        assert_eq!(shadow_opacity(Vec3::new(0.0, 15.0, 0.0)), 1.0);
        assert!((shadow_opacity(Vec3::new(0.0, 16.5, 0.0)) - 0.55).abs() < 1e-5);
        assert_eq!(shadow_opacity(Vec3::new(0.0, 30.0, 0.0)), 0.0);
    }

    #[test]
    fn test_jump_requires_ground_and_fires_once() {
        let mut kb = KeyboardState::new();
        let mut character = Character::new(config(), 0.5);
        let dt = 1000.0 / 60.0;

        // Airborne: nothing happens.
        assert!(!character.update_jump(&actions(&[KeyCode::Space], &mut kb), dt));

        character.grounded = true;
        assert!(character.update_jump(&actions(&[KeyCode::Space], &mut kb), dt));
        assert!(!character.grounded, "jump clears grounded immediately");
        assert!(character.jump_pending());

        // Landing while the key is still held does not jump again.
        character.cancel_pending_jump();
        character.update_grounded(&[Vec3::Y]);
        for _ in 0..60 {
            assert!(!character.update_jump(&actions(&[KeyCode::Space], &mut kb), dt));
        }
    }

    #[test]
    fn test_pending_jump_adds_up_velocity() {
        let mut physics = PhysicsWorld::new(0.0, 1.0 / 60.0);
        let spawned = astronaut_blueprint(astronaut_spawn()).spawn(&mut physics);
        physics.rigid_body_set[spawned.body].set_linvel(Vector::new(0.0, 0.0, 2.0), true);

        let mut kb = KeyboardState::new();
        let mut character = Character::new(config(), 0.5);
        character.grounded = true;
        assert!(character.update_jump(&actions(&[KeyCode::Space], &mut kb), 16.0));

        let mut applied_after = None;
        for frame in 1..=20 {
            if character.tick_pending_jump(16.0, &mut physics, spawned.body) {
                applied_after = Some(frame);
                break;
            }
        }
        assert_eq!(applied_after, Some(13), "200 ms at 16 ms per frame");
        let v = physics.body_linvel(spawned.body).unwrap();
        assert!((v - Vec3::new(0.0, 4.0, 2.0)).length() < 1e-5, "additive jump, got {v}");
    }

    #[test]
    fn test_astronaut_has_unit_mass() {
        let mut physics = PhysicsWorld::new(0.0, 1.0 / 60.0);
        let spawned = astronaut_blueprint(astronaut_spawn()).spawn(&mut physics);
        assert_eq!(spawned.colliders.len(), 4);
        let mass = physics.rigid_body_set[spawned.body].mass();
        assert!((mass - 1.0).abs() < 1e-5, "mass={mass}");
    }

    #[test]
    fn test_animation_selection() {
        let mut kb = KeyboardState::new();
        let mut character = Character::new(config(), 0.5);
        assert_eq!(
            character.select_animation(&actions(&[KeyCode::KeyW], &mut kb)),
            AnimationCue::Run
        );
        assert_eq!(
            character.select_animation(&actions(&[KeyCode::KeyA], &mut kb)),
            AnimationCue::Walk
        );
        assert_eq!(
            character.select_animation(&actions(&[], &mut kb)),
            AnimationCue::Idle
        );
        character.track_activity(false, 60_000.0);
        assert_eq!(
            character.select_animation(&actions(&[], &mut kb)),
            AnimationCue::IdleLong
        );
    }
}
