//! Central gravity: every dynamic body is pulled toward the planet center.
//!
//! The engine's own world gravity stays at `(0, -g_force, 0)`. Each body gets a
//! per-step force of `g_force * g_force_scale` toward the origin plus
//! `mass * g_force` along world +Y, which cancels the engine term so the net
//! acceleration is purely radial.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;
use tracing::warn;

use crate::{BodyHandle, PhysicsWorld, to_vec3, to_vector};

/// Marks a prop entity whose body receives central gravity every step.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct CentralGravity;

/// Tunables of the central gravity field.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct GravitySettings {
    /// Base constant; also the magnitude of the engine's world gravity.
    pub g_force: f32,
    /// Multiplier turning `g_force` into the radial pull.
    pub g_force_scale: f32,
    /// Positions closer to the center than this are normalized as if they were
    /// this far away.
    pub min_distance: f32,
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            g_force: 0.01,
            g_force_scale: 700.0,
            min_distance: 0.5,
        }
    }
}

impl GravitySettings {
    /// Magnitude of the radial pull.
    pub fn radial_magnitude(&self) -> f32 {
        self.g_force * self.g_force_scale
    }

    /// Gravity vector the engine itself must apply for the correction term to cancel.
    pub fn engine_gravity(&self) -> Vec3 {
        Vec3::new(0.0, -self.g_force, 0.0)
    }
}

/// Pull direction at `position`, pointing toward the planet center.
///
/// Unit length outside `min_distance`; inside it the position is divided by
/// `min_distance` instead of its own length, so the pull fades out toward the
/// center instead of flipping. At the exact center it falls back to world down.
pub fn gravity_direction(position: Vec3, min_distance: f32) -> Vec3 {
    let distance = position.length();
    if distance <= f32::EPSILON {
        return Vec3::NEG_Y;
    }
    -position / distance.max(min_distance)
}

/// Local "up" at `position`: the normalized negated gravity direction.
pub fn local_up(position: Vec3, min_distance: f32) -> Vec3 {
    (-gravity_direction(position, min_distance)).normalize_or(Vec3::Y)
}

/// Force to apply to a body of `mass` at `position`.
pub fn central_gravity_force(position: Vec3, mass: f32, settings: &GravitySettings) -> Vec3 {
    let mut force = gravity_direction(position, settings.min_distance) * settings.radial_magnitude();
    force.y += mass * settings.g_force;
    force
}

/// Replaces the body's accumulated force with its central gravity force.
///
/// Rapier keeps user forces and torques across steps, so both accumulators are
/// reset first; anything else (thrust) must be added after this call. Returns the force
/// written, or `None` for missing or non-dynamic bodies.
pub fn apply_central_gravity(
    physics: &mut PhysicsWorld,
    handle: RigidBodyHandle,
    settings: &GravitySettings,
) -> Option<Vec3> {
    let body = physics.rigid_body_set.get_mut(handle)?;
    if !body.is_dynamic() {
        return None;
    }
    let position = to_vec3(body.translation());
    if !position.is_finite() {
        warn!(?handle, "body position is not finite, skipping gravity");
        return None;
    }
    let force = central_gravity_force(position, body.mass(), settings);
    body.reset_forces(false);
    body.reset_torques(false);
    body.add_force(to_vector(force), true);
    Some(force)
}

/// Applies central gravity to every live body tagged with [`CentralGravity`].
pub fn central_gravity_system(
    mut physics: ResMut<PhysicsWorld>,
    settings: Res<GravitySettings>,
    query: Query<&BodyHandle, With<CentralGravity>>,
) {
    for handle in query.iter() {
        apply_central_gravity(&mut physics, handle.0, &settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::unit_ball;

    #[test]
    fn test_gravity_points_toward_planet_center() {
        let positions = [
            (Vec3::new(16.5, 0.0, 0.0), Vec3::NEG_X),
            (Vec3::new(0.0, 16.5, 0.0), Vec3::NEG_Y),
            (Vec3::new(0.0, 0.0, -30.0), Vec3::Z),
            (Vec3::new(0.0, -17.0, 0.0), Vec3::Y),
        ];
        for (pos, expected) in positions {
            let dir = gravity_direction(pos, 0.5);
            assert!(
                (dir - expected).length() < 1e-6,
                "At {pos}, expected {expected}, got {dir}"
            );
        }
    }

    #[test]
    fn test_force_at_spawn_point() {
        let settings = GravitySettings::default();
        let force = central_gravity_force(Vec3::new(0.0, 16.5, 0.0), 1.0, &settings);
        // Radial 7 downward, plus the 0.01 correction upward.
        assert!((force - Vec3::new(0.0, -6.99, 0.0)).length() < 1e-5, "got {force}");
    }

    #[test]
    fn test_center_falls_back_to_world_down() {
        let settings = GravitySettings::default();
        let force = central_gravity_force(Vec3::ZERO, 2.0, &settings);
        assert!(force.is_finite());
        assert!((force - Vec3::new(0.0, -7.0 + 0.02, 0.0)).length() < 1e-5, "got {force}");
    }

    #[test]
    fn test_pull_fades_inside_min_distance() {
        let dir = gravity_direction(Vec3::new(0.25, 0.0, 0.0), 0.5);
        assert!(dir.is_finite());
        assert!((dir - Vec3::new(-0.5, 0.0, 0.0)).length() < 1e-6, "got {dir}");
        let up = local_up(Vec3::new(0.25, 0.0, 0.0), 0.5);
        assert!((up - Vec3::X).length() < 1e-6, "up stays unit, got {up}");
    }

    #[test]
    fn test_scale_is_linear() {
        let mut settings = GravitySettings::default();
        let pos = Vec3::new(3.0, 4.0, 12.0);
        let base = central_gravity_force(pos, 0.0, &settings);
        settings.g_force_scale *= 2.0;
        let doubled = central_gravity_force(pos, 0.0, &settings);
        assert!((doubled - base * 2.0).length() < 1e-5);
    }

    #[test]
    fn test_engine_gravity_is_cancelled_numerically() {
        let settings = GravitySettings::default();
        let dt = 1.0 / 60.0;
        let mut physics = PhysicsWorld::new(settings.g_force, dt);
        // Off the Y axis so any leftover engine gravity shows up in linvel.y.
        let handle = unit_ball(&mut physics, Vec3::new(20.0, 0.0, 0.0));

        let steps = 10;
        for _ in 0..steps {
            apply_central_gravity(&mut physics, handle, &settings).unwrap();
            physics.step();
        }
        let v = physics.body_linvel(handle).unwrap();
        let expected_x = -settings.radial_magnitude() * dt * steps as f32;
        assert!(
            (v.x - expected_x).abs() < 1e-3,
            "radial speed {} expected {expected_x}",
            v.x
        );
        assert!(v.y.abs() < 1e-4, "engine gravity leaked: vy={}", v.y);
    }

    #[test]
    fn test_forces_do_not_accumulate_across_steps() {
        let settings = GravitySettings::default();
        let mut physics = PhysicsWorld::new(settings.g_force, 1.0 / 60.0);
        let handle = unit_ball(&mut physics, Vec3::new(0.0, 16.5, 0.0));
        for _ in 0..3 {
            apply_central_gravity(&mut physics, handle, &settings);
        }
        let force = to_vec3(physics.rigid_body_set[handle].user_force());
        assert!((force.y + 6.99).abs() < 1e-4, "force written once, got {force}");
    }

    #[test]
    fn test_system_only_touches_tagged_bodies() {
        let settings = GravitySettings::default();
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(settings.g_force, 1.0 / 60.0);
        let tagged = unit_ball(&mut physics, Vec3::new(0.0, 16.5, 0.0));
        let untagged = unit_ball(&mut physics, Vec3::new(0.0, -16.5, 0.0));
        world.insert_resource(physics);
        world.insert_resource(settings);
        world.spawn((BodyHandle(tagged), CentralGravity));
        world.spawn(BodyHandle(untagged));

        let mut schedule = Schedule::default();
        schedule.add_systems(central_gravity_system);
        schedule.run(&mut world);

        let physics = world.resource::<PhysicsWorld>();
        assert!(to_vec3(physics.rigid_body_set[tagged].user_force()).length() > 6.0);
        assert_eq!(to_vec3(physics.rigid_body_set[untagged].user_force()), Vec3::ZERO);
    }
}
