//! Physics integration: rigid bodies, trigger volumes, central gravity and world stepping.
//!
//! Wraps the Rapier 3D physics engine behind a single [`PhysicsWorld`] resource
//! that owns all simulation state and exposes a minimal capability surface:
//! insert a body, attach a collider, remove a body, step.

pub mod events;
pub mod gravity;
pub mod parking;

use bevy_ecs::prelude::*;
use std::sync::Mutex;
use std::sync::mpsc::Receiver;
use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

pub use events::{ColliderPairEvent, PhysicsEvents};
pub use gravity::{
    CentralGravity, GravitySettings, apply_central_gravity, central_gravity_force,
    central_gravity_system,
};
pub use parking::{BodyBlueprint, ColliderPart, ParkedBody, SpawnedBody};
pub use rapier3d;

/// Name of the material colliders get when none is requested.
pub const DEFAULT_MATERIAL: &str = "default";

/// Friction and restitution used for every contact against a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: 1.5,
            restitution: 0.3,
        }
    }
}

/// Component that stores a Rapier rigid body handle on an ECS entity.
///
/// Removed while the body is parked outside the simulation.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyHandle(pub RigidBodyHandle);

/// Nearest collider hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub distance: f32,
    pub point: Vec3,
}

/// Central physics simulation resource owning all Rapier state.
///
/// Insert into the Bevy ECS world at startup. Systems read via `Res<PhysicsWorld>`
/// for queries or mutate via `ResMut<PhysicsWorld>` to add/remove bodies.
#[derive(Resource)]
pub struct PhysicsWorld {
    /// Engine-wide gravity, applied to every dynamic body as an acceleration.
    pub gravity: Vector,
    /// Timestep and solver configuration.
    pub integration_parameters: IntegrationParameters,
    /// The main simulation pipeline.
    pub physics_pipeline: PhysicsPipeline,
    /// Tracks sleeping/awake body islands.
    pub island_manager: IslandManager,
    /// Broad-phase collision detection (also provides query pipeline).
    pub broad_phase: BroadPhaseBvh,
    /// Narrow-phase collision detection (contact manifolds).
    pub narrow_phase: NarrowPhase,
    /// All rigid bodies in the simulation.
    pub rigid_body_set: RigidBodySet,
    /// All colliders in the simulation.
    pub collider_set: ColliderSet,
    /// Impulse-based joints.
    pub impulse_joint_set: ImpulseJointSet,
    /// Multibody joints.
    pub multibody_joint_set: MultibodyJointSet,
    /// Continuous collision detection solver.
    pub ccd_solver: CCDSolver,
    materials: FxHashMap<String, ContactMaterial>,
    event_collector: ChannelEventCollector,
    collision_recv: Mutex<Receiver<CollisionEvent>>,
    contact_force_recv: Mutex<Receiver<ContactForceEvent>>,
}

impl PhysicsWorld {
    /// Creates a physics world whose engine gravity is `(0, -g_force, 0)`,
    /// stepping `fixed_dt` seconds per call to [`step`](Self::step).
    pub fn new(g_force: f32, fixed_dt: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: fixed_dt,
            ..Default::default()
        };
        let (collision_send, collision_recv) = std::sync::mpsc::channel();
        let (contact_force_send, contact_force_recv) = std::sync::mpsc::channel();

        let mut materials = FxHashMap::default();
        materials.insert(DEFAULT_MATERIAL.to_string(), ContactMaterial::default());

        Self {
            gravity: Vector::new(0.0, -g_force, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            materials,
            event_collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv: Mutex::new(collision_recv),
            contact_force_recv: Mutex::new(contact_force_recv),
        }
    }

    /// Advances the simulation by one fixed timestep and returns the pair
    /// events it produced.
    ///
    /// Events are only collected here; callers react to them after the step
    /// so no body is touched while Rapier iterates its contact graph.
    pub fn step(&mut self) -> PhysicsEvents {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &self.event_collector,
        );

        let mut events = PhysicsEvents::default();
        let collision_recv = self.collision_recv.get_mut().unwrap();
        while let Ok(event) = collision_recv.try_recv() {
            events.push(event);
        }
        // Contact force events are not requested by any collider; drain so the
        // channel never grows.
        while self.contact_force_recv.get_mut().unwrap().try_recv().is_ok() {}
        trace!(pairs = events.len(), "physics step");
        events
    }

    /// Sets the world gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vector::new(x, y, z);
    }

    /// Returns the current gravity as `(x, y, z)`.
    pub fn gravity(&self) -> (f32, f32, f32) {
        (self.gravity.x, self.gravity.y, self.gravity.z)
    }

    /// Registers (or replaces) a named contact material.
    pub fn register_material(&mut self, name: &str, material: ContactMaterial) {
        self.materials.insert(name.to_string(), material);
    }

    /// Looks up a material, falling back to the default one.
    pub fn material(&self, name: &str) -> ContactMaterial {
        match self.materials.get(name) {
            Some(material) => *material,
            None => {
                warn!(material = name, "unknown contact material, using default");
                self.materials
                    .get(DEFAULT_MATERIAL)
                    .copied()
                    .unwrap_or_default()
            }
        }
    }

    /// Adds a rigid body.
    pub fn insert_body(&mut self, body: impl Into<RigidBody>) -> RigidBodyHandle {
        self.rigid_body_set.insert(body)
    }

    /// Attaches a collider to `parent`, applying the named material's friction
    /// and restitution.
    pub fn insert_collider(
        &mut self,
        collider: ColliderBuilder,
        material: &str,
        parent: RigidBodyHandle,
    ) -> ColliderHandle {
        let material = self.material(material);
        let collider = collider
            .friction(material.friction)
            .restitution(material.restitution)
            .build();
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Removes a body together with its attached colliders.
    /// Returns `false` if the handle was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Whether the body is currently part of the simulation.
    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    /// World position of a body.
    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_vec3(body.translation()))
    }

    /// World orientation of a body.
    pub fn body_rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_quat(*body.rotation()))
    }

    /// Linear velocity of a body.
    pub fn body_linvel(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_vec3(body.linvel()))
    }

    /// Casts a ray and returns the nearest solid hit, ignoring sensors and the
    /// optional excluded body.
    pub fn cast_ray(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        let dir = dir.try_normalize()?;
        let mut filter = QueryFilter::new().exclude_sensors();
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle);
        }
        let query_pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.rigid_body_set,
            &self.collider_set,
            filter,
        );
        let ray = Ray::new(to_vector(origin), to_vector(dir));
        let (collider, distance) = query_pipeline.cast_ray(&ray, max_distance, true)?;
        Some(RayHit {
            collider,
            distance,
            point: origin + dir * distance,
        })
    }
}

/// Converts a Rapier vector into the workspace `glam` type.
///
/// Rapier may depend on a different `glam` release, so conversion goes
/// through components.
pub fn to_vec3(v: Vector) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Converts a workspace vector into Rapier's vector type.
pub fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

/// Converts a Rapier rotation into the workspace quaternion.
pub fn to_quat(q: rapier3d::math::Rotation) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

/// Converts a workspace quaternion into Rapier's rotation type.
pub fn to_rotation(q: Quat) -> rapier3d::math::Rotation {
    rapier3d::math::Rotation::from_xyzw(q.x, q.y, q.z, q.w)
}

/// Scaled-axis form of a rotation, as accepted by Rapier's builders.
pub fn to_axis_angle(q: Quat) -> Vector {
    to_vector(q.normalize().to_scaled_axis())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Dynamic ball of unit mass at `pos`.
    pub fn unit_ball(physics: &mut PhysicsWorld, pos: Vec3) -> RigidBodyHandle {
        let handle = physics.insert_body(RigidBodyBuilder::dynamic().translation(to_vector(pos)));
        physics.insert_collider(
            ColliderBuilder::ball(0.5).mass(1.0),
            DEFAULT_MATERIAL,
            handle,
        );
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::unit_ball;

    #[test]
    fn test_physics_world_initializes() {
        let world = PhysicsWorld::new(0.01, 1.0 / 60.0);
        assert_eq!(world.rigid_body_set.len(), 0);
        assert_eq!(world.collider_set.len(), 0);
        assert_eq!(world.gravity(), (0.0, -0.01, 0.0));
    }

    #[test]
    fn test_gravity_set_custom() {
        let mut world = PhysicsWorld::new(0.01, 1.0 / 60.0);
        world.set_gravity(0.0, -1.62, 0.0);
        assert_eq!(world.gravity(), (0.0, -1.62, 0.0));
    }

    #[test]
    fn test_step_advances_simulation() {
        let mut world = PhysicsWorld::new(9.81, 1.0 / 60.0);
        let handle = unit_ball(&mut world, Vec3::new(0.0, 10.0, 0.0));
        for _ in 0..60 {
            world.step();
        }
        let pos = world.body_translation(handle).unwrap();
        assert!(pos.y < 10.0, "Body should have fallen: y={}", pos.y);
    }

    #[test]
    fn test_insert_remove_contains() {
        let mut world = PhysicsWorld::new(0.01, 1.0 / 60.0);
        let handle = unit_ball(&mut world, Vec3::ZERO);
        assert!(world.contains_body(handle));
        assert_eq!(world.collider_set.len(), 1);

        assert!(world.remove_body(handle));
        assert!(!world.contains_body(handle));
        assert_eq!(world.collider_set.len(), 0, "colliders go with the body");
        assert!(!world.remove_body(handle), "second removal is a no-op");
    }

    #[test]
    fn test_material_applied_to_collider() {
        let mut world = PhysicsWorld::new(0.01, 1.0 / 60.0);
        world.register_material(
            "ice",
            ContactMaterial {
                friction: 0.05,
                restitution: 0.0,
            },
        );
        let body = world.insert_body(RigidBodyBuilder::fixed());
        let ice = world.insert_collider(ColliderBuilder::cuboid(1.0, 1.0, 1.0), "ice", body);
        let plain = world.insert_collider(ColliderBuilder::ball(1.0), DEFAULT_MATERIAL, body);
        assert_eq!(world.collider_set[ice].friction(), 0.05);
        assert_eq!(world.collider_set[plain].friction(), 1.5);
        assert_eq!(world.collider_set[plain].restitution(), 0.3);
    }

    #[test]
    fn test_unknown_material_falls_back_to_default() {
        let world = PhysicsWorld::new(0.01, 1.0 / 60.0);
        assert_eq!(world.material("rubber"), ContactMaterial::default());
    }

    #[test]
    fn test_cast_ray_hits_body() {
        let mut world = PhysicsWorld::new(0.0, 1.0 / 60.0);
        let target = world.insert_body(RigidBodyBuilder::fixed().translation(Vector::new(0.0, 0.0, 10.0)));
        let collider = world.insert_collider(ColliderBuilder::ball(1.0), DEFAULT_MATERIAL, target);
        world.step();

        let hit = world
            .cast_ray(Vec3::ZERO, Vec3::Z, 100.0, None)
            .expect("ray should hit the ball");
        assert_eq!(hit.collider, collider);
        assert!((hit.distance - 9.0).abs() < 1e-3, "distance={}", hit.distance);
        assert!(world.cast_ray(Vec3::ZERO, Vec3::X, 100.0, None).is_none());
    }

    #[test]
    fn test_rotation_conversion_roundtrip() {
        let q = Quat::from_rotation_x(std::f32::consts::PI);
        let back = to_quat(to_rotation(q));
        assert!(q.dot(back).abs() > 0.9999);
    }
}
