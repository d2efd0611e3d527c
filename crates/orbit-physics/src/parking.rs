//! Taking bodies out of the simulation and putting them back.
//!
//! A parked body is removed from Rapier entirely (so it produces no contacts
//! and no trigger events) and only its pose and velocities are kept. It is
//! rebuilt from the [`BodyBlueprint`] it was created from.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use tracing::debug;

use crate::{PhysicsWorld, to_axis_angle, to_quat, to_rotation, to_vec3, to_vector};

/// Pose and velocities of a body that is currently out of the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkedBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

impl ParkedBody {
    /// Parked pose at rest.
    pub fn at(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
        }
    }

    /// Removes `handle` and its colliders from the world, keeping its state.
    /// Returns `None` if the body was not in the world.
    pub fn park(physics: &mut PhysicsWorld, handle: RigidBodyHandle) -> Option<Self> {
        let body = physics.rigid_body_set.get(handle)?;
        let parked = Self {
            position: to_vec3(body.translation()),
            rotation: to_quat(*body.rotation()),
            linvel: to_vec3(body.linvel()),
            angvel: to_vec3(body.angvel()),
        };
        physics.remove_body(handle);
        debug!(?handle, position = %parked.position, "body parked");
        Some(parked)
    }
}

/// One collider of a blueprint.
#[derive(Clone)]
pub struct ColliderPart {
    pub builder: ColliderBuilder,
    pub material: &'static str,
}

impl ColliderPart {
    pub fn new(builder: ColliderBuilder, material: &'static str) -> Self {
        Self { builder, material }
    }
}

/// Handles produced by [`BodyBlueprint::spawn`], colliders in blueprint order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedBody {
    pub body: RigidBodyHandle,
    pub colliders: Vec<ColliderHandle>,
}

/// Everything needed to (re)build a body: the body builder and its colliders.
#[derive(Clone)]
pub struct BodyBlueprint {
    pub body: RigidBodyBuilder,
    pub colliders: Vec<ColliderPart>,
}

impl BodyBlueprint {
    pub fn new(body: RigidBodyBuilder) -> Self {
        Self {
            body,
            colliders: Vec::new(),
        }
    }

    /// Adds a collider.
    pub fn with_collider(mut self, builder: ColliderBuilder, material: &'static str) -> Self {
        self.colliders.push(ColliderPart::new(builder, material));
        self
    }

    /// Inserts the body at the blueprint's own pose.
    pub fn spawn(&self, physics: &mut PhysicsWorld) -> SpawnedBody {
        self.insert(physics, self.body.clone())
    }

    /// Re-inserts the body at a parked pose with the parked velocities.
    pub fn restore(&self, physics: &mut PhysicsWorld, parked: &ParkedBody) -> SpawnedBody {
        let builder = self
            .body
            .clone()
            .translation(to_vector(parked.position))
            .rotation(to_axis_angle(parked.rotation))
            .linvel(to_vector(parked.linvel))
            .angvel(to_vector(parked.angvel));
        let spawned = self.insert(physics, builder);
        debug!(handle = ?spawned.body, position = %parked.position, "body restored");
        spawned
    }

    /// Whether any blueprint collider, placed at the parked pose, intersects
    /// the live collider `other`. Missing colliders never intersect.
    pub fn intersects_at(
        &self,
        physics: &PhysicsWorld,
        parked: &ParkedBody,
        other: ColliderHandle,
    ) -> bool {
        let Some(other) = physics.collider_set.get(other) else {
            return false;
        };
        let pose = Pose::from_parts(to_vector(parked.position), to_rotation(parked.rotation));
        self.colliders.iter().any(|part| {
            let part_pose = pose * part.builder.position;
            rapier3d::parry::query::intersection_test(
                &part_pose,
                &*part.builder.shape,
                other.position(),
                other.shape(),
            )
            .unwrap_or(false)
        })
    }

    fn insert(&self, physics: &mut PhysicsWorld, builder: RigidBodyBuilder) -> SpawnedBody {
        let body = physics.insert_body(builder);
        let colliders = self
            .colliders
            .iter()
            .map(|part| physics.insert_collider(part.builder.clone(), part.material, body))
            .collect();
        SpawnedBody { body, colliders }
    }
}
