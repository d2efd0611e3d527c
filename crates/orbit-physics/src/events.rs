//! Pair events collected during a step, and contact-normal queries.
//!
//! The simulation follows a flag-then-consume pattern: Rapier reports pair
//! changes through a channel while it steps, [`PhysicsWorld::step`] drains them
//! into a [`PhysicsEvents`] list, and gameplay code turns them into flags
//! after the step has returned.

use glam::Vec3;
use rapier3d::prelude::*;

use crate::{PhysicsWorld, to_vec3};

/// A pair of colliders that started or stopped touching (or overlapping, for
/// sensors) during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderPairEvent {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    pub started: bool,
    pub sensor: bool,
    /// The pair ended because one collider was removed from the world.
    pub removed: bool,
}

impl ColliderPairEvent {
    /// If `collider` is part of the pair, returns the other collider.
    pub fn other(&self, collider: ColliderHandle) -> Option<ColliderHandle> {
        if self.collider1 == collider {
            Some(self.collider2)
        } else if self.collider2 == collider {
            Some(self.collider1)
        } else {
            None
        }
    }

    /// Whether the event is exactly the pair `(a, b)` in either order.
    pub fn is_pair(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        self.other(a) == Some(b)
    }
}

impl From<CollisionEvent> for ColliderPairEvent {
    fn from(event: CollisionEvent) -> Self {
        Self {
            collider1: event.collider1(),
            collider2: event.collider2(),
            started: event.started(),
            sensor: event.sensor(),
            removed: event.removed(),
        }
    }
}

/// Pair events of one physics step, in the order Rapier reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsEvents {
    pairs: Vec<ColliderPairEvent>,
}

impl PhysicsEvents {
    pub fn push(&mut self, event: impl Into<ColliderPairEvent>) {
        self.pairs.push(event.into());
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColliderPairEvent> {
        self.pairs.iter()
    }

    /// Appends the events of a later step.
    pub fn extend(&mut self, other: PhysicsEvents) {
        self.pairs.extend(other.pairs);
    }

    /// Final overlap state of the pair `(a, b)` after these events, if any
    /// event mentions it. Removal events are skipped.
    pub fn pair_state(&self, a: ColliderHandle, b: ColliderHandle) -> Option<bool> {
        self.pairs
            .iter()
            .filter(|e| !e.removed && e.is_pair(a, b))
            .last()
            .map(|e| e.started)
    }

    /// Number of times the pair `(a, b)` started touching.
    pub fn pair_starts(&self, a: ColliderHandle, b: ColliderHandle) -> usize {
        self.pairs
            .iter()
            .filter(|e| e.started && e.is_pair(a, b))
            .count()
    }
}

/// Normals of the active contacts of `collider`, each pointing from the other
/// collider toward `collider`. Standing on flat ground yields roughly the
/// ground's up direction.
pub fn contact_normals(physics: &PhysicsWorld, collider: ColliderHandle) -> Vec<Vec3> {
    let mut normals = Vec::new();
    for pair in physics.narrow_phase.contact_pairs_with(collider) {
        if !pair.has_any_active_contact() {
            continue;
        }
        // Manifold normals point from collider1 to collider2.
        let sign = if pair.collider1 == collider { -1.0 } else { 1.0 };
        for manifold in &pair.manifolds {
            if manifold.points.is_empty() {
                continue;
            }
            normals.push(to_vec3(manifold.data.normal) * sign);
        }
    }
    normals
}

/// Whether two colliders currently have an active contact.
pub fn in_contact(physics: &PhysicsWorld, a: ColliderHandle, b: ColliderHandle) -> bool {
    physics
        .narrow_phase
        .contact_pair(a, b)
        .is_some_and(|pair| pair.has_any_active_contact())
}
