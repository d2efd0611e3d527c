//! Which mode triggers contain the astronaut.
//!
//! While the astronaut body is simulated, overlap follows the sensor pair
//! events of each substep. While it is parked it has no colliders, so its
//! blueprint shapes are tested at the parked pose against each sensor.

use bevy_ecs::prelude::*;
use orbit_physics::rapier3d::prelude::ColliderHandle;
use orbit_physics::{BodyHandle, PhysicsEvents, PhysicsWorld};
use orbit_player::Character;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::mode::Overlaps;
use crate::props::{Blueprint, Parked, PropColliders, TriggerVolume};
use crate::systems::StepEvents;

/// Sensors currently overlapped by one of the astronaut's colliders.
#[derive(Resource, Debug, Clone, Default)]
pub struct TriggerContacts {
    pairs: FxHashSet<(ColliderHandle, ColliderHandle)>,
}

impl TriggerContacts {
    /// Folds one step's events into the pair set. Only pairs between one of
    /// `bodies` and one of `sensors` are kept.
    pub fn record(&mut self, events: &PhysicsEvents, bodies: &[ColliderHandle], sensors: &[ColliderHandle]) {
        for event in events.iter().filter(|e| e.sensor) {
            let pair = if bodies.contains(&event.collider1) && sensors.contains(&event.collider2) {
                (event.collider1, event.collider2)
            } else if bodies.contains(&event.collider2) && sensors.contains(&event.collider1) {
                (event.collider2, event.collider1)
            } else {
                continue;
            };
            if event.started && !event.removed {
                self.pairs.insert(pair);
            } else {
                self.pairs.remove(&pair);
            }
        }
    }

    /// Whether any astronaut collider overlaps `sensor`.
    pub fn overlaps(&self, sensor: ColliderHandle) -> bool {
        self.pairs.iter().any(|(_, s)| *s == sensor)
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Substep: updates overlaps from the sensor events of the step that just ran.
pub fn trigger_overlap_system(
    events: Res<StepEvents>,
    mut contacts: ResMut<TriggerContacts>,
    mut overlaps: ResMut<Overlaps>,
    astronaut: Query<&PropColliders, (With<Character>, With<BodyHandle>)>,
    triggers: Query<&TriggerVolume>,
) {
    let Ok(colliders) = astronaut.get_single() else {
        return;
    };
    let sensors: Vec<ColliderHandle> = triggers
        .iter()
        .filter(|t| t.mode.is_some())
        .filter_map(|t| t.sensor)
        .collect();
    contacts.record(&events.last, &colliders.0, &sensors);

    for trigger in triggers.iter() {
        if let (Some(mode), Some(sensor)) = (trigger.mode, trigger.sensor) {
            overlaps.set(mode, contacts.overlaps(sensor));
        }
    }
    trace!(?overlaps, "trigger overlaps");
}

/// Pre-step: tests the astronaut's collider shapes, placed at the parked
/// pose, against every mode sensor. Uses the same shapes that produced the
/// sensor events before parking.
pub fn parked_overlap_system(
    physics: Res<PhysicsWorld>,
    mut overlaps: ResMut<Overlaps>,
    astronaut: Query<(&Parked, &Blueprint), With<Character>>,
    triggers: Query<&TriggerVolume>,
) {
    let Ok((parked, blueprint)) = astronaut.get_single() else {
        return;
    };
    for trigger in triggers.iter() {
        let Some(mode) = trigger.mode else {
            continue;
        };
        let inside = trigger
            .sensor
            .is_some_and(|sensor| blueprint.0.intersects_at(&physics, &parked.0, sensor));
        overlaps.set(mode, inside);
    }
}
