//! Frame resources and the systems run by [`SimSchedules`](crate::schedule::SimSchedules).

use bevy_ecs::prelude::*;
use glam::Vec3;
use orbit_input::{Action, InputState};
use orbit_physics::events::contact_normals;
use orbit_physics::gravity::local_up;
use orbit_physics::{BodyHandle, GravitySettings, ParkedBody, PhysicsEvents, PhysicsWorld, to_vector};
use orbit_player::{CameraRig, Character, FollowInput, VehicleController, VehicleInput, chase_marker};
use tracing::{debug, trace, warn};

use crate::mode::{ModeMachine, Mode, Overlaps, Transition, shelf_signal};
use crate::props::{
    Blueprint, Bobbing, CameraMarker, Hidden, Parked, Prop, PropColliders, PropKind, SceneIndex,
};
use crate::triggers::TriggerContacts;

/// Resolved input of the current frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct PlayerInput(pub InputState);

impl PlayerInput {
    /// Any key held or pointer moved this frame.
    pub fn any_activity(&self) -> bool {
        self.0.keyboard.any_activity() || self.0.pointer.moved()
    }
}

/// Frame counter and wall-clock time fed to the schedules.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameClock {
    pub frame: u64,
    pub dt_ms: f32,
    pub elapsed_s: f32,
}

impl FrameClock {
    pub fn advance(&mut self, dt_ms: f32) {
        self.frame += 1;
        self.dt_ms = dt_ms;
        self.elapsed_s += dt_ms / 1000.0;
    }
}

/// Pair events of the current frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct StepEvents {
    /// Every substep of the frame, in order.
    pub frame: PhysicsEvents,
    /// The substep that ran last.
    pub last: PhysicsEvents,
}

impl StepEvents {
    pub fn record(&mut self, events: PhysicsEvents) {
        self.frame.extend(events.clone());
        self.last = events;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Projection used for picking.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ViewParams {
    pub fov_y: f32,
    pub aspect: f32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            fov_y: 45f32.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }
}

/// Prop under the pointer while inspecting.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hover(pub Option<PropKind>);

/// Rays longer than this never pick anything.
const PICK_DISTANCE: f32 = 100.0;

fn astronaut_position(
    physics: &PhysicsWorld,
    body: Option<&BodyHandle>,
    parked: Option<&Parked>,
) -> Option<Vec3> {
    match (body, parked) {
        (Some(body), _) => physics.body_translation(body.0),
        (None, Some(parked)) => Some(parked.0.position),
        (None, None) => None,
    }
}

/// Moves the kinematic props along their bobbing paths.
pub fn kinematic_bob_system(
    clock: Res<FrameClock>,
    mut physics: ResMut<PhysicsWorld>,
    astronaut: Query<(Option<&BodyHandle>, Option<&Parked>), With<Character>>,
    bobbing: Query<(&Bobbing, &BodyHandle)>,
) {
    let astronaut = astronaut
        .get_single()
        .ok()
        .and_then(|(body, parked)| astronaut_position(&physics, body, parked));
    for (bob, body) in bobbing.iter() {
        let target = bob.position_at(clock.elapsed_s, astronaut);
        if let Some(body) = physics.rigid_body_set.get_mut(body.0) {
            body.set_next_kinematic_translation(to_vector(target));
        }
    }
}

/// Evaluates the mode machine and carries out the resulting transition.
#[allow(clippy::too_many_arguments)]
pub fn mode_system(
    mut commands: Commands,
    input: Res<PlayerInput>,
    overlaps: Res<Overlaps>,
    settings: Res<GravitySettings>,
    index: Res<SceneIndex>,
    mut machine: ResMut<ModeMachine>,
    mut physics: ResMut<PhysicsWorld>,
    mut camera: ResMut<CameraRig>,
    mut contacts: ResMut<TriggerContacts>,
    mut astronaut: Query<(Entity, &mut Character, Option<&BodyHandle>, Option<&Parked>, &Blueprint)>,
    mut vehicles: Query<(&mut VehicleController, &BodyHandle)>,
    bodies: Query<&BodyHandle, With<Prop>>,
) {
    if let Some(shelf) = index.get(PropKind::Shelf).and_then(|e| bodies.get(e).ok()) {
        if let (Some(position), Some(rotation)) =
            (physics.body_translation(shelf.0), physics.body_rotation(shelf.0))
        {
            machine.shelf_signal = shelf_signal(position, rotation, settings.min_distance);
        }
    }

    let toggle = input.0.actions.action_just_activated(Action::Interact);
    let Some(transition) = machine.evaluate(&overlaps, toggle, machine.shelf_signal) else {
        return;
    };
    let Ok((entity, mut character, body, parked, blueprint)) = astronaut.get_single_mut() else {
        return;
    };

    match transition {
        Transition::Enter(mode) => {
            let Some(body) = body else {
                warn!(%mode, "astronaut already parked, ignoring mode entry");
                return;
            };
            let Some(parked) = ParkedBody::park(&mut physics, body.0) else {
                warn!(%mode, "astronaut body missing, ignoring mode entry");
                return;
            };
            machine.apply(transition);
            character.cancel_pending_jump();
            contacts.clear();
            commands
                .entity(entity)
                .remove::<(BodyHandle, PropColliders)>()
                .insert((Parked(parked), Hidden));
            if mode == Mode::VehiclePilot {
                for (mut vehicle, handle) in vehicles.iter_mut() {
                    vehicle.begin_piloting(&mut physics, handle.0);
                }
            }
        }
        Transition::Exit(mode) => {
            let Some(parked) = parked else {
                warn!(%mode, "astronaut not parked, ignoring mode exit");
                return;
            };
            if mode == Mode::VehiclePilot {
                for (mut vehicle, handle) in vehicles.iter_mut() {
                    vehicle.end_piloting(&mut physics, handle.0);
                }
            }
            machine.apply(transition);
            let spawned = blueprint.0.restore(&mut physics, &parked.0);
            commands
                .entity(entity)
                .remove::<(Parked, Hidden)>()
                .insert((BodyHandle(spawned.body), PropColliders(spawned.colliders)));
            camera.begin_return();
            debug!(position = %parked.0.position, "astronaut back in the world");
        }
    }
}

/// While piloting, keeps the parked astronaut in the seat and forwards the
/// pilot's keys to the vehicle.
pub fn vehicle_control_system(
    input: Res<PlayerInput>,
    machine: Res<ModeMachine>,
    physics: Res<PhysicsWorld>,
    mut astronaut: Query<(&mut Character, &mut Parked)>,
    mut vehicles: Query<(&mut VehicleController, &BodyHandle)>,
) {
    let piloting = machine.mode() == Mode::VehiclePilot;
    for (mut vehicle, handle) in vehicles.iter_mut() {
        vehicle.input = if piloting {
            VehicleInput::from_actions(&input.0.actions)
        } else {
            VehicleInput::default()
        };
        if !piloting {
            continue;
        }
        let Some((seat, rotation)) = vehicle.seat_pose(&physics, handle.0) else {
            continue;
        };
        for (mut character, mut parked) in astronaut.iter_mut() {
            parked.0.position = seat;
            parked.0.rotation = rotation;
            parked.0.linvel = physics.body_linvel(handle.0).unwrap_or(Vec3::ZERO);
            parked.0.angvel = Vec3::ZERO;
            character.steering = rotation;
            character.prev_up = rotation * Vec3::Y;
        }
    }
}

/// Free-roam walking, turning and jumping.
pub fn character_control_system(
    clock: Res<FrameClock>,
    input: Res<PlayerInput>,
    mut physics: ResMut<PhysicsWorld>,
    mut astronaut: Query<(&mut Character, &BodyHandle)>,
) {
    let actions = &input.0.actions;
    for (mut character, body) in astronaut.iter_mut() {
        let Some(position) = physics.body_translation(body.0) else {
            continue;
        };
        character.reorient(position);
        character.track_activity(input.any_activity(), clock.dt_ms);
        character.apply_movement_input(actions, &mut physics, body.0);
        character.update_jump(actions, clock.dt_ms);
        character.tick_pending_jump(clock.dt_ms, &mut physics, body.0);
        character.select_animation(actions);
    }
}

/// Adds pilot thrust after the gravity pass.
pub fn vehicle_thrust_system(
    mut physics: ResMut<PhysicsWorld>,
    vehicles: Query<(&VehicleController, &BodyHandle)>,
) {
    for (vehicle, body) in vehicles.iter() {
        vehicle.apply_thrust(&mut physics, body.0);
    }
}

/// Advances the physics world one fixed step.
pub fn physics_step_system(mut physics: ResMut<PhysicsWorld>, mut events: ResMut<StepEvents>) {
    let step = physics.step();
    trace!(pairs = step.len(), "substep");
    events.record(step);
}

/// Sets the grounded flag from the astronaut's contacts.
pub fn grounded_system(
    physics: Res<PhysicsWorld>,
    mut astronaut: Query<(&mut Character, &PropColliders), With<BodyHandle>>,
) {
    for (mut character, colliders) in astronaut.iter_mut() {
        let normals: Vec<Vec3> = colliders
            .0
            .iter()
            .flat_map(|c| contact_normals(&physics, *c))
            .collect();
        character.update_grounded(&normals);
    }
}

/// Drives the camera rig for the active mode.
pub fn camera_system(
    clock: Res<FrameClock>,
    input: Res<PlayerInput>,
    machine: Res<ModeMachine>,
    index: Res<SceneIndex>,
    settings: Res<GravitySettings>,
    physics: Res<PhysicsWorld>,
    mut camera: ResMut<CameraRig>,
    astronaut: Query<(&Character, Option<&BodyHandle>, Option<&Parked>)>,
    markers: Query<(&CameraMarker, &BodyHandle)>,
    bodies: Query<&BodyHandle, With<Prop>>,
) {
    let Ok((character, body, parked)) = astronaut.get_single() else {
        return;
    };
    let dt_ms = clock.dt_ms;
    match machine.mode() {
        Mode::FreeRoam => {
            let Some(position) = astronaut_position(&physics, body, parked) else {
                return;
            };
            let follow = FollowInput {
                character_position: position,
                steering: character.steering,
                up: local_up(position, settings.min_distance),
                forward_held: input.0.actions.is_action_active(Action::MoveForward),
                any_input: input.any_activity(),
                idle: character.is_idle(),
            };
            camera.update_free_roam(dt_ms, &follow);
        }
        Mode::VehiclePilot => {
            let Some(ufo) = index.get(PropKind::Ufo).and_then(|e| bodies.get(e).ok()) else {
                return;
            };
            if let (Some(position), Some(rotation)) =
                (physics.body_translation(ufo.0), physics.body_rotation(ufo.0))
            {
                camera.update_vehicle(dt_ms, &chase_marker(position, rotation));
            }
        }
        mode => {
            let Some((marker, prop)) = PropKind::for_mode(mode)
                .and_then(|kind| index.get(kind))
                .and_then(|e| markers.get(e).ok())
            else {
                return;
            };
            if let (Some(position), Some(rotation)) =
                (physics.body_translation(prop.0), physics.body_rotation(prop.0))
            {
                let up = astronaut_position(&physics, body, parked)
                    .map_or(character.prev_up, |p| local_up(p, settings.min_distance));
                let target = marker.pose(position, rotation, up);
                camera.update_inspect(dt_ms, &target);
            }
        }
    }
}

/// Picks the prop under the pointer in the inspection modes.
pub fn hover_system(
    input: Res<PlayerInput>,
    machine: Res<ModeMachine>,
    view: Res<ViewParams>,
    camera: Res<CameraRig>,
    physics: Res<PhysicsWorld>,
    mut hover: ResMut<Hover>,
    props: Query<(&Prop, &BodyHandle)>,
) {
    let inspecting = matches!(machine.mode(), Mode::ShelfInspect | Mode::KioskInspect);
    let picked = input
        .0
        .pointer
        .ndc()
        .filter(|_| inspecting)
        .and_then(|ndc| {
            let (origin, dir) = camera.pose.ray_through(ndc, view.fov_y, view.aspect);
            physics.cast_ray(origin, dir, PICK_DISTANCE, None)
        })
        .and_then(|hit| physics.collider_set.get(hit.collider)?.parent())
        .and_then(|parent| {
            props
                .iter()
                .find(|(_, body)| body.0 == parent)
                .map(|(prop, _)| prop.kind)
        });
    if hover.0 != picked {
        debug!(?picked, "hover changed");
        hover.0 = picked;
    }
}
