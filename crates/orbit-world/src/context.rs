//! The simulation context: one ECS world, its schedules and the frame entry
//! point.

use bevy_ecs::prelude::*;
use glam::Vec3;
use orbit_config::Config;
use orbit_input::InputProvider;
use orbit_physics::rapier3d::prelude::RigidBodyHandle;
use orbit_physics::{
    BodyHandle, ContactMaterial, DEFAULT_MATERIAL, GravitySettings, PhysicsWorld,
    central_gravity_system, to_vector,
};
use orbit_player::{CameraPose, CameraRig, Character};
use tracing::{debug, info};

use crate::error::WorldError;
use crate::mode::{Mode, ModeMachine, Overlaps};
use crate::props::{PropKind, SceneIndex, build_scene};
use crate::scene_frame::{SceneFrame, SceneNodes, capture, visual_sync_system};
use crate::schedule::{SimSchedule, SimSchedules};
use crate::soccer::{SoccerState, soccer_system};
use crate::step_clock::StepClock;
use crate::systems::{
    FrameClock, Hover, PlayerInput, StepEvents, ViewParams, camera_system,
    character_control_system, grounded_system, hover_system, kinematic_bob_system, mode_system,
    physics_step_system, vehicle_control_system, vehicle_thrust_system,
};
use crate::triggers::{TriggerContacts, parked_overlap_system, trigger_overlap_system};

/// Owns every piece of mutable simulation state.
pub struct SimContext {
    world: World,
    schedules: SimSchedules,
}

impl SimContext {
    /// Builds the scene and the frame schedules from `config`.
    pub fn new(config: &Config) -> Self {
        let physics_config = &config.physics;
        let mut world = World::new();

        let mut physics = PhysicsWorld::new(physics_config.g_force, physics_config.fixed_dt);
        physics.register_material(
            DEFAULT_MATERIAL,
            ContactMaterial {
                friction: physics_config.friction,
                restitution: physics_config.restitution,
            },
        );
        world.insert_resource(physics);
        world.insert_resource(GravitySettings {
            g_force: physics_config.g_force,
            g_force_scale: physics_config.g_force_scale,
            min_distance: physics_config.min_gravity_distance,
        });
        world.insert_resource(StepClock::new(
            f64::from(physics_config.fixed_dt),
            physics_config.max_substeps,
        ));
        world.insert_resource(CameraRig::new(config.camera.clone()));
        world.init_resource::<PlayerInput>();
        world.init_resource::<FrameClock>();
        world.init_resource::<StepEvents>();
        world.init_resource::<Overlaps>();
        world.init_resource::<TriggerContacts>();
        world.init_resource::<ModeMachine>();
        world.init_resource::<SoccerState>();
        world.init_resource::<SceneNodes>();
        world.init_resource::<ViewParams>();
        world.init_resource::<Hover>();

        build_scene(&mut world, config);

        let mut schedules = SimSchedules::new();
        schedules.add_system(
            SimSchedule::PreStep,
            (
                kinematic_bob_system,
                parked_overlap_system,
                mode_system,
                vehicle_control_system,
                character_control_system,
            )
                .chain(),
        );
        schedules.add_system(
            SimSchedule::Substep,
            (
                central_gravity_system,
                vehicle_thrust_system,
                physics_step_system,
                grounded_system,
                trigger_overlap_system,
            )
                .chain(),
        );
        schedules.add_system(
            SimSchedule::PostStep,
            (soccer_system, visual_sync_system, camera_system, hover_system).chain(),
        );
        schedules.initialize_all(&mut world);

        info!(
            fixed_dt = physics_config.fixed_dt,
            max_substeps = physics_config.max_substeps,
            "simulation ready"
        );
        Self { world, schedules }
    }

    /// Runs one frame of `dt_ms` milliseconds with the next input snapshot.
    pub fn frame(&mut self, dt_ms: f32, input: &mut dyn InputProvider) -> SceneFrame {
        let snapshot = input.poll();
        self.world.resource_mut::<PlayerInput>().0.apply(&snapshot);
        self.world.resource_mut::<FrameClock>().advance(dt_ms);
        self.world.resource_mut::<StepEvents>().clear();
        let substeps = self
            .world
            .resource_mut::<StepClock>()
            .advance(f64::from(dt_ms) / 1000.0);

        self.schedules.run(&mut self.world, substeps);
        capture(&mut self.world)
    }

    pub fn mode(&self) -> Mode {
        self.world.resource::<ModeMachine>().mode()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn physics(&self) -> &PhysicsWorld {
        self.world.resource::<PhysicsWorld>()
    }

    pub fn physics_mut(&mut self) -> Mut<'_, PhysicsWorld> {
        self.world.resource_mut::<PhysicsWorld>()
    }

    pub fn camera(&self) -> CameraPose {
        self.world.resource::<CameraRig>().pose
    }

    pub fn overlaps(&self) -> Overlaps {
        *self.world.resource::<Overlaps>()
    }

    pub fn soccer(&self) -> &SoccerState {
        self.world.resource::<SoccerState>()
    }

    pub fn step_clock(&self) -> &StepClock {
        self.world.resource::<StepClock>()
    }

    pub fn prop_entity(&self, kind: PropKind) -> Result<Entity, WorldError> {
        self.world
            .resource::<SceneIndex>()
            .get(kind)
            .ok_or(WorldError::MissingProp(kind))
    }

    /// Handle of the prop's live body. Fails while the prop is parked.
    pub fn body_of(&self, kind: PropKind) -> Result<RigidBodyHandle, WorldError> {
        let entity = self.prop_entity(kind)?;
        self.world
            .get::<BodyHandle>(entity)
            .map(|b| b.0)
            .filter(|h| self.physics().contains_body(*h))
            .ok_or(WorldError::BodyNotInWorld(kind))
    }

    pub fn character(&self) -> Result<&Character, WorldError> {
        let entity = self.prop_entity(PropKind::Astronaut)?;
        self.world
            .get::<Character>(entity)
            .ok_or(WorldError::MissingProp(PropKind::Astronaut))
    }

    /// Moves a live body to `position` and stops it.
    pub fn place_body(&mut self, kind: PropKind, position: Vec3) -> Result<(), WorldError> {
        let handle = self.body_of(kind)?;
        let mut physics = self.physics_mut();
        let body = physics
            .rigid_body_set
            .get_mut(handle)
            .ok_or(WorldError::BodyNotInWorld(kind))?;
        body.set_translation(to_vector(position), true);
        body.set_linvel(to_vector(Vec3::ZERO), true);
        body.set_angvel(to_vector(Vec3::ZERO), true);
        debug!(prop = %kind, %position, "body placed");
        Ok(())
    }

    /// Changes the radial gravity multiplier at runtime.
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.world.resource_mut::<GravitySettings>().g_force_scale = scale;
        info!(scale, "gravity scale changed");
    }

    /// Applies tunables from a reloaded config that are safe to change live.
    pub fn apply_config(&mut self, config: &Config) {
        self.set_gravity_scale(config.physics.g_force_scale);
        self.world.resource_mut::<CameraRig>().config = config.camera.clone();
        let mut query = self.world.query::<&mut Character>();
        for mut character in query.iter_mut(&mut self.world) {
            character.config = config.player.clone();
        }
        debug!("live config applied");
    }
}

#[cfg(test)]
mod tests {
    use orbit_input::ManualInput;

    use super::*;

    #[test]
    fn test_new_context_starts_in_free_roam() {
        let ctx = SimContext::new(&Config::default());
        assert_eq!(ctx.mode(), Mode::FreeRoam);
        assert!(ctx.body_of(PropKind::Astronaut).is_ok());
        assert_eq!(ctx.camera(), CameraPose::default());
    }

    #[test]
    fn test_frame_counts_and_steps() {
        let mut ctx = SimContext::new(&Config::default());
        let mut input = ManualInput::new();
        let frame = ctx.frame(1000.0 / 60.0, &mut input);
        assert_eq!(frame.frame, 1);
        assert_eq!(ctx.step_clock().step_count(), 1);
        assert_eq!(frame.nodes.len(), 12);
        assert!(frame.astronaut_visible);
    }

    #[test]
    fn test_zero_dt_frame_does_not_step() {
        let mut ctx = SimContext::new(&Config::default());
        let mut input = ManualInput::new();
        ctx.frame(0.0, &mut input);
        assert_eq!(ctx.step_clock().step_count(), 0);
    }

    #[test]
    fn test_gravity_scale_override() {
        let mut ctx = SimContext::new(&Config::default());
        ctx.set_gravity_scale(350.0);
        let settings = ctx.world().resource::<GravitySettings>();
        assert!((settings.radial_magnitude() - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_place_body_moves_and_stops() {
        let mut ctx = SimContext::new(&Config::default());
        ctx.place_body(PropKind::Ball, Vec3::new(0.0, 30.0, 0.0)).unwrap();
        let handle = ctx.body_of(PropKind::Ball).unwrap();
        assert_eq!(ctx.physics().body_translation(handle), Some(Vec3::new(0.0, 30.0, 0.0)));
    }
}
