//! Simulation schedule labels and the ordered schedule runner.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::{IntoSystemConfigs, ScheduleLabel};

/// Labels for each stage of a simulation frame.
///
/// `PreStep` and `PostStep` run once per frame; `Substep` runs once per fixed
/// physics step, zero or more times in between.
#[derive(ScheduleLabel, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSchedule {
    /// Input, mode transitions, character control.
    PreStep,
    /// Gravity, thrust, the physics step and the flags it produces.
    Substep,
    /// Gameplay reactions, visual sync, camera, picking.
    PostStep,
}

impl SimSchedule {
    pub const ALL: [SimSchedule; 3] = [SimSchedule::PreStep, SimSchedule::Substep, SimSchedule::PostStep];
}

/// Ordered collection of [`Schedule`]s that drives one simulation frame.
pub struct SimSchedules {
    schedules: Vec<(SimSchedule, Schedule)>,
}

impl SimSchedules {
    pub fn new() -> Self {
        let schedules = SimSchedule::ALL
            .into_iter()
            .map(|label| (label, Schedule::new(label)))
            .collect();
        Self { schedules }
    }

    /// Register a system (or system tuple) into a specific stage.
    pub fn add_system<M>(&mut self, stage: SimSchedule, system: impl IntoSystemConfigs<M>) {
        if let Some(schedule) = self.get_schedule_mut(stage) {
            schedule.add_systems(system);
        }
    }

    /// Runs one frame: `PreStep`, then `Substep` `substeps` times, then
    /// `PostStep`.
    pub fn run(&mut self, world: &mut World, substeps: u32) {
        self.run_stage(SimSchedule::PreStep, world);
        for _ in 0..substeps {
            self.run_stage(SimSchedule::Substep, world);
        }
        self.run_stage(SimSchedule::PostStep, world);
    }

    /// Returns a mutable reference to the schedule for a given stage.
    pub fn get_schedule_mut(&mut self, stage: SimSchedule) -> Option<&mut Schedule> {
        self.schedules
            .iter_mut()
            .find(|(label, _)| *label == stage)
            .map(|(_, schedule)| schedule)
    }

    /// Force-initialize all schedules, validating the dependency graph.
    pub fn initialize_all(&mut self, world: &mut World) {
        for (label, schedule) in &mut self.schedules {
            if let Err(error) = schedule.initialize(world) {
                tracing::error!(stage = ?label, %error, "schedule failed to initialize");
            }
        }
    }

    fn run_stage(&mut self, target: SimSchedule, world: &mut World) {
        if let Some(schedule) = self.get_schedule_mut(target) {
            schedule.run(world);
        }
    }
}

impl Default for SimSchedules {
    fn default() -> Self {
        Self::new()
    }
}
