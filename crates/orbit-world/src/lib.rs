//! The orbit-walk simulation: scene props, interaction modes and the
//! per-frame schedule, driven through [`SimContext`].

pub mod context;
pub mod error;
pub mod mode;
pub mod props;
pub mod scene_frame;
pub mod schedule;
pub mod soccer;
pub mod step_clock;
pub mod systems;
pub mod triggers;

pub use context::SimContext;
pub use error::WorldError;
pub use mode::{Mode, ModeMachine, Overlaps, Transition, shelf_signal};
pub use props::{
    Bobbing, CameraMarker, Prop, PropKind, SceneIndex, TriggerShape, TriggerVolume, VisualId,
};
pub use scene_frame::{NodeTransform, SceneFrame};
pub use schedule::{SimSchedule, SimSchedules};
pub use soccer::SoccerState;
pub use step_clock::StepClock;
