//! Interaction modes and the transition rules between them.
//!
//! Exactly one mode is active. Leaving free roam needs the toggle edge while
//! the astronaut stands inside that mode's trigger; when several triggers
//! overlap, kiosk beats vehicle and vehicle beats shelf. An active mode ends on
//! the next toggle edge, when its trigger no longer contains the astronaut,
//! or, for the shelf, when the shelf has tipped over.

use std::fmt;

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use orbit_physics::gravity::local_up;
use tracing::info;

/// The exclusive interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    FreeRoam,
    ShelfInspect,
    VehiclePilot,
    KioskInspect,
}

impl Mode {
    /// Non-free-roam modes, highest priority first.
    pub const PRIORITY: [Mode; 3] = [Mode::KioskInspect, Mode::VehiclePilot, Mode::ShelfInspect];

    pub fn is_free_roam(self) -> bool {
        self == Mode::FreeRoam
    }

    /// Whether the astronaut body is out of the simulation in this mode.
    pub fn parks_astronaut(self) -> bool {
        !self.is_free_roam()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::FreeRoam => "free-roam",
            Mode::ShelfInspect => "shelf-inspect",
            Mode::VehiclePilot => "vehicle-pilot",
            Mode::KioskInspect => "kiosk-inspect",
        };
        f.write_str(name)
    }
}

/// Which mode triggers currently contain the astronaut.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlaps {
    pub kiosk: bool,
    pub vehicle: bool,
    pub shelf: bool,
}

impl Overlaps {
    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::FreeRoam => false,
            Mode::ShelfInspect => self.shelf,
            Mode::VehiclePilot => self.vehicle,
            Mode::KioskInspect => self.kiosk,
        }
    }

    pub fn set(&mut self, mode: Mode, inside: bool) {
        match mode {
            Mode::FreeRoam => {}
            Mode::ShelfInspect => self.shelf = inside,
            Mode::VehiclePilot => self.vehicle = inside,
            Mode::KioskInspect => self.kiosk = inside,
        }
    }
}

/// A mode change decided by [`ModeMachine::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enter(Mode),
    Exit(Mode),
}

/// How upright the shelf stands, in `[0, 1]`.
///
/// 1 when the shelf's up axis matches the radial up, falling linearly to 0 at
/// 60 degrees of tilt.
pub fn shelf_signal(position: Vec3, rotation: Quat, min_gravity_distance: f32) -> f32 {
    let alignment = (rotation * Vec3::Y).dot(local_up(position, min_gravity_distance));
    ((alignment - 0.5) / 0.5).clamp(0.0, 1.0)
}

/// Current mode plus the last shelf signal.
#[derive(Resource, Debug, Clone)]
pub struct ModeMachine {
    mode: Mode,
    pub shelf_signal: f32,
    transitions: u64,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            mode: Mode::FreeRoam,
            shelf_signal: 1.0,
            transitions: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of transitions applied so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Decides this frame's transition, if any. Pure: calling it again with
    /// the same inputs gives the same answer.
    pub fn evaluate(&self, overlaps: &Overlaps, toggle: bool, shelf_signal: f32) -> Option<Transition> {
        match self.mode {
            Mode::FreeRoam => {
                if !toggle {
                    return None;
                }
                let candidate = Mode::PRIORITY.into_iter().find(|m| overlaps.get(*m))?;
                if candidate == Mode::ShelfInspect && shelf_signal <= 0.0 {
                    return None;
                }
                Some(Transition::Enter(candidate))
            }
            active => {
                let shelf_down = active == Mode::ShelfInspect && shelf_signal <= 0.0;
                if toggle || !overlaps.get(active) || shelf_down {
                    Some(Transition::Exit(active))
                } else {
                    None
                }
            }
        }
    }

    /// Records a transition. Entering is ignored unless in free roam and
    /// exiting is ignored unless that mode is active.
    pub fn apply(&mut self, transition: Transition) -> bool {
        let next = match transition {
            Transition::Enter(mode) if self.mode.is_free_roam() && !mode.is_free_roam() => mode,
            Transition::Exit(mode) if self.mode == mode && !mode.is_free_roam() => Mode::FreeRoam,
            _ => return false,
        };
        info!(from = %self.mode, to = %next, "mode changed");
        self.mode = next;
        self.transitions += 1;
        true
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside(modes: &[Mode]) -> Overlaps {
        let mut overlaps = Overlaps::default();
        for mode in modes {
            overlaps.set(*mode, true);
        }
        overlaps
    }

    #[test]
    fn test_no_toggle_no_transition() {
        let machine = ModeMachine::new();
        assert_eq!(machine.evaluate(&inside(&[Mode::VehiclePilot]), false, 1.0), None);
    }

    #[test]
    fn test_toggle_outside_triggers_does_nothing() {
        let machine = ModeMachine::new();
        assert_eq!(machine.evaluate(&Overlaps::default(), true, 1.0), None);
    }

    #[test]
    fn test_priority_order() {
        let machine = ModeMachine::new();
        let all = inside(&[Mode::ShelfInspect, Mode::VehiclePilot, Mode::KioskInspect]);
        assert_eq!(
            machine.evaluate(&all, true, 1.0),
            Some(Transition::Enter(Mode::KioskInspect))
        );
        let two = inside(&[Mode::ShelfInspect, Mode::VehiclePilot]);
        assert_eq!(
            machine.evaluate(&two, true, 1.0),
            Some(Transition::Enter(Mode::VehiclePilot))
        );
        assert_eq!(
            machine.evaluate(&inside(&[Mode::ShelfInspect]), true, 1.0),
            Some(Transition::Enter(Mode::ShelfInspect))
        );
    }

    #[test]
    fn test_fallen_shelf_blocks_entry() {
        let machine = ModeMachine::new();
        assert_eq!(machine.evaluate(&inside(&[Mode::ShelfInspect]), true, 0.0), None);
    }

    #[test]
    fn test_exit_on_toggle_or_leaving() {
        let mut machine = ModeMachine::new();
        assert!(machine.apply(Transition::Enter(Mode::VehiclePilot)));
        let overlaps = inside(&[Mode::VehiclePilot]);
        assert_eq!(machine.evaluate(&overlaps, false, 1.0), None, "stays while inside");
        assert_eq!(
            machine.evaluate(&overlaps, true, 1.0),
            Some(Transition::Exit(Mode::VehiclePilot))
        );
        assert_eq!(
            machine.evaluate(&Overlaps::default(), false, 1.0),
            Some(Transition::Exit(Mode::VehiclePilot))
        );
    }

    #[test]
    fn test_active_mode_ignores_other_triggers() {
        let mut machine = ModeMachine::new();
        machine.apply(Transition::Enter(Mode::ShelfInspect));
        let overlaps = inside(&[Mode::ShelfInspect, Mode::KioskInspect]);
        assert_eq!(machine.evaluate(&overlaps, false, 1.0), None);
        assert!(!machine.apply(Transition::Enter(Mode::KioskInspect)));
        assert_eq!(machine.mode(), Mode::ShelfInspect);
    }

    #[test]
    fn test_shelf_tipping_forces_exit() {
        let mut machine = ModeMachine::new();
        machine.apply(Transition::Enter(Mode::ShelfInspect));
        assert_eq!(
            machine.evaluate(&inside(&[Mode::ShelfInspect]), false, 0.0),
            Some(Transition::Exit(Mode::ShelfInspect))
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut machine = ModeMachine::new();
        assert!(machine.apply(Transition::Enter(Mode::KioskInspect)));
        assert!(!machine.apply(Transition::Enter(Mode::KioskInspect)));
        assert!(machine.apply(Transition::Exit(Mode::KioskInspect)));
        assert!(!machine.apply(Transition::Exit(Mode::KioskInspect)));
        assert_eq!(machine.mode(), Mode::FreeRoam);
        assert_eq!(machine.transitions(), 2);
    }

    #[test]
    fn test_shelf_signal() {
        let pos = Vec3::new(0.0, 16.0, 0.0);
        assert!((shelf_signal(pos, Quat::IDENTITY, 0.5) - 1.0).abs() < 1e-6);
        let tilted = Quat::from_rotation_x(std::f32::consts::FRAC_PI_4);
        let expected = ((std::f32::consts::FRAC_PI_4.cos() - 0.5) / 0.5).clamp(0.0, 1.0);
        assert!((shelf_signal(pos, tilted, 0.5) - expected).abs() < 1e-5);
        let fallen = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        assert_eq!(shelf_signal(pos, fallen, 0.5), 0.0);
    }
}
