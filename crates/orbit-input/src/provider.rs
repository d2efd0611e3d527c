//! Injected input providers.
//!
//! The simulation polls an [`InputProvider`] once per frame and never listens
//! to window events itself. A windowed front end feeds [`ManualInput`] from its
//! event loop; the headless driver replays an [`InputScript`].

use std::collections::HashSet;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

use crate::action_map::{keycode_serde, ActionResolver, ActionState, InputMap};
use crate::error::ScriptError;
use crate::keyboard::KeyboardState;
use crate::pointer::PointerState;

/// Everything the simulation reads from the outside world in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Keys currently held.
    pub keys: HashSet<KeyCode>,
    /// Pointer in normalized device coordinates, if over the viewport.
    pub pointer: Option<Vec2>,
}

/// Source of per-frame input snapshots.
pub trait InputProvider {
    /// Returns the input state for the next frame.
    fn poll(&mut self) -> InputSnapshot;
}

/// Provider whose state is set directly by the caller.
#[derive(Debug, Clone, Default)]
pub struct ManualInput {
    snapshot: InputSnapshot,
}

impl ManualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.snapshot.keys.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.snapshot.keys.remove(&key);
    }

    pub fn release_all(&mut self) {
        self.snapshot.keys.clear();
    }

    pub fn set_pointer(&mut self, ndc: Option<Vec2>) {
        self.snapshot.pointer = ndc;
    }
}

impl InputProvider for ManualInput {
    fn poll(&mut self) -> InputSnapshot {
        self.snapshot.clone()
    }
}

/// Keys held over a half-open frame range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub start: u32,
    pub end: u32,
    #[serde(with = "keycode_serde::list", default)]
    pub keys: Vec<KeyCode>,
    #[serde(default)]
    pub pointer: Option<(f32, f32)>,
}

/// A recorded input session, stored as RON.
///
/// ```ron
/// (segments: [
///     (start: 0, end: 120, keys: ["KeyW"]),
///     (start: 130, end: 131, keys: ["KeyE"]),
/// ])
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputScript {
    pub segments: Vec<ScriptSegment>,
}

impl InputScript {
    /// Load a script from a RON file.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Parse a script from RON text.
    pub fn from_ron(s: &str) -> Result<Self, ScriptError> {
        Ok(ron::from_str(s)?)
    }

    /// Last frame any segment covers.
    #[must_use]
    pub fn len_frames(&self) -> u32 {
        self.segments.iter().map(|s| s.end).max().unwrap_or(0)
    }

    /// Input held at `frame`. Overlapping segments merge their keys; the last
    /// segment with a pointer wins.
    #[must_use]
    pub fn snapshot_at(&self, frame: u32) -> InputSnapshot {
        let mut snapshot = InputSnapshot::default();
        for segment in self
            .segments
            .iter()
            .filter(|s| s.start <= frame && frame < s.end)
        {
            snapshot.keys.extend(segment.keys.iter().copied());
            if let Some((x, y)) = segment.pointer {
                snapshot.pointer = Some(Vec2::new(x, y));
            }
        }
        snapshot
    }
}

/// Replays an [`InputScript`] one frame per poll.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    script: InputScript,
    frame: u32,
}

impl ScriptedInput {
    pub fn new(script: InputScript) -> Self {
        Self { script, frame: 0 }
    }

    /// Frames polled so far.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Whether every segment has been played.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.frame >= self.script.len_frames()
    }
}

impl InputProvider for ScriptedInput {
    fn poll(&mut self) -> InputSnapshot {
        let snapshot = self.script.snapshot_at(self.frame);
        self.frame = self.frame.saturating_add(1);
        snapshot
    }
}

/// Resolved input for one frame: raw keys, actions and pointer.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub map: InputMap,
    pub keyboard: KeyboardState,
    pub actions: ActionState,
    pub pointer: PointerState,
}

impl InputState {
    pub fn new(map: InputMap) -> Self {
        Self {
            map,
            ..Default::default()
        }
    }

    /// Folds a polled snapshot into key edges and action state.
    pub fn apply(&mut self, snapshot: &InputSnapshot) {
        self.keyboard.apply_snapshot(&snapshot.keys);
        ActionResolver::resolve(&self.map, &self.keyboard, &mut self.actions);
        self.pointer.clear_transients();
        match snapshot.pointer {
            Some(ndc) => self.pointer.set_ndc(ndc),
            None => self.pointer.on_cursor_left(),
        }
    }
}
