//! Frame-coherent key state.
//!
//! [`KeyboardState`] answers three questions for any key code: is it held,
//! was it just pressed this frame, and was it just released this frame. It is
//! fed either by discrete window events or by polling a whole key map once per
//! frame from an [`InputProvider`](crate::InputProvider).

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Minimal description of a key event for processing.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    /// The key involved.
    pub key: KeyCode,
    /// Whether the key was pressed or released.
    pub state: ElementState,
    /// Whether this is an auto-repeat event.
    pub repeat: bool,
}

/// Tracks per-frame key state using physical key codes.
///
/// Physical codes keep WASD in place regardless of keyboard layout.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pressed: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    just_released: HashSet<KeyCode>,
}

impl KeyboardState {
    /// Creates a new `KeyboardState` with no keys pressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes a winit [`KeyEvent`]. Keys without a known code are ignored.
    pub fn process_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(key) = event.physical_key {
            self.process_raw(RawKeyEvent {
                key,
                state: event.state,
                repeat: event.repeat,
            });
        }
    }

    /// Processes a [`RawKeyEvent`]. Repeat events are ignored.
    pub fn process_raw(&mut self, event: RawKeyEvent) {
        if event.repeat {
            return;
        }
        match event.state {
            ElementState::Pressed => {
                if self.pressed.insert(event.key) {
                    self.just_pressed.insert(event.key);
                }
            }
            ElementState::Released => {
                if self.pressed.remove(&event.key) {
                    self.just_released.insert(event.key);
                }
            }
        }
    }

    /// Replaces the held set with a polled snapshot, deriving edges from the
    /// difference to the previous frame.
    ///
    /// Transients from the previous frame are cleared first, so call this
    /// exactly once per frame instead of [`clear_transients`](Self::clear_transients).
    pub fn apply_snapshot(&mut self, held: &HashSet<KeyCode>) {
        self.clear_transients();
        for key in held.difference(&self.pressed) {
            self.just_pressed.insert(*key);
        }
        for key in self.pressed.difference(held) {
            self.just_released.insert(*key);
        }
        self.pressed.clone_from(held);
    }

    /// Returns `true` while the key is held down.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Returns `true` only during the frame the key transitioned to pressed.
    #[must_use]
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed.contains(&key)
    }

    /// Returns `true` only during the frame the key transitioned to released.
    #[must_use]
    pub fn just_released(&self, key: KeyCode) -> bool {
        self.just_released.contains(&key)
    }

    /// Returns `true` if any key is held or changed state this frame.
    #[must_use]
    pub fn any_activity(&self) -> bool {
        !self.pressed.is_empty() || !self.just_released.is_empty()
    }

    /// Clears `just_pressed` and `just_released` sets.
    pub fn clear_transients(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(key: KeyCode, state: ElementState, repeat: bool) -> RawKeyEvent {
        RawKeyEvent { key, state, repeat }
    }

    fn held(keys: &[KeyCode]) -> HashSet<KeyCode> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_initial_state_no_keys_pressed() {
        let kb = KeyboardState::new();
        for k in [KeyCode::KeyW, KeyCode::KeyA, KeyCode::Space, KeyCode::KeyE] {
            assert!(!kb.is_pressed(k));
            assert!(!kb.just_pressed(k));
            assert!(!kb.just_released(k));
        }
        assert!(!kb.any_activity());
    }

    #[test]
    fn test_press_then_release_events() {
        let mut kb = KeyboardState::new();
        kb.process_raw(raw(KeyCode::KeyW, ElementState::Pressed, false));
        assert!(kb.is_pressed(KeyCode::KeyW));
        assert!(kb.just_pressed(KeyCode::KeyW));
        kb.clear_transients();
        kb.process_raw(raw(KeyCode::KeyW, ElementState::Released, false));
        assert!(!kb.is_pressed(KeyCode::KeyW));
        assert!(kb.just_released(KeyCode::KeyW));
    }

    #[test]
    fn test_repeat_events_ignored() {
        let mut kb = KeyboardState::new();
        kb.process_raw(raw(KeyCode::Space, ElementState::Pressed, false));
        kb.clear_transients();
        kb.process_raw(raw(KeyCode::Space, ElementState::Pressed, true));
        assert!(kb.is_pressed(KeyCode::Space));
        assert!(!kb.just_pressed(KeyCode::Space), "repeat must not re-edge");
    }

    #[test]
    fn test_snapshot_derives_edges() {
        let mut kb = KeyboardState::new();
        kb.apply_snapshot(&held(&[KeyCode::KeyW, KeyCode::Space]));
        assert!(kb.just_pressed(KeyCode::KeyW));
        assert!(kb.just_pressed(KeyCode::Space));

        kb.apply_snapshot(&held(&[KeyCode::KeyW]));
        assert!(kb.is_pressed(KeyCode::KeyW));
        assert!(!kb.just_pressed(KeyCode::KeyW), "held key edges only once");
        assert!(kb.just_released(KeyCode::Space));
        assert!(!kb.is_pressed(KeyCode::Space));

        kb.apply_snapshot(&held(&[]));
        assert!(kb.just_released(KeyCode::KeyW));
        kb.apply_snapshot(&held(&[]));
        assert!(!kb.just_released(KeyCode::KeyW));
        assert!(!kb.any_activity());
    }
}
