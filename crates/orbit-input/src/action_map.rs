//! Action mapping: abstract simulation actions bound to physical keys.
//!
//! [`InputMap`] defines which keys trigger which [`Action`]s. [`ActionState`]
//! is recomputed each frame by [`ActionResolver`] from the [`KeyboardState`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

use crate::keyboard::KeyboardState;

/// Serde helpers for [`KeyCode`], which has no serde support of its own.
///
/// Keys are written as their `Debug` names (`"KeyW"`, `"Space"`).
pub mod keycode_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use winit::keyboard::KeyCode;

    macro_rules! named_keys {
        ($($name:ident),* $(,)?) => {
            /// Parses a key from its `Debug` name.
            #[must_use]
            pub fn keycode_from_name(name: &str) -> Option<KeyCode> {
                match name {
                    $(stringify!($name) => Some(KeyCode::$name),)*
                    _ => None,
                }
            }
        };
    }

    named_keys!(
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN, KeyO,
        KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ, Digit0, Digit1, Digit2,
        Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9, Space, Enter, Escape, Tab,
        ShiftLeft, ShiftRight, ControlLeft, ControlRight, AltLeft, AltRight, ArrowUp, ArrowDown,
        ArrowLeft, ArrowRight,
    );

    /// Serialize a [`KeyCode`] as its debug string.
    pub fn serialize<S: Serializer>(code: &KeyCode, s: S) -> Result<S::Ok, S::Error> {
        format!("{code:?}").serialize(s)
    }

    /// Deserialize a [`KeyCode`] from its debug string.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<KeyCode, D::Error> {
        let name = String::deserialize(d)?;
        keycode_from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown key: {name}")))
    }

    /// The same encoding for a list of keys.
    pub mod list {
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};
        use winit::keyboard::KeyCode;

        pub fn serialize<S: Serializer>(codes: &[KeyCode], s: S) -> Result<S::Ok, S::Error> {
            let mut seq = s.serialize_seq(Some(codes.len()))?;
            for code in codes {
                seq.serialize_element(&format!("{code:?}"))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<KeyCode>, D::Error> {
            Vec::<String>::deserialize(d)?
                .iter()
                .map(|name| {
                    super::keycode_from_name(name)
                        .ok_or_else(|| serde::de::Error::custom(format!("unknown key: {name}")))
                })
                .collect()
        }
    }
}

/// Semantic actions the character and vehicle controllers respond to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Walk forward, or thrust forward while piloting.
    MoveForward,
    /// Walk backward, or reverse thrust.
    MoveBack,
    /// Turn the steering frame left, or yaw the vehicle left.
    TurnLeft,
    /// Turn the steering frame right, or yaw the vehicle right.
    TurnRight,
    /// Jump (debounced), or lift while piloting.
    Jump,
    /// Descend while piloting.
    Descend,
    /// Enter or leave the inspection/pilot mode of the nearby prop.
    Interact,
}

impl Action {
    /// Every action, in a stable order.
    pub const ALL: [Action; 7] = [
        Action::MoveForward,
        Action::MoveBack,
        Action::TurnLeft,
        Action::TurnRight,
        Action::Jump,
        Action::Descend,
        Action::Interact,
    ];
}

/// A physical input source bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputBinding {
    /// A keyboard key (physical scan code).
    Key(#[serde(with = "keycode_serde")] KeyCode),
}

/// Maps [`Action`]s to lists of [`InputBinding`]s. Several bindings on one
/// action combine with OR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMap {
    /// The binding table.
    pub bindings: HashMap<Action, Vec<InputBinding>>,
}

impl Default for InputMap {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        for (action, key) in [
            (Action::MoveForward, KeyCode::KeyW),
            (Action::MoveBack, KeyCode::KeyS),
            (Action::TurnLeft, KeyCode::KeyA),
            (Action::TurnRight, KeyCode::KeyD),
            (Action::Jump, KeyCode::Space),
            (Action::Descend, KeyCode::ShiftLeft),
            (Action::Interact, KeyCode::KeyE),
        ] {
            bindings.insert(action, vec![InputBinding::Key(key)]);
        }
        Self { bindings }
    }
}

impl InputMap {
    /// Create an empty input map with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Set the bindings for an action, replacing any existing ones.
    pub fn set_bindings(&mut self, action: Action, bindings: Vec<InputBinding>) {
        self.bindings.insert(action, bindings);
    }

    /// Get the bindings for an action.
    #[must_use]
    pub fn get_bindings(&self, action: &Action) -> &[InputBinding] {
        self.bindings.get(action).map_or(&[], |v| v.as_slice())
    }

    /// Serialize to RON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON string.
    ///
    /// # Errors
    /// Returns an error if the RON string is malformed.
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ActionFrame {
    active: bool,
    just_activated: bool,
    just_deactivated: bool,
}

/// Per-frame action state computed by [`ActionResolver`].
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    frames: HashMap<Action, ActionFrame>,
}

impl ActionState {
    /// Create a new empty action state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn frame(&self, action: Action) -> ActionFrame {
        self.frames.get(&action).copied().unwrap_or_default()
    }

    /// Whether any binding of the action is held.
    #[must_use]
    pub fn is_action_active(&self, action: Action) -> bool {
        self.frame(action).active
    }

    /// True only on the frame one of the action's keys was pressed.
    #[must_use]
    pub fn action_just_activated(&self, action: Action) -> bool {
        self.frame(action).just_activated
    }

    /// True only on the frame the action's keys were let go.
    #[must_use]
    pub fn action_just_deactivated(&self, action: Action) -> bool {
        self.frame(action).just_deactivated
    }

    /// Whether any action is active or changed this frame.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.frames
            .values()
            .any(|f| f.active || f.just_activated || f.just_deactivated)
    }
}

/// Fills [`ActionState`] from the keyboard each frame.
pub struct ActionResolver;

impl ActionResolver {
    /// Resolve all actions from the current keyboard state.
    ///
    /// Call once per frame after the keyboard has been updated.
    pub fn resolve(input_map: &InputMap, keyboard: &KeyboardState, state: &mut ActionState) {
        state.frames.clear();
        for (action, bindings) in &input_map.bindings {
            let mut frame = ActionFrame::default();
            let mut released = false;
            for InputBinding::Key(code) in bindings {
                frame.active |= keyboard.is_pressed(*code);
                frame.just_activated |= keyboard.just_pressed(*code);
                released |= keyboard.just_released(*code);
            }
            frame.just_deactivated = released && !frame.active;
            state.frames.insert(*action, frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn resolve_with(map: &InputMap, kb: &KeyboardState) -> ActionState {
        let mut state = ActionState::new();
        ActionResolver::resolve(map, kb, &mut state);
        state
    }

    fn held(keys: &[KeyCode]) -> HashSet<KeyCode> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_default_bindings() {
        let map = InputMap::default();
        assert_eq!(
            map.get_bindings(&Action::Interact),
            &[InputBinding::Key(KeyCode::KeyE)]
        );
        for action in Action::ALL {
            assert_eq!(map.get_bindings(&action).len(), 1, "{action:?} unbound");
        }
    }

    #[test]
    fn test_action_bound_to_key_activates_on_press() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        kb.apply_snapshot(&held(&[KeyCode::KeyW]));
        let state = resolve_with(&map, &kb);
        assert!(state.is_action_active(Action::MoveForward));
        assert!(state.action_just_activated(Action::MoveForward));
        assert!(!state.is_action_active(Action::MoveBack));
    }

    #[test]
    fn test_action_edges_follow_keyboard() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        kb.apply_snapshot(&held(&[KeyCode::KeyE]));
        assert!(resolve_with(&map, &kb).action_just_activated(Action::Interact));

        kb.apply_snapshot(&held(&[KeyCode::KeyE]));
        let state = resolve_with(&map, &kb);
        assert!(state.is_action_active(Action::Interact));
        assert!(!state.action_just_activated(Action::Interact));

        kb.apply_snapshot(&held(&[]));
        assert!(resolve_with(&map, &kb).action_just_deactivated(Action::Interact));
    }

    #[test]
    fn test_multiple_bindings_or_logic() {
        let mut map = InputMap::default();
        map.set_bindings(
            Action::Jump,
            vec![
                InputBinding::Key(KeyCode::Space),
                InputBinding::Key(KeyCode::KeyJ),
            ],
        );
        let mut kb = KeyboardState::new();
        kb.apply_snapshot(&held(&[KeyCode::Space, KeyCode::KeyJ]));
        kb.apply_snapshot(&held(&[KeyCode::KeyJ]));
        let state = resolve_with(&map, &kb);
        assert!(state.is_action_active(Action::Jump));
        assert!(
            !state.action_just_deactivated(Action::Jump),
            "still held through the second binding"
        );
    }

    #[test]
    fn test_unbound_action_inactive() {
        let map = InputMap::new();
        let mut kb = KeyboardState::new();
        kb.apply_snapshot(&held(&[KeyCode::KeyW]));
        let state = resolve_with(&map, &kb);
        assert!(!state.is_action_active(Action::MoveForward));
        assert!(!state.any_active());
    }

    #[test]
    fn test_input_map_ron_roundtrip() {
        let map = InputMap::default();
        let text = map.to_ron().unwrap();
        assert!(text.contains("\"KeyE\""), "keys serialize by name: {text}");
        let back = InputMap::from_ron(&text).unwrap();
        assert_eq!(back.get_bindings(&Action::Descend), map.get_bindings(&Action::Descend));
    }

    #[test]
    fn test_unknown_key_name_rejected() {
        let text = "(bindings: {Jump: [Key(\"Hyper\")]})";
        assert!(InputMap::from_ron(text).is_err());
    }
}
