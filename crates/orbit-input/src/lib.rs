//! Input abstraction: polled key snapshots mapped through action bindings,
//! a debounced jump key and a pointer for picking.

pub mod action_map;
pub mod error;
pub mod jump;
pub mod keyboard;
pub mod pointer;
pub mod provider;

pub use action_map::{Action, ActionResolver, ActionState, InputBinding, InputMap};
pub use error::ScriptError;
pub use jump::JumpDebounce;
pub use keyboard::{KeyboardState, RawKeyEvent};
pub use pointer::PointerState;
pub use provider::{
    InputProvider, InputScript, InputSnapshot, InputState, ManualInput, ScriptSegment,
    ScriptedInput,
};
pub use winit::keyboard::KeyCode;
