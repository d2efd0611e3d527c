//! Jump-key debounce.
//!
//! Once a jump is consumed the key reads as released until the player lets go
//! and a cooldown elapses. Holding the key through a landing does not jump again.

use tracing::trace;

/// Debounced view of the jump key.
#[derive(Debug, Clone)]
pub struct JumpDebounce {
    cooldown_ms: f32,
    consumed: bool,
    cooldown_remaining: Option<f32>,
    /// Set when the cooldown expired with the key still held; a fresh press is
    /// then required.
    await_fresh_press: bool,
    effective: bool,
}

impl JumpDebounce {
    /// Creates a debounce with the given release cooldown.
    #[must_use]
    pub fn new(cooldown_ms: f32) -> Self {
        Self {
            cooldown_ms,
            consumed: false,
            cooldown_remaining: None,
            await_fresh_press: false,
            effective: false,
        }
    }

    /// Advances the debounce by one frame of raw key state.
    pub fn update(&mut self, pressed: bool, just_pressed: bool, just_released: bool, dt_ms: f32) {
        if let Some(remaining) = self.cooldown_remaining.as_mut() {
            *remaining -= dt_ms;
            if *remaining <= 0.0 {
                self.cooldown_remaining = None;
                self.consumed = false;
                self.await_fresh_press = pressed;
                trace!(held = pressed, "jump cooldown elapsed");
            }
        }

        if just_released && self.consumed {
            self.cooldown_remaining = Some(self.cooldown_ms);
        }

        if !pressed || just_pressed {
            self.await_fresh_press = false;
        }

        self.effective = pressed && !self.consumed && !self.await_fresh_press;
    }

    /// Whether a jump is requested this frame.
    #[must_use]
    pub fn requested(&self) -> bool {
        self.effective
    }

    /// Marks the current press as used. The key reads released until the
    /// cooldown after key-up elapses.
    pub fn consume(&mut self) {
        self.consumed = true;
        self.effective = false;
        self.cooldown_remaining = None;
    }

    /// Whether a consumed press is still blocking new jumps.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.consumed
    }
}
