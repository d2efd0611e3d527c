//! Pointer position for picking in inspection modes.
//!
//! [`PointerState`] stores the cursor in normalized device coordinates
//! (`x` right, `y` up, both in `[-1, 1]`), which is what a camera ray cast needs.

use glam::Vec2;

/// Frame-coherent pointer state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    ndc: Option<Vec2>,
    moved: bool,
}

impl PointerState {
    /// Creates a pointer with no known position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a `CursorMoved` event in window-logical pixels.
    ///
    /// A zero-sized window leaves the state untouched.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let ndc = Vec2::new(
            ((x / width) * 2.0 - 1.0) as f32,
            (-(y / height) * 2.0 + 1.0) as f32,
        );
        self.set_ndc(ndc);
    }

    /// Sets the position directly in normalized device coordinates.
    pub fn set_ndc(&mut self, ndc: Vec2) {
        let ndc = ndc.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
        if self.ndc != Some(ndc) {
            self.moved = true;
        }
        self.ndc = Some(ndc);
    }

    /// Process a `CursorLeft` event.
    pub fn on_cursor_left(&mut self) {
        self.ndc = None;
    }

    /// Current position, `None` while the cursor is outside the viewport.
    #[must_use]
    pub fn ndc(&self) -> Option<Vec2> {
        self.ndc
    }

    /// Whether the pointer moved since the last clear.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.moved
    }

    /// Clears the per-frame `moved` flag.
    pub fn clear_transients(&mut self) {
        self.moved = false;
    }
}
