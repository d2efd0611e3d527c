//! Fixed-timestep clock for the physics substeps.
//!
//! Frame time is accumulated and spent in whole fixed steps. At most
//! `max_substeps` steps run per frame; whatever is left beyond that is dropped
//! so a long frame costs a bounded amount of work instead of snowballing.

use bevy_ecs::prelude::*;
use tracing::warn;

/// Slack for frame times that arrive as rounded milliseconds.
const STEP_EPSILON: f64 = 1e-6;

/// Fixed-step accumulator.
#[derive(Resource, Debug, Clone)]
pub struct StepClock {
    fixed_dt: f64,
    max_substeps: u32,
    accumulator: f64,
    total_sim_time: f64,
    step_count: u64,
}

impl StepClock {
    /// Creates a clock stepping `fixed_dt` seconds, at most `max_substeps`
    /// times per frame.
    pub fn new(fixed_dt: f64, max_substeps: u32) -> Self {
        Self {
            fixed_dt,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
            total_sim_time: 0.0,
            step_count: 0,
        }
    }

    /// Adds one frame of time and returns how many fixed steps to run.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        self.accumulator += frame_dt;

        let mut steps = 0;
        while self.accumulator + STEP_EPSILON >= self.fixed_dt && steps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        if self.accumulator + STEP_EPSILON >= self.fixed_dt {
            warn!(
                "Frame time {:.1}ms exceeds {} substeps, dropping {:.1}ms",
                frame_dt * 1000.0,
                self.max_substeps,
                self.accumulator * 1000.0
            );
            self.accumulator %= self.fixed_dt;
            if self.accumulator + STEP_EPSILON >= self.fixed_dt {
                self.accumulator = 0.0;
            }
        }
        self.accumulator = self.accumulator.max(0.0);

        self.total_sim_time += f64::from(steps) * self.fixed_dt;
        self.step_count += u64::from(steps);
        steps
    }

    /// Leftover time as a fraction of one step, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / self.fixed_dt
        } else {
            0.0
        }
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn max_substeps(&self) -> u32 {
        self.max_substeps
    }

    /// Returns the total number of fixed steps executed.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Returns the total simulated time in seconds.
    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn test_single_step() {
        let mut clock = StepClock::default();
        assert_eq!(clock.advance(DT), 1);
        assert!(clock.alpha() < 1e-9);
    }

    #[test]
    fn test_partial_frame_runs_no_step() {
        let mut clock = StepClock::default();
        assert_eq!(clock.advance(0.5 * DT), 0);
        assert!((clock.alpha() - 0.5).abs() < 1e-9, "alpha={}", clock.alpha());
        assert_eq!(clock.advance(0.5 * DT), 1);
    }

    #[test]
    fn test_multiple_steps_in_one_frame() {
        let mut clock = StepClock::default();
        assert_eq!(clock.advance(2.0 * DT), 2);
        assert!((clock.total_sim_time() - 2.0 * DT).abs() < 1e-12);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut clock = StepClock::new(DT, 3);
        assert_eq!(clock.advance(1.0), 3);
        assert!(clock.alpha() < 1.0, "excess dropped, alpha={}", clock.alpha());
        // The next normal frame is not paying for the dropped time.
        assert_eq!(clock.advance(DT), 1);
    }

    #[test]
    fn test_zero_and_invalid_frames() {
        let mut clock = StepClock::default();
        assert_eq!(clock.advance(0.0), 0);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.step_count(), 0);
    }

    #[test]
    fn test_deterministic_sequence() {
        let frame_times = [0.017, 0.015, 0.020, 0.016, 0.033, 0.008, 0.018];
        let mut a = StepClock::default();
        let mut b = StepClock::default();
        for &ft in &frame_times {
            assert_eq!(a.advance(ft), b.advance(ft));
        }
        assert_eq!(a.step_count(), b.step_count());
        let expected = a.step_count() as f64 * DT;
        assert!((a.total_sim_time() - expected).abs() < 1e-10);
    }

    #[test]
    fn test_single_precision_frame_runs_one_step() {
        let fixed = f64::from(1.0_f32 / 60.0);
        let mut clock = StepClock::new(fixed, 3);
        let frame_ms: f32 = 1000.0 / 60.0;
        assert_eq!(clock.advance(f64::from(frame_ms) / 1000.0), 1);
    }

    #[test]
    fn test_zero_substeps_clamped_to_one() {
        let clock = StepClock::new(DT, 0);
        assert_eq!(clock.max_substeps(), 1);
    }
}
