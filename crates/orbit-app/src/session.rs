//! A headless play session: the built-in demo script and the per-frame
//! bookkeeping the driver logs.

use glam::Vec3;
use orbit_input::{InputProvider, InputScript, KeyCode, ScriptSegment};
use orbit_world::{Mode, PropKind, SceneFrame, SimContext};
use tracing::{debug, info};

/// Frames between two progress lines.
const PROGRESS_INTERVAL: u64 = 60;

fn segment(start: u32, end: u32, keys: &[KeyCode]) -> ScriptSegment {
    ScriptSegment {
        start,
        end,
        keys: keys.to_vec(),
        pointer: None,
    }
}

/// Walk, turn, jump and walk again.
pub fn demo_script() -> InputScript {
    InputScript {
        segments: vec![
            segment(30, 180, &[KeyCode::KeyW]),
            segment(120, 200, &[KeyCode::KeyA]),
            segment(240, 250, &[KeyCode::Space]),
            segment(300, 480, &[KeyCode::KeyW]),
            segment(420, 440, &[KeyCode::KeyD]),
        ],
    }
}

/// Totals reported at the end of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: u64,
    pub mode_changes: u32,
    pub jumps: u32,
    pub goals: u32,
    pub final_mode: Mode,
    pub astronaut_position: Option<Vec3>,
}

/// Runs frames and keeps the summary current.
pub struct Session {
    ctx: SimContext,
    summary: SessionSummary,
}

impl Session {
    pub fn new(ctx: SimContext) -> Self {
        Self {
            ctx,
            summary: SessionSummary::default(),
        }
    }

    pub fn ctx_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn step(&mut self, frame_ms: f32, input: &mut dyn InputProvider) -> SceneFrame {
        let frame = self.ctx.frame(frame_ms, input);

        if frame.mode != self.summary.final_mode {
            self.summary.mode_changes += 1;
            info!(frame = frame.frame, from = %self.summary.final_mode, to = %frame.mode, "mode");
        }
        self.summary.frames = frame.frame;
        self.summary.final_mode = frame.mode;
        self.summary.goals = self.ctx.soccer().goals;
        self.summary.jumps = self.ctx.character().map_or(0, |c| c.jumps);
        self.summary.astronaut_position = frame.node(PropKind::Astronaut).map(|n| n.position);

        if frame.frame % PROGRESS_INTERVAL == 0 {
            debug!(
                frame = frame.frame,
                mode = %frame.mode,
                position = ?self.summary.astronaut_position,
                animation = ?frame.animation,
                camera = %frame.camera.position,
                "progress"
            );
        }
        frame
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use orbit_config::Config;
    use orbit_input::ScriptedInput;

    use super::*;

    #[test]
    fn test_demo_script_covers_walk_and_jump() {
        let script = demo_script();
        assert_eq!(script.len_frames(), 480);
        assert!(script.snapshot_at(100).keys.contains(&KeyCode::KeyW));
        assert!(script.snapshot_at(245).keys.contains(&KeyCode::Space));
        assert!(script.snapshot_at(0).keys.is_empty());
    }

    #[test]
    fn test_session_tracks_frames_and_position() {
        let mut session = Session::new(SimContext::new(&Config::default()));
        let mut input = ScriptedInput::new(demo_script());
        for _ in 0..120 {
            session.step(1000.0 / 60.0, &mut input);
        }
        let summary = session.summary();
        assert_eq!(summary.frames, 120);
        assert_eq!(summary.final_mode, Mode::FreeRoam);
        assert_eq!(summary.mode_changes, 0);
        let position = summary.astronaut_position.expect("astronaut visible node");
        assert!(position.z > 0.5, "walked forward, at {position}");
    }
}
