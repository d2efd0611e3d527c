//! Ball and goal mini-game.
//!
//! Each time the ball enters the goal sensor it counts a goal and, after a
//! short delay, the goal spits the ball back out by scaling its velocity with
//! a negative factor. Every third goal in a row the goal gets angry and the
//! push is much stronger. Walking into a ball that is moving faster than the
//! astronaut bounces it back.

use bevy_ecs::prelude::*;
use glam::Vec3;
use orbit_physics::{BodyHandle, PhysicsWorld, to_vec3, to_vector};
use tracing::{debug, info};

use crate::props::{PropColliders, PropKind, SceneIndex, TriggerVolume};
use crate::systems::{FrameClock, StepEvents};

const PUSH_DELAY_MS: f32 = 200.0;
const PUSH_FACTOR: f32 = -2.0;
const ANGRY_DELAY_MS: f32 = 1000.0;
const ANGRY_FACTOR: f32 = -8.0;
const ANGRY_STREAK: u32 = 3;

/// Ball push scheduled by a goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingPush {
    pub remaining_ms: f32,
    pub factor: f32,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SoccerState {
    pub goals: u32,
    pub streak: u32,
    pub pending_push: Option<PendingPush>,
    /// The ball is inside the goal sensor.
    pub alert: bool,
    pub angry: bool,
}

impl SoccerState {
    /// Counts a goal and schedules the push back out. A push still pending
    /// from an earlier goal is dropped.
    pub fn on_ball_entered(&mut self) -> PendingPush {
        self.goals += 1;
        self.streak += 1;
        self.alert = true;
        let push = if self.streak >= ANGRY_STREAK {
            self.streak = 0;
            self.angry = true;
            PendingPush {
                remaining_ms: ANGRY_DELAY_MS,
                factor: ANGRY_FACTOR,
            }
        } else {
            PendingPush {
                remaining_ms: PUSH_DELAY_MS,
                factor: PUSH_FACTOR,
            }
        };
        self.pending_push = Some(push);
        push
    }

    pub fn on_ball_left(&mut self) {
        self.alert = false;
    }

    /// Counts down the pending push. Returns the velocity factor on the frame
    /// it fires.
    pub fn tick(&mut self, dt_ms: f32) -> Option<f32> {
        let push = self.pending_push.as_mut()?;
        push.remaining_ms -= dt_ms;
        if push.remaining_ms > 0.0 {
            return None;
        }
        let factor = push.factor;
        self.pending_push = None;
        self.angry = false;
        Some(factor)
    }
}

/// New ball velocity after the astronaut walks into it, if it bounces.
pub fn kick_response(ball_velocity: Vec3, astronaut_velocity: Vec3) -> Option<Vec3> {
    (ball_velocity.length_squared() > astronaut_velocity.length_squared()).then_some(-ball_velocity)
}

/// Post-step: goal counting, delayed pushes and kicks.
pub fn soccer_system(
    clock: Res<FrameClock>,
    events: Res<StepEvents>,
    index: Res<SceneIndex>,
    mut soccer: ResMut<SoccerState>,
    mut physics: ResMut<PhysicsWorld>,
    props: Query<(&PropColliders, &BodyHandle)>,
    triggers: Query<&TriggerVolume>,
) {
    let Some((ball_colliders, ball_body)) = index
        .get(PropKind::Ball)
        .and_then(|e| props.get(e).ok())
        .map(|(c, b)| (c.0.clone(), b.0))
    else {
        return;
    };
    let goal_sensor = index
        .get(PropKind::Goal)
        .and_then(|e| triggers.get(e).ok())
        .and_then(|t| t.sensor);
    let astronaut = index
        .get(PropKind::Astronaut)
        .and_then(|e| props.get(e).ok())
        .map(|(c, b)| (c.0.clone(), b.0));

    if let Some(factor) = soccer.tick(clock.dt_ms) {
        if let Some(body) = physics.rigid_body_set.get_mut(ball_body) {
            let velocity = to_vec3(body.linvel()) * factor;
            body.set_linvel(to_vector(velocity), true);
            debug!(%velocity, factor, "goal pushed the ball out");
        }
    }

    for event in events.frame.iter().filter(|e| !e.removed) {
        let ball_side = ball_colliders
            .iter()
            .find_map(|c| event.other(*c));
        let Some(other) = ball_side else {
            continue;
        };

        if event.sensor && Some(other) == goal_sensor {
            if event.started {
                let push = soccer.on_ball_entered();
                info!(goals = soccer.goals, angry = soccer.angry, delay_ms = push.remaining_ms, "goal");
            } else {
                soccer.on_ball_left();
            }
            continue;
        }

        let Some((astronaut_colliders, astronaut_body)) = &astronaut else {
            continue;
        };
        if event.sensor || !event.started || !astronaut_colliders.contains(&other) {
            continue;
        }
        let Some(astronaut_velocity) = physics.body_linvel(*astronaut_body) else {
            continue;
        };
        if let Some(body) = physics.rigid_body_set.get_mut(ball_body) {
            if let Some(velocity) = kick_response(to_vec3(body.linvel()), astronaut_velocity) {
                body.set_linvel(to_vector(velocity), true);
                debug!(%velocity, "ball bounced off the astronaut");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_schedules_push() {
        let mut soccer = SoccerState::default();
        let push = soccer.on_ball_entered();
        assert_eq!(push.factor, PUSH_FACTOR);
        assert!(soccer.alert);
        assert_eq!(soccer.goals, 1);

        assert_eq!(soccer.tick(150.0), None);
        assert_eq!(soccer.tick(60.0), Some(PUSH_FACTOR));
        assert_eq!(soccer.tick(16.0), None, "push fires once");
    }

    #[test]
    fn test_third_goal_in_a_row_is_angry() {
        let mut soccer = SoccerState::default();
        soccer.on_ball_entered();
        soccer.on_ball_entered();
        let push = soccer.on_ball_entered();
        assert!(soccer.angry);
        assert_eq!(push.factor, ANGRY_FACTOR);
        assert_eq!(push.remaining_ms, ANGRY_DELAY_MS);
        assert_eq!(soccer.streak, 0);
        assert_eq!(soccer.goals, 3);

        assert_eq!(soccer.tick(999.0), None);
        assert_eq!(soccer.tick(1.0), Some(ANGRY_FACTOR));
        assert!(!soccer.angry);
    }

    #[test]
    fn test_new_goal_replaces_pending_push() {
        let mut soccer = SoccerState::default();
        soccer.on_ball_entered();
        soccer.tick(150.0);
        soccer.on_ball_entered();
        assert_eq!(soccer.tick(100.0), None, "delay restarted");
        assert_eq!(soccer.tick(100.0), Some(PUSH_FACTOR));
    }

    #[test]
    fn test_ball_leaving_clears_alert() {
        let mut soccer = SoccerState::default();
        soccer.on_ball_entered();
        soccer.on_ball_left();
        assert!(!soccer.alert);
        assert!(soccer.pending_push.is_some());
    }

    #[test]
    fn test_kick_only_reverses_faster_ball() {
        let ball = Vec3::new(3.0, 0.0, 0.0);
        assert_eq!(kick_response(ball, Vec3::new(1.0, 0.0, 0.0)), Some(-ball));
        assert_eq!(kick_response(ball, Vec3::new(0.0, 4.0, 0.0)), None);
    }
}
