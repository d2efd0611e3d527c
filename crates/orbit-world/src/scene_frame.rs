//! Per-frame output: where every visual node is and what the camera sees.
//!
//! A renderer only ever reads a [`SceneFrame`]; nothing here points back into
//! the physics world.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use orbit_physics::{BodyHandle, PhysicsWorld};
use orbit_player::{AnimationCue, CameraPose, CameraRig, Character, shadow_opacity};

use crate::mode::{Mode, ModeMachine};
use crate::props::{Hidden, Parked, Prop, PropKind, VisualId};
use crate::soccer::SoccerState;
use crate::systems::{FrameClock, Hover};

/// Transform of one visual node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub kind: PropKind,
    pub visual: VisualId,
    pub position: Vec3,
    pub rotation: Quat,
    pub visible: bool,
}

/// Node transforms written by [`visual_sync_system`], in visual id order.
#[derive(Resource, Debug, Clone, Default)]
pub struct SceneNodes(pub Vec<NodeTransform>);

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    pub frame: u64,
    pub mode: Mode,
    /// Nodes in visual id order.
    pub nodes: Vec<NodeTransform>,
    pub camera: CameraPose,
    pub astronaut_visible: bool,
    pub animation: AnimationCue,
    pub shadow_opacity: f32,
    pub shelf_signal: f32,
    /// The ball sits inside the goal.
    pub goal_alert: bool,
    pub hovered: Option<PropKind>,
}

impl SceneFrame {
    pub fn node(&self, kind: PropKind) -> Option<&NodeTransform> {
        self.nodes.iter().find(|n| n.kind == kind)
    }
}

/// Copies every prop pose, live or parked, onto its visual node.
pub fn visual_sync_system(
    physics: Res<PhysicsWorld>,
    mut nodes: ResMut<SceneNodes>,
    props: Query<(&Prop, Option<&BodyHandle>, Option<&Parked>, Has<Hidden>)>,
) {
    nodes.0.clear();
    for (prop, body, parked, hidden) in props.iter() {
        let pose = match (body, parked) {
            (Some(body), _) => physics
                .body_translation(body.0)
                .zip(physics.body_rotation(body.0)),
            (None, Some(parked)) => Some((parked.0.position, parked.0.rotation)),
            (None, None) => None,
        };
        let Some((position, rotation)) = pose else {
            continue;
        };
        nodes.0.push(NodeTransform {
            kind: prop.kind,
            visual: prop.visual,
            position,
            rotation,
            visible: !hidden,
        });
    }
    nodes.0.sort_by_key(|n| n.visual.0);
}

/// Assembles the frame output from the synced nodes and the frame resources.
pub fn capture(world: &mut World) -> SceneFrame {
    let mut astronaut = world.query::<&Character>();
    let animation = astronaut
        .get_single(world)
        .map(|c| c.animation)
        .unwrap_or_default();

    let nodes = world.resource::<SceneNodes>().0.clone();
    let astronaut_node = nodes
        .iter()
        .find(|n| n.kind == PropKind::Astronaut && n.visible);
    let machine = world.resource::<ModeMachine>();
    SceneFrame {
        frame: world.resource::<FrameClock>().frame,
        mode: machine.mode(),
        camera: world.resource::<CameraRig>().pose,
        astronaut_visible: astronaut_node.is_some(),
        animation,
        shadow_opacity: astronaut_node.map_or(0.0, |n| shadow_opacity(n.position)),
        shelf_signal: machine.shelf_signal,
        goal_alert: world.resource::<SoccerState>().alert,
        hovered: world.resource::<Hover>().0,
        nodes,
    }
}
