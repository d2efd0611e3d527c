//! Scene props and the scene layout.
//!
//! Every prop is an entity with the same shape: a [`Prop`] tag naming it and
//! its visual node, a [`BodyHandle`] while its body is simulated, the
//! [`PropColliders`] attached to that body and the [`Blueprint`] it was built
//! from. Optional components add behaviour: [`CentralGravity`],
//! [`TriggerVolume`], [`CameraMarker`], [`Bobbing`]. Adding a prop means
//! adding an entity here, nothing else.

use std::f32::consts::FRAC_PI_2;
use std::fmt;

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use orbit_config::Config;
use orbit_physics::rapier3d::prelude::*;
use orbit_physics::{
    BodyBlueprint, BodyHandle, CentralGravity, DEFAULT_MATERIAL, ParkedBody, PhysicsWorld,
    to_axis_angle, to_vector,
};
use orbit_player::{
    CameraPose, Character, PLANET_RADIUS, VehicleController, astronaut_blueprint, astronaut_spawn,
    ufo_blueprint, ufo_spawn,
};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::mode::Mode;

/// Named props of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropKind {
    Planet,
    Astronaut,
    Ufo,
    LogoBase,
    Logo,
    Shelf,
    Moon,
    Satellite,
    Rover,
    Lander,
    Ball,
    Goal,
}

impl PropKind {
    pub fn name(self) -> &'static str {
        match self {
            PropKind::Planet => "planet",
            PropKind::Astronaut => "astronaut",
            PropKind::Ufo => "ufo",
            PropKind::LogoBase => "logo-base",
            PropKind::Logo => "logo",
            PropKind::Shelf => "shelf",
            PropKind::Moon => "moon",
            PropKind::Satellite => "satellite",
            PropKind::Rover => "rover",
            PropKind::Lander => "lander",
            PropKind::Ball => "ball",
            PropKind::Goal => "goal",
        }
    }

    /// Prop whose trigger and camera marker belong to `mode`.
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::FreeRoam => None,
            Mode::ShelfInspect => Some(PropKind::Shelf),
            Mode::VehiclePilot => Some(PropKind::Ufo),
            Mode::KioskInspect => Some(PropKind::LogoBase),
        }
    }
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque handle of the renderer's scene node for a prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualId(pub u32);

#[derive(Component, Debug, Clone, Copy)]
pub struct Prop {
    pub kind: PropKind,
    pub visual: VisualId,
}

/// How to rebuild the prop's body after it was parked.
#[derive(Component, Clone)]
pub struct Blueprint(pub BodyBlueprint);

/// Colliders of the prop's live body, in blueprint order (triggers excluded).
#[derive(Component, Debug, Clone, Default)]
pub struct PropColliders(pub Vec<ColliderHandle>);

/// Present while the prop's body is out of the simulation.
#[derive(Component, Debug, Clone, Copy)]
pub struct Parked(pub ParkedBody);

/// The prop's visual node is hidden.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Hidden;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerShape {
    /// Cylinder along the trigger's local Y.
    Cylinder { radius: f32, half_height: f32 },
    Cuboid { half_extents: Vec3 },
}

/// Sensor volume attached to a prop body.
#[derive(Component, Debug, Clone)]
pub struct TriggerVolume {
    /// Mode the trigger enables, `None` for gameplay-only triggers.
    pub mode: Option<Mode>,
    pub shape: TriggerShape,
    pub local_offset: Vec3,
    pub local_rotation: Quat,
    /// Sensor collider, set once attached.
    pub sensor: Option<ColliderHandle>,
}

impl TriggerVolume {
    pub fn new(mode: Option<Mode>, shape: TriggerShape) -> Self {
        Self {
            mode,
            shape,
            local_offset: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            sensor: None,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.local_offset = offset;
        self
    }

    /// Sensor collider for this volume. Sensors carry no mass.
    pub fn collider(&self) -> ColliderBuilder {
        let builder = match self.shape {
            TriggerShape::Cylinder {
                radius,
                half_height,
            } => ColliderBuilder::cylinder(half_height, radius),
            TriggerShape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        };
        builder
            .translation(to_vector(self.local_offset))
            .rotation(to_axis_angle(self.local_rotation))
            .sensor(true)
            .density(0.0)
            .active_events(ActiveEvents::COLLISION_EVENTS)
    }
}

/// Camera placement attached to a prop frame, used by the inspection modes.
#[derive(Component, Debug, Clone, Copy)]
pub struct CameraMarker {
    pub offset: Vec3,
    pub look_offset: Vec3,
}

impl CameraMarker {
    /// Marker pose for the prop at `position`/`rotation`, with the given up.
    pub fn pose(&self, position: Vec3, rotation: Quat, up: Vec3) -> CameraPose {
        CameraPose {
            position: position + rotation * self.offset,
            look_at: position + rotation * self.look_offset,
            up,
        }
    }
}

/// Kinematic oscillation along an axis.
///
/// Optionally rises away from the astronaut while it is closer than
/// `approach_radius` to the anchor.
#[derive(Component, Debug, Clone, Copy)]
pub struct Bobbing {
    pub anchor: Vec3,
    pub axis: Vec3,
    pub amplitude: f32,
    /// Angular rate of the oscillation, rad/s.
    pub rate: f32,
    pub approach_radius: Option<f32>,
}

impl Bobbing {
    const APPROACH_DIVISOR: f32 = 1.8;

    pub fn position_at(&self, elapsed_s: f32, astronaut: Option<Vec3>) -> Vec3 {
        let mut along = self.amplitude * (elapsed_s * self.rate).sin();
        if let (Some(radius), Some(astronaut)) = (self.approach_radius, astronaut) {
            let distance = astronaut.distance(self.anchor);
            if distance < radius {
                along += (radius - distance) / Self::APPROACH_DIVISOR;
            }
        }
        self.anchor + self.axis * along
    }
}

/// Prop entities by kind.
#[derive(Resource, Debug, Clone, Default)]
pub struct SceneIndex {
    entities: FxHashMap<PropKind, Entity>,
}

impl SceneIndex {
    pub fn get(&self, kind: PropKind) -> Option<Entity> {
        self.entities.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Orientation whose local up points away from the planet center.
pub fn radial_rotation(position: Vec3) -> Quat {
    Quat::from_rotation_arc(Vec3::Y, position.normalize_or(Vec3::Y))
}

/// Spawns prop entities and their bodies.
struct SceneBuilder<'w> {
    world: &'w mut World,
    index: SceneIndex,
}

impl SceneBuilder<'_> {
    fn spawn(&mut self, kind: PropKind, blueprint: BodyBlueprint) -> Entity {
        let spawned = blueprint.spawn(&mut self.world.resource_mut::<PhysicsWorld>());
        let visual = VisualId(self.index.len() as u32);
        let entity = self
            .world
            .spawn((
                Prop { kind, visual },
                BodyHandle(spawned.body),
                PropColliders(spawned.colliders),
                Blueprint(blueprint),
            ))
            .id();
        self.index.entities.insert(kind, entity);
        debug!(prop = %kind, body = ?spawned.body, "prop spawned");
        entity
    }

    fn spawn_with_gravity(&mut self, kind: PropKind, blueprint: BodyBlueprint) -> Entity {
        let entity = self.spawn(kind, blueprint);
        self.world.entity_mut(entity).insert(CentralGravity);
        entity
    }

    fn attach_trigger(&mut self, entity: Entity, mut trigger: TriggerVolume) {
        let Some(body) = self.world.get::<BodyHandle>(entity).copied() else {
            return;
        };
        let sensor = self.world.resource_mut::<PhysicsWorld>().insert_collider(
            trigger.collider(),
            DEFAULT_MATERIAL,
            body.0,
        );
        trigger.sensor = Some(sensor);
        self.world.entity_mut(entity).insert(trigger);
    }
}

fn dynamic_at(position: Vec3, rotation: Quat) -> RigidBodyBuilder {
    RigidBodyBuilder::dynamic()
        .translation(to_vector(position))
        .rotation(to_axis_angle(rotation))
}

fn fixed_at(position: Vec3, rotation: Quat) -> RigidBodyBuilder {
    RigidBodyBuilder::fixed()
        .translation(to_vector(position))
        .rotation(to_axis_angle(rotation))
}

fn kinematic_at(position: Vec3, rotation: Quat) -> RigidBodyBuilder {
    RigidBodyBuilder::kinematic_position_based()
        .translation(to_vector(position))
        .rotation(to_axis_angle(rotation))
}

fn ball_at(radius: f32, offset: Vec3, mass: f32) -> ColliderBuilder {
    ColliderBuilder::ball(radius)
        .translation(to_vector(offset))
        .mass(mass)
}

fn planet_blueprint() -> BodyBlueprint {
    const WALL: f32 = 200.0;
    let mut blueprint = BodyBlueprint::new(RigidBodyBuilder::fixed())
        .with_collider(ColliderBuilder::ball(PLANET_RADIUS), DEFAULT_MATERIAL)
        .with_collider(
            ColliderBuilder::cylinder(1.5, 6.0).translation(Vector::new(0.0, -14.3, 0.0)),
            DEFAULT_MATERIAL,
        );
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        let half = Vec3::splat(WALL) - axis * (WALL - 1.0);
        for side in [-1.0, 1.0] {
            blueprint = blueprint.with_collider(
                ColliderBuilder::cuboid(half.x, half.y, half.z)
                    .translation(to_vector(axis * side * (WALL + 1.0))),
                DEFAULT_MATERIAL,
            );
        }
    }
    blueprint
}

/// Builds every prop of the scene into `world`, which must already hold the
/// [`PhysicsWorld`].
pub fn build_scene(world: &mut World, config: &Config) {
    let mut scene = SceneBuilder {
        world,
        index: SceneIndex::default(),
    };

    scene.spawn(PropKind::Planet, planet_blueprint());

    let astronaut = scene.spawn_with_gravity(PropKind::Astronaut, astronaut_blueprint(astronaut_spawn()));
    scene.world.entity_mut(astronaut).insert(Character::new(
        config.player.clone(),
        config.physics.min_gravity_distance,
    ));

    let (ufo_position, ufo_rotation) = ufo_spawn();
    let ufo = scene.spawn_with_gravity(PropKind::Ufo, ufo_blueprint(ufo_position, ufo_rotation));
    scene
        .world
        .entity_mut(ufo)
        .insert(VehicleController::new(config.vehicle.clone()));
    scene.attach_trigger(
        ufo,
        TriggerVolume::new(
            Some(Mode::VehiclePilot),
            TriggerShape::Cylinder {
                radius: 5.0,
                half_height: 4.0,
            },
        ),
    );

    // Kiosk: fixed base with the trigger and camera marker, logo bobbing above it.
    let facing_z = Quat::from_rotation_x(FRAC_PI_2);
    let base = scene.spawn(
        PropKind::LogoBase,
        BodyBlueprint::new(fixed_at(Vec3::new(0.0, 0.0, 14.8), facing_z))
            .with_collider(ColliderBuilder::cylinder(0.5, 3.0), DEFAULT_MATERIAL),
    );
    scene.attach_trigger(
        base,
        TriggerVolume::new(
            Some(Mode::KioskInspect),
            TriggerShape::Cylinder {
                radius: 4.3,
                half_height: 1.5,
            },
        )
        .with_offset(Vec3::new(0.0, 1.2, 0.0)),
    );
    scene.world.entity_mut(base).insert(CameraMarker {
        offset: Vec3::new(0.0, 6.0, 8.0),
        look_offset: Vec3::new(0.0, 3.2, 0.0),
    });

    let logo_anchor = Vec3::new(0.0, 0.0, 18.0);
    let logo = scene.spawn(
        PropKind::Logo,
        BodyBlueprint::new(kinematic_at(logo_anchor, facing_z))
            .with_collider(ColliderBuilder::cylinder(0.75, 2.0), DEFAULT_MATERIAL),
    );
    scene.world.entity_mut(logo).insert(Bobbing {
        anchor: logo_anchor,
        axis: Vec3::Z,
        amplitude: 0.5,
        rate: 1.0 / 1.2,
        approach_radius: Some(6.0),
    });

    let shelf_position = Vec3::new(12.0, -6.0, 10.0);
    let mut shelf_blueprint = BodyBlueprint::new(dynamic_at(shelf_position, radial_rotation(shelf_position)))
        .with_collider(ColliderBuilder::cuboid(2.7, 1.0, 0.7).mass(0.8), DEFAULT_MATERIAL);
    for (x, z) in [(2.4, 0.45), (2.4, -0.45), (-2.4, 0.45), (-2.4, -0.45)] {
        shelf_blueprint = shelf_blueprint.with_collider(ball_at(0.25, Vec3::new(x, -1.0, z), 0.05), DEFAULT_MATERIAL);
    }
    let shelf = scene.spawn_with_gravity(PropKind::Shelf, shelf_blueprint);
    scene.attach_trigger(
        shelf,
        TriggerVolume::new(
            Some(Mode::ShelfInspect),
            TriggerShape::Cylinder {
                radius: 3.5,
                half_height: 1.0,
            },
        ),
    );
    scene.world.entity_mut(shelf).insert(CameraMarker {
        offset: Vec3::new(0.0, 1.5, -5.0),
        look_offset: Vec3::new(0.0, 1.0, 0.0),
    });

    scene.spawn_with_gravity(
        PropKind::Moon,
        BodyBlueprint::new(
            dynamic_at(Vec3::new(150.0, 0.0, 150.0), Quat::IDENTITY).linvel(Vector::new(0.0, 25.0, 0.0)),
        )
        .with_collider(ColliderBuilder::ball(3.0).mass(1.0), DEFAULT_MATERIAL),
    );

    let satellite_anchor = Vec3::new(-20.0, 30.0, -50.0);
    let satellite = scene.spawn(
        PropKind::Satellite,
        BodyBlueprint::new(kinematic_at(satellite_anchor, radial_rotation(satellite_anchor)))
            .with_collider(ColliderBuilder::cuboid(0.5, 0.3, 0.5), DEFAULT_MATERIAL)
            .with_collider(ColliderBuilder::cuboid(2.8, 0.1, 0.5), DEFAULT_MATERIAL),
    );
    scene.world.entity_mut(satellite).insert(Bobbing {
        anchor: satellite_anchor,
        axis: Vec3::Y,
        amplitude: 1.0,
        rate: 1.0,
        approach_radius: None,
    });

    let rover_position = Vec3::new(10.0, -2.0, -13.0);
    let mut rover = BodyBlueprint::new(dynamic_at(rover_position, radial_rotation(rover_position)))
        .with_collider(ColliderBuilder::cuboid(0.95, 0.55, 0.3).mass(0.6), DEFAULT_MATERIAL);
    for (x, z) in [(0.8, 0.5), (0.8, -0.5), (-0.8, 0.5), (-0.8, -0.5)] {
        rover = rover.with_collider(ball_at(0.16, Vec3::new(x, -0.6, z), 0.1), DEFAULT_MATERIAL);
    }
    scene.spawn_with_gravity(PropKind::Rover, rover);

    let lander_position = Vec3::new(0.0, -7.0, -15.0);
    let mut lander = BodyBlueprint::new(dynamic_at(lander_position, radial_rotation(lander_position)))
        .with_collider(ColliderBuilder::cuboid(1.2, 0.8, 1.2).mass(0.5), DEFAULT_MATERIAL)
        .with_collider(
            ColliderBuilder::cuboid(3.2, 0.2, 1.0)
                .translation(Vector::new(0.0, 0.2, 0.0))
                .mass(0.1),
            DEFAULT_MATERIAL,
        );
    for (x, z) in [(2.05, 0.0), (-2.05, 0.0), (0.0, 2.05), (0.0, -2.05)] {
        lander = lander.with_collider(ball_at(0.4, Vec3::new(x, -1.25, z), 0.1), DEFAULT_MATERIAL);
    }
    scene.spawn_with_gravity(PropKind::Lander, lander);

    scene.spawn_with_gravity(
        PropKind::Ball,
        BodyBlueprint::new(dynamic_at(Vec3::new(-10.0, 13.0, 0.0), Quat::IDENTITY)).with_collider(
            ColliderBuilder::ball(1.0)
                .mass(1.0)
                .active_events(ActiveEvents::COLLISION_EVENTS),
            DEFAULT_MATERIAL,
        ),
    );

    // Goal frame: back net, crossbar and two side nets, opening toward local +Z.
    let goal_position = Vec3::new(-17.0, 0.0, 0.0);
    let goal_blueprint = BodyBlueprint::new(dynamic_at(goal_position, radial_rotation(goal_position)))
        .with_collider(
            ColliderBuilder::cuboid(3.0, 2.0, 0.1)
                .translation(Vector::new(0.0, 0.0, -1.2))
                .mass(0.25),
            DEFAULT_MATERIAL,
        )
        .with_collider(
            ColliderBuilder::cuboid(3.0, 0.1, 1.15)
                .translation(Vector::new(0.0, 1.9, 0.0))
                .mass(0.25),
            DEFAULT_MATERIAL,
        )
        .with_collider(
            ColliderBuilder::cuboid(0.1, 1.9, 1.15)
                .translation(Vector::new(3.1, 0.0, 0.0))
                .mass(0.25),
            DEFAULT_MATERIAL,
        )
        .with_collider(
            ColliderBuilder::cuboid(0.1, 1.9, 1.15)
                .translation(Vector::new(-3.1, 0.0, 0.0))
                .mass(0.25),
            DEFAULT_MATERIAL,
        );
    let goal = scene.spawn_with_gravity(PropKind::Goal, goal_blueprint);
    scene.attach_trigger(
        goal,
        TriggerVolume::new(
            None,
            TriggerShape::Cuboid {
                half_extents: Vec3::new(2.0, 1.0, 0.5),
            },
        ),
    );

    info!(props = scene.index.len(), "scene built");
    let index = scene.index;
    world.insert_resource(index);
}
