//! Astronaut controller, camera rig and UFO flight controller.

pub mod camera_rig;
pub mod character;
pub mod vehicle;

pub use camera_rig::{CameraPose, CameraRig, FollowInput, FreeRoamPhase, smoothing_factor};
pub use character::{
    AnimationCue, Character, PLANET_RADIUS, astronaut_blueprint, astronaut_spawn,
    is_ground_contact, movement_velocity, reorient_to_local_up, shadow_opacity, turn_steering,
};
pub use vehicle::{VehicleController, VehicleInput, chase_marker, ufo_blueprint, ufo_spawn};
