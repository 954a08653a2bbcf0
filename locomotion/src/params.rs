/*!
Player locomotion configuration.

`PlayerLocomotionParams` groups the smooth locomotion settings, the teleport
settings and the collision params of the player body. Like the collision
params it is loadable from TOML with every missing field defaulted:

```toml
max_speed = 3.0
snap_turn = false

[teleport.detection]
max_distance = 5.0

[teleport.detection.visibility]
requirement = "head_or_feet"

[collision]
radius = 0.25
```
*/

use collision::layer_flags::{PhysicsLayer, PhysicsLayerFlags};
use collision::{CollisionCheckParams, check::ParamsError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SPEED: f32 = 2.0;
pub const DEFAULT_MAX_ROTATION_SPEED: f32 = 100.0;
pub const DEFAULT_SNAP_TURN_ANGLE: f32 = 30.0;
pub const DEFAULT_MIN_ANGLE_TO_FLY: f32 = 45.0;
pub const DEFAULT_GRAVITY_SPEED: f32 = 2.0;
pub const DEFAULT_STICK_IDLE_THRESHOLD: f32 = 0.1;
/// Snap turn fires above this stick intensity...
pub const SNAP_TURN_TRIGGER_THRESHOLD: f32 = 0.5;
/// ...and re-arms below this one.
pub const SNAP_TURN_RELEASE_THRESHOLD: f32 = 0.4;
/// Frames the stick must stay idle before the direction converter resets.
pub const STICK_IDLE_FRAMES: u32 = 2;

pub const DEFAULT_HEAD_HEIGHT: f32 = 1.65;

pub const DEFAULT_TELEPORT_MAX_DISTANCE: f32 = 3.0;
pub const DEFAULT_TELEPORT_MAX_HEIGHT_DIFFERENCE: f32 = 4.0;
pub const DEFAULT_GROUND_ANGLE_TO_IGNORE_UPWARD: f32 = 30.0;
pub const DEFAULT_TELEPORT_START_STICK_FORWARD: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum LocomotionParamsError {
    #[error("failed to parse locomotion params: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Collision(#[from] ParamsError),
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be in [0, 1], got {value}")]
    StickThresholdOutOfRange { name: &'static str, value: f32 },
    #[error("parable gravity must pull along -up, got {0}")]
    ParableGravityNotDownward(f32),
}

/// Which parts of the player must be visible from the head at the teleport position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityRequirement {
    #[default]
    None,
    Head,
    Feet,
    HeadAndFeet,
    HeadOrFeet,
}

/// Line-of-sight check between the current head and a candidate position.
///
/// A ray is cast from the head and from points on rings around it; a hit more
/// than `distance_from_hit_threshold` short of the target hides it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityCheckParams {
    pub requirement: VisibilityRequirement,
    pub radius: f32,
    pub feet_position_vertical_offset: f32,
    /// Zero means any hit hides the position.
    pub distance_from_hit_threshold: f32,
    pub circumference_slices: u32,
    pub circumference_steps: u32,
    pub circumference_rotation_per_step: f32,
    pub block_layer_flags: PhysicsLayerFlags,
}

impl Default for VisibilityCheckParams {
    fn default() -> Self {
        Self {
            requirement: VisibilityRequirement::None,
            radius: 0.05,
            feet_position_vertical_offset: 0.1,
            distance_from_hit_threshold: 0.1,
            circumference_slices: 6,
            circumference_steps: 1,
            circumference_rotation_per_step: 30.0,
            block_layer_flags: PhysicsLayerFlags::all(),
        }
    }
}

/// Sampling of the arc used to find a teleport position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParableParams {
    pub speed: f32,
    pub gravity: f32,
    pub step_length: f32,
}

impl Default for ParableParams {
    fn default() -> Self {
        Self {
            speed: 15.0,
            gravity: -30.0,
            step_length: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportDetectionParams {
    /// Maximum flat distance of the teleport position from the arc start.
    pub max_distance: f32,
    pub max_height_difference: f32,
    /// Ground steeper than this is rejected when teleporting upward (degrees).
    pub ground_angle_to_ignore_upward: f32,
    pub must_be_on_ground: bool,

    /// Layers that stop the arc.
    pub block_layer_flags: PhysicsLayerFlags,
    /// Layers a hit must belong to for its position to be a floor.
    pub floor_layer_flags: PhysicsLayerFlags,

    pub visibility: VisibilityCheckParams,

    /// The pointing forward must be at least this far from up/down (degrees)...
    pub forward_min_angle_to_be_valid_up: f32,
    pub forward_min_angle_to_be_valid_down: f32,
    /// ...and so must the arc direction after the extra vertical rotation.
    pub parable_forward_min_angle_to_be_valid_up: f32,
    pub parable_forward_min_angle_to_be_valid_down: f32,
    /// Pitch added to the pointing forward to get the arc direction (degrees);
    /// negative raises the arc.
    pub extra_vertical_rotation: f32,

    pub parable: ParableParams,

    /// Validate with a movement check from the feet instead of a teleport check.
    pub perform_teleport_as_movement: bool,
    pub teleport_as_movement_max_distance_from_target: f32,

    pub rotation_on_up_enabled: bool,
    pub rotation_on_up_min_stick_intensity: f32,
}

impl Default for TeleportDetectionParams {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_TELEPORT_MAX_DISTANCE,
            max_height_difference: DEFAULT_TELEPORT_MAX_HEIGHT_DIFFERENCE,
            ground_angle_to_ignore_upward: DEFAULT_GROUND_ANGLE_TO_IGNORE_UPWARD,
            must_be_on_ground: true,
            block_layer_flags: PhysicsLayerFlags::all(),
            floor_layer_flags: PhysicsLayerFlags::from_layers(&[PhysicsLayer::Default, PhysicsLayer::Floor]),
            visibility: VisibilityCheckParams::default(),
            forward_min_angle_to_be_valid_up: 7.5,
            forward_min_angle_to_be_valid_down: 7.5,
            parable_forward_min_angle_to_be_valid_up: 30.0,
            parable_forward_min_angle_to_be_valid_down: 0.0,
            extra_vertical_rotation: -30.0,
            parable: ParableParams::default(),
            perform_teleport_as_movement: false,
            teleport_as_movement_max_distance_from_target: 0.001,
            rotation_on_up_enabled: true,
            rotation_on_up_min_stick_intensity: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportParams {
    pub enabled: bool,
    /// Stick forward intensity that starts the detection.
    pub start_min_stick_forward: f32,
    pub detection: TeleportDetectionParams,
}

impl Default for TeleportParams {
    fn default() -> Self {
        Self {
            enabled: true,
            start_min_stick_forward: DEFAULT_TELEPORT_START_STICK_FORWARD,
            detection: TeleportDetectionParams::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerLocomotionParams {
    pub max_speed: f32,
    /// Smooth turn speed (degrees per second).
    pub max_rotation_speed: f32,
    pub snap_turn: bool,
    pub snap_turn_angle: f32,
    pub fly_enabled: bool,
    /// Pointing this far above/below the horizon starts flying (degrees).
    pub min_angle_to_fly: f32,
    pub gravity_speed: f32,
    pub stick_idle_threshold: f32,
    /// Height of the head above the feet, used when no tracked head is given.
    pub head_height: f32,
    pub teleport: TeleportParams,
    pub collision: CollisionCheckParams,
}

impl Default for PlayerLocomotionParams {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            max_rotation_speed: DEFAULT_MAX_ROTATION_SPEED,
            snap_turn: true,
            snap_turn_angle: DEFAULT_SNAP_TURN_ANGLE,
            fly_enabled: false,
            min_angle_to_fly: DEFAULT_MIN_ANGLE_TO_FLY,
            gravity_speed: DEFAULT_GRAVITY_SPEED,
            stick_idle_threshold: DEFAULT_STICK_IDLE_THRESHOLD,
            head_height: DEFAULT_HEAD_HEIGHT,
            teleport: TeleportParams::default(),
            collision: CollisionCheckParams::default(),
        }
    }
}

impl PlayerLocomotionParams {
    pub fn from_toml_str(source: &str) -> Result<Self, LocomotionParamsError> {
        let params: Self = toml::from_str(source)?;
        if let Err(error) = params.validate() {
            log::warn!("Rejected locomotion params: {error}");
            return Err(error);
        }
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), LocomotionParamsError> {
        self.collision.validate()?;

        positive("max_speed", self.max_speed)?;
        positive("snap_turn_angle", self.snap_turn_angle)?;
        stick_threshold("stick_idle_threshold", self.stick_idle_threshold)?;
        stick_threshold("teleport.start_min_stick_forward", self.teleport.start_min_stick_forward)?;

        let detection = &self.teleport.detection;
        positive("teleport.detection.max_distance", detection.max_distance)?;
        positive("teleport.detection.parable.speed", detection.parable.speed)?;
        positive("teleport.detection.parable.step_length", detection.parable.step_length)?;
        if !(detection.parable.gravity < 0.0) {
            return Err(LocomotionParamsError::ParableGravityNotDownward(detection.parable.gravity));
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), LocomotionParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LocomotionParamsError::NotPositive { name, value })
    }
}

fn stick_threshold(name: &'static str, value: f32) -> Result<(), LocomotionParamsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LocomotionParamsError::StickThresholdOutOfRange { name, value })
    }
}
