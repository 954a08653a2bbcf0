/*!
Per-character collision check configuration.

`CollisionCheckParams` is immutable while a character moves. It is grouped by
concern (horizontal, vertical, ground, ceiling, wall slide, split movement,
tolerances) and every group has sensible defaults from [`super::settings`],
so a TOML file only needs to list what it overrides:

```toml
radius = 0.25

[ground]
angle_to_ignore = 40.0
snap_max_distance = 0.2

[split_movement]
enabled = true
max_step_length = 0.15
```

Fields missing from a `[ceiling]` table keep the ceiling defaults
(`SurfaceParams::ceiling()`), not the ground ones.
*/

use serde::{Deserialize, Deserializer, Serialize, de};

use super::runtime::CollisionRuntimeParams;
use super::settings::*;
use crate::layer_flags::PhysicsLayerFlags;
use crate::raycast::ObjectId;
use crate::world::types::Vec3;

/// Errors raised while loading or validating params.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("failed to parse params: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be in [0, 180) degrees, got {value}")]
    AngleOutOfRange { name: &'static str, value: f32 },
    #[error("ignored feet ({feet}) and head ({head}) bands leave nothing of the height {height}")]
    IgnoredBandTooLarge { feet: f32, head: f32, height: f32 },
    #[error("split movement: {0}")]
    InvalidSplitMovement(&'static str),
}

/// Named horizontal sub-checks, run in the configured order.
///
/// Every sub-check casts its own rays and proposes the closest blocking hit;
/// the resolver keeps the most restrictive one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalCheckKind {
    /// One ray from the capsule axis along the movement, per height level.
    StraightCentral,
    /// Rays parallel to the movement at lateral offsets inside the radius.
    Straight,
    /// Rays from the destination center to the border, inside a cone around the movement.
    HorizontalBorder,
    /// Vertical ray at the destination front, refined with a horizontal ray at the hit height.
    VerticalStraight,
    /// Diagonal rays from a level at the start to the next level up at the destination.
    VerticalDiagonalUpward,
    /// Diagonal rays from a level at the start to the next level down at the destination.
    VerticalDiagonalDownward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizontalCheckParams {
    pub movement_check_enabled: bool,
    pub position_check_enabled: bool,
    pub checks: Vec<HorizontalCheckKind>,
    /// Lateral offsets per side used by `Straight`.
    pub radial_steps: u32,
    pub cone_half_angle: f32,
    pub cone_half_slices: u32,
    /// When disabled only the lowest level (feet ignore height) is checked.
    pub height_check_enabled: bool,
    pub height_steps: u32,
    /// Directions sampled around the full circle by the position check.
    pub position_check_slices: u32,
    pub block_layer_flags: PhysicsLayerFlags,
    pub objects_to_ignore: Vec<ObjectId>,
    /// Overrides the transform forward as orientation reference.
    pub fixed_forward: Option<Vec3>,
}

impl Default for HorizontalCheckParams {
    fn default() -> Self {
        Self {
            movement_check_enabled: true,
            position_check_enabled: true,
            checks: vec![
                HorizontalCheckKind::StraightCentral,
                HorizontalCheckKind::Straight,
                HorizontalCheckKind::HorizontalBorder,
                HorizontalCheckKind::VerticalStraight,
            ],
            radial_steps: DEFAULT_RADIAL_STEPS,
            cone_half_angle: DEFAULT_CONE_HALF_ANGLE,
            cone_half_slices: DEFAULT_CONE_HALF_SLICES,
            height_check_enabled: true,
            height_steps: DEFAULT_HEIGHT_STEPS,
            position_check_slices: DEFAULT_POSITION_CHECK_SLICES,
            block_layer_flags: PhysicsLayerFlags::all(),
            objects_to_ignore: Vec::new(),
            fixed_forward: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalCheckParams {
    pub movement_check_enabled: bool,
    pub position_check_enabled: bool,
    pub circumference_radius: f32,
    pub circumference_slices: u32,
    pub circumference_radial_steps: u32,
    /// Extra rotation applied to every further radial ring (degrees).
    pub circumference_rotation_per_step: f32,
    pub central_check_enabled: bool,
    /// When disabled a blocked vertical movement is canceled instead of shortened.
    pub movement_reduce_enabled: bool,
    pub block_layer_flags: PhysicsLayerFlags,
    pub objects_to_ignore: Vec<ObjectId>,
}

impl Default for VerticalCheckParams {
    fn default() -> Self {
        Self {
            movement_check_enabled: true,
            position_check_enabled: true,
            circumference_radius: DEFAULT_CIRCUMFERENCE_RADIUS,
            circumference_slices: DEFAULT_CIRCUMFERENCE_SLICES,
            circumference_radial_steps: DEFAULT_CIRCUMFERENCE_RADIAL_STEPS,
            circumference_rotation_per_step: DEFAULT_CIRCUMFERENCE_ROTATION_PER_STEP,
            central_check_enabled: true,
            movement_reduce_enabled: true,
            block_layer_flags: PhysicsLayerFlags::all(),
            objects_to_ignore: Vec::new(),
        }
    }
}

/// Requirements a destination surface must satisfy (teleport, position check).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacePolicy {
    pub must_be_on_surface: bool,
    /// Surface angle must not exceed `SurfaceParams::angle_to_ignore`.
    pub must_be_on_ignorable_angle: bool,
    pub max_surface_angle: Option<f32>,
}

/// Ground or ceiling classification and adjustment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceParams {
    pub on_surface_max_outside_distance: f32,
    pub on_surface_max_inside_distance: f32,
    pub collect_info_max_outside_distance: f32,
    pub collect_info_max_inside_distance: f32,

    /// Steeper surfaces are not walkable (degrees).
    pub angle_to_ignore: f32,
    /// A steeper surface is still walkable when its perceived angle along the
    /// movement is within this bound (degrees). `None` disables it.
    pub angle_to_ignore_with_perceived_angle: Option<f32>,
    /// A surface steeper than `angle_to_ignore` is not "on surface"...
    pub on_surface_requires_ignorable_angle: bool,
    /// ...unless it is within this distance.
    pub steep_on_surface_max_distance: Option<f32>,
    /// Horizontal checks ignore hits on ignorable angles below this height; `None` means any height.
    pub horizontal_movement_ignore_max_height: Option<f32>,

    /// Zero disables snapping.
    pub snap_max_distance: f32,
    /// Zero disables pop-out.
    pub pop_out_max_distance: f32,

    pub base_inside_collision_check_enabled: bool,
    pub on_surface_if_base_inside_collision: bool,

    pub slope_follow_downhill_enabled: bool,
    pub slope_follow_uphill_enabled: bool,
    pub slope_follow_downhill_max_angle: f32,
    pub slope_follow_downhill_max_perceived_angle: f32,
    pub slope_follow_uphill_max_angle: f32,
    pub slope_follow_uphill_max_perceived_angle: f32,

    /// Blocked vertical movement slides along steep surfaces.
    pub downhill_slide_enabled: bool,
    pub downhill_slide_min_angle: f32,

    /// Moving uphill on a surface steeper than `angle_to_ignore` is blocked...
    pub block_uphill_on_not_ignorable_angle: bool,
    /// ...unless the destination is on an ignorable angle.
    pub allow_exit_attempt_when_on_not_ignorable_angle: bool,

    pub must_stay_on_surface: bool,
    pub must_stay_on_ignorable_angle_downhill: bool,
    pub recollect_info_on_surface_check_failed: bool,

    pub teleport: SurfacePolicy,
    pub check_transform: SurfacePolicy,
}

impl SurfaceParams {
    pub fn ground() -> Self {
        Self {
            on_surface_max_outside_distance: DEFAULT_ON_SURFACE_MAX_OUTSIDE_DISTANCE,
            on_surface_max_inside_distance: DEFAULT_ON_SURFACE_MAX_INSIDE_DISTANCE,
            collect_info_max_outside_distance: DEFAULT_COLLECT_INFO_MAX_OUTSIDE_DISTANCE,
            collect_info_max_inside_distance: DEFAULT_COLLECT_INFO_MAX_INSIDE_DISTANCE,
            angle_to_ignore: DEFAULT_GROUND_ANGLE_TO_IGNORE,
            angle_to_ignore_with_perceived_angle: None,
            on_surface_requires_ignorable_angle: false,
            steep_on_surface_max_distance: None,
            horizontal_movement_ignore_max_height: None,
            snap_max_distance: DEFAULT_SNAP_MAX_DISTANCE,
            pop_out_max_distance: DEFAULT_POP_OUT_MAX_DISTANCE,
            base_inside_collision_check_enabled: true,
            on_surface_if_base_inside_collision: false,
            slope_follow_downhill_enabled: true,
            slope_follow_uphill_enabled: true,
            slope_follow_downhill_max_angle: DEFAULT_SLOPE_FOLLOW_MAX_ANGLE,
            slope_follow_downhill_max_perceived_angle: DEFAULT_SLOPE_FOLLOW_MAX_PERCEIVED_ANGLE,
            slope_follow_uphill_max_angle: DEFAULT_SLOPE_FOLLOW_MAX_ANGLE,
            slope_follow_uphill_max_perceived_angle: DEFAULT_SLOPE_FOLLOW_MAX_PERCEIVED_ANGLE,
            downhill_slide_enabled: false,
            downhill_slide_min_angle: DEFAULT_DOWNHILL_SLIDE_MIN_ANGLE,
            block_uphill_on_not_ignorable_angle: true,
            allow_exit_attempt_when_on_not_ignorable_angle: true,
            must_stay_on_surface: false,
            must_stay_on_ignorable_angle_downhill: false,
            recollect_info_on_surface_check_failed: true,
            teleport: SurfacePolicy::default(),
            check_transform: SurfacePolicy::default(),
        }
    }

    pub fn ceiling() -> Self {
        Self {
            angle_to_ignore: DEFAULT_CEILING_ANGLE_TO_IGNORE,
            snap_max_distance: 0.0,
            slope_follow_downhill_enabled: false,
            slope_follow_uphill_enabled: false,
            block_uphill_on_not_ignorable_angle: false,
            ..Self::ground()
        }
    }

    /// Whether a surface is walkable. `perceived_angle` is the slope along the
    /// movement, when there is one.
    pub fn is_ignorable_angle(&self, angle: f32, perceived_angle: Option<f32>, angle_epsilon: f32) -> bool {
        if angle <= self.angle_to_ignore + angle_epsilon {
            return true;
        }
        match (self.angle_to_ignore_with_perceived_angle, perceived_angle) {
            (Some(max), Some(perceived)) => perceived.abs() <= max + angle_epsilon,
            _ => false,
        }
    }

    /// Steepest angle any of the ignore or slope-follow bounds accepts.
    pub fn max_followed_angle(&self) -> f32 {
        self.angle_to_ignore
            .max(self.slope_follow_downhill_max_angle)
            .max(self.slope_follow_uphill_max_angle)
    }

    fn angles(&self) -> [f32; SURFACE_ANGLE_COUNT] {
        [
            self.angle_to_ignore,
            self.angle_to_ignore_with_perceived_angle.unwrap_or(0.0),
            self.slope_follow_downhill_max_angle,
            self.slope_follow_downhill_max_perceived_angle,
            self.slope_follow_uphill_max_angle,
            self.slope_follow_uphill_max_perceived_angle,
            self.downhill_slide_min_angle,
        ]
    }
}

const SURFACE_ANGLE_COUNT: usize = 7;

const GROUND_ANGLE_NAMES: [&str; SURFACE_ANGLE_COUNT] = [
    "ground.angle_to_ignore",
    "ground.angle_to_ignore_with_perceived_angle",
    "ground.slope_follow_downhill_max_angle",
    "ground.slope_follow_downhill_max_perceived_angle",
    "ground.slope_follow_uphill_max_angle",
    "ground.slope_follow_uphill_max_perceived_angle",
    "ground.downhill_slide_min_angle",
];

const CEILING_ANGLE_NAMES: [&str; SURFACE_ANGLE_COUNT] = [
    "ceiling.angle_to_ignore",
    "ceiling.angle_to_ignore_with_perceived_angle",
    "ceiling.slope_follow_downhill_max_angle",
    "ceiling.slope_follow_downhill_max_perceived_angle",
    "ceiling.slope_follow_uphill_max_angle",
    "ceiling.slope_follow_uphill_max_perceived_angle",
    "ceiling.downhill_slide_min_angle",
];

/// Deserialize a `[ceiling]` table on top of the ceiling defaults.
fn deserialize_ceiling<'de, D>(deserializer: D) -> Result<SurfaceParams, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = toml::Table::deserialize(deserializer)?;
    let defaults = toml::Value::try_from(SurfaceParams::ceiling()).map_err(<D::Error as de::Error>::custom)?;
    let toml::Value::Table(mut table) = defaults else {
        return Err(de::Error::custom("ceiling defaults must serialize to a table"));
    };
    merge_tables(&mut table, overrides);
    toml::Value::Table(table).try_into().map_err(de::Error::custom)
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(nested) if matches!(base.get(&key), Some(toml::Value::Table(_))) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, nested);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self::ground()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallSlideParams {
    pub enabled: bool,
    pub max_attempts: u32,
    /// Near head-on, also try the opposite slide direction when the first is blocked.
    pub check_both_directions: bool,
    pub flicker_prevention_enabled: bool,
    pub flicker_prevention_only_when_already_sliding: bool,
    /// Extra frames a slide reversal stays blocked after it is first detected.
    pub flicker_prevention_force_check_counter: u32,
    /// Keep the previous slide side while the movement is within `ninety_degrees_max_angle` of head-on.
    pub adjust_sign_90_degrees: bool,
    pub ninety_degrees_max_angle: f32,
}

impl Default for WallSlideParams {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_SLIDING_MAX_ATTEMPTS,
            check_both_directions: true,
            flicker_prevention_enabled: true,
            flicker_prevention_only_when_already_sliding: true,
            flicker_prevention_force_check_counter: DEFAULT_FLICKER_FORCE_CHECK_COUNTER,
            adjust_sign_90_degrees: true,
            ninety_degrees_max_angle: DEFAULT_NINETY_DEGREES_MAX_ANGLE,
        }
    }
}

/// Caller-provided stop condition, evaluated after every split step.
pub type SplitStopCondition = fn(&CollisionRuntimeParams) -> bool;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitMovementParams {
    pub enabled: bool,
    pub max_step_length: Option<f32>,
    /// Use full `max_step_length` steps and let the last one absorb the remainder.
    pub last_step_can_be_longer: bool,
    pub max_steps: Option<u32>,
    pub min_step_length: Option<f32>,
    pub stop_on_horizontal_movement_failed: bool,
    pub stop_and_fail_if_movement_would_be_reduced: bool,
    pub stop_on_vertical_movement_failed: bool,
    pub stop_on_vertical_movement_reduced: bool,
    /// On stop, discard the step that triggered it.
    pub stop_return_previous_results: bool,
    #[serde(skip)]
    pub stop_condition: Option<SplitStopCondition>,
}

impl Default for SplitMovementParams {
    fn default() -> Self {
        Self {
            enabled: false,
            max_step_length: Some(DEFAULT_SPLIT_MAX_STEP_LENGTH),
            last_step_can_be_longer: false,
            max_steps: None,
            min_step_length: None,
            stop_on_horizontal_movement_failed: false,
            stop_and_fail_if_movement_would_be_reduced: false,
            stop_on_vertical_movement_failed: false,
            stop_on_vertical_movement_reduced: false,
            stop_return_previous_results: false,
            stop_condition: None,
        }
    }
}

/// Numeric tolerances, scaled with the world unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub skin: f32,
    pub distance_epsilon: f32,
    pub zero_epsilon: f32,
    pub angle_epsilon: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            skin: DEFAULT_SKIN,
            distance_epsilon: DISTANCE_EPSILON,
            zero_epsilon: ZERO_EPSILON,
            angle_epsilon: ANGLE_EPSILON,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionCheckParams {
    pub height: f32,
    pub radius: f32,
    pub feet_distance_to_ignore: f32,
    pub head_distance_to_ignore: f32,
    /// Movement and teleport are applied without any check.
    pub check_disabled: bool,
    pub compute_ground_info_enabled: bool,
    pub compute_ceiling_info_enabled: bool,
    pub horizontal: HorizontalCheckParams,
    pub vertical: VerticalCheckParams,
    pub ground: SurfaceParams,
    #[serde(deserialize_with = "deserialize_ceiling")]
    pub ceiling: SurfaceParams,
    pub wall_slide: WallSlideParams,
    pub split_movement: SplitMovementParams,
    pub tolerances: Tolerances,
}

impl Default for CollisionCheckParams {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            radius: DEFAULT_RADIUS,
            feet_distance_to_ignore: DEFAULT_FEET_DISTANCE_TO_IGNORE,
            head_distance_to_ignore: 0.0,
            check_disabled: false,
            compute_ground_info_enabled: true,
            compute_ceiling_info_enabled: true,
            horizontal: HorizontalCheckParams::default(),
            vertical: VerticalCheckParams::default(),
            ground: SurfaceParams::ground(),
            ceiling: SurfaceParams::ceiling(),
            wall_slide: WallSlideParams::default(),
            split_movement: SplitMovementParams::default(),
            tolerances: Tolerances::default(),
        }
    }
}

impl CollisionCheckParams {
    /// Parse from TOML (missing fields use defaults) and validate.
    pub fn from_toml_str(source: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(source)?;
        if let Err(error) = params.validate() {
            log::warn!("Rejected collision params: {error}");
            return Err(error);
        }
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        positive("height", self.height)?;
        positive("radius", self.radius)?;

        let feet = self.feet_distance_to_ignore.max(0.0);
        let head = self.head_distance_to_ignore.max(0.0);
        if feet + head >= self.height {
            return Err(ParamsError::IgnoredBandTooLarge {
                feet,
                head,
                height: self.height,
            });
        }

        angle("horizontal.cone_half_angle", self.horizontal.cone_half_angle)?;
        angle("wall_slide.ninety_degrees_max_angle", self.wall_slide.ninety_degrees_max_angle)?;
        for (names, surface) in [(GROUND_ANGLE_NAMES, &self.ground), (CEILING_ANGLE_NAMES, &self.ceiling)] {
            for (name, value) in names.into_iter().zip(surface.angles()) {
                angle(name, value)?;
            }
        }

        let split = &self.split_movement;
        if split.enabled {
            if split.max_step_length.is_some_and(|l| !(l > 0.0)) {
                return Err(ParamsError::InvalidSplitMovement("max_step_length must be positive"));
            }
            if split.min_step_length.is_some_and(|l| !(l > 0.0)) {
                return Err(ParamsError::InvalidSplitMovement("min_step_length must be positive"));
            }
            if split.max_steps == Some(0) {
                return Err(ParamsError::InvalidSplitMovement("max_steps must be at least 1"));
            }
        }

        Ok(())
    }

    /// Surface params for the given kind.
    #[inline]
    pub fn surface(&self, kind: SurfaceKind) -> &SurfaceParams {
        match kind {
            SurfaceKind::Ground => &self.ground,
            SurfaceKind::Ceiling => &self.ceiling,
        }
    }

    /// Lowest and highest height (above the feet) sampled by horizontal checks.
    #[inline]
    pub fn horizontal_check_band(&self) -> (f32, f32) {
        let low = self.feet_distance_to_ignore.max(0.0);
        let high = (self.height - self.head_distance_to_ignore.max(0.0)).max(low);
        (low, high)
    }
}

/// Which surface a classification refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Ground,
    Ceiling,
}

fn positive(name: &'static str, value: f32) -> Result<(), ParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::NotPositive { name, value })
    }
}

fn angle(name: &'static str, value: f32) -> Result<(), ParamsError> {
    if (0.0..180.0).contains(&value) {
        Ok(())
    } else {
        Err(ParamsError::AngleOutOfRange { name, value })
    }
}
