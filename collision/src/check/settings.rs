/*!
Collision check default settings and tolerances.

These constants are the defaults of [`super::params::CollisionCheckParams`].
Keeping them together makes tuning easier; per-character overrides come from
the params (usually loaded from TOML).

Notes
- Distances are in meters, angles in degrees.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
- The tolerances are copied into `Tolerances` so they can be scaled for worlds
  that do not use meters.
*/

/// Default capsule height (meters), measured from the feet.
pub const DEFAULT_HEIGHT: f32 = 1.75;

/// Default capsule radius (meters).
pub const DEFAULT_RADIUS: f32 = 0.3;

/// Lowest band of the capsule skipped by horizontal checks (meters).
/// Anything lower than this is a step and is handled by the vertical resolver.
pub const DEFAULT_FEET_DISTANCE_TO_IGNORE: f32 = 0.1;

/// Separation kept from walls when horizontal movement is truncated (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_SKIN: f32 = 0.01;

/// Distance tolerance for comparisons in world space (meters).
pub const DISTANCE_EPSILON: f32 = 1.0e-4;

/// Lengths below this are treated as zero (meters).
/// Movements below this are ignored to avoid tiny oscillations.
pub const ZERO_EPSILON: f32 = 1.0e-5;

/// Angle tolerance for threshold comparisons (degrees).
pub const ANGLE_EPSILON: f32 = 1.0e-4;

/// Horizontal sampling.
pub const DEFAULT_RADIAL_STEPS: u32 = 3;
pub const DEFAULT_CONE_HALF_ANGLE: f32 = 60.0;
pub const DEFAULT_CONE_HALF_SLICES: u32 = 2;
pub const DEFAULT_HEIGHT_STEPS: u32 = 2;
pub const DEFAULT_POSITION_CHECK_SLICES: u32 = 8;

/// Lateral rays are pulled slightly inside the radius so they still block.
pub const LATERAL_RAY_RADIUS_FACTOR: f32 = 0.99;

/// Vertical sampling around the capsule base/top.
pub const DEFAULT_CIRCUMFERENCE_RADIUS: f32 = 0.2;
pub const DEFAULT_CIRCUMFERENCE_SLICES: u32 = 6;
pub const DEFAULT_CIRCUMFERENCE_RADIAL_STEPS: u32 = 1;
pub const DEFAULT_CIRCUMFERENCE_ROTATION_PER_STEP: f32 = 30.0;

/// Surface classification distances (meters).
pub const DEFAULT_ON_SURFACE_MAX_OUTSIDE_DISTANCE: f32 = 0.001;
pub const DEFAULT_ON_SURFACE_MAX_INSIDE_DISTANCE: f32 = 0.001;
pub const DEFAULT_COLLECT_INFO_MAX_OUTSIDE_DISTANCE: f32 = 0.1;
pub const DEFAULT_COLLECT_INFO_MAX_INSIDE_DISTANCE: f32 = 0.1;

/// Surfaces steeper than this are not walkable (degrees).
pub const DEFAULT_GROUND_ANGLE_TO_IGNORE: f32 = 30.0;
pub const DEFAULT_CEILING_ANGLE_TO_IGNORE: f32 = 30.0;

/// Max distance pulled onto the ground when slightly airborne (meters).
pub const DEFAULT_SNAP_MAX_DISTANCE: f32 = 0.1;

/// Max distance pushed out of a surface when slightly inside (meters).
pub const DEFAULT_POP_OUT_MAX_DISTANCE: f32 = 0.1;

/// Slope follow bounds (degrees).
pub const DEFAULT_SLOPE_FOLLOW_MAX_ANGLE: f32 = 30.0;
pub const DEFAULT_SLOPE_FOLLOW_MAX_PERCEIVED_ANGLE: f32 = 30.0;

/// Blocked vertical movement slides downhill on surfaces at least this steep (degrees).
pub const DEFAULT_DOWNHILL_SLIDE_MIN_ANGLE: f32 = 45.0;

/// Wall slide.
pub const DEFAULT_SLIDING_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_FLICKER_FORCE_CHECK_COUNTER: u32 = 5;
/// Movement within this angle of head-on keeps the previous slide side (degrees).
pub const DEFAULT_NINETY_DEGREES_MAX_ANGLE: f32 = 5.0;

/// Split movement.
pub const DEFAULT_SPLIT_MAX_STEP_LENGTH: f32 = 0.2;
/// Upper bound on split steps, applied even when `max_steps` is unset or larger.
pub const MAX_SPLIT_STEPS: u32 = 64;
