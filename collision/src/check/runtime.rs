/*!
The character collision session.

`CollisionRuntimeParams` is the single in-memory representation of everything a
collision check reads and writes. It is created once per character, passed by
`&mut` into every check and keeps state across frames so the engine can apply
hysteresis (previous ground, slide side, flicker counters, last valid movement).

Lifetime
- Create it with the character.
- Call [`CollisionRuntimeParams::reset`] on scene (re)entry or after a teleport that
  bypassed the collision check; the previous frame is meaningless then.
- Never reset it between consecutive frames of continuous movement.

Structured, semantically named results are read through
[`CollisionRuntimeParams::results`], a borrowed projection (see `results.rs`).
*/

use super::results::CharacterCollisionResults;
use crate::raycast::RaycastHit;
use crate::world::types::{Transform, Vec3};

/// Operation that produced the current results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionCheckType {
    Movement,
    Teleport,
    PositionCheck,
    SurfaceInfo,
}

/// Ground or ceiling classification.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceInfo {
    pub on_surface: bool,
    /// Angle between the surface normal and the up axis (down axis for ceilings), degrees.
    pub surface_angle: f32,
    /// Slope along the reference direction, positive when the surface rises (degrees).
    pub surface_perceived_angle: f32,
    pub surface_normal: Vec3,
    /// Signed distance from the capsule base (top for ceilings) to the surface;
    /// negative when inside. `None` when nothing was found.
    pub surface_distance: Option<f32>,
    pub surface_hit_max_angle: f32,
    pub surface_hit_max_normal: Vec3,
    /// Hit that decided the on-surface state.
    pub reference_hit: Option<RaycastHit>,
    pub base_inside_collision: bool,
    pub on_surface_due_to_base_inside: bool,
}

/// Corrections applied to reach or follow a surface during the last check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceAdjustments {
    pub snapped: bool,
    pub popped_out: bool,
    pub vertical_movement_adjusted_downhill: bool,
    pub vertical_movement_adjusted_uphill: bool,
    pub horizontal_movement_adjusted_downhill: bool,
    pub recollected_info: bool,
}

/// Outcome of one movement axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisMovementResults {
    pub requested: Vec3,
    pub fixed: Vec3,
    /// A non-zero request ended up as no movement.
    pub canceled: bool,
    pub colliding: bool,
    /// Shortened but not canceled.
    pub reduced: bool,
    pub collision_hit: Option<RaycastHit>,
}

impl AxisMovementResults {
    pub(crate) fn accumulate(&mut self, step: &AxisMovementResults, zero_epsilon: f32) {
        self.requested += step.requested;
        self.fixed += step.fixed;
        self.colliding |= step.colliding;
        self.reduced |= step.reduced;
        if step.collision_hit.is_some() {
            self.collision_hit = step.collision_hit;
        }
        self.canceled =
            self.requested.norm() > zero_epsilon && self.fixed.norm() <= zero_epsilon;
    }
}

/// Wall slide state carried across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallSlideState {
    pub is_sliding: bool,
    pub wall_normal: Vec3,
    /// Signed angle from the requested movement to the slide movement (degrees).
    pub movement_angle: f32,
    /// Angle between the reversed movement and the wall normal (degrees).
    pub collision_angle: f32,
    pub sliding_into_opposite_direction: bool,
    pub flicker_prevented: bool,
    pub flicker_force_check_counter: u32,
    /// Side (+1 / -1 along `up × wall normal`) of the last slide near head-on.
    pub sign_90_degrees: f32,
    pub recompute_sign_90_degrees: bool,
    pub previous_slide_movement: Vec3,
}

impl Default for WallSlideState {
    fn default() -> Self {
        Self {
            is_sliding: false,
            wall_normal: Vec3::zeros(),
            movement_angle: 0.0,
            collision_angle: 0.0,
            sliding_into_opposite_direction: false,
            flicker_prevented: false,
            flicker_force_check_counter: 0,
            sign_90_degrees: 1.0,
            recompute_sign_90_degrees: true,
            previous_slide_movement: Vec3::zeros(),
        }
    }
}

/// Last non-zero movements, used as reference directions when the current one is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LastValidMovement {
    pub original_horizontal: Vec3,
    pub original_vertical: Vec3,
    pub end_horizontal: Vec3,
    pub end_vertical: Vec3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TeleportResults {
    pub target_position: Vec3,
    pub fixed_position: Vec3,
    pub canceled: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionCheckResults {
    pub original_position: Vec3,
    pub fixed_position: Vec3,
    /// `true` means the position is valid.
    pub is_position_ok: bool,
    pub strict: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplitMovementResult {
    pub steps_to_perform: u32,
    pub steps_performed: u32,
    pub movement_interrupted: bool,
    pub movement_reduced: bool,
    pub last_step_longer_than_max_length: bool,
    /// Sum of the requested movement of the performed steps.
    pub movement_checked: Vec3,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionRuntimeParams {
    pub check_type: Option<CollisionCheckType>,

    pub original_position: Vec3,
    pub original_transform: Transform,
    pub original_up: Vec3,
    pub original_forward: Vec3,
    pub original_movement: Vec3,

    pub new_position: Vec3,
    pub fixed_movement: Vec3,

    pub horizontal: AxisMovementResults,
    pub vertical: AxisMovementResults,
    pub reference_collision_hit: Option<RaycastHit>,

    pub ground: SurfaceInfo,
    pub ceiling: SurfaceInfo,
    pub ground_adjustments: SurfaceAdjustments,
    pub ceiling_adjustments: SurfaceAdjustments,

    pub wall_slide: WallSlideState,
    pub last_valid: LastValidMovement,

    pub teleport: TeleportResults,
    pub position_check: PositionCheckResults,
    pub split_movement: SplitMovementResult,

    /// Raycasts issued by the last check.
    pub raycast_count: u32,
}

impl CollisionRuntimeParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, including the hysteresis state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read-only structured view of the current results.
    pub fn results(&self) -> CharacterCollisionResults<'_> {
        CharacterCollisionResults::new(self)
    }

    #[inline]
    pub fn is_on_ground(&self) -> bool {
        self.ground.on_surface
    }

    #[inline]
    pub fn is_on_ceiling(&self) -> bool {
        self.ceiling.on_surface
    }

    pub fn final_transform(&self) -> Transform {
        self.original_transform.with_translation(self.new_position)
    }

    /// Clear the per-call results, keeping the state the next frame depends on.
    pub(crate) fn begin_check(&mut self, check_type: CollisionCheckType, transform: &Transform) {
        self.check_type = Some(check_type);
        self.original_position = transform.translation;
        self.original_transform = *transform;
        self.original_up = transform.up();
        self.original_forward = transform.forward();
        self.original_movement = Vec3::zeros();
        self.new_position = transform.translation;
        self.fixed_movement = Vec3::zeros();

        self.horizontal = AxisMovementResults::default();
        self.vertical = AxisMovementResults::default();
        self.reference_collision_hit = None;
        self.ground_adjustments = SurfaceAdjustments::default();
        self.ceiling_adjustments = SurfaceAdjustments::default();

        self.teleport = TeleportResults::default();
        self.position_check = PositionCheckResults::default();
        self.split_movement = SplitMovementResult::default();
        self.raycast_count = 0;
    }

    pub(crate) fn adjustments_mut(&mut self, ground: bool) -> &mut SurfaceAdjustments {
        if ground {
            &mut self.ground_adjustments
        } else {
            &mut self.ceiling_adjustments
        }
    }
}
