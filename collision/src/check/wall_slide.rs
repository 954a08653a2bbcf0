/*!
Wall slide.

When the horizontal movement is blocked, the movement is projected on the
blocking wall and re-attempted from the start position, up to `max_attempts`
times (every new wall found re-projects the slide). Two pieces of state make
sliding stable across frames:

- near head-on the projection is tiny and its side flips with noise, so the side
  of the last slide (`sign_90_degrees`) is kept while the movement stays within
  `ninety_degrees_max_angle` of the wall normal;
- at sharp corners two walls can alternate the slide direction every frame; a
  reversal is blocked for `flicker_prevention_force_check_counter` frames before
  it is accepted.
*/

use super::horizontal::resolve_horizontal;
use super::params::{CollisionCheckParams, WallSlideParams};
use super::runtime::WallSlideState;
use super::{Caster, Frame};
use crate::raycast::RaycastHit;
use crate::world::types::{Vec3, angle_degrees, flatten, project_on_plane, signed_angle_degrees};

/// Accepted slide movement and the wall it follows.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SlideOutcome {
    pub movement: Vec3,
    pub hit: RaycastHit,
}

/// Decide whether a slide reversal is held back this frame.
///
/// Returns `true` when `slide` must be discarded. Updates the flicker fields of
/// `state`; `was_sliding` is the sliding state of the previous frame.
pub(crate) fn flicker_decision(params: &WallSlideParams, state: &mut WallSlideState, slide: &Vec3, was_sliding: bool) -> bool {
    let reversal = slide.dot(&state.previous_slide_movement) < 0.0;
    state.sliding_into_opposite_direction = reversal;

    if !params.flicker_prevention_enabled || (params.flicker_prevention_only_when_already_sliding && !was_sliding) {
        state.flicker_prevented = false;
        return false;
    }
    if !reversal {
        state.flicker_prevented = false;
        state.flicker_force_check_counter = 0;
        return false;
    }

    if state.flicker_prevented && state.flicker_force_check_counter == 0 {
        state.flicker_prevented = false;
        return false;
    }
    if state.flicker_prevented {
        state.flicker_force_check_counter -= 1;
    } else {
        state.flicker_force_check_counter = params.flicker_prevention_force_check_counter;
    }
    state.flicker_prevented = true;
    true
}

/// Try to slide `movement` along the wall of `hit`, starting from `start`.
///
/// `blocked` is the truncated movement the resolver already allows; the slide is
/// only accepted when it gets further. Updates `state` in both cases.
#[allow(clippy::too_many_arguments)]
pub(crate) fn slide_along_wall(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    state: &mut WallSlideState,
    start: Vec3,
    frame: &Frame,
    movement: &Vec3,
    hit: &RaycastHit,
    blocked: &Vec3,
) -> Option<SlideOutcome> {
    let slide_params = &params.wall_slide;
    let tolerances = &params.tolerances;
    let was_sliding = state.is_sliding;
    state.is_sliding = false;

    if !slide_params.enabled {
        return None;
    }
    let first_normal = flatten(&hit.normal, &frame.up);
    if first_normal.norm_squared() == 0.0 {
        return None;
    }

    state.wall_normal = first_normal;
    state.collision_angle = angle_degrees(&-movement, &first_normal);
    let near_head_on = state.collision_angle <= slide_params.ninety_degrees_max_angle + tolerances.angle_epsilon;

    let tangent = frame.up.cross(&first_normal);
    let mut slide = project_on_plane(movement, &first_normal);
    let side = if slide.dot(&tangent) < 0.0 { -1.0 } else { 1.0 };
    if near_head_on && slide_params.adjust_sign_90_degrees && !state.recompute_sign_90_degrees {
        if side != state.sign_90_degrees {
            slide = -slide;
        }
    } else {
        state.sign_90_degrees = side;
        state.recompute_sign_90_degrees = false;
    }

    let mut best = attempt_slide(caster, params, start, frame, slide, &first_normal, *hit);
    let blocked_at_start = best.as_ref().is_none_or(|b| b.movement.norm() <= tolerances.zero_epsilon);
    if blocked_at_start && near_head_on && slide_params.check_both_directions {
        let opposite = attempt_slide(caster, params, start, frame, -slide, &first_normal, *hit);
        if opposite.as_ref().is_some_and(|o| o.movement.norm() > tolerances.zero_epsilon) {
            state.sign_90_degrees = -state.sign_90_degrees;
            best = opposite;
        }
    }

    let outcome = best?;
    let slide_length = outcome.movement.norm();
    if slide_length <= tolerances.zero_epsilon || slide_length <= blocked.norm() + tolerances.distance_epsilon {
        return None;
    }
    if flicker_decision(slide_params, state, &outcome.movement, was_sliding) {
        log::debug!("Wall slide reversal held back, {} frames left", state.flicker_force_check_counter);
        state.is_sliding = was_sliding;
        return None;
    }

    state.is_sliding = true;
    state.movement_angle = signed_angle_degrees(movement, &outcome.movement, &frame.up);
    state.previous_slide_movement = outcome.movement;
    Some(outcome)
}

/// Re-project `slide` on every newly hit wall until it is free or attempts run out.
fn attempt_slide(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    start: Vec3,
    frame: &Frame,
    slide: Vec3,
    first_normal: &Vec3,
    first_hit: RaycastHit,
) -> Option<SlideOutcome> {
    let tolerances = &params.tolerances;
    let mut slide = slide;
    let mut hit = first_hit;
    let mut best: Option<SlideOutcome> = None;

    for _ in 0..params.wall_slide.max_attempts.max(1) {
        if slide.norm() <= tolerances.zero_epsilon {
            break;
        }
        let outcome = resolve_horizontal(caster, params, start, frame, &slide);
        if best.as_ref().is_none_or(|b| outcome.fixed.norm() > b.movement.norm()) {
            best = Some(SlideOutcome {
                movement: outcome.fixed,
                hit: outcome.hit.unwrap_or(hit),
            });
        }
        let Some(next_hit) = outcome.hit else {
            break;
        };

        let next_normal = flatten(&next_hit.normal, &frame.up);
        if next_normal.norm_squared() == 0.0 {
            break;
        }
        let next = project_on_plane(&slide, &next_normal);
        if next.dot(first_normal) < -tolerances.zero_epsilon {
            break;
        }
        slide = next;
        hit = next_hit;
    }

    best
}

/// Forget the slide side once the character stops touching walls.
pub(crate) fn clear_sliding(state: &mut WallSlideState) {
    state.is_sliding = false;
    state.recompute_sign_90_degrees = true;
    state.flicker_prevented = false;
    state.flicker_force_check_counter = 0;
    state.sliding_into_opposite_direction = false;
}
