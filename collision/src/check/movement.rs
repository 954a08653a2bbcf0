/*!
One movement step: horizontal first, then vertical.

The order is fixed. Horizontal resolution runs the sub-check pipeline and wall
slide, then the slope under the character turns part of the horizontal movement
into vertical movement before the vertical resolver runs. Surface info is
refreshed at the end position, where snap/pop-out and the must-stay policy apply.
*/

use super::horizontal::{horizontal_position_ok, resolve_horizontal};
use super::params::{CollisionCheckParams, SurfaceKind, Tolerances};
use super::runtime::{AxisMovementResults, CollisionRuntimeParams};
use super::surface::{
    apply_snap_and_pop_out, blocks_steep_uphill, collect_surface_info, must_stay_violated, refresh_surface_info,
    slope_follow,
};
use super::vertical::{downhill_slide, resolve_vertical, vertical_position_ok};
use super::wall_slide::{clear_sliding, slide_along_wall};
use super::{Caster, Frame};
use crate::world::types::{Vec3, flatten, horizontal_component, vertical_component};

/// Horizontal direction used for perceived angles when the movement has none.
pub(crate) fn reference_direction(runtime: &CollisionRuntimeParams, frame: &Frame) -> Vec3 {
    match flatten(&runtime.last_valid.original_horizontal, &frame.up) {
        direction if direction.norm_squared() > 0.0 => direction,
        _ => frame.forward,
    }
}

fn finish_axis(axis: &mut AxisMovementResults, fixed: Vec3, intended: f32, tolerances: &Tolerances) {
    let length = fixed.norm();
    axis.fixed = fixed;
    axis.canceled = axis.requested.norm() > tolerances.zero_epsilon && length <= tolerances.zero_epsilon;
    axis.reduced = axis.colliding && !axis.canceled && length + tolerances.distance_epsilon < intended;
}

/// Move from `start` by `movement` and return the end position.
///
/// Writes the per-axis results, surface info, adjustments and wall slide state
/// into `runtime`.
pub(crate) fn move_step(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    start: Vec3,
    frame: &Frame,
    movement: Vec3,
) -> Vec3 {
    let tolerances = &params.tolerances;
    let up = frame.up;

    let requested_horizontal = horizontal_component(&movement, &up);
    let requested_vertical = movement.dot(&up);
    runtime.horizontal = AxisMovementResults {
        requested: requested_horizontal,
        ..AxisMovementResults::default()
    };
    runtime.vertical = AxisMovementResults {
        requested: up * requested_vertical,
        ..AxisMovementResults::default()
    };

    let horizontal_length = requested_horizontal.norm();
    let direction = if horizontal_length > tolerances.zero_epsilon {
        requested_horizontal / horizontal_length
    } else {
        reference_direction(runtime, frame)
    };
    let previous_ground = runtime.ground;
    let was_on_ground = previous_ground.on_surface;

    // Horizontal.
    let mut fixed_horizontal = Vec3::zeros();
    if horizontal_length > tolerances.zero_epsilon {
        if blocks_steep_uphill(caster, params, &previous_ground, start, frame, &requested_horizontal) {
            log::trace!("Uphill movement blocked on a {} degrees surface", previous_ground.surface_angle);
            runtime.horizontal.colliding = true;
        } else {
            let outcome = resolve_horizontal(caster, params, start, frame, &requested_horizontal);
            fixed_horizontal = outcome.fixed;
            match outcome.hit {
                Some(hit) => {
                    runtime.horizontal.colliding = true;
                    runtime.horizontal.collision_hit = Some(hit);
                    runtime.reference_collision_hit = Some(hit);
                    if let Some(slide) = slide_along_wall(
                        caster,
                        params,
                        &mut runtime.wall_slide,
                        start,
                        frame,
                        &requested_horizontal,
                        &hit,
                        &outcome.fixed,
                    ) {
                        fixed_horizontal = slide.movement;
                        runtime.reference_collision_hit = Some(slide.hit);
                    }
                }
                None => clear_sliding(&mut runtime.wall_slide),
            }
        }
    }

    // Slope follow turns part of the horizontal movement into vertical movement.
    let mut follow = slope_follow(params, runtime, frame, &fixed_horizontal);
    if fixed_horizontal.norm() > tolerances.zero_epsilon
        && !horizontal_position_ok(caster, params, start + fixed_horizontal + follow, frame)
    {
        log::trace!("Horizontal destination rejected by the position check");
        fixed_horizontal = Vec3::zeros();
        follow = Vec3::zeros();
        runtime.horizontal.colliding = true;
        runtime.ground_adjustments.vertical_movement_adjusted_downhill = false;
        runtime.ground_adjustments.vertical_movement_adjusted_uphill = false;
        runtime.ceiling_adjustments.vertical_movement_adjusted_downhill = false;
        runtime.ceiling_adjustments.vertical_movement_adjusted_uphill = false;
    }

    // Vertical.
    let vertical_amount = requested_vertical + follow.dot(&up);
    let after_horizontal = start + fixed_horizontal;
    let outcome = resolve_vertical(caster, params, after_horizontal, frame, vertical_amount);
    let mut fixed_vertical = up * outcome.fixed;
    if let Some(hit) = outcome.hit {
        runtime.vertical.colliding = true;
        runtime.vertical.collision_hit = Some(hit);
        runtime.reference_collision_hit.get_or_insert(hit);

        let slide = downhill_slide(params, frame, vertical_amount, &outcome);
        if slide.norm() > tolerances.zero_epsilon {
            let slide_outcome = resolve_horizontal(caster, params, after_horizontal, frame, &slide);
            if slide_outcome.fixed.norm() > tolerances.zero_epsilon {
                fixed_horizontal += slide_outcome.fixed;
                runtime.ground_adjustments.horizontal_movement_adjusted_downhill = true;
            }
        }
    }

    let mut end = start + fixed_horizontal + fixed_vertical;
    if !vertical_position_ok(caster, params, end, frame) {
        fixed_vertical = Vec3::zeros();
        runtime.vertical.colliding = true;
        end = start + fixed_horizontal;
        if !vertical_position_ok(caster, params, end, frame) {
            fixed_horizontal = Vec3::zeros();
            runtime.horizontal.colliding = true;
            end = start;
        }
    }

    finish_axis(&mut runtime.horizontal, fixed_horizontal, horizontal_length, tolerances);
    finish_axis(&mut runtime.vertical, fixed_vertical, vertical_amount.abs(), tolerances);
    if runtime.horizontal.canceled && runtime.vertical.canceled {
        log::debug!("Movement {movement:?} fully canceled");
        refresh_surface_info(caster, params, runtime, start, frame, &direction);
        return start;
    }

    // Surfaces at the end position.
    refresh_surface_info(caster, params, runtime, end, frame, &direction);
    end = apply_snap_and_pop_out(caster, params, runtime, end, frame, &direction, vertical_amount);

    if must_stay_violated(params, was_on_ground, &runtime.ground)
        && !recover_surface(caster, params, runtime, &mut end, frame, &direction, fixed_horizontal.norm(), was_on_ground)
    {
        log::trace!("Leaving the ground is not allowed, horizontal movement reverted");
        runtime.horizontal.colliding = true;
        runtime.ground_adjustments.vertical_movement_adjusted_downhill = false;
        runtime.ground_adjustments.vertical_movement_adjusted_uphill = false;

        // The vertical part was resolved at the abandoned position.
        let reverted = resolve_vertical(caster, params, start, frame, requested_vertical);
        if let Some(hit) = reverted.hit {
            runtime.vertical.colliding = true;
            runtime.vertical.collision_hit = Some(hit);
        }
        end = start + up * reverted.fixed;
        refresh_surface_info(caster, params, runtime, end, frame, &direction);
        end = apply_snap_and_pop_out(caster, params, runtime, end, frame, &direction, requested_vertical);
    }

    let displacement = end - start;
    finish_axis(
        &mut runtime.horizontal,
        horizontal_component(&displacement, &up),
        horizontal_length,
        tolerances,
    );
    finish_axis(
        &mut runtime.vertical,
        vertical_component(&displacement, &up),
        vertical_amount.abs(),
        tolerances,
    );

    if horizontal_length > tolerances.zero_epsilon {
        runtime.last_valid.original_horizontal = requested_horizontal;
    }
    if runtime.horizontal.fixed.norm() > tolerances.zero_epsilon {
        runtime.last_valid.end_horizontal = runtime.horizontal.fixed;
    }
    if requested_vertical.abs() > tolerances.zero_epsilon {
        runtime.last_valid.original_vertical = runtime.vertical.requested;
    }
    if runtime.vertical.fixed.norm() > tolerances.zero_epsilon {
        runtime.last_valid.end_vertical = runtime.vertical.fixed;
    }

    end
}

/// Search further below for ground that a snap can still reach.
///
/// Returns `true` when the must-stay policy is satisfied afterwards.
#[allow(clippy::too_many_arguments)]
fn recover_surface(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    end: &mut Vec3,
    frame: &Frame,
    direction: &Vec3,
    horizontal_length: f32,
    was_on_ground: bool,
) -> bool {
    let surface = &params.ground;
    let tolerances = &params.tolerances;
    if !surface.recollect_info_on_surface_check_failed || runtime.ground.on_surface {
        return false;
    }

    let steepest = surface.max_followed_angle().min(89.0);
    let extra = horizontal_length * steepest.to_radians().tan();
    let info = collect_surface_info(caster, params, SurfaceKind::Ground, *end, frame, direction, extra);
    runtime.ground_adjustments.recollected_info = true;

    let Some(distance) = info.surface_distance else {
        return false;
    };
    if distance <= tolerances.distance_epsilon || distance > surface.snap_max_distance + extra + tolerances.distance_epsilon {
        return false;
    }
    let outcome = resolve_vertical(caster, params, *end, frame, -distance);
    if (outcome.fixed + distance).abs() > tolerances.distance_epsilon {
        return false;
    }

    *end += frame.up * outcome.fixed;
    runtime.ground_adjustments.snapped = true;
    refresh_surface_info(caster, params, runtime, *end, frame, direction);
    !must_stay_violated(params, was_on_ground, &runtime.ground)
}
