//! Teleport and position check: validate a destination instead of a path.

use super::horizontal::horizontal_position_blocker;
use super::movement::reference_direction;
use super::params::{CollisionCheckParams, SurfacePolicy, SurfaceParams};
use super::runtime::{CollisionRuntimeParams, PositionCheckResults};
use super::surface::{apply_snap_and_pop_out, refresh_surface_info, surface_policy_satisfied};
use super::vertical::vertical_position_ok;
use super::wall_slide::clear_sliding;
use super::{Caster, Frame};
use crate::world::types::{Transform, Vec3, flatten};

/// Collect surfaces at `position`, optionally fix it, and run every destination check.
///
/// Returns whether the (possibly fixed) position is valid, and that position.
#[allow(clippy::too_many_arguments)]
fn validate_destination(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    position: Vec3,
    frame: &Frame,
    direction: &Vec3,
    allow_fixes: bool,
    policy: fn(&SurfaceParams) -> &SurfacePolicy,
) -> (bool, Vec3) {
    refresh_surface_info(caster, params, runtime, position, frame, direction);
    let position = if allow_fixes {
        apply_snap_and_pop_out(caster, params, runtime, position, frame, direction, 0.0)
    } else {
        position
    };

    if let Some(hit) = horizontal_position_blocker(caster, params, position, frame) {
        log::debug!("Destination {position:?} fails the horizontal position check on {:?}", hit.object);
        runtime.horizontal.colliding = true;
        runtime.horizontal.collision_hit = Some(hit);
        return (false, position);
    }
    if !vertical_position_ok(caster, params, position, frame) {
        log::debug!("Destination {position:?} fails the vertical position check");
        runtime.vertical.colliding = true;
        return (false, position);
    }

    let tolerances = &params.tolerances;
    let ground_ok = !params.compute_ground_info_enabled
        || surface_policy_satisfied(&runtime.ground, policy(&params.ground), &params.ground, tolerances);
    let ceiling_ok = !params.compute_ceiling_info_enabled
        || surface_policy_satisfied(&runtime.ceiling, policy(&params.ceiling), &params.ceiling, tolerances);
    if !(ground_ok && ceiling_ok) {
        log::debug!(
            "Destination {position:?} rejected by surface policy (ground ok: {ground_ok}, ceiling ok: {ceiling_ok})"
        );
    }
    (ground_ok && ceiling_ok, position)
}

pub(crate) fn perform_teleport(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    transform: &Transform,
    target_position: Vec3,
    frame: &Frame,
) {
    let start = transform.translation;
    let direction = match flatten(&(target_position - start), &frame.up) {
        direction if direction.norm_squared() > 0.0 => direction,
        _ => reference_direction(runtime, frame),
    };
    let previous_ground = runtime.ground;
    let previous_ceiling = runtime.ceiling;

    let (ok, fixed) = validate_destination(
        caster,
        params,
        runtime,
        target_position,
        frame,
        &direction,
        true,
        |surface| &surface.teleport,
    );
    runtime.teleport.fixed_position = fixed;

    if !ok {
        log::debug!("Teleport to {target_position:?} canceled");
        runtime.teleport.canceled = true;
        runtime.new_position = start;
        runtime.fixed_movement = Vec3::zeros();
        runtime.ground = previous_ground;
        runtime.ceiling = previous_ceiling;
        return;
    }

    runtime.new_position = fixed;
    runtime.fixed_movement = fixed - start;
    clear_sliding(&mut runtime.wall_slide);
    let moved = flatten(&runtime.fixed_movement, &frame.up);
    if moved.norm_squared() > 0.0 {
        runtime.last_valid.original_horizontal = moved;
        runtime.last_valid.end_horizontal = moved;
    }
}

pub(crate) fn perform_position_check(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    transform: &Transform,
    strict: bool,
    frame: &Frame,
) {
    let position = transform.translation;
    let direction = reference_direction(runtime, frame);
    let (ok, fixed) = validate_destination(
        caster,
        params,
        runtime,
        position,
        frame,
        &direction,
        !strict,
        |surface| &surface.check_transform,
    );

    runtime.position_check = PositionCheckResults {
        original_position: position,
        fixed_position: fixed,
        is_position_ok: ok,
        strict,
    };
    if ok {
        runtime.new_position = fixed;
        runtime.fixed_movement = fixed - position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CollisionScratch;
    use crate::check::test_utils::{floor_and_wall_world, floor_world, frame_for, slope_world, standing};
    use crate::world::StaticWorld;
    use approx::assert_relative_eq;

    fn teleport(world: &StaticWorld, params: &CollisionCheckParams, target: Vec3) -> CollisionRuntimeParams {
        let transform = standing(Vec3::new(-3.0, 0.0, 0.0));
        let mut runtime = CollisionRuntimeParams::new();
        runtime.ground.on_surface = true;
        let frame = frame_for(&transform.with_translation(target), params);
        let mut scratch = CollisionScratch::default();
        let mut caster = Caster::new(world, &mut scratch);
        perform_teleport(&mut caster, params, &mut runtime, &transform, target, &frame);
        runtime
    }

    #[test]
    fn teleport_onto_steep_slope_fails() {
        let mut params = CollisionCheckParams::default();
        params.ground.angle_to_ignore = 45.0;
        params.ground.teleport = SurfacePolicy {
            must_be_on_surface: true,
            must_be_on_ignorable_angle: true,
            max_surface_angle: None,
        };

        let runtime = teleport(&slope_world(50.0), &params, Vec3::zeros());
        assert!(runtime.teleport.canceled);
        assert_eq!(runtime.new_position, Vec3::new(-3.0, 0.0, 0.0));
        assert_eq!(runtime.fixed_movement, Vec3::zeros());
        // Surface info of the start position is kept.
        assert!(runtime.ground.on_surface);
    }

    #[test]
    fn teleport_snaps_onto_floor() {
        let params = CollisionCheckParams::default();
        let runtime = teleport(&floor_world(), &params, Vec3::new(2.0, 0.05, 0.0));

        assert!(!runtime.teleport.canceled);
        assert!(runtime.ground.on_surface);
        assert!(runtime.ground_adjustments.snapped);
        assert_relative_eq!(runtime.new_position, Vec3::new(2.0, 0.0, 0.0), epsilon = 1.0e-4);
        assert_relative_eq!(runtime.fixed_movement, Vec3::new(5.0, 0.0, 0.0), epsilon = 1.0e-4);
    }

    #[test]
    fn teleport_into_wall_fails() {
        let params = CollisionCheckParams::default();
        let runtime = teleport(&floor_and_wall_world(1.0), &params, Vec3::new(0.9, 0.0, 0.0));
        assert!(runtime.teleport.canceled);
        assert!(runtime.horizontal.colliding);
        let normal = runtime.horizontal.collision_hit.map(|hit| hit.normal).unwrap_or_default();
        assert_relative_eq!(normal, -Vec3::x(), epsilon = 1.0e-5);
        assert_eq!(runtime.new_position, Vec3::new(-3.0, 0.0, 0.0));
    }

    #[test]
    fn strict_position_check_forbids_fixes() {
        let mut params = CollisionCheckParams::default();
        params.ground.check_transform.must_be_on_surface = true;
        let world = floor_world();
        let transform = standing(Vec3::new(0.0, 0.05, 0.0));
        let frame = frame_for(&transform, &params);
        let mut scratch = CollisionScratch::default();

        let mut runtime = CollisionRuntimeParams::new();
        let mut caster = Caster::new(&world, &mut scratch);
        perform_position_check(&mut caster, &params, &mut runtime, &transform, true, &frame);
        assert!(!runtime.position_check.is_position_ok);
        assert_eq!(runtime.position_check.fixed_position, transform.translation);

        let mut caster = Caster::new(&world, &mut scratch);
        perform_position_check(&mut caster, &params, &mut runtime, &transform, false, &frame);
        assert!(runtime.position_check.is_position_ok);
        assert_relative_eq!(runtime.position_check.fixed_position.y, 0.0, epsilon = 1.0e-4);
    }
}
