/*!
Collision check engine.

Turns a requested movement, teleport or transform into a collision-respecting
result by raycasting against a [`RaycastProvider`]. The engine is split into:

- params:          per-character configuration (`CollisionCheckParams`)
- runtime:         the collision session carried across frames (`CollisionRuntimeParams`)
- results:         read-only structured projection of the session
- sampling:        circumference sample points around the capsule base/top
- sub_checks:      named horizontal sub-checks run as an ordered pipeline
- horizontal:      horizontal movement resolver and horizontal position check
- vertical:        vertical movement resolver and vertical position check
- surface:         ground/ceiling classifier, snap, pop-out and slope policies
- wall_slide:      slide along blocking walls with flicker prevention
- movement:        one horizontal-then-vertical movement step
- split_movement:  long movements performed as bounded sub-steps
- teleport:        destination validation for teleport and position checks
- settings:        default values and tolerances

Every operation runs to completion synchronously and writes its outcome into the
session; nothing is returned and nothing panics.
*/

pub mod params;
pub mod results;
pub mod runtime;
pub mod settings;

mod horizontal;
mod movement;
mod sampling;
mod split_movement;
mod sub_checks;
mod surface;
mod teleport;
mod vertical;
mod wall_slide;

#[cfg(test)]
mod test_utils;

pub use params::{
    CollisionCheckParams, HorizontalCheckKind, HorizontalCheckParams, ParamsError,
    SplitMovementParams, SplitStopCondition, SurfaceKind, SurfaceParams, SurfacePolicy, Tolerances,
    VerticalCheckParams, WallSlideParams,
};
pub use results::{CharacterCollisionResults, MovementView};
pub use runtime::{
    AxisMovementResults, CollisionCheckType, CollisionRuntimeParams, LastValidMovement,
    PositionCheckResults, SplitMovementResult, SurfaceAdjustments, SurfaceInfo, TeleportResults,
    WallSlideState,
};
pub use surface::classify_surface;

use crate::layer_flags::PhysicsLayerFlags;
use crate::raycast::{ObjectId, RaycastHit, RaycastProvider, RaycastResults, RaycastSetup};
use crate::world::types::{Transform, Vec3, flatten, normalize_or_zero};

use surface::SurfaceSample;

/// Buffers reused by every check instead of allocating per call.
#[derive(Debug, Default)]
pub struct CollisionScratch {
    setup: RaycastSetup,
    results: RaycastResults,
    surface_samples: Vec<SurfaceSample>,
}

/// Layer mask and ignore list of a group of casts.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CastFilter<'p> {
    pub layers: PhysicsLayerFlags,
    pub ignore: &'p [ObjectId],
}

impl<'p> CastFilter<'p> {
    pub fn horizontal(params: &'p CollisionCheckParams) -> Self {
        Self {
            layers: params.horizontal.block_layer_flags,
            ignore: &params.horizontal.objects_to_ignore,
        }
    }

    pub fn vertical(params: &'p CollisionCheckParams) -> Self {
        Self {
            layers: params.vertical.block_layer_flags,
            ignore: &params.vertical.objects_to_ignore,
        }
    }
}

/// Borrowed world plus scratch for the duration of one check.
pub(crate) struct Caster<'a> {
    world: &'a dyn RaycastProvider,
    scratch: &'a mut CollisionScratch,
    count: u32,
}

impl<'a> Caster<'a> {
    pub fn new(world: &'a dyn RaycastProvider, scratch: &'a mut CollisionScratch) -> Self {
        Self {
            world,
            scratch,
            count: 0,
        }
    }

    /// Ordered hits of a single ray; valid until the next cast.
    pub fn cast(
        &mut self,
        filter: CastFilter<'_>,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
    ) -> &[RaycastHit] {
        let setup = &mut self.scratch.setup;
        setup.origin = origin;
        setup.direction = direction;
        setup.distance = distance;
        setup.block_layer_flags = filter.layers;
        setup.objects_to_ignore.clear();
        setup.objects_to_ignore.extend_from_slice(filter.ignore);
        setup.ignore_hits_inside_collision = false;

        self.world.raycast(&self.scratch.setup, &mut self.scratch.results);
        self.count += 1;
        &self.scratch.results.hits
    }

    /// First hit that did not start inside a collider.
    pub fn first_blocking(
        &mut self,
        filter: CastFilter<'_>,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
    ) -> Option<RaycastHit> {
        self.cast(filter, origin, direction, distance)
            .iter()
            .find(|h| h.is_blocking())
            .copied()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn take_samples(&mut self) -> Vec<SurfaceSample> {
        let mut samples = std::mem::take(&mut self.scratch.surface_samples);
        samples.clear();
        samples
    }

    pub(crate) fn return_samples(&mut self, samples: Vec<SurfaceSample>) {
        self.scratch.surface_samples = samples;
    }
}

/// Orientation of the character during one check.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub up: Vec3,
    /// Horizontal, unit length.
    pub forward: Vec3,
    pub right: Vec3,
}

impl Frame {
    pub fn new(transform: &Transform, params: &CollisionCheckParams) -> Self {
        let up = match normalize_or_zero(&transform.up()) {
            up if up.norm_squared() > 0.0 => up,
            _ => Vec3::y(),
        };
        let reference = params
            .horizontal
            .fixed_forward
            .unwrap_or_else(|| transform.forward());
        let forward = match flatten(&reference, &up) {
            forward if forward.norm_squared() > 0.0 => forward,
            _ => sampling::perpendicular(&up),
        };

        Self {
            up,
            forward,
            right: up.cross(&forward),
        }
    }
}

/// The collision check engine.
///
/// Owns only scratch buffers; all state that must survive between frames lives in
/// the caller's [`CollisionRuntimeParams`].
#[derive(Debug, Default)]
pub struct CollisionCheck {
    scratch: CollisionScratch,
}

impl CollisionCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `movement` from `transform` and store the outcome in `runtime`.
    ///
    /// Horizontal movement is resolved first, then vertical. If both are fully
    /// canceled the movement failed and `runtime.new_position` is the start position.
    pub fn check_movement<W: RaycastProvider>(
        &mut self,
        world: &W,
        movement: Vec3,
        transform: &Transform,
        params: &CollisionCheckParams,
        runtime: &mut CollisionRuntimeParams,
    ) {
        runtime.begin_check(CollisionCheckType::Movement, transform);
        runtime.original_movement = movement;

        let start = transform.translation;
        if params.check_disabled {
            runtime.new_position = start + movement;
            runtime.fixed_movement = movement;
            return;
        }

        let frame = Frame::new(transform, params);
        let mut caster = Caster::new(world, &mut self.scratch);

        let end = if params.split_movement.enabled {
            split_movement::perform_split_movement(&mut caster, params, runtime, start, &frame, movement)
        } else {
            movement::move_step(&mut caster, params, runtime, start, &frame, movement)
        };

        let end = if runtime.results().movement_failed() {
            start
        } else {
            end
        };
        runtime.new_position = end;
        runtime.fixed_movement = end - start;
        runtime.raycast_count = caster.count();

        log::trace!(
            "Movement check: requested {:?}, fixed {:?}, {} raycasts",
            movement,
            runtime.fixed_movement,
            runtime.raycast_count
        );
    }

    /// Validate `target_position` as a teleport destination.
    ///
    /// On failure `teleport.canceled` is set and `new_position` stays at the
    /// transform position.
    pub fn teleport<W: RaycastProvider>(
        &mut self,
        world: &W,
        target_position: Vec3,
        transform: &Transform,
        params: &CollisionCheckParams,
        runtime: &mut CollisionRuntimeParams,
    ) {
        runtime.begin_check(CollisionCheckType::Teleport, transform);
        runtime.teleport.target_position = target_position;

        if params.check_disabled {
            runtime.teleport.fixed_position = target_position;
            runtime.new_position = target_position;
            runtime.fixed_movement = target_position - transform.translation;
            return;
        }

        let target = transform.with_translation(target_position);
        let frame = Frame::new(&target, params);
        let mut caster = Caster::new(world, &mut self.scratch);
        teleport::perform_teleport(&mut caster, params, runtime, transform, target_position, &frame);
        runtime.raycast_count = caster.count();
    }

    /// Validate `transform` in place. `strict` forbids snap/pop-out fixes.
    ///
    /// `position_check.is_position_ok == true` means valid.
    pub fn position_check<W: RaycastProvider>(
        &mut self,
        world: &W,
        strict: bool,
        transform: &Transform,
        params: &CollisionCheckParams,
        runtime: &mut CollisionRuntimeParams,
    ) {
        runtime.begin_check(CollisionCheckType::PositionCheck, transform);

        if params.check_disabled {
            runtime.position_check = PositionCheckResults {
                original_position: transform.translation,
                fixed_position: transform.translation,
                is_position_ok: true,
                strict,
            };
            return;
        }

        let frame = Frame::new(transform, params);
        let mut caster = Caster::new(world, &mut self.scratch);
        teleport::perform_position_check(&mut caster, params, runtime, transform, strict, &frame);
        runtime.raycast_count = caster.count();
    }

    /// Recompute ground and/or ceiling info at `transform` without moving.
    pub fn update_surface_info<W: RaycastProvider>(
        &mut self,
        world: &W,
        transform: &Transform,
        params: &CollisionCheckParams,
        runtime: &mut CollisionRuntimeParams,
    ) {
        runtime.begin_check(CollisionCheckType::SurfaceInfo, transform);
        let frame = Frame::new(transform, params);
        let mut caster = Caster::new(world, &mut self.scratch);
        let direction = movement::reference_direction(runtime, &frame);
        surface::refresh_surface_info(
            &mut caster,
            params,
            runtime,
            transform.translation,
            &frame,
            &direction,
        );
        runtime.raycast_count = caster.count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::test_utils::{floor_and_wall_world, floor_world, ledge_world, slope_world, standing};
    use crate::world::types::Quat;
    use crate::world::{StaticWorld, cuboid_from_pose, plane_through_point};
    use approx::assert_relative_eq;

    fn grounded(world: &StaticWorld, params: &CollisionCheckParams, position: Vec3) -> CollisionRuntimeParams {
        let mut runtime = CollisionRuntimeParams::new();
        CollisionCheck::new().update_surface_info(world, &standing(position), params, &mut runtime);
        runtime
    }

    fn move_by(
        world: &StaticWorld,
        params: &CollisionCheckParams,
        runtime: &mut CollisionRuntimeParams,
        position: Vec3,
        movement: Vec3,
    ) -> Vec3 {
        CollisionCheck::new().check_movement(world, movement, &standing(position), params, runtime);
        runtime.new_position
    }

    #[test]
    fn surface_info_update_is_idempotent() {
        let world = slope_world(20.0);
        let params = CollisionCheckParams::default();
        let mut check = CollisionCheck::new();
        let mut runtime = CollisionRuntimeParams::new();
        let transform = standing(Vec3::new(0.0, 0.02, 0.0));

        check.update_surface_info(&world, &transform, &params, &mut runtime);
        let first = (runtime.ground, runtime.ceiling);
        check.update_surface_info(&world, &transform, &params, &mut runtime);

        assert_eq!((runtime.ground, runtime.ceiling), first);
        assert_eq!(runtime.new_position, transform.translation);
        assert_eq!(runtime.check_type, Some(CollisionCheckType::SurfaceInfo));
    }

    #[test]
    fn fixed_movement_decomposes_into_axes() {
        let world = floor_world();
        let params = CollisionCheckParams::default();
        let mut runtime = CollisionRuntimeParams::new();
        let movement = Vec3::new(0.4, -0.5, 0.2);
        move_by(&world, &params, &mut runtime, Vec3::new(0.0, 0.3, 0.0), movement);

        let results = runtime.results();
        let horizontal = results.horizontal_movement().fixed;
        let vertical = results.vertical_movement().fixed;
        assert_relative_eq!(results.movement().fixed, horizontal + vertical, epsilon = 1.0e-5);
        assert_relative_eq!(horizontal.y, 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(vertical.x, 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(vertical.z, 0.0, epsilon = 1.0e-6);
        assert!(results.movement().fixed.norm() <= movement.norm() + 1.0e-4);
        assert_relative_eq!(runtime.new_position, Vec3::new(0.4, 0.0, 0.2), epsilon = 1.0e-4);
        assert!(results.vertical_movement_reduced());
    }

    #[test]
    fn failed_movement_does_not_move() {
        let world = floor_and_wall_world(0.3);
        let params = CollisionCheckParams::default();
        let mut runtime = grounded(&world, &params, Vec3::zeros());

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(1.0, -1.0, 0.0));
        assert!(runtime.results().movement_failed());
        assert_eq!(end, Vec3::zeros());
        assert_eq!(runtime.fixed_movement, Vec3::zeros());
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn split_matches_unsplit_in_open_field() {
        let world = floor_world();
        let mut params = CollisionCheckParams::default();
        let movement = Vec3::new(1.0, 0.0, 0.0);

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let unsplit = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);

        params.split_movement.enabled = true;
        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let split = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);

        assert_relative_eq!(split, unsplit, epsilon = 1.0e-4);
        assert_relative_eq!(split, movement, epsilon = 1.0e-4);
        assert_eq!(runtime.split_movement.steps_to_perform, 5);
        assert_eq!(runtime.split_movement.steps_performed, 5);
        assert!(!runtime.split_movement.movement_interrupted);
    }

    #[test]
    fn blocked_horizontal_movement_stops_before_wall() {
        let world = floor_and_wall_world(1.0);
        let params = CollisionCheckParams::default();
        let mut runtime = grounded(&world, &params, Vec3::zeros());

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(end.x, 1.0 - 0.3 - params.tolerances.skin, epsilon = 1.0e-4);
        assert_relative_eq!(end.y, 0.0, epsilon = 1.0e-5);
        assert_relative_eq!(end.z, 0.0, epsilon = 1.0e-5);

        let results = runtime.results();
        assert!(results.movement_collided());
        assert!(!results.movement_failed());
        assert_eq!(results.vertical_movement().fixed, Vec3::zeros());
        assert!(results.reference_collision_hit().is_some());
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn snaps_to_ground_just_below() {
        let world = floor_world();
        let params = CollisionCheckParams::default();
        let mut runtime = CollisionRuntimeParams::new();

        let end = move_by(&world, &params, &mut runtime, Vec3::new(0.0, 0.05, 0.0), Vec3::zeros());
        assert!(runtime.is_on_ground());
        assert!(runtime.ground_adjustments.snapped);
        assert_relative_eq!(end.y, 0.0, epsilon = 1.0e-4);
        assert_relative_eq!(runtime.fixed_movement.y, -0.05, epsilon = 1.0e-4);
    }

    #[test]
    fn pops_out_of_shallow_penetration() {
        let world = floor_world();
        let params = CollisionCheckParams::default();
        let mut runtime = CollisionRuntimeParams::new();

        let end = move_by(&world, &params, &mut runtime, Vec3::new(0.0, -0.05, 0.0), Vec3::zeros());
        assert!(runtime.ground_adjustments.popped_out);
        assert!(runtime.is_on_ground());
        assert_relative_eq!(end.y, 0.0, epsilon = 1.0e-4);
    }

    #[test]
    fn slides_along_diagonal_wall() {
        let normal = Vec3::new(-1.0, 0.0, -1.0).normalize();
        let world = floor_world().with(plane_through_point(normal, Vec3::new(1.0, 0.0, 0.0)));
        let params = CollisionCheckParams::default();
        let mut runtime = grounded(&world, &params, Vec3::zeros());

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(end, Vec3::new(0.5, 0.0, -0.5), epsilon = 1.0e-3);
        assert!(runtime.results().wall_slide().is_sliding);
        assert!(runtime.results().movement_collided());
    }

    #[test]
    fn must_stay_holds_at_a_ledge_under_gravity() {
        let world = ledge_world(1.0);
        let mut params = CollisionCheckParams::default();
        params.ground.must_stay_on_surface = true;
        let mut position = Vec3::new(0.5, 0.0, 0.0);
        let mut runtime = grounded(&world, &params, position);

        for frame in 0..6 {
            position = move_by(&world, &params, &mut runtime, position, Vec3::new(0.2, -0.01, 0.0));
            assert_relative_eq!(position.y, 0.0, epsilon = 1.0e-4);
            assert!(runtime.is_on_ground(), "frame {frame}");
        }
        assert!(position.x <= 1.0 + params.vertical.circumference_radius + 1.0e-3);
        assert!(runtime.horizontal.colliding);
    }

    #[test]
    fn slope_follow_keeps_the_character_on_the_slope() {
        let world = slope_world(20.0);
        let params = CollisionCheckParams::default();
        let rise = 0.5 * 20f32.to_radians().tan();

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(end, Vec3::new(0.5, rise, 0.0), epsilon = 1.0e-3);
        assert!(runtime.ground_adjustments.vertical_movement_adjusted_uphill);
        assert!(runtime.is_on_ground());

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(-0.5, 0.0, 0.0));
        assert_relative_eq!(end, Vec3::new(-0.5, -rise, 0.0), epsilon = 1.0e-3);
        assert!(runtime.ground_adjustments.vertical_movement_adjusted_downhill);
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn slope_follow_bounds_are_per_direction() {
        let world = slope_world(20.0);
        let mut params = CollisionCheckParams::default();
        params.ground.slope_follow_uphill_max_angle = 10.0;

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(-0.5, 0.0, 0.0));
        assert!(runtime.ground_adjustments.vertical_movement_adjusted_downhill);

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(0.5, 0.0, 0.0));
        assert!(!runtime.ground_adjustments.vertical_movement_adjusted_uphill);
    }

    #[test]
    fn steep_uphill_is_blocked_unless_the_exit_is_walkable() {
        // 40 degree ramp whose top edge meets a flat plateau.
        let radians = 40f32.to_radians();
        let along = Vec3::new(radians.cos(), radians.sin(), 0.0);
        let normal = Vec3::new(-radians.sin(), radians.cos(), 0.0);
        let edge = Vec3::new(0.15, 0.15 * radians.tan(), 0.0);
        let ramp = cuboid_from_pose(
            Vec3::new(1.0, 0.5, 5.0),
            edge - along - normal * 0.5,
            Quat::from_axis_angle(&Vec3::z_axis(), radians),
        );
        let plateau = cuboid_from_pose(
            Vec3::new(2.0, 0.5, 5.0),
            Vec3::new(edge.x + 2.0, edge.y - 0.5, 0.0),
            Quat::identity(),
        );
        let world = StaticWorld::new().with(ramp).with(plateau);

        let mut params = CollisionCheckParams::default();
        // The plateau lip is a step, not a wall.
        params.feet_distance_to_ignore = 0.3;
        params.ground.pop_out_max_distance = 0.3;
        params.ground.allow_exit_attempt_when_on_not_ignorable_angle = false;
        let start = Vec3::new(-0.1, -0.1 * radians.tan(), 0.0);
        let movement = Vec3::new(0.45, 0.0, 0.0);

        let mut runtime = grounded(&world, &params, start);
        assert!(runtime.is_on_ground());
        assert!(runtime.ground.surface_angle > params.ground.angle_to_ignore);
        let end = move_by(&world, &params, &mut runtime, start, movement);
        assert_relative_eq!(end, start, epsilon = 1.0e-4);
        assert!(runtime.horizontal.colliding);

        params.ground.allow_exit_attempt_when_on_not_ignorable_angle = true;
        let mut runtime = grounded(&world, &params, start);
        let end = move_by(&world, &params, &mut runtime, start, movement);
        assert_relative_eq!(end, Vec3::new(0.35, edge.y, 0.0), epsilon = 1.0e-3);
        assert!(runtime.ground_adjustments.popped_out);
        assert!(runtime.is_on_ground());
        assert_relative_eq!(runtime.ground.surface_angle, 0.0, epsilon = 1.0e-2);
    }

    #[test]
    fn steep_uphill_at_a_shallow_perceived_angle_is_walkable() {
        let world = slope_world(40.0);
        let mut params = CollisionCheckParams::default();
        params.feet_distance_to_ignore = 0.3;
        params.ground.slope_follow_uphill_max_angle = 45.0;
        params.ground.slope_follow_uphill_max_perceived_angle = 45.0;
        // About 31 degrees along this direction.
        let movement = Vec3::new(0.2, 0.0, 0.2);

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);
        assert_relative_eq!(end, Vec3::zeros(), epsilon = 1.0e-4);

        params.ground.angle_to_ignore_with_perceived_angle = Some(35.0);
        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);
        assert_relative_eq!(end, Vec3::new(0.2, 0.2 * 40f32.to_radians().tan(), 0.2), epsilon = 1.0e-3);
        assert!(runtime.ground_adjustments.vertical_movement_adjusted_uphill);
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn stepping_down_recollects_the_lower_ground() {
        let world = ledge_world(1.0).with(plane_through_point(Vec3::y(), Vec3::new(0.0, -0.15, 0.0)));
        let mut params = CollisionCheckParams::default();
        params.ground.must_stay_on_surface = true;
        let start = Vec3::new(0.9, 0.0, 0.0);
        let movement = Vec3::new(0.5, 0.0, 0.0);

        let mut runtime = grounded(&world, &params, start);
        let end = move_by(&world, &params, &mut runtime, start, movement);
        assert_relative_eq!(end, Vec3::new(1.4, -0.15, 0.0), epsilon = 1.0e-4);
        assert!(runtime.ground_adjustments.recollected_info);
        assert!(runtime.ground_adjustments.snapped);
        assert!(runtime.is_on_ground());

        // Without the second look the step down is refused.
        params.ground.recollect_info_on_surface_check_failed = false;
        let mut runtime = grounded(&world, &params, start);
        let end = move_by(&world, &params, &mut runtime, start, movement);
        assert_relative_eq!(end, start, epsilon = 1.0e-4);
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn steep_downhill_can_be_refused() {
        let world = slope_world(40.0);
        let mut params = CollisionCheckParams::default();
        params.feet_distance_to_ignore = 0.3;
        params.ground.slope_follow_downhill_max_angle = 45.0;
        params.ground.slope_follow_downhill_max_perceived_angle = 45.0;
        let movement = Vec3::new(-0.3, 0.0, 0.0);

        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);
        assert_relative_eq!(end, Vec3::new(-0.3, -0.3 * 40f32.to_radians().tan(), 0.0), epsilon = 1.0e-3);
        assert!(runtime.is_on_ground());

        params.ground.must_stay_on_ignorable_angle_downhill = true;
        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), movement);
        assert_relative_eq!(end, Vec3::zeros(), epsilon = 1.0e-4);
        assert!(runtime.horizontal.colliding);
        assert!(runtime.is_on_ground());
    }

    fn split_params() -> CollisionCheckParams {
        let mut params = CollisionCheckParams::default();
        params.split_movement.enabled = true;
        params
    }

    #[test]
    fn split_stops_when_horizontal_movement_fails() {
        let world = floor_and_wall_world(0.5);
        let mut params = split_params();
        params.split_movement.stop_on_horizontal_movement_failed = true;
        let mut runtime = grounded(&world, &params, Vec3::zeros());

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(end.x, 0.19, epsilon = 1.0e-4);
        let split = runtime.results().split_movement();
        assert!(split.movement_interrupted);
        assert!(split.movement_reduced);
        assert_eq!(split.steps_performed, 2);

        params.split_movement.stop_return_previous_results = true;
        let mut runtime = grounded(&world, &params, Vec3::zeros());
        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(end.x, 0.19, epsilon = 1.0e-4);
        assert_eq!(runtime.split_movement.steps_performed, 1);
        assert!(runtime.split_movement.movement_interrupted);
    }

    #[test]
    fn split_fails_instead_of_reducing() {
        let world = floor_and_wall_world(0.5);
        let mut params = split_params();
        params.split_movement.stop_and_fail_if_movement_would_be_reduced = true;
        let mut runtime = grounded(&world, &params, Vec3::zeros());

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(end, Vec3::zeros());
        assert!(runtime.results().movement_failed());
        assert!(runtime.split_movement.movement_interrupted);
        assert!(runtime.is_on_ground());
    }

    #[test]
    fn teleport_and_position_check_report_through_results() {
        let mut params = CollisionCheckParams::default();
        params.ground.angle_to_ignore = 45.0;
        params.ground.teleport.must_be_on_surface = true;
        params.ground.teleport.must_be_on_ignorable_angle = true;
        let mut check = CollisionCheck::new();
        let mut runtime = CollisionRuntimeParams::new();
        let start = standing(Vec3::new(-2.0, 0.0, 0.0));

        check.teleport(&slope_world(50.0), Vec3::zeros(), &start, &params, &mut runtime);
        assert!(runtime.results().teleport_failed());
        assert_eq!(runtime.results().final_transform().translation, start.translation);

        check.teleport(&floor_world(), Vec3::new(1.0, 0.0, 1.0), &start, &params, &mut runtime);
        assert!(!runtime.results().teleport_failed());
        assert_relative_eq!(runtime.new_position, Vec3::new(1.0, 0.0, 1.0), epsilon = 1.0e-4);

        check.position_check(&floor_world(), true, &standing(Vec3::zeros()), &params, &mut runtime);
        assert!(!runtime.results().check_transform_failed());
    }

    #[test]
    fn disabled_check_applies_movement_directly() {
        let world = floor_and_wall_world(1.0);
        let params = CollisionCheckParams {
            check_disabled: true,
            ..CollisionCheckParams::default()
        };
        let mut runtime = CollisionRuntimeParams::new();

        let end = move_by(&world, &params, &mut runtime, Vec3::zeros(), Vec3::new(2.0, -1.0, 0.0));
        assert_eq!(end, Vec3::new(2.0, -1.0, 0.0));
        assert_eq!(runtime.raycast_count, 0);
    }
}
