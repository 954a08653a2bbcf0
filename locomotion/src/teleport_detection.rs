//! Finding where a teleport arc lands and whether the player may stand there.

use collision::world::types::{
    Quat, angle_degrees, flatten, horizontal_component, is_concordant, rotate_around_axis, signed_angle_degrees,
};
use collision::{
    CollisionCheck, CollisionRuntimeParams, ObjectId, PhysicsLayerFlags, RaycastHit, RaycastProvider, RaycastResults,
    RaycastSetup, Transform, Vec3,
};
use nalgebra as na;

use crate::input::Vec2;
use crate::params::{PlayerLocomotionParams, TeleportDetectionParams, VisibilityRequirement};
use crate::parable::Parable;

/// Offset used to step off a surface before re-casting against it.
const SURFACE_OFFSET: f32 = 0.01;
const FLOOR_RECAST_DISTANCE: f32 = SURFACE_OFFSET * 1.25;
/// Length of the downward cast that looks for a floor below the arc end.
const FLOOR_SEARCH_DISTANCE: f32 = 100.0;
/// Back-off candidates are this many player radii away from the rejected point.
const BACK_OFF_RADIUS_FACTOR: f32 = 1.1;
/// Hard cap on arc samples, whatever the parameters.
const MAX_ARC_SAMPLES: u32 = 4096;
const DISTANCE_EPSILON: f32 = 1.0e-5;
const ANGLE_EPSILON: f32 = 1.0e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TeleportDetectionResult {
    /// The pointer aims somewhere an arc can be drawn.
    pub detection_valid: bool,
    /// `teleport_position` can be teleported to.
    pub position_valid: bool,
    pub teleport_position: Vec3,
    pub surface_normal: Vec3,
    /// Arc length up to the landing point, for drawing.
    pub parable_distance: f32,
    /// Yaw applied to the player on arrival (degrees).
    pub rotation_on_up: f32,
}

/// Where the player stands while aiming.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPose {
    pub feet: Transform,
    pub head_position: Vec3,
}

impl PlayerPose {
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.feet.up()
    }

    pub fn head_height(&self) -> f32 {
        (self.head_position - self.feet.translation).dot(&self.up())
    }
}

/// Everything a detection pass reads but does not own.
pub struct DetectionContext<'a, W> {
    pub world: &'a W,
    pub params: &'a PlayerLocomotionParams,
    /// The player's collision session; copied, never modified.
    pub session: &'a CollisionRuntimeParams,
    pub pose: PlayerPose,
}

impl<W> DetectionContext<'_, W> {
    #[inline]
    fn detection(&self) -> &TeleportDetectionParams {
        &self.params.teleport.detection
    }
}

/// Arc casting and landing validation.
///
/// Keeps its own collision check and a scratch copy of the player session, so
/// probing destinations never disturbs the player's hysteresis state.
#[derive(Debug, Default)]
pub struct TeleportDetection {
    check: CollisionCheck,
    check_session: CollisionRuntimeParams,
    setup: RaycastSetup,
    results: RaycastResults,
    result: TeleportDetectionResult,
    rotation_on_up_next: f32,
}

impl TeleportDetection {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn result(&self) -> &TeleportDetectionResult {
        &self.result
    }

    /// Collision session of the last destination probed.
    #[inline]
    pub fn check_session(&self) -> &CollisionRuntimeParams {
        &self.check_session
    }

    pub fn reset(&mut self) {
        self.result = TeleportDetectionResult::default();
        self.rotation_on_up_next = 0.0;
    }

    /// Mark the current aim as unusable, keeping the arrival yaw.
    pub fn invalidate(&mut self) {
        self.result.detection_valid = false;
        self.result.position_valid = false;
    }

    /// Arc direction for `pointer`, or `None` when it aims too close to up or down.
    ///
    /// The pointer forward is pitched by `extra_vertical_rotation`; negative
    /// values raise the arc. A pointer held upside down pitches the other way.
    pub fn pointer_direction(detection: &TeleportDetectionParams, pointer: &Transform, up: &Vec3) -> Option<Vec3> {
        let forward = pointer.forward();
        if angle_degrees(&forward, up) < detection.forward_min_angle_to_be_valid_up
            || angle_degrees(&forward, &-up) < detection.forward_min_angle_to_be_valid_down
        {
            return None;
        }

        let pitch_axis = up.cross(&forward);
        let pitch = if is_concordant(&pointer.up(), up) {
            detection.extra_vertical_rotation
        } else {
            -detection.extra_vertical_rotation
        };
        let direction = rotate_around_axis(&forward, pitch, &pitch_axis);

        let valid = angle_degrees(&direction, up) >= detection.parable_forward_min_angle_to_be_valid_up
            && angle_degrees(&direction, &-up) >= detection.parable_forward_min_angle_to_be_valid_down;
        valid.then_some(direction)
    }

    /// Track the arrival yaw chosen with `stick`.
    ///
    /// The value shown lags one push-frame behind the stick, so releasing the
    /// stick does not change it on the way back to the center.
    pub fn update_rotation_on_up(&mut self, stick: &Vec2, detection: &TeleportDetectionParams) {
        if !detection.rotation_on_up_enabled {
            self.result.rotation_on_up = 0.0;
            self.rotation_on_up_next = 0.0;
            return;
        }

        if stick.norm() > detection.rotation_on_up_min_stick_intensity {
            self.result.rotation_on_up = self.rotation_on_up_next;
            self.rotation_on_up_next = signed_angle_degrees(&Vec3::z(), &Vec3::new(stick.x, 0.0, stick.y), &Vec3::y());
        }
    }

    /// Cast the arc from `start` along `direction` and validate where it lands.
    pub fn detect<W: RaycastProvider>(
        &mut self,
        ctx: &DetectionContext<'_, W>,
        start: Vec3,
        direction: Vec3,
    ) -> &TeleportDetectionResult {
        self.result.detection_valid = true;
        self.result.position_valid = false;

        let detection = ctx.detection();
        let up = ctx.pose.up();
        let parable = Parable::new(start, direction, up, &detection.parable);
        let max_parable_distance = detection.max_distance * 2.0;

        let mut previous = parable.position(0);
        let mut arc_distance = 0.0;
        let mut last_segment = 0.0;
        let mut arc_hit = None;
        for index in 1..=MAX_ARC_SAMPLES {
            let position = parable.position(index);
            let segment = position - previous;
            last_segment = segment.norm();
            if last_segment > 0.0 {
                arc_hit = self.cast(
                    ctx.world,
                    previous,
                    segment / last_segment,
                    last_segment,
                    detection.block_layer_flags,
                    &[],
                );
            }
            arc_distance += last_segment;
            previous = position;

            let flat_distance = horizontal_component(&(position - start), &up).norm();
            if arc_hit.is_some() || flat_distance > detection.max_distance || arc_distance > max_parable_distance {
                break;
            }
        }

        let max_distance = parable.distance_over_flat_distance(detection.max_distance, max_parable_distance);
        self.result.parable_distance = arc_distance.min(max_distance);

        let hit = arc_hit.filter(|hit| {
            let hit_distance = arc_distance - (last_segment - hit.distance);
            hit_distance <= self.result.parable_distance
        });
        match hit {
            Some(hit) => {
                self.result.parable_distance = arc_distance - (last_segment - hit.distance);
                if !self.evaluate_hit(ctx, &hit) {
                    let origin = hit.position + hit.normal * SURFACE_OFFSET;
                    self.settle_below(ctx, origin, Some(hit.normal), &direction);
                }
            }
            None => {
                let end = parable.position_by_distance(self.result.parable_distance);
                self.settle_below(ctx, end, None, &direction);
            }
        }

        log::trace!(
            "Teleport detection: valid {}, position {:?}, arc {}",
            self.result.position_valid,
            self.result.teleport_position,
            self.result.parable_distance
        );
        &self.result
    }

    /// Look for a floor below `origin`, then around it when that floor is rejected.
    ///
    /// Candidates step back by a bit more than the player radius: away from
    /// the wall the teleport check bumped into, away from the surface the arc
    /// hit, and back toward the player.
    fn settle_below<W: RaycastProvider>(
        &mut self,
        ctx: &DetectionContext<'_, W>,
        origin: Vec3,
        arc_hit_normal: Option<Vec3>,
        direction: &Vec3,
    ) {
        let up = ctx.pose.up();
        let block_layer_flags = ctx.detection().block_layer_flags;
        let Some(floor) = self.cast(ctx.world, origin, -up, FLOOR_SEARCH_DISTANCE, block_layer_flags, &[]) else {
            return;
        };
        if self.evaluate_hit(ctx, &floor) {
            return;
        }

        let blocker_normal = (self.check_session.teleport.canceled && self.check_session.horizontal.colliding)
            .then(|| self.check_session.horizontal.collision_hit.map(|hit| hit.normal))
            .flatten();
        let back_off = ctx.params.collision.radius * BACK_OFF_RADIUS_FACTOR;

        for away in [blocker_normal, arc_hit_normal, Some(-direction)].into_iter().flatten() {
            let away = flatten(&away, &up);
            if away.norm_squared() == 0.0 {
                continue;
            }
            let candidate_origin = origin + away * back_off;
            if let Some(floor) = self.cast(ctx.world, candidate_origin, -up, FLOOR_SEARCH_DISTANCE, block_layer_flags, &[])
                && self.evaluate_hit(ctx, &floor)
            {
                return;
            }
        }
    }

    fn evaluate_hit<W: RaycastProvider>(&mut self, ctx: &DetectionContext<'_, W>, hit: &RaycastHit) -> bool {
        self.check_session.reset();
        let valid = self.is_hit_valid(ctx, hit);
        self.result.position_valid = valid;
        if valid {
            self.result.teleport_position = self.check_session.new_position;
            self.result.surface_normal = self.check_session.ground.surface_normal;
        }
        valid
    }

    /// A hit is a landing spot if it lies on a floor layer and the position passes
    /// [`Self::is_position_valid`].
    fn is_hit_valid<W: RaycastProvider>(&mut self, ctx: &DetectionContext<'_, W>, hit: &RaycastHit) -> bool {
        if !hit.is_valid() || hit.inside_collision {
            return false;
        }

        let floor = self.cast(
            ctx.world,
            hit.position + hit.normal * SURFACE_OFFSET,
            -hit.normal,
            FLOOR_RECAST_DISTANCE,
            ctx.detection().floor_layer_flags,
            &[],
        );
        if floor.is_none_or(|floor| floor.object != hit.object) {
            return false;
        }

        self.is_position_valid(ctx, hit.position)
    }

    /// Run every destination check on `position`; the engine's fixed position
    /// ends up in the check session.
    pub fn is_position_valid<W: RaycastProvider>(&mut self, ctx: &DetectionContext<'_, W>, position: Vec3) -> bool {
        let detection = ctx.detection();
        if !self.is_position_visible(ctx, position) {
            return false;
        }

        let up = ctx.pose.up();
        let mut feet = ctx.pose.feet;
        if self.result.rotation_on_up != 0.0 {
            let yaw = Quat::from_axis_angle(&na::Unit::new_normalize(up), self.result.rotation_on_up.to_radians());
            feet.rotation = yaw * feet.rotation;
        }

        let height_difference = (position - feet.translation).dot(&up).abs();
        if height_difference >= detection.max_height_difference + DISTANCE_EPSILON {
            return false;
        }

        self.check_session.clone_from(ctx.session);
        let canceled = if detection.perform_teleport_as_movement {
            self.check_as_movement(ctx, position, &feet)
        } else {
            self.check
                .teleport(ctx.world, position, &feet, &ctx.params.collision, &mut self.check_session);
            self.check_session.teleport.canceled
        };
        if canceled {
            return false;
        }

        if detection.must_be_on_ground && !self.check_session.is_on_ground() {
            return false;
        }

        let upward = (self.check_session.new_position - feet.translation).dot(&up) > 0.0;
        if upward && self.check_session.ground.surface_angle >= detection.ground_angle_to_ignore_upward + ANGLE_EPSILON {
            return false;
        }

        true
    }

    /// Walk from the feet to `position`; canceled unless the walk ends close to it.
    fn check_as_movement<W: RaycastProvider>(
        &mut self,
        ctx: &DetectionContext<'_, W>,
        position: Vec3,
        feet: &Transform,
    ) -> bool {
        let movement = position - feet.translation;
        self.check
            .check_movement(ctx.world, movement, feet, &ctx.params.collision, &mut self.check_session);

        let miss = (self.check_session.new_position - position).norm();
        let canceled = self.check_session.results().movement_failed()
            || miss > ctx.detection().teleport_as_movement_max_distance_from_target + DISTANCE_EPSILON;
        self.check_session.teleport.target_position = position;
        self.check_session.teleport.canceled = canceled;
        canceled
    }

    fn is_position_visible<W: RaycastProvider>(&mut self, ctx: &DetectionContext<'_, W>, position: Vec3) -> bool {
        let visibility = &ctx.detection().visibility;
        let up = ctx.pose.up();
        let head = position + up * ctx.pose.head_height();
        let feet = position + up * visibility.feet_position_vertical_offset;

        match visibility.requirement {
            VisibilityRequirement::None => true,
            VisibilityRequirement::Head => self.is_point_visible(ctx, head),
            VisibilityRequirement::Feet => self.is_point_visible(ctx, feet),
            VisibilityRequirement::HeadAndFeet => self.is_point_visible(ctx, head) && self.is_point_visible(ctx, feet),
            VisibilityRequirement::HeadOrFeet => self.is_point_visible(ctx, head) || self.is_point_visible(ctx, feet),
        }
    }

    /// Rays from the player's head, and rings around it, must reach `target`.
    ///
    /// A ray that hits something counts as reaching the target when the hit is
    /// within `distance_from_hit_threshold` of it.
    fn is_point_visible<W: RaycastProvider>(&mut self, ctx: &DetectionContext<'_, W>, target: Vec3) -> bool {
        let visibility = &ctx.detection().visibility;
        let head = ctx.pose.head_position;
        let to_target = target - head;
        let distance = to_target.norm();
        if distance <= DISTANCE_EPSILON {
            return true;
        }
        let forward = to_target / distance;

        let up = ctx.pose.up();
        let reference_up = if angle_degrees(&forward, &up) < ANGLE_EPSILON
            || angle_degrees(&forward, &-up) < ANGLE_EPSILON
        {
            ctx.pose.feet.forward()
        } else {
            up
        };
        let ring_up = forward.cross(&reference_up).cross(&forward).normalize();

        let ignore = ctx.params.collision.horizontal.objects_to_ignore.as_slice();
        let layers = visibility.block_layer_flags;
        let threshold = visibility.distance_from_hit_threshold;
        let blocked = |this: &mut Self, origin: Vec3| {
            let end = origin + forward * distance;
            this.cast(ctx.world, origin, forward, distance, layers, ignore)
                .is_some_and(|hit| threshold == 0.0 || (hit.position - end).norm() > threshold + DISTANCE_EPSILON)
        };

        if blocked(self, head) {
            return false;
        }

        let steps = visibility.circumference_steps;
        let slices = visibility.circumference_slices.max(1);
        let slice_angle = 360.0 / slices as f32;
        for step in 0..steps {
            let radius = visibility.radius * (step + 1) as f32 / steps as f32;
            let step_rotation = visibility.circumference_rotation_per_step * step as f32;
            let start = rotate_around_axis(&ring_up, step_rotation, &forward);
            for slice in 0..slices {
                let offset = rotate_around_axis(&start, slice_angle * slice as f32, &forward) * radius;
                if blocked(self, head + offset) {
                    return false;
                }
            }
        }

        true
    }

    fn cast<W: RaycastProvider>(
        &mut self,
        world: &W,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
        layers: PhysicsLayerFlags,
        ignore: &[ObjectId],
    ) -> Option<RaycastHit> {
        self.setup.origin = origin;
        self.setup.direction = direction;
        self.setup.distance = distance;
        self.setup.block_layer_flags = layers;
        self.setup.ignore_hits_inside_collision = true;
        self.setup.objects_to_ignore.clear();
        self.setup.objects_to_ignore.extend_from_slice(ignore);
        world.raycast(&self.setup, &mut self.results);
        self.results.first_hit().copied()
    }
}
