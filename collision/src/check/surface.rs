/*!
Ground and ceiling classification, plus the adjustments built on top of it.

Collecting a surface casts one ray per circumference point from slightly inside
the capsule base (top for ceilings) outward, then classifies the hits:

- hits at (almost) 90 degrees are walls and never count as a surface;
- walkable hits are measured against their own plane at the capsule axis, so a
  character standing on a uniform slope reads a distance of zero;
- the closest hit decides the distance, the hits inside the collect window are
  averaged into the surface normal.

On top of the classification this module applies snap and pop-out, slope follow,
and the steep-surface and must-stay policies used by the movement step.
*/

use super::params::{CollisionCheckParams, SurfaceKind, SurfaceParams, SurfacePolicy, Tolerances};
use super::runtime::{CollisionRuntimeParams, SurfaceInfo};
use super::sampling::circumference_points;
use super::{CastFilter, Caster, Frame};
use crate::raycast::RaycastHit;
use crate::world::types::{Vec3, angle_degrees, normalize_or_zero};

/// One ray result used by [`classify_surface`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceSample {
    pub hit: RaycastHit,
    /// Distance from the capsule extremity to the hit along the ray; negative when
    /// the hit is inside the capsule.
    pub ray_distance: f32,
    /// Distance used for classification. For walkable hits this is the distance to
    /// the hit plane along the capsule axis, otherwise `ray_distance`.
    pub signed_distance: f32,
    /// Angle between the hit normal and the surface up, degrees.
    pub angle: f32,
}

/// Direction a flat surface of `kind` faces: up for ground, down for ceilings.
#[inline]
pub(crate) fn surface_up(kind: SurfaceKind, frame: &Frame) -> Vec3 {
    match kind {
        SurfaceKind::Ground => frame.up,
        SurfaceKind::Ceiling => -frame.up,
    }
}

#[inline]
pub(crate) fn surface_info(runtime: &CollisionRuntimeParams, kind: SurfaceKind) -> &SurfaceInfo {
    match kind {
        SurfaceKind::Ground => &runtime.ground,
        SurfaceKind::Ceiling => &runtime.ceiling,
    }
}

#[inline]
fn info_enabled(params: &CollisionCheckParams, kind: SurfaceKind) -> bool {
    match kind {
        SurfaceKind::Ground => params.compute_ground_info_enabled,
        SurfaceKind::Ceiling => params.compute_ceiling_info_enabled,
    }
}

/// Capsule extremity facing the surface.
#[inline]
fn extremity(kind: SurfaceKind, position: Vec3, frame: &Frame, params: &CollisionCheckParams) -> Vec3 {
    match kind {
        SurfaceKind::Ground => position,
        SurfaceKind::Ceiling => position + frame.up * params.height,
    }
}

/// Rise per unit of horizontal travel along `direction` on a surface with `normal`.
///
/// Positive when the surface gets closer to the capsule (uphill for ground).
/// `None` for surfaces too steep to have a meaningful slope.
pub(crate) fn slope_rise(normal: &Vec3, surface_up: &Vec3, direction: &Vec3, zero_epsilon: f32) -> Option<f32> {
    let alignment = normal.dot(surface_up);
    if alignment <= zero_epsilon {
        return None;
    }
    Some(-normal.dot(direction) / alignment)
}

/// Collect the surface of `kind` around `position`.
///
/// `direction` is the horizontal reference used for the perceived angle.
/// `extra_outside` extends the search beyond the configured ranges.
pub(crate) fn collect_surface_info(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    kind: SurfaceKind,
    position: Vec3,
    frame: &Frame,
    direction: &Vec3,
    extra_outside: f32,
) -> SurfaceInfo {
    let surface = params.surface(kind);
    let tolerances = &params.tolerances;
    let base = extremity(kind, position, frame, params);
    let up = surface_up(kind, frame);
    let outward = -up;

    let inside_range = surface
        .collect_info_max_inside_distance
        .max(surface.on_surface_max_inside_distance)
        .max(surface.pop_out_max_distance)
        + tolerances.distance_epsilon;
    let outside_range = surface
        .collect_info_max_outside_distance
        .max(surface.on_surface_max_outside_distance)
        .max(surface.snap_max_distance)
        + extra_outside.max(0.0)
        + tolerances.distance_epsilon;
    let projection_limit = surface.max_followed_angle() + tolerances.angle_epsilon;

    let filter = CastFilter::vertical(params);
    let mut samples = caster.take_samples();
    let mut origins_inside = 0;

    for point in circumference_points(base, frame, params.vertical.circumference_radius, &params.vertical) {
        let origin = point - outward * inside_range;
        let hits = caster.cast(filter, origin, outward, inside_range + outside_range);
        if hits.first().is_some_and(|h| h.inside_collision) {
            origins_inside += 1;
        }
        let Some(hit) = hits.iter().find(|h| h.is_blocking()).copied() else {
            continue;
        };

        let angle = angle_degrees(&hit.normal, &up);
        let ray_distance = hit.distance - inside_range;
        let alignment = hit.normal.dot(&up);
        let signed_distance = if angle <= projection_limit && alignment > tolerances.zero_epsilon {
            (base - hit.position).dot(&hit.normal) / alignment
        } else {
            ray_distance
        };

        samples.push(SurfaceSample {
            hit,
            ray_distance,
            signed_distance,
            angle,
        });
    }

    let info = classify_surface(&samples, origins_inside, surface, tolerances, &up, direction);
    caster.return_samples(samples);
    info
}

/// Classify collected samples into a [`SurfaceInfo`].
///
/// `origins_inside` is the number of rays that started inside a collider.
/// `surface_up` is the normal of a flat surface of this kind.
pub fn classify_surface(
    samples: &[SurfaceSample],
    origins_inside: usize,
    params: &SurfaceParams,
    tolerances: &Tolerances,
    surface_up: &Vec3,
    direction: &Vec3,
) -> SurfaceInfo {
    let eps = tolerances.distance_epsilon;
    let wall_limit = 90.0 - tolerances.angle_epsilon;
    let partially_inside = origins_inside > 0 || samples.iter().any(|s| s.ray_distance < -eps);

    let mut info = SurfaceInfo::default();

    let reference = samples
        .iter()
        .filter(|s| s.angle < wall_limit)
        .min_by(|a, b| a.signed_distance.total_cmp(&b.signed_distance));
    let Some(reference) = reference else {
        info.base_inside_collision = params.base_inside_collision_check_enabled && partially_inside;
        if info.base_inside_collision && params.on_surface_if_base_inside_collision {
            info.on_surface = true;
            info.on_surface_due_to_base_inside = true;
        }
        return info;
    };

    let in_window = |s: &&SurfaceSample| {
        s.angle < wall_limit
            && s.signed_distance >= -(params.collect_info_max_inside_distance + eps)
            && s.signed_distance <= params.collect_info_max_outside_distance + eps
    };
    let mut normal_sum = Vec3::zeros();
    let mut steepest = reference;
    for sample in samples.iter().filter(in_window) {
        normal_sum += sample.hit.normal;
        if sample.angle > steepest.angle {
            steepest = sample;
        }
    }
    let normal = match normalize_or_zero(&normal_sum) {
        n if n.norm_squared() > 0.0 => n,
        _ => reference.hit.normal,
    };

    let distance = reference.signed_distance;
    info.surface_normal = normal;
    info.surface_angle = angle_degrees(&normal, surface_up);
    info.surface_perceived_angle = slope_rise(&normal, surface_up, direction, tolerances.zero_epsilon)
        .map_or(0.0, |rise| rise.atan().to_degrees());
    info.surface_distance = Some(distance);
    info.surface_hit_max_angle = steepest.angle;
    info.surface_hit_max_normal = steepest.hit.normal;
    info.reference_hit = Some(reference.hit);

    let within = distance >= -(params.on_surface_max_inside_distance + eps)
        && distance <= params.on_surface_max_outside_distance + eps;
    let steep = info.surface_angle > params.angle_to_ignore + tolerances.angle_epsilon;

    let mut on_surface = within;
    if within && steep && params.on_surface_requires_ignorable_angle {
        on_surface = params
            .steep_on_surface_max_distance
            .is_some_and(|max| distance.abs() <= max + eps);
    }

    info.base_inside_collision =
        params.base_inside_collision_check_enabled && (distance < -eps || partially_inside);
    if !on_surface && info.base_inside_collision && params.on_surface_if_base_inside_collision {
        on_surface = true;
        info.on_surface_due_to_base_inside = true;
    }
    info.on_surface = on_surface;

    info
}

/// Recompute the enabled surfaces at `position` and store them in the session.
pub(crate) fn refresh_surface_info(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    position: Vec3,
    frame: &Frame,
    direction: &Vec3,
) {
    runtime.ground = if params.compute_ground_info_enabled {
        collect_surface_info(caster, params, SurfaceKind::Ground, position, frame, direction, 0.0)
    } else {
        SurfaceInfo::default()
    };
    runtime.ceiling = if params.compute_ceiling_info_enabled {
        collect_surface_info(caster, params, SurfaceKind::Ceiling, position, frame, direction, 0.0)
    } else {
        SurfaceInfo::default()
    };
}

/// Pull onto a close surface or push out of a shallow penetration.
///
/// `vertical_amount` is the requested vertical movement along up; ground snapping
/// is skipped while moving up and ceiling snapping only happens while moving up.
/// Applying this to an already resolved position does nothing.
pub(crate) fn apply_snap_and_pop_out(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    position: Vec3,
    frame: &Frame,
    direction: &Vec3,
    vertical_amount: f32,
) -> Vec3 {
    let tolerances = &params.tolerances;
    let eps = tolerances.distance_epsilon;
    let mut position = position;

    for kind in [SurfaceKind::Ground, SurfaceKind::Ceiling] {
        if !info_enabled(params, kind) {
            continue;
        }
        let Some(distance) = surface_info(runtime, kind).surface_distance else {
            continue;
        };
        let surface = params.surface(kind);
        let toward = -surface_up(kind, frame);
        let approach = vertical_amount * toward.dot(&frame.up);
        let snap_allowed = match kind {
            SurfaceKind::Ground => approach >= -tolerances.zero_epsilon,
            SurfaceKind::Ceiling => approach > tolerances.zero_epsilon,
        };

        let correction = if distance < -eps
            && surface.pop_out_max_distance > 0.0
            && -distance <= surface.pop_out_max_distance + eps
        {
            let lift = -distance;
            let free = free_distance(caster, params, kind, position, frame, lift);
            if free + eps < lift {
                log::debug!("{kind:?} pop-out of {lift} blocked after {free}");
                None
            } else {
                runtime.adjustments_mut(kind == SurfaceKind::Ground).popped_out = true;
                Some(-toward * lift)
            }
        } else if distance > eps
            && surface.snap_max_distance > 0.0
            && distance <= surface.snap_max_distance + eps
            && snap_allowed
        {
            runtime.adjustments_mut(kind == SurfaceKind::Ground).snapped = true;
            Some(toward * distance)
        } else {
            None
        };

        if let Some(correction) = correction {
            position += correction;
            refresh_surface_info(caster, params, runtime, position, frame, direction);
        }
    }

    position
}

/// Free space on the opposite side of the capsule when popping out of `kind`.
fn free_distance(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    kind: SurfaceKind,
    position: Vec3,
    frame: &Frame,
    length: f32,
) -> f32 {
    let (origin, direction) = match kind {
        SurfaceKind::Ground => (position + frame.up * params.height, frame.up),
        SurfaceKind::Ceiling => (position, -frame.up),
    };
    caster
        .first_blocking(CastFilter::vertical(params), origin, direction, length)
        .map_or(length, |hit| hit.distance)
}

/// Vertical movement that keeps a horizontal movement on the current slope.
///
/// Ground takes precedence; the ceiling is only followed when the ground did not
/// adjust. Returns zero when no surface qualifies.
pub(crate) fn slope_follow(
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    frame: &Frame,
    horizontal: &Vec3,
) -> Vec3 {
    let tolerances = &params.tolerances;
    let length = horizontal.norm();
    if length <= tolerances.zero_epsilon {
        return Vec3::zeros();
    }
    let direction = horizontal / length;

    for kind in [SurfaceKind::Ground, SurfaceKind::Ceiling] {
        let surface = params.surface(kind);
        if !surface.slope_follow_downhill_enabled && !surface.slope_follow_uphill_enabled {
            continue;
        }
        let info = *surface_info(runtime, kind);
        if !info.on_surface {
            continue;
        }
        let up = surface_up(kind, frame);
        let Some(rise) = slope_rise(&info.surface_normal, &up, &direction, tolerances.zero_epsilon) else {
            continue;
        };
        let perceived = rise.atan().to_degrees().abs();
        let within = |max_angle: f32, max_perceived: f32| {
            info.surface_angle <= max_angle + tolerances.angle_epsilon
                && perceived <= max_perceived + tolerances.angle_epsilon
        };

        let adjustments = runtime.adjustments_mut(kind == SurfaceKind::Ground);
        if rise < -tolerances.zero_epsilon
            && surface.slope_follow_downhill_enabled
            && within(surface.slope_follow_downhill_max_angle, surface.slope_follow_downhill_max_perceived_angle)
        {
            adjustments.vertical_movement_adjusted_downhill = true;
            return up * (rise * length);
        }
        if rise > tolerances.zero_epsilon
            && surface.slope_follow_uphill_enabled
            && within(surface.slope_follow_uphill_max_angle, surface.slope_follow_uphill_max_perceived_angle)
        {
            adjustments.vertical_movement_adjusted_uphill = true;
            return up * (rise * length);
        }
    }

    Vec3::zeros()
}

/// Uphill movement on ground steeper than the ignorable angle is blocked, unless
/// the exit attempt is allowed and the destination is walkable.
pub(crate) fn blocks_steep_uphill(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    ground: &SurfaceInfo,
    start: Vec3,
    frame: &Frame,
    horizontal: &Vec3,
) -> bool {
    let surface = &params.ground;
    let tolerances = &params.tolerances;
    if !surface.block_uphill_on_not_ignorable_angle || !ground.on_surface {
        return false;
    }

    let direction = normalize_or_zero(horizontal);
    let Some(rise) = slope_rise(&ground.surface_normal, &frame.up, &direction, tolerances.zero_epsilon) else {
        return false;
    };
    let perceived = rise.atan().to_degrees();
    if rise <= tolerances.zero_epsilon
        || surface.is_ignorable_angle(ground.surface_angle, Some(perceived), tolerances.angle_epsilon)
    {
        return false;
    }
    if !surface.allow_exit_attempt_when_on_not_ignorable_angle {
        return true;
    }

    let destination = collect_surface_info(
        caster,
        params,
        SurfaceKind::Ground,
        start + horizontal,
        frame,
        &direction,
        0.0,
    );
    let exits = destination.surface_distance.is_some()
        && surface.is_ignorable_angle(
            destination.surface_angle,
            Some(destination.surface_perceived_angle),
            tolerances.angle_epsilon,
        );
    !exits
}

/// Whether leaving the ground (or sliding down a steep part of it) is forbidden.
pub(crate) fn must_stay_violated(params: &CollisionCheckParams, was_on_ground: bool, ground: &SurfaceInfo) -> bool {
    let surface = &params.ground;
    let tolerances = &params.tolerances;
    if !was_on_ground {
        return false;
    }
    if surface.must_stay_on_surface && !ground.on_surface {
        return true;
    }
    surface.must_stay_on_ignorable_angle_downhill
        && ground.on_surface
        && ground.surface_perceived_angle < -tolerances.angle_epsilon
        && !surface.is_ignorable_angle(
            ground.surface_angle,
            Some(ground.surface_perceived_angle),
            tolerances.angle_epsilon,
        )
}

/// Teleport and position-check requirements on a destination surface.
pub(crate) fn surface_policy_satisfied(
    info: &SurfaceInfo,
    policy: &SurfacePolicy,
    surface: &SurfaceParams,
    tolerances: &Tolerances,
) -> bool {
    if policy.must_be_on_surface && !info.on_surface {
        return false;
    }
    if info.on_surface {
        if policy.must_be_on_ignorable_angle
            && info.surface_angle > surface.angle_to_ignore + tolerances.angle_epsilon
        {
            return false;
        }
        if policy
            .max_surface_angle
            .is_some_and(|max| info.surface_angle > max + tolerances.angle_epsilon)
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::test_utils::{floor_world, frame_for, slope_world, standing};
    use crate::check::{CollisionScratch, Caster};
    use crate::raycast::ObjectId;
    use approx::assert_relative_eq;

    fn sample(normal: Vec3, distance: f32) -> SurfaceSample {
        SurfaceSample {
            hit: RaycastHit {
                normal,
                distance,
                object: Some(ObjectId(0)),
                ..RaycastHit::default()
            },
            ray_distance: distance,
            signed_distance: distance,
            angle: angle_degrees(&normal, &Vec3::y()),
        }
    }

    fn classify(samples: &[SurfaceSample]) -> SurfaceInfo {
        classify_surface(
            samples,
            0,
            &SurfaceParams::ground(),
            &Tolerances::default(),
            &Vec3::y(),
            &Vec3::z(),
        )
    }

    #[test]
    fn flat_hit_within_distance_is_ground() {
        let info = classify(&[sample(Vec3::y(), 0.0005)]);
        assert!(info.on_surface);
        assert_relative_eq!(info.surface_angle, 0.0, epsilon = 1.0e-4);
        assert_eq!(info.surface_distance, Some(0.0005));
    }

    #[test]
    fn wall_hit_is_never_ground() {
        for distance in [0.0, 0.0005, 0.05] {
            let info = classify(&[sample(-Vec3::x(), distance)]);
            assert!(!info.on_surface);
            assert_eq!(info.surface_distance, None);
        }
    }

    #[test]
    fn airborne_hit_is_not_on_surface_but_keeps_distance() {
        let info = classify(&[sample(Vec3::y(), 0.05)]);
        assert!(!info.on_surface);
        assert_eq!(info.surface_distance, Some(0.05));
        assert!(!info.base_inside_collision);
    }

    #[test]
    fn steep_surface_needs_height_exception() {
        let normal = Vec3::new(0.0, 40f32.to_radians().cos(), -40f32.to_radians().sin());
        let mut params = SurfaceParams::ground();
        params.on_surface_requires_ignorable_angle = true;

        let samples = [sample(normal, 0.0)];
        let tolerances = Tolerances::default();
        let info = classify_surface(&samples, 0, &params, &tolerances, &Vec3::y(), &Vec3::z());
        assert!(!info.on_surface);

        params.steep_on_surface_max_distance = Some(0.01);
        let info = classify_surface(&samples, 0, &params, &tolerances, &Vec3::y(), &Vec3::z());
        assert!(info.on_surface);
        assert_relative_eq!(info.surface_perceived_angle, 40.0, epsilon = 1.0e-3);
    }

    #[test]
    fn base_inside_override() {
        let mut params = SurfaceParams::ground();
        params.on_surface_if_base_inside_collision = true;
        let info = classify_surface(
            &[sample(Vec3::y(), -0.05)],
            0,
            &params,
            &Tolerances::default(),
            &Vec3::y(),
            &Vec3::z(),
        );
        assert!(info.base_inside_collision);
        assert!(info.on_surface);
        assert!(info.on_surface_due_to_base_inside);
    }

    #[test]
    fn collect_measures_distance_to_floor() {
        let world = floor_world();
        let params = CollisionCheckParams::default();
        let transform = standing(Vec3::new(0.0, 0.05, 0.0));
        let frame = frame_for(&transform, &params);
        let mut scratch = CollisionScratch::default();
        let mut caster = Caster::new(&world, &mut scratch);

        let info = collect_surface_info(
            &mut caster,
            &params,
            SurfaceKind::Ground,
            transform.translation,
            &frame,
            &Vec3::z(),
            0.0,
        );
        assert_relative_eq!(info.surface_distance.unwrap_or(f32::NAN), 0.05, epsilon = 1.0e-4);
        assert!(!info.on_surface);
        assert!(caster.count() > 0);
    }

    #[test]
    fn uniform_slope_reads_zero_distance() {
        let world = slope_world(20.0);
        let params = CollisionCheckParams::default();
        let transform = standing(Vec3::zeros());
        let frame = frame_for(&transform, &params);
        let mut scratch = CollisionScratch::default();
        let mut caster = Caster::new(&world, &mut scratch);

        let info = collect_surface_info(
            &mut caster,
            &params,
            SurfaceKind::Ground,
            transform.translation,
            &frame,
            &Vec3::x(),
            0.0,
        );
        assert!(info.on_surface);
        assert_relative_eq!(info.surface_distance.unwrap_or(f32::NAN), 0.0, epsilon = 1.0e-3);
        assert_relative_eq!(info.surface_angle, 20.0, epsilon = 1.0e-2);
        assert_relative_eq!(info.surface_perceived_angle, 20.0, epsilon = 1.0e-2);
    }

    #[test]
    fn policy_rejects_steep_surface() {
        let info = SurfaceInfo {
            on_surface: true,
            surface_angle: 50.0,
            ..SurfaceInfo::default()
        };
        let mut surface = SurfaceParams::ground();
        surface.angle_to_ignore = 45.0;
        let tolerances = Tolerances::default();

        let lax = SurfacePolicy::default();
        assert!(surface_policy_satisfied(&info, &lax, &surface, &tolerances));

        let strict = SurfacePolicy {
            must_be_on_ignorable_angle: true,
            ..SurfacePolicy::default()
        };
        assert!(!surface_policy_satisfied(&info, &strict, &surface, &tolerances));

        let airborne = SurfaceInfo::default();
        let grounded = SurfacePolicy {
            must_be_on_surface: true,
            ..SurfacePolicy::default()
        };
        assert!(!surface_policy_satisfied(&airborne, &grounded, &surface, &tolerances));
    }

    #[test]
    fn must_stay_only_applies_when_previously_grounded() {
        let mut params = CollisionCheckParams::default();
        params.ground.must_stay_on_surface = true;
        let airborne = SurfaceInfo::default();

        assert!(must_stay_violated(&params, true, &airborne));
        assert!(!must_stay_violated(&params, false, &airborne));
    }
}
