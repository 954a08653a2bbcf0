//! Vertical movement resolver and vertical position check.

use super::params::{CollisionCheckParams, SurfaceKind};
use super::sampling::circumference_points;
use super::{CastFilter, Caster, Frame};
use crate::raycast::RaycastHit;
use crate::world::types::{Vec3, angle_degrees, horizontal_component, project_on_plane};

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct VerticalOutcome {
    /// Signed amount along up.
    pub fixed: f32,
    pub hit: Option<RaycastHit>,
}

impl VerticalOutcome {
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.hit.is_some()
    }
}

/// Shorten a vertical movement of `amount` (signed, along up) to the closest
/// ground or ceiling hit below the base / above the top.
pub(crate) fn resolve_vertical(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    position: Vec3,
    frame: &Frame,
    amount: f32,
) -> VerticalOutcome {
    let tolerances = &params.tolerances;
    let length = amount.abs();
    if length <= tolerances.zero_epsilon {
        return VerticalOutcome::default();
    }
    if !params.vertical.movement_check_enabled {
        return VerticalOutcome {
            fixed: amount,
            hit: None,
        };
    }

    let (kind, base, direction) = if amount < 0.0 {
        (SurfaceKind::Ground, position, -frame.up)
    } else {
        (SurfaceKind::Ceiling, position + frame.up * params.height, frame.up)
    };
    let surface = params.surface(kind);
    let inset = surface.on_surface_max_inside_distance + tolerances.distance_epsilon;
    let walkable = surface.max_followed_angle() + tolerances.angle_epsilon;
    let facing = -direction;
    let filter = CastFilter::vertical(params);

    let mut allowed = length;
    let mut hit = None;
    for point in circumference_points(base, frame, params.vertical.circumference_radius, &params.vertical) {
        let origin = point - direction * inset;
        let Some(found) = caster.first_blocking(filter, origin, direction, inset + length) else {
            continue;
        };
        // Walkable hits are measured against their plane at the capsule axis.
        let alignment = found.normal.dot(&facing);
        let distance = if alignment > tolerances.zero_epsilon && angle_degrees(&found.normal, &facing) <= walkable {
            (base - found.position).dot(&found.normal) / alignment
        } else {
            found.distance - inset
        }
        .max(0.0);
        if distance < allowed && distance < length - tolerances.distance_epsilon {
            allowed = distance;
            hit = Some(found);
        }
    }

    if hit.is_some() && !params.vertical.movement_reduce_enabled {
        allowed = 0.0;
    }
    VerticalOutcome {
        fixed: allowed * amount.signum(),
        hit,
    }
}

/// Horizontal movement that lets a blocked descent slide down a steep surface.
///
/// Returns zero unless the movement went down, was blocked by ground at least
/// `downhill_slide_min_angle` steep and downhill slide is enabled.
pub(crate) fn downhill_slide(params: &CollisionCheckParams, frame: &Frame, requested: f32, outcome: &VerticalOutcome) -> Vec3 {
    let surface = &params.ground;
    if !surface.downhill_slide_enabled || requested >= 0.0 {
        return Vec3::zeros();
    }
    let Some(hit) = outcome.hit else {
        return Vec3::zeros();
    };
    let angle = angle_degrees(&hit.normal, &frame.up);
    if angle < surface.downhill_slide_min_angle - params.tolerances.angle_epsilon || angle >= 90.0 {
        return Vec3::zeros();
    }

    let remainder = -frame.up * (outcome.fixed - requested).abs();
    horizontal_component(&project_on_plane(&remainder, &hit.normal), &frame.up)
}

/// Whether the capsule body is free of obstacles at `position`.
///
/// Rays go down from the top to just above what a walkable slope could reach at
/// each sample point; anything hit in between is inside the capsule.
pub(crate) fn vertical_position_ok(caster: &mut Caster<'_>, params: &CollisionCheckParams, position: Vec3, frame: &Frame) -> bool {
    if !params.vertical.position_check_enabled {
        return true;
    }

    let tolerances = &params.tolerances;
    let top = position + frame.up * params.height;
    let slope = params.ground.angle_to_ignore.to_radians().tan();
    let filter = CastFilter::vertical(params);

    for point in circumference_points(top, frame, params.vertical.circumference_radius, &params.vertical) {
        let ring_radius = horizontal_component(&(point - top), &frame.up).norm();
        let lower_bound = params.feet_distance_to_ignore.max(0.0) + ring_radius * slope + tolerances.distance_epsilon;
        let length = params.height - lower_bound;
        if length <= 0.0 {
            continue;
        }
        if let Some(hit) = caster.cast(filter, point, -frame.up, length).first() {
            log::trace!("Vertical position check hit {:?} at {}", hit.object, hit.distance);
            return false;
        }
    }

    true
}
