//! Horizontal movement resolver and horizontal position check.

use super::params::CollisionCheckParams;
use super::sampling::height_levels;
use super::sub_checks::{HorizontalProbe, is_ignorable_hit, sub_check};
use super::{CastFilter, Caster, Frame};
use crate::raycast::RaycastHit;
use crate::world::types::{Vec3, rotate_around_axis};

/// Resolved horizontal movement.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct HorizontalOutcome {
    pub fixed: Vec3,
    /// Most restrictive blocking hit, if the movement was shortened.
    pub hit: Option<RaycastHit>,
}

impl HorizontalOutcome {
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.hit.is_some()
    }
}

/// Run the configured sub-check pipeline and truncate `movement` (horizontal) to
/// the smallest allowed distance.
pub(crate) fn resolve_horizontal(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    start: Vec3,
    frame: &Frame,
    movement: &Vec3,
) -> HorizontalOutcome {
    let length = movement.norm();
    if length <= params.tolerances.zero_epsilon {
        return HorizontalOutcome::default();
    }
    if !params.horizontal.movement_check_enabled {
        return HorizontalOutcome {
            fixed: *movement,
            hit: None,
        };
    }

    let probe = HorizontalProbe {
        start,
        direction: movement / length,
        length,
        frame,
    };

    let mut allowed = length;
    let mut hit = None;
    for kind in &params.horizontal.checks {
        if let Some(candidate) = sub_check(*kind).candidate(caster, params, &probe) {
            if candidate.allowed < allowed {
                allowed = candidate.allowed;
                hit = Some(candidate.hit);
            }
        }
    }

    if hit.is_some() {
        log::trace!("Horizontal movement of {length} reduced to {allowed}");
    }
    HorizontalOutcome {
        fixed: probe.direction * allowed,
        hit,
    }
}

/// Whether the capsule fits horizontally at `position`.
pub(crate) fn horizontal_position_ok(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    position: Vec3,
    frame: &Frame,
) -> bool {
    horizontal_position_blocker(caster, params, position, frame).is_none()
}

/// First hit that keeps the capsule from fitting horizontally at `position`.
///
/// Rays of `radius` length are cast around the full circle at every level; a ray
/// starting inside a collider or a non-walkable hit blocks.
pub(crate) fn horizontal_position_blocker(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    position: Vec3,
    frame: &Frame,
) -> Option<RaycastHit> {
    if !params.horizontal.position_check_enabled {
        return None;
    }

    let (low, high) = params.horizontal_check_band();
    let slices = params.horizontal.position_check_slices.max(1);
    let filter = CastFilter::horizontal(params);

    for height in height_levels(low, high, params.horizontal.height_steps, params.horizontal.height_check_enabled) {
        let origin = position + frame.up * height;
        for slice in 0..slices {
            let angle = 360.0 * slice as f32 / slices as f32;
            let direction = rotate_around_axis(&frame.forward, angle, &frame.up);
            for hit in caster.cast(filter, origin, direction, params.radius) {
                if hit.inside_collision {
                    log::trace!("Horizontal position check started inside {:?}", hit.object);
                    return Some(*hit);
                }
                let hit_height = (hit.position - position).dot(&frame.up);
                if hit.is_valid() && !is_ignorable_hit(hit, hit_height, params, frame, None) {
                    return Some(*hit);
                }
            }
        }
    }

    None
}
