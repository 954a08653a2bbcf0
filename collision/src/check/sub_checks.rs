/*!
Horizontal sub-checks.

Each [`HorizontalCheckKind`] maps to a unit implementing [`HorizontalSubCheck`]:
it casts its own rays for a [`HorizontalProbe`] and proposes the most restrictive
[`Candidate`] it found. The resolver runs the configured kinds in order and keeps
the smallest allowed distance, so sub-checks are independent and can be tested
one at a time.

All sub-checks measure a hit with the same rule ([`allowed_distance`]): the capsule
center may advance until the hit is `radius + skin` away from its path.
*/

use super::params::{CollisionCheckParams, HorizontalCheckKind};
use super::sampling::height_levels;
use super::settings::LATERAL_RAY_RADIUS_FACTOR;
use super::surface::slope_rise;
use super::{CastFilter, Caster, Frame};
use crate::raycast::RaycastHit;
use crate::world::types::{Vec3, angle_degrees, horizontal_component, normalize_or_zero, rotate_around_axis};

/// A horizontal movement to test.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HorizontalProbe<'a> {
    pub start: Vec3,
    /// Unit, horizontal.
    pub direction: Vec3,
    pub length: f32,
    pub frame: &'a Frame,
}

impl HorizontalProbe<'_> {
    #[inline]
    fn at_height(&self, point: Vec3, height: f32) -> Vec3 {
        point + self.frame.up * height
    }

    #[inline]
    fn destination(&self) -> Vec3 {
        self.start + self.direction * self.length
    }

    #[inline]
    fn lateral(&self) -> Vec3 {
        self.frame.up.cross(&self.direction)
    }
}

/// Most restrictive hit of a sub-check.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    /// Distance the capsule center may travel along the probe.
    pub allowed: f32,
    pub hit: RaycastHit,
}

impl Candidate {
    fn keep_min(current: Option<Candidate>, next: Option<Candidate>) -> Option<Candidate> {
        match (current, next) {
            (Some(a), Some(b)) if b.allowed < a.allowed => Some(b),
            (None, b) => b,
            (a, _) => a,
        }
    }
}

pub(crate) trait HorizontalSubCheck {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate>;
}

pub(crate) fn sub_check(kind: HorizontalCheckKind) -> &'static dyn HorizontalSubCheck {
    match kind {
        HorizontalCheckKind::StraightCentral => &StraightCentral,
        HorizontalCheckKind::Straight => &Straight,
        HorizontalCheckKind::HorizontalBorder => &HorizontalBorder,
        HorizontalCheckKind::VerticalStraight => &VerticalStraight,
        HorizontalCheckKind::VerticalDiagonalUpward => &VerticalDiagonal { upward: true },
        HorizontalCheckKind::VerticalDiagonalDownward => &VerticalDiagonal { upward: false },
    }
}

fn levels(params: &CollisionCheckParams) -> impl Iterator<Item = f32> {
    let (low, high) = params.horizontal_check_band();
    height_levels(low, high, params.horizontal.height_steps, params.horizontal.height_check_enabled)
}

/// Hits a horizontal check never blocks on: walkable ground and ceiling.
///
/// `height` is measured from the feet along up. `direction` is the horizontal
/// movement direction, used for the perceived angle when there is one.
pub(crate) fn is_ignorable_hit(
    hit: &RaycastHit,
    height: f32,
    params: &CollisionCheckParams,
    frame: &Frame,
    direction: Option<&Vec3>,
) -> bool {
    let tolerances = &params.tolerances;
    let perceived = |up: &Vec3| {
        direction
            .and_then(|direction| slope_rise(&hit.normal, up, direction, tolerances.zero_epsilon))
            .map(|rise| rise.atan().to_degrees())
    };

    let ground = &params.ground;
    if ground.is_ignorable_angle(angle_degrees(&hit.normal, &frame.up), perceived(&frame.up), tolerances.angle_epsilon)
        && ground
            .horizontal_movement_ignore_max_height
            .is_none_or(|max| height <= max + tolerances.distance_epsilon)
    {
        return true;
    }

    let ceiling = &params.ceiling;
    let down = -frame.up;
    ceiling.is_ignorable_angle(angle_degrees(&hit.normal, &down), perceived(&down), tolerances.angle_epsilon)
        && ceiling
            .horizontal_movement_ignore_max_height
            .is_none_or(|max| params.height - height <= max + tolerances.distance_epsilon)
}

/// Distance the capsule center may travel along the probe before `hit` is within
/// `radius + skin` of it; `None` when the hit does not block the movement.
pub(crate) fn allowed_distance(hit: &RaycastHit, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<f32> {
    if !hit.is_blocking() {
        return None;
    }
    let tolerances = &params.tolerances;
    let up = &probe.frame.up;

    let relative = hit.position - probe.start;
    let height = relative.dot(up);
    let (low, high) = params.horizontal_check_band();
    if height < low - tolerances.distance_epsilon || height > high + tolerances.distance_epsilon {
        return None;
    }

    let flat = horizontal_component(&relative, up);
    let along = flat.dot(&probe.direction);
    if along < 0.0 {
        return None;
    }
    let offset = (flat - probe.direction * along).norm();
    let radius = params.radius;
    if offset >= radius - tolerances.distance_epsilon {
        return None;
    }
    if is_ignorable_hit(hit, height, params, probe.frame, Some(&probe.direction)) {
        return None;
    }

    let reach = (radius * radius - offset * offset).sqrt();
    Some((along - reach - tolerances.skin).max(0.0))
}

fn candidate_from_hit(hit: Option<RaycastHit>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
    let hit = hit?;
    allowed_distance(&hit, params, probe).map(|allowed| Candidate { allowed, hit })
}

/// Closest candidate of a single ray.
fn cast_candidate(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    probe: &HorizontalProbe<'_>,
    origin: Vec3,
    direction: Vec3,
    distance: f32,
) -> Option<Candidate> {
    let mut best = None;
    for hit in caster.cast(CastFilter::horizontal(params), origin, direction, distance) {
        if let Some(allowed) = allowed_distance(hit, params, probe) {
            best = Candidate::keep_min(best, Some(Candidate { allowed, hit: *hit }));
        }
    }
    best
}

struct StraightCentral;

impl HorizontalSubCheck for StraightCentral {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
        let distance = probe.length + params.radius + params.tolerances.skin;
        levels(params).fold(None, |best, height| {
            let origin = probe.at_height(probe.start, height);
            let next = cast_candidate(caster, params, probe, origin, probe.direction, distance);
            Candidate::keep_min(best, next)
        })
    }
}

struct Straight;

impl HorizontalSubCheck for Straight {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
        let steps = params.horizontal.radial_steps;
        if steps == 0 {
            return None;
        }
        let lateral = probe.lateral();
        let distance = probe.length + params.radius + params.tolerances.skin;

        let mut best = None;
        for height in levels(params) {
            for step in 1..=steps {
                let offset = params.radius * LATERAL_RAY_RADIUS_FACTOR * step as f32 / steps as f32;
                for side in [1.0, -1.0] {
                    let origin = probe.at_height(probe.start + lateral * (offset * side), height);
                    let next = cast_candidate(caster, params, probe, origin, probe.direction, distance);
                    best = Candidate::keep_min(best, next);
                }
            }
        }
        best
    }
}

struct HorizontalBorder;

impl HorizontalSubCheck for HorizontalBorder {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
        let half_slices = params.horizontal.cone_half_slices;
        let half_angle = params.horizontal.cone_half_angle;
        let distance = params.radius + params.tolerances.skin;
        let destination = probe.destination();

        let mut best = None;
        for height in levels(params) {
            let origin = probe.at_height(destination, height);
            for slice in -(half_slices as i32)..=half_slices as i32 {
                let angle = if half_slices == 0 {
                    0.0
                } else {
                    half_angle * slice as f32 / half_slices as f32
                };
                let direction = rotate_around_axis(&probe.direction, angle, &probe.frame.up);
                let next = cast_candidate(caster, params, probe, origin, direction, distance);
                best = Candidate::keep_min(best, next);
            }
        }
        best
    }
}

/// Vertical ray at the front of the destination. It catches thin obstacles lying
/// between the horizontal levels; the blocking distance comes from a horizontal
/// ray re-cast just below the found top.
struct VerticalStraight;

impl HorizontalSubCheck for VerticalStraight {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
        let (low, high) = params.horizontal_check_band();
        if high - low <= params.tolerances.distance_epsilon {
            return None;
        }
        let front = probe.destination() + probe.direction * (params.radius * LATERAL_RAY_RADIUS_FACTOR);
        let top = caster.first_blocking(
            CastFilter::vertical(params),
            probe.at_height(front, high),
            -probe.frame.up,
            high - low,
        )?;

        let hit_height = (top.position - probe.start).dot(&probe.frame.up);
        let recast_height = (hit_height - params.tolerances.skin).max(low);
        let origin = probe.at_height(probe.start, recast_height);
        let distance = probe.length + params.radius + params.tolerances.skin;
        let hit = caster.first_blocking(CastFilter::horizontal(params), origin, probe.direction, distance);
        candidate_from_hit(hit, params, probe)
    }
}

/// Diagonal rays from each level at the start to the next level (up or down) at
/// the destination front.
struct VerticalDiagonal {
    upward: bool,
}

impl HorizontalSubCheck for VerticalDiagonal {
    fn candidate(&self, caster: &mut Caster<'_>, params: &CollisionCheckParams, probe: &HorizontalProbe<'_>) -> Option<Candidate> {
        let heights: Vec<f32> = levels(params).collect();
        let front = probe.destination() + probe.direction * (params.radius + params.tolerances.skin);

        let mut best = None;
        for pair in heights.windows(2) {
            let (from, to) = if self.upward {
                (pair[0], pair[1])
            } else {
                (pair[1], pair[0])
            };
            let origin = probe.at_height(probe.start, from);
            let target = probe.at_height(front, to);
            let offset = target - origin;
            let direction = normalize_or_zero(&offset);
            if direction.norm_squared() == 0.0 {
                continue;
            }
            let next = cast_candidate(caster, params, probe, origin, direction, offset.norm());
            best = Candidate::keep_min(best, next);
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CollisionScratch;
    use crate::check::test_utils::{floor_and_wall_world, floor_world, frame_for, standing};
    use crate::world::types::{Quat, StaticShape};
    use crate::world::{StaticWorld, cuboid_from_pose};
    use approx::assert_relative_eq;

    fn run(world: &StaticWorld, kind: HorizontalCheckKind, movement: Vec3) -> Option<Candidate> {
        let params = CollisionCheckParams::default();
        let transform = standing(Vec3::zeros());
        let frame = frame_for(&transform, &params);
        let probe = HorizontalProbe {
            start: Vec3::zeros(),
            direction: movement.normalize(),
            length: movement.norm(),
            frame: &frame,
        };
        let mut scratch = CollisionScratch::default();
        let mut caster = Caster::new(world, &mut scratch);
        sub_check(kind).candidate(&mut caster, &params, &probe)
    }

    #[test]
    fn straight_central_stops_before_wall() {
        let world = floor_and_wall_world(1.0);
        let candidate = run(&world, HorizontalCheckKind::StraightCentral, Vec3::new(2.0, 0.0, 0.0));
        let allowed = candidate.map(|c| c.allowed).unwrap_or(f32::NAN);
        assert_relative_eq!(allowed, 1.0 - 0.3 - 0.01, epsilon = 1.0e-4);
    }

    #[test]
    fn floor_never_blocks() {
        let world = floor_world();
        for kind in [
            HorizontalCheckKind::StraightCentral,
            HorizontalCheckKind::Straight,
            HorizontalCheckKind::HorizontalBorder,
            HorizontalCheckKind::VerticalStraight,
            HorizontalCheckKind::VerticalDiagonalUpward,
            HorizontalCheckKind::VerticalDiagonalDownward,
        ] {
            assert!(run(&world, kind, Vec3::new(0.0, 0.0, 1.0)).is_none(), "{kind:?}");
        }
    }

    #[test]
    fn straight_catches_offset_pole() {
        // Thin pole off the central ray but inside the capsule radius.
        let pole = StaticShape::Cuboid {
            half_extents: Vec3::new(0.02, 1.0, 0.02),
            transform: standing(Vec3::new(0.2, 1.0, 1.0)),
        };
        let world = floor_world().with(pole);

        assert!(run(&world, HorizontalCheckKind::StraightCentral, Vec3::new(0.0, 0.0, 2.0)).is_none());
        let candidate = run(&world, HorizontalCheckKind::Straight, Vec3::new(0.0, 0.0, 2.0));
        assert!(candidate.is_some_and(|c| c.allowed < 1.0));
    }

    #[test]
    fn vertical_straight_catches_bar_between_levels() {
        // Horizontal bar at knee height, between the feet and middle levels.
        let bar = cuboid_from_pose(Vec3::new(2.0, 0.05, 0.05), Vec3::new(0.0, 0.5, 1.0), Quat::identity());
        let world = floor_world().with(bar);

        assert!(run(&world, HorizontalCheckKind::StraightCentral, Vec3::new(0.0, 0.0, 0.7)).is_none());
        let candidate = run(&world, HorizontalCheckKind::VerticalStraight, Vec3::new(0.0, 0.0, 0.7));
        let allowed = candidate.map(|c| c.allowed).unwrap_or(f32::NAN);
        assert_relative_eq!(allowed, 0.95 - 0.3 - 0.01, epsilon = 1.0e-3);
    }

    #[test]
    fn side_hits_outside_radius_are_ignored() {
        let params = CollisionCheckParams::default();
        let transform = standing(Vec3::zeros());
        let frame = frame_for(&transform, &params);
        let probe = HorizontalProbe {
            start: Vec3::zeros(),
            direction: Vec3::z(),
            length: 1.0,
            frame: &frame,
        };
        let wall_hit = |position: Vec3| RaycastHit {
            position,
            normal: -Vec3::z(),
            distance: 0.5,
            object: Some(crate::raycast::ObjectId(1)),
            inside_collision: false,
        };

        assert!(allowed_distance(&wall_hit(Vec3::new(0.35, 0.5, 0.8)), &params, &probe).is_none());
        assert!(allowed_distance(&wall_hit(Vec3::new(0.0, 0.5, -0.2)), &params, &probe).is_none());
        assert!(allowed_distance(&wall_hit(Vec3::new(0.0, 0.05, 0.8)), &params, &probe).is_none());
        assert_relative_eq!(
            allowed_distance(&wall_hit(Vec3::new(0.0, 0.5, 0.8)), &params, &probe).unwrap_or(f32::NAN),
            0.8 - 0.3 - 0.01,
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn steep_hit_is_ignored_when_crossed_at_a_shallow_angle() {
        let mut params = CollisionCheckParams::default();
        let frame = frame_for(&standing(Vec3::zeros()), &params);
        // 40 degrees rising toward +X.
        let radians = 40f32.to_radians();
        let hit = RaycastHit {
            position: Vec3::new(0.3, 0.25, 0.3),
            normal: Vec3::new(-radians.sin(), radians.cos(), 0.0),
            distance: 0.4,
            object: Some(crate::raycast::ObjectId(1)),
            inside_collision: false,
        };
        let head_on = Vec3::x();
        let diagonal = Vec3::new(1.0, 0.0, 1.0).normalize();

        assert!(!is_ignorable_hit(&hit, 0.25, &params, &frame, Some(&diagonal)));

        params.ground.angle_to_ignore_with_perceived_angle = Some(35.0);
        assert!(is_ignorable_hit(&hit, 0.25, &params, &frame, Some(&diagonal)));
        assert!(!is_ignorable_hit(&hit, 0.25, &params, &frame, Some(&head_on)));
        assert!(!is_ignorable_hit(&hit, 0.25, &params, &frame, None));
    }
}
