use nalgebra as na;
use rapier3d::parry::{bounding_volume::Aabb, shape as pshape};

use super::types::{StaticShape, Transform, Vec3};

/// World-space AABB of a finite static shape, `None` for infinite planes.
///
/// Planes are always tested during queries; finite shapes are pruned against the
/// ray segment AABB first.
pub fn static_shape_aabb(shape: &StaticShape) -> Option<Aabb> {
    match *shape {
        StaticShape::Plane { .. } => None,
        StaticShape::Cuboid {
            half_extents,
            transform,
        } => Some(pshape::Cuboid::new(half_extents).aabb(&transform.iso())),
        StaticShape::Sphere { radius, transform } => Some(sphere_aabb_world(radius, transform)),
        StaticShape::Capsule {
            radius,
            half_height,
            transform,
        } => Some(pshape::Capsule::new_y(half_height, radius).aabb(&transform.iso())),
    }
}

fn sphere_aabb_world(radius: f32, transform: Transform) -> Aabb {
    let r = Vec3::new(radius, radius, radius);
    let center = na::Point3::from(transform.translation);
    Aabb {
        mins: center - r,
        maxs: center + r,
    }
}

/// AABB of the segment `origin -> origin + dir * distance`, inflated by `margin`.
pub fn ray_segment_aabb(origin: Vec3, dir: Vec3, distance: f32, margin: f32) -> Aabb {
    let start = na::Point3::from(origin);
    let end = na::Point3::from(origin + dir * distance.max(0.0));
    let point_aabb = |p: na::Point3<f32>| Aabb { mins: p, maxs: p };
    aabb_inflate(&aabb_union(&point_aabb(start), &point_aabb(end)), margin)
}

/// Compute the union of two AABBs.
fn aabb_union(a: &Aabb, b: &Aabb) -> Aabb {
    let min = na::Point3::new(
        a.mins.x.min(b.mins.x),
        a.mins.y.min(b.mins.y),
        a.mins.z.min(b.mins.z),
    );
    let max = na::Point3::new(
        a.maxs.x.max(b.maxs.x),
        a.maxs.y.max(b.maxs.y),
        a.maxs.z.max(b.maxs.z),
    );
    Aabb {
        mins: min,
        maxs: max,
    }
}

/// Inflate an AABB by `margin` on all sides.
fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = na::Vector3::new(margin, margin, margin);
    Aabb {
        mins: a.mins - delta,
        maxs: a.maxs + delta,
    }
}

/// Test two AABBs for intersection.
pub fn aabb_intersects(a: &Aabb, b: &Aabb) -> bool {
    !(a.maxs.x < b.mins.x
        || a.mins.x > b.maxs.x
        || a.maxs.y < b.mins.y
        || a.mins.y > b.maxs.y
        || a.maxs.z < b.mins.z
        || a.mins.z > b.maxs.z)
}
