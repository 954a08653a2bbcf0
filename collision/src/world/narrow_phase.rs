use nalgebra as na;
use rapier3d::parry::{
    query::{Ray, RayCast},
    shape as pshape,
};

use super::types::{Iso, StaticShape, Vec3};

/// Result of a ray cast against a single static shape.
#[derive(Clone, Copy, Debug)]
pub struct RayShapeHit {
    /// Distance along the (unit) ray direction.
    pub time_of_impact: f32,
    /// World-space outward normal, zero when the ray started inside the shape.
    pub normal: Vec3,
    pub inside: bool,
}

/// Cast a solid ray against a single static shape and return the first hit (if any).
///
/// - `origin`/`dir`: world-space ray, `dir` is expected to be unit length.
/// - `max_toi`: maximum distance along `dir`.
///
/// A ray starting inside the shape reports `time_of_impact == 0` and `inside == true`.
pub fn cast_ray_against_static(
    origin: Vec3,
    dir: Vec3,
    max_toi: f32,
    shape: &StaticShape,
) -> Option<RayShapeHit> {
    let ray = Ray::new(na::Point3::from(origin), dir);

    let intersection = match *shape {
        StaticShape::Plane { normal, dist } => {
            // Plane: represent as a parry HalfSpace with world normal, positioned at normal * dist.
            let unit_n = na::Unit::new_normalize(normal);
            let plane = pshape::HalfSpace::new(unit_n);
            let offset = unit_n.into_inner() * dist;
            let plane_iso = Iso::from_parts(
                na::Translation3::new(offset.x, offset.y, offset.z),
                na::UnitQuaternion::identity(),
            );
            plane.cast_ray_and_get_normal(&plane_iso, &ray, max_toi, true)
        }
        StaticShape::Cuboid {
            half_extents,
            transform,
        } => pshape::Cuboid::new(half_extents).cast_ray_and_get_normal(
            &transform.iso(),
            &ray,
            max_toi,
            true,
        ),
        StaticShape::Sphere { radius, transform } => {
            // Rotation is irrelevant for a ball.
            let ball_iso = Iso::from_parts(
                na::Translation3::new(
                    transform.translation.x,
                    transform.translation.y,
                    transform.translation.z,
                ),
                na::UnitQuaternion::identity(),
            );
            pshape::Ball::new(radius).cast_ray_and_get_normal(&ball_iso, &ray, max_toi, true)
        }
        StaticShape::Capsule {
            radius,
            half_height,
            transform,
        } => pshape::Capsule::new_y(half_height, radius).cast_ray_and_get_normal(
            &transform.iso(),
            &ray,
            max_toi,
            true,
        ),
    }?;

    let normal = intersection.normal;
    let inside = intersection.time_of_impact <= 0.0 && normal.norm_squared() < 1.0e-12;

    Some(RayShapeHit {
        time_of_impact: intersection.time_of_impact,
        normal: if inside { Vec3::zeros() } else { normal },
        inside,
    })
}
