/*!
Core geometry types and math aliases shared by the world and the collision check.

This module intentionally contains no algorithms beyond small vector helpers.
It defines the data exchanged between:
- the static world (analytic shapes used by tests and tools)
- the rapier query world
- the collision check engine (horizontal/vertical resolvers, surface classifier)
- the locomotion layer

Axis convention: +Y is up, +Z is forward and +X is right in the local space of
a `Transform`. The character "up" is always derived from the transform rotation,
so tilted characters (e.g. walking on walls) work the same way.
*/

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// A rigid transform (isometry) in world space.
///
/// For a character this is the feet transform: `translation` is the capsule base.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::zeros())
    }
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    /// Convert to nalgebra `Isometry3` for use with parry/rapier queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }

    #[inline]
    pub fn with_translation(&self, translation: Vec3) -> Self {
        Self::new(translation, self.rotation)
    }
}

/// Static collision shapes supported by the analytic world.
///
/// - Plane: infinite half-space in world-space represented by its normal and offset (dist)
///          satisfying: normal ⋅ x = dist. Everything behind the plane is solid.
/// - Cuboid: oriented box with half-extents in local space, placed by `transform`.
#[derive(Clone, Copy, Debug)]
pub enum StaticShape {
    Plane {
        /// World-space unit normal of the plane.
        normal: Vec3,
        /// Plane offset along the normal, i.e., normal ⋅ x = dist.
        dist: f32,
    },
    Cuboid {
        /// Local-space half-extents (hx, hy, hz).
        half_extents: Vec3,
        /// World-space pose of the cuboid.
        transform: Transform,
    },
    Sphere {
        /// Radius of the sphere in meters.
        radius: f32,
        /// World-space pose (translation used; rotation ignored).
        transform: Transform,
    },
    Capsule {
        /// Radius of the spherical caps and cylinder.
        radius: f32,
        /// Half of the cylinder length along the local +Y axis.
        half_height: f32,
        /// World-space pose of the capsule.
        transform: Transform,
    },
}

/// Squared length below which a vector is treated as zero by the helpers below.
const DEGENERATE_SQ: f32 = 1.0e-12;

/// Component of `v` along `up`.
#[inline]
pub fn vertical_component(v: &Vec3, up: &Vec3) -> Vec3 {
    up * v.dot(up)
}

/// Component of `v` orthogonal to `up`.
///
/// `horizontal_component(v, up) + vertical_component(v, up) == v` for a unit `up`.
#[inline]
pub fn horizontal_component(v: &Vec3, up: &Vec3) -> Vec3 {
    v - vertical_component(v, up)
}

/// Remove the component of `v` along the (unit) `normal`.
#[inline]
pub fn project_on_plane(v: &Vec3, normal: &Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Normalize or return zero for degenerate input.
#[inline]
pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
    let len_sq = v.norm_squared();
    if len_sq > DEGENERATE_SQ {
        v / len_sq.sqrt()
    } else {
        Vec3::zeros()
    }
}

/// Horizontal direction of `v` (unit length), or zero if `v` is (almost) vertical.
#[inline]
pub fn flatten(v: &Vec3, up: &Vec3) -> Vec3 {
    normalize_or_zero(&horizontal_component(v, up))
}

/// Unsigned angle between two vectors in degrees. Degenerate input yields 0.
pub fn angle_degrees(a: &Vec3, b: &Vec3) -> f32 {
    let denom = (a.norm_squared() * b.norm_squared()).sqrt();
    if denom <= DEGENERATE_SQ {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle from `a` to `b` in degrees, signed by the rotation direction around `axis`.
pub fn signed_angle_degrees(a: &Vec3, b: &Vec3, axis: &Vec3) -> f32 {
    let angle = angle_degrees(a, b);
    if a.cross(b).dot(axis) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// True when both vectors point into the same half-space.
#[inline]
pub fn is_concordant(a: &Vec3, b: &Vec3) -> bool {
    a.dot(b) >= 0.0
}

/// Rotate `v` by `degrees` around the unit `axis`.
#[inline]
pub fn rotate_around_axis(v: &Vec3, degrees: f32, axis: &Vec3) -> Vec3 {
    let unit_axis = na::Unit::new_normalize(*axis);
    Quat::from_axis_angle(&unit_axis, degrees.to_radians()) * v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn horizontal_plus_vertical_is_identity_for_tilted_up() {
        let up = Vec3::new(0.3, 0.9, -0.1).normalize();
        let vectors = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(-1.5, 3.25, 0.5),
            Vec3::new(0.0, -4.0, 7.0),
            Vec3::zeros(),
        ];

        for v in vectors {
            let h = horizontal_component(&v, &up);
            let vert = vertical_component(&v, &up);
            assert_relative_eq!(h + vert, v, epsilon = 1.0e-5);
            assert!(h.dot(&up).abs() < 1.0e-5);
        }
    }

    #[test]
    fn transform_axes_follow_rotation() {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let t = Transform::new(Vec3::zeros(), rotation);

        assert_relative_eq!(t.up(), Vec3::y(), epsilon = 1.0e-6);
        assert_relative_eq!(t.forward(), Vec3::x(), epsilon = 1.0e-6);
        assert_relative_eq!(t.right(), -Vec3::z(), epsilon = 1.0e-6);
    }

    #[test]
    fn angles_are_guarded_for_zero_vectors() {
        assert_eq!(angle_degrees(&Vec3::zeros(), &Vec3::y()), 0.0);
        assert_relative_eq!(angle_degrees(&Vec3::x(), &Vec3::y()), 90.0, epsilon = 1.0e-4);
        assert_relative_eq!(
            signed_angle_degrees(&Vec3::z(), &Vec3::x(), &Vec3::y()),
            90.0,
            epsilon = 1.0e-4
        );
        assert_relative_eq!(
            signed_angle_degrees(&Vec3::x(), &Vec3::z(), &Vec3::y()),
            -90.0,
            epsilon = 1.0e-4
        );
    }

    #[test]
    fn flatten_drops_vertical_part() {
        let up = Vec3::y();
        assert_relative_eq!(flatten(&Vec3::new(3.0, 5.0, 0.0), &up), Vec3::x());
        assert_eq!(flatten(&Vec3::new(0.0, 5.0, 0.0), &up), Vec3::zeros());
    }
}
