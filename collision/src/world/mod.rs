/*!
World module: the geometry the collision check raycasts against.

- types:         math aliases, Transform, StaticShape and vector helpers
- broad:         AABB helpers used to prune finite shapes before ray casts
- narrow_phase:  thin wrapper over parry ray casts against a single shape
- static_world:  analytic `RaycastProvider` over a list of static shapes
- rapier_world:  `RaycastProvider` over a rapier query pipeline
*/

pub mod broad;
pub mod narrow_phase;
pub mod rapier_world;
pub mod static_world;
pub mod types;

pub use rapier_world::{ColliderShapeDef, RapierQueryWorld, WorldStaticDef};
pub use static_world::{StaticCollider, StaticWorld};
pub use types::{Quat, StaticShape, Transform, Vec3};

/// Half-space whose surface faces `normal` and contains `point`.
#[inline]
pub fn plane_through_point(normal: Vec3, point: Vec3) -> StaticShape {
    let normal = types::normalize_or_zero(&normal);
    StaticShape::Plane {
        normal,
        dist: normal.dot(&point),
    }
}

/// Oriented box placed at `translation`.
#[inline]
pub fn cuboid_from_pose(half_extents: Vec3, translation: Vec3, rotation: Quat) -> StaticShape {
    StaticShape::Cuboid {
        half_extents,
        transform: Transform {
            translation,
            rotation,
        },
    }
}
