//! Shared fixtures for the collision check tests.

use super::Frame;
use super::params::CollisionCheckParams;
use crate::world::types::{Quat, Transform, Vec3};
use crate::world::{StaticWorld, cuboid_from_pose, plane_through_point};

pub(crate) fn standing(position: Vec3) -> Transform {
    Transform::from_translation(position)
}

pub(crate) fn frame_for(transform: &Transform, params: &CollisionCheckParams) -> Frame {
    Frame::new(transform, params)
}

/// Infinite floor at y = 0.
pub(crate) fn floor_world() -> StaticWorld {
    StaticWorld::new().with(plane_through_point(Vec3::y(), Vec3::zeros()))
}

/// Plane through the origin rising toward +X by `degrees`.
pub(crate) fn slope_world(degrees: f32) -> StaticWorld {
    let radians = degrees.to_radians();
    StaticWorld::new().with(plane_through_point(
        Vec3::new(-radians.sin(), radians.cos(), 0.0),
        Vec3::zeros(),
    ))
}

/// Floor plus a wall at x = `wall_x` facing -X.
pub(crate) fn floor_and_wall_world(wall_x: f32) -> StaticWorld {
    floor_world().with(plane_through_point(-Vec3::x(), Vec3::new(wall_x, 0.0, 0.0)))
}

/// Flat platform with its top at y = 0, ending at x = `edge_x`; nothing beyond.
pub(crate) fn ledge_world(edge_x: f32) -> StaticWorld {
    StaticWorld::new().with(cuboid_from_pose(
        Vec3::new(10.0, 0.5, 10.0),
        Vec3::new(edge_x - 10.0, -0.5, 0.0),
        Quat::identity(),
    ))
}
