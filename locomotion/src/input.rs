//! Per-frame input consumed by the locomotion loop.
//!
//! Device handling lives outside this crate; callers fill this struct from
//! whatever gamepad, keyboard or hand tracking they use.

use collision::Transform;
use nalgebra as na;

pub type Vec2 = na::Vector2<f32>;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocomotionInput {
    /// Movement stick: x right, y forward.
    pub move_stick: Vec2,
    /// Turn stick; only x is used.
    pub turn_stick: Vec2,
    /// Add an upward component to the movement (flying only).
    pub ascend: bool,
    /// Stick that drives the teleport; usually the movement stick.
    pub teleport_stick: Vec2,
    pub teleport_cancel: bool,
    /// Pose the movement direction is relative to (head or hand).
    pub direction_reference: Transform,
    /// Pose the teleport arc starts from, with its pointing direction as forward.
    pub teleport_pointer: Transform,
    /// Tracked head position; `None` puts the head `head_height` above the feet.
    pub head_position: Option<collision::Vec3>,
}
