//! Player locomotion on top of the collision check: smooth movement with
//! gravity and optional flying, snap or smooth turning around the head, and
//! arc teleport with landing validation.

pub mod direction;
pub mod input;
pub mod parable;
pub mod params;
pub mod player;
pub mod teleport;
pub mod teleport_detection;

pub use direction::Direction2DTo3DConverter;
pub use input::{LocomotionInput, Vec2};
pub use parable::Parable;
pub use params::{
    LocomotionParamsError, ParableParams, PlayerLocomotionParams, TeleportDetectionParams, TeleportParams,
    VisibilityCheckParams, VisibilityRequirement,
};
pub use player::PlayerLocomotion;
pub use teleport::{PlayerTeleport, TeleportRequest, TeleportState};
pub use teleport_detection::{DetectionContext, PlayerPose, TeleportDetection, TeleportDetectionResult};
