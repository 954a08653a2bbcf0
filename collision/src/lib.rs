pub mod check;
pub mod layer_flags;
pub mod raycast;
pub mod world;

pub use check::{
    CharacterCollisionResults, CollisionCheck, CollisionCheckParams, CollisionCheckType,
    CollisionRuntimeParams, SurfaceInfo, SurfaceKind, SurfacePolicy,
};
pub use layer_flags::{PhysicsLayer, PhysicsLayerFlags};
pub use raycast::{ObjectId, RaycastHit, RaycastProvider, RaycastResults, RaycastSetup};
pub use world::{RapierQueryWorld, StaticShape, StaticWorld, Transform, Vec3, plane_through_point};
