//! Raycast provider backed by a rapier scene of fixed colliders.
//!
//! Colliders never move after [`RapierQueryWorld::build`]; the scene is only
//! stepped once so the broad phase can answer ray queries. Insertion is sorted
//! by id, so the same definitions always produce the same scene.
//!
//! Collider identity and layer membership travel in the collider `user_data`:
//! the low 32 bits hold the [`ObjectId`], the next 32 bits the layer bits.

use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::parry::query::Ray;
use rapier3d::prelude::*;

use crate::layer_flags::PhysicsLayerFlags;
use crate::raycast::{ObjectId, RaycastHit, RaycastProvider, RaycastResults, RaycastSetup};

/// A fixed collider of the level. Planes face `rotation * +Y`.
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    /// Reported back as the hit object.
    pub id: ObjectId,
    pub translation: Vector<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
    pub layers: PhysicsLayerFlags,
}

/// Shapes in the collider's local frame, in meters.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Half-space, shifted along its normal.
    Plane { offset_along_normal: f32 },
    Cuboid { half_extents: Vector<f32> },
    Sphere { radius: f32 },
    CapsuleY { radius: f32, half_height: f32 },
    CylinderY { radius: f32, half_height: f32 },
}

/// Rapier sets needed for ray queries, without any dynamics.
pub struct RapierQueryWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
}

impl RapierQueryWorld {
    /// Definitions are expected to be finite; nothing here validates them.
    pub fn build(mut defs: Vec<WorldStaticDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        for def in &defs {
            let pose = Isometry::from_parts(Translation3::from(def.translation), def.rotation);
            let body = bodies.insert(RigidBodyBuilder::fixed().pose(pose).build());
            colliders.insert_with_parent(collider_from_def(def), body, &mut bodies);
        }

        // One collision step fills the broad-phase BVH.
        let mut broad_phase = BroadPhaseBvh::new();
        let mut narrow_phase = NarrowPhase::new();
        let mut collision_pipeline = CollisionPipeline::new();

        let hooks = ();
        let events = ();

        collision_pipeline.step(
            0.0,
            &mut broad_phase,
            &mut narrow_phase,
            &mut bodies,
            &mut colliders,
            &hooks,
            &events,
        );

        log::debug!("Built rapier query world with {} colliders", colliders.len());

        Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase,
        }
    }

    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }
}

impl RaycastProvider for RapierQueryWorld {
    fn raycast(&self, setup: &RaycastSetup, results: &mut RaycastResults) {
        results.clear();
        if setup.distance < 0.0 {
            return;
        }

        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            let (id, layers) = unpack_user_data(collider.user_data);
            layers.intersects(setup.block_layer_flags) && !setup.is_ignored(id)
        };
        let pipeline = self.query_pipeline(QueryFilter::new().predicate(&predicate));

        let ray = Ray::new(Point::from(setup.origin), setup.direction);
        for (_handle, collider, intersection) in pipeline.intersect_ray(ray, setup.distance, true) {
            let inside = intersection.time_of_impact <= 0.0
                && intersection.normal.norm_squared() < 1.0e-12;
            if inside && setup.ignore_hits_inside_collision {
                continue;
            }

            let (id, _) = unpack_user_data(collider.user_data);
            results.push_sorted(RaycastHit {
                position: setup.origin + setup.direction * intersection.time_of_impact,
                normal: intersection.normal,
                distance: intersection.time_of_impact,
                object: Some(id),
                inside_collision: inside,
            });
        }
    }
}

fn pack_user_data(id: ObjectId, layers: PhysicsLayerFlags) -> u128 {
    (id.0 as u128) | ((layers.bits as u128) << 32)
}

fn unpack_user_data(data: u128) -> (ObjectId, PhysicsLayerFlags) {
    (
        ObjectId(data as u32),
        PhysicsLayerFlags::new((data >> 32) as u32),
    )
}

/// Build a Rapier collider from a `WorldStaticDef`.
///
/// The pose lives on the parent rigid-body, so shapes use a local frame.
fn collider_from_def(def: &WorldStaticDef) -> Collider {
    let mut collider = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Local +Y becomes `rotation * +Y` once attached to the body.
            ColliderBuilder::new(SharedShape::new(HalfSpace::new(Vector::y_axis())))
                .translation(Vector::y() * *offset_along_normal)
                .build()
        }

        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build()
        }

        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius).build(),

        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius).build(),

        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius).build(),
    };
    collider.user_data = pack_user_data(def.id, def.layers);
    collider
}
