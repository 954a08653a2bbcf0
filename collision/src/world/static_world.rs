use rapier3d::parry::bounding_volume::Aabb;

use super::{
    broad::{aabb_intersects, ray_segment_aabb, static_shape_aabb},
    narrow_phase::cast_ray_against_static,
    types::StaticShape,
};
use crate::layer_flags::PhysicsLayerFlags;
use crate::raycast::{ObjectId, RaycastHit, RaycastProvider, RaycastResults, RaycastSetup};

/// Margin added to the ray segment AABB so grazing hits are not pruned.
const RAY_AABB_MARGIN: f32 = 1.0e-3;

/// A static collider of the analytic world.
#[derive(Clone, Debug)]
pub struct StaticCollider {
    pub id: ObjectId,
    pub layers: PhysicsLayerFlags,
    pub shape: StaticShape,
    aabb: Option<Aabb>,
}

/// Immutable set of analytic static shapes answering raycasts.
///
/// Shapes are scanned linearly; finite ones are pruned with their AABB first.
/// Suitable for tests, tools and small scenes; large scenes should use
/// [`super::RapierQueryWorld`].
#[derive(Clone, Debug, Default)]
pub struct StaticWorld {
    colliders: Vec<StaticCollider>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collider on the default layer, returning its id.
    pub fn add(&mut self, shape: StaticShape) -> ObjectId {
        self.add_with_layers(shape, PhysicsLayerFlags::all())
    }

    pub fn add_with_layers(&mut self, shape: StaticShape, layers: PhysicsLayerFlags) -> ObjectId {
        let id = ObjectId(self.colliders.len() as u32);
        self.colliders.push(StaticCollider {
            id,
            layers,
            shape,
            aabb: static_shape_aabb(&shape),
        });
        id
    }

    /// Builder-style [`StaticWorld::add`].
    pub fn with(mut self, shape: StaticShape) -> Self {
        self.add(shape);
        self
    }

    pub fn colliders(&self) -> &[StaticCollider] {
        &self.colliders
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl RaycastProvider for StaticWorld {
    fn raycast(&self, setup: &RaycastSetup, results: &mut RaycastResults) {
        results.clear();
        if setup.distance < 0.0 {
            return;
        }

        let segment = ray_segment_aabb(setup.origin, setup.direction, setup.distance, RAY_AABB_MARGIN);

        for collider in &self.colliders {
            if !collider.layers.intersects(setup.block_layer_flags) || setup.is_ignored(collider.id) {
                continue;
            }
            if let Some(aabb) = &collider.aabb {
                if !aabb_intersects(aabb, &segment) {
                    continue;
                }
            }

            let Some(hit) =
                cast_ray_against_static(setup.origin, setup.direction, setup.distance, &collider.shape)
            else {
                continue;
            };

            if hit.inside && setup.ignore_hits_inside_collision {
                continue;
            }

            results.push_sorted(RaycastHit {
                position: setup.origin + setup.direction * hit.time_of_impact,
                normal: hit.normal,
                distance: hit.time_of_impact,
                object: Some(collider.id),
                inside_collision: hit.inside,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer_flags::PhysicsLayer;
    use crate::world::types::{Transform, Vec3};
    use approx::assert_relative_eq;

    fn floor() -> StaticShape {
        StaticShape::Plane {
            normal: Vec3::y(),
            dist: 0.0,
        }
    }

    #[test]
    fn hits_are_ordered_and_filtered_by_layer() {
        let mut world = StaticWorld::new();
        let floor_id =
            world.add_with_layers(floor(), PhysicsLayerFlags::from_layers(&[PhysicsLayer::Floor]));
        let box_id = world.add_with_layers(
            StaticShape::Cuboid {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
                transform: Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            },
            PhysicsLayerFlags::from_layers(&[PhysicsLayer::Props]),
        );

        let mut results = RaycastResults::default();
        let mut setup = RaycastSetup::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::y(), 10.0);
        world.raycast(&setup, &mut results);

        let objects: Vec<_> = results.hits.iter().map(|h| h.object).collect();
        assert_eq!(objects, vec![Some(box_id), Some(floor_id)]);
        assert_relative_eq!(results.hits[0].distance, 1.5, epsilon = 1.0e-5);

        setup.block_layer_flags = PhysicsLayerFlags::from_layers(&[PhysicsLayer::Floor]);
        world.raycast(&setup, &mut results);
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].object, Some(floor_id));
    }

    #[test]
    fn ignore_list_and_inside_hits_are_respected() {
        let mut world = StaticWorld::new();
        let floor_id = world.add(floor());

        let mut results = RaycastResults::default();
        let mut setup = RaycastSetup::new(Vec3::new(0.0, -0.2, 0.0), -Vec3::y(), 1.0);
        world.raycast(&setup, &mut results);
        assert!(results.hits[0].inside_collision);

        setup.ignore_hits_inside_collision = true;
        world.raycast(&setup, &mut results);
        assert!(results.is_empty());

        setup.ignore_hits_inside_collision = false;
        setup.objects_to_ignore.push(floor_id);
        world.raycast(&setup, &mut results);
        assert!(results.is_empty());
    }
}
