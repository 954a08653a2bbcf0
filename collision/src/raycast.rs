/*!
Raycast primitives consumed by the collision check.

The collision check never talks to a physics engine directly. Everything it needs
from the world goes through [`RaycastProvider::raycast`], which fills an ordered
hit list. Two providers ship with this crate:
- [`crate::world::StaticWorld`]: analytic shapes, used by tests and tools.
- [`crate::world::RapierQueryWorld`]: a rapier query pipeline over static colliders.
*/

use serde::{Deserialize, Serialize};

use crate::layer_flags::PhysicsLayerFlags;
use crate::world::types::Vec3;

/// Stable identity of a collider in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

/// Input of a single raycast.
#[derive(Clone, Debug)]
pub struct RaycastSetup {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Maximum distance along `direction`.
    pub distance: f32,
    /// Only colliders whose layers intersect this mask can be hit.
    pub block_layer_flags: PhysicsLayerFlags,
    pub objects_to_ignore: Vec<ObjectId>,
    /// Drop hits whose ray started inside the collider.
    pub ignore_hits_inside_collision: bool,
}

impl Default for RaycastSetup {
    fn default() -> Self {
        Self {
            origin: Vec3::zeros(),
            direction: Vec3::z(),
            distance: 0.0,
            block_layer_flags: PhysicsLayerFlags::all(),
            objects_to_ignore: Vec::new(),
            ignore_hits_inside_collision: false,
        }
    }
}

impl RaycastSetup {
    pub fn new(origin: Vec3, direction: Vec3, distance: f32) -> Self {
        Self {
            origin,
            direction,
            distance,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_ignored(&self, object: ObjectId) -> bool {
        self.objects_to_ignore.contains(&object)
    }
}

/// A single raycast hit.
///
/// A ray that starts inside a collider produces a hit with `distance == 0`,
/// a zero normal and `inside_collision == true`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RaycastHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub object: Option<ObjectId>,
    pub inside_collision: bool,
}

impl RaycastHit {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.object.is_some()
    }

    /// Valid and not started inside a collider.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.is_valid() && !self.inside_collision
    }
}

/// Hits of a raycast, ordered by ascending distance.
///
/// Meant to be reused as a scratch buffer: providers clear it before filling.
#[derive(Clone, Debug, Default)]
pub struct RaycastResults {
    pub hits: Vec<RaycastHit>,
}

impl RaycastResults {
    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn first_hit(&self) -> Option<&RaycastHit> {
        self.hits.first()
    }

    /// First hit that did not start inside a collider.
    pub fn first_blocking_hit(&self) -> Option<&RaycastHit> {
        self.hits.iter().find(|h| h.is_blocking())
    }

    /// Insert keeping the distance ordering.
    pub fn push_sorted(&mut self, hit: RaycastHit) {
        let index = self.hits.partition_point(|h| h.distance <= hit.distance);
        self.hits.insert(index, hit);
    }
}

/// Source of raycast queries against the physics world.
pub trait RaycastProvider {
    /// Cast `setup` and replace the content of `results` with the ordered hits.
    fn raycast(&self, setup: &RaycastSetup, results: &mut RaycastResults);
}

impl<P: RaycastProvider + ?Sized> RaycastProvider for &P {
    fn raycast(&self, setup: &RaycastSetup, results: &mut RaycastResults) {
        (**self).raycast(setup, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(distance: f32) -> RaycastHit {
        RaycastHit {
            distance,
            object: Some(ObjectId(1)),
            ..RaycastHit::default()
        }
    }

    #[test]
    fn push_sorted_keeps_distance_order() {
        let mut results = RaycastResults::default();
        for d in [0.5, 0.1, 0.9, 0.3] {
            results.push_sorted(hit_at(d));
        }

        let distances: Vec<f32> = results.hits.iter().map(|h| h.distance).collect();
        assert_eq!(distances, vec![0.1, 0.3, 0.5, 0.9]);
    }

    #[test]
    fn first_blocking_hit_skips_inside_hits() {
        let mut results = RaycastResults::default();
        results.push_sorted(RaycastHit {
            inside_collision: true,
            ..hit_at(0.0)
        });
        results.push_sorted(hit_at(0.4));

        assert_eq!(results.first_hit().map(|h| h.distance), Some(0.0));
        assert_eq!(results.first_blocking_hit().map(|h| h.distance), Some(0.4));
        assert!(!RaycastHit::default().is_valid());
    }
}
