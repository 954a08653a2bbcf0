//! Structured, read-only projection of a collision session.
//!
//! Nothing here is stored twice: every accessor reads the session it borrows,
//! so there is no conversion step that could drift out of sync.

use super::runtime::{
    CollisionCheckType, CollisionRuntimeParams, SplitMovementResult, SurfaceAdjustments,
    SurfaceInfo, WallSlideState,
};
use crate::raycast::RaycastHit;
use crate::world::types::{Transform, Vec3};

/// Movement split into its requested and resolved parts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementView {
    pub initial: Vec3,
    pub fixed: Vec3,
}

#[derive(Clone, Copy, Debug)]
pub struct CharacterCollisionResults<'a> {
    session: &'a CollisionRuntimeParams,
}

impl<'a> CharacterCollisionResults<'a> {
    pub(crate) fn new(session: &'a CollisionRuntimeParams) -> Self {
        Self { session }
    }

    pub fn check_type(&self) -> Option<CollisionCheckType> {
        self.session.check_type
    }

    pub fn initial_transform(&self) -> Transform {
        self.session.original_transform
    }

    pub fn final_transform(&self) -> Transform {
        self.session.final_transform()
    }

    pub fn movement(&self) -> MovementView {
        MovementView {
            initial: self.session.original_movement,
            fixed: self.session.fixed_movement,
        }
    }

    pub fn horizontal_movement(&self) -> MovementView {
        MovementView {
            initial: self.session.horizontal.requested,
            fixed: self.session.horizontal.fixed,
        }
    }

    pub fn vertical_movement(&self) -> MovementView {
        MovementView {
            initial: self.session.vertical.requested,
            fixed: self.session.vertical.fixed,
        }
    }

    /// Both axes were fully canceled: nothing moved.
    pub fn movement_failed(&self) -> bool {
        self.session.horizontal.canceled && self.session.vertical.canceled
    }

    /// At least one axis hit something.
    pub fn movement_collided(&self) -> bool {
        self.session.horizontal.colliding || self.session.vertical.colliding
    }

    pub fn horizontal_movement_canceled(&self) -> bool {
        self.session.horizontal.canceled
    }

    pub fn vertical_movement_canceled(&self) -> bool {
        self.session.vertical.canceled
    }

    pub fn vertical_movement_reduced(&self) -> bool {
        self.session.vertical.reduced
    }

    pub fn reference_collision_hit(&self) -> Option<&'a RaycastHit> {
        self.session.reference_collision_hit.as_ref()
    }

    pub fn teleport_failed(&self) -> bool {
        self.session.teleport.canceled
    }

    pub fn teleport_fixed_position(&self) -> Vec3 {
        self.session.teleport.fixed_position
    }

    /// Negation of `is_position_ok`; `true` means the checked transform is invalid.
    pub fn check_transform_failed(&self) -> bool {
        !self.session.position_check.is_position_ok
    }

    pub fn check_transform_fixed_position(&self) -> Vec3 {
        self.session.position_check.fixed_position
    }

    pub fn ground_info(&self) -> &'a SurfaceInfo {
        &self.session.ground
    }

    pub fn ceiling_info(&self) -> &'a SurfaceInfo {
        &self.session.ceiling
    }

    pub fn ground_adjustments(&self) -> &'a SurfaceAdjustments {
        &self.session.ground_adjustments
    }

    pub fn ceiling_adjustments(&self) -> &'a SurfaceAdjustments {
        &self.session.ceiling_adjustments
    }

    pub fn wall_slide(&self) -> &'a WallSlideState {
        &self.session.wall_slide
    }

    pub fn split_movement(&self) -> &'a SplitMovementResult {
        &self.session.split_movement
    }

    pub fn raycast_count(&self) -> u32 {
        self.session.raycast_count
    }
}
