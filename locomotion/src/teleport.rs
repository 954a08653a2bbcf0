//! Teleport state machine: aim while the stick is pushed, jump on release.

use collision::{RaycastProvider, Vec3};

use crate::input::LocomotionInput;
use crate::teleport_detection::{DetectionContext, TeleportDetection, TeleportDetectionResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TeleportState {
    #[default]
    Idle,
    Detecting,
}

/// A confirmed teleport the caller still has to run through the collision check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeleportRequest {
    pub position: Vec3,
    /// Yaw to apply on arrival (degrees, positive turns right).
    pub rotation_on_up: f32,
}

#[derive(Debug, Default)]
pub struct PlayerTeleport {
    state: TeleportState,
    detection: TeleportDetection,
}

impl PlayerTeleport {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> TeleportState {
        self.state
    }

    #[inline]
    pub fn is_detecting(&self) -> bool {
        self.state == TeleportState::Detecting
    }

    #[inline]
    pub fn result(&self) -> &TeleportDetectionResult {
        self.detection.result()
    }

    pub fn detection(&self) -> &TeleportDetection {
        &self.detection
    }

    pub fn cancel(&mut self) {
        if self.state == TeleportState::Detecting {
            log::debug!("Teleport canceled");
        }
        self.state = TeleportState::Idle;
        self.detection.reset();
    }

    /// Advance one frame.
    ///
    /// Pushing the teleport stick forward starts aiming; every frame while
    /// aiming casts the arc again. Releasing the stick on a valid position
    /// returns the teleport to perform, releasing it anywhere else cancels.
    pub fn update<W: RaycastProvider>(
        &mut self,
        input: &LocomotionInput,
        ctx: &DetectionContext<'_, W>,
    ) -> Option<TeleportRequest> {
        let teleport = &ctx.params.teleport;
        if !teleport.enabled {
            self.cancel();
            return None;
        }

        match self.state {
            TeleportState::Idle => {
                if !input.teleport_cancel && input.teleport_stick.y > teleport.start_min_stick_forward {
                    log::debug!("Teleport detection started");
                    self.state = TeleportState::Detecting;
                    self.detection.reset();
                    self.aim(input, ctx);
                }
                None
            }
            TeleportState::Detecting if input.teleport_cancel => {
                self.cancel();
                None
            }
            TeleportState::Detecting if input.teleport_stick.norm() <= ctx.params.stick_idle_threshold => {
                self.state = TeleportState::Idle;
                let result = *self.detection.result();
                if result.detection_valid && result.position_valid {
                    log::debug!("Teleport confirmed to {:?}", result.teleport_position);
                    Some(TeleportRequest {
                        position: result.teleport_position,
                        rotation_on_up: result.rotation_on_up,
                    })
                } else {
                    log::debug!("Teleport released without a valid position");
                    None
                }
            }
            TeleportState::Detecting => {
                self.aim(input, ctx);
                None
            }
        }
    }

    fn aim<W: RaycastProvider>(&mut self, input: &LocomotionInput, ctx: &DetectionContext<'_, W>) {
        let detection = &ctx.params.teleport.detection;
        self.detection.update_rotation_on_up(&input.teleport_stick, detection);

        let pointer = &input.teleport_pointer;
        match TeleportDetection::pointer_direction(detection, pointer, &ctx.pose.up()) {
            Some(direction) => {
                self.detection.detect(ctx, pointer.translation, direction);
            }
            None => self.detection.invalidate(),
        }
    }
}
