//! Per-frame player locomotion: smooth movement, gravity, turning and teleport.

use collision::world::types::{Quat, vertical_component};
use collision::{CollisionCheck, CollisionRuntimeParams, RaycastProvider, Transform, Vec3};
use nalgebra as na;

use crate::direction::Direction2DTo3DConverter;
use crate::input::LocomotionInput;
use crate::params::{
    LocomotionParamsError, PlayerLocomotionParams, SNAP_TURN_RELEASE_THRESHOLD, SNAP_TURN_TRIGGER_THRESHOLD,
    STICK_IDLE_FRAMES,
};
use crate::teleport::{PlayerTeleport, TeleportRequest};
use crate::teleport_detection::{DetectionContext, PlayerPose, TeleportDetectionResult};

/// Directions shorter than this are treated as no input.
const MIN_DIRECTION_LENGTH: f32 = 1.0e-4;
/// Collision results shorter than this do not move the player.
const MIN_APPLIED_MOVEMENT: f32 = 1.0e-5;

/// A player body driven by stick input through the collision check.
///
/// Owns the feet transform and the collision session of the player, so the
/// check hysteresis (wall slide, surface info) carries over between frames.
#[derive(Debug)]
pub struct PlayerLocomotion {
    params: PlayerLocomotionParams,
    feet: Transform,
    session: CollisionRuntimeParams,
    check: CollisionCheck,
    converter: Direction2DTo3DConverter,
    teleport: PlayerTeleport,
    snap_done: bool,
    stick_idle_count: u32,
    is_flying: bool,
}

impl PlayerLocomotion {
    pub fn new(params: PlayerLocomotionParams, feet: Transform) -> Result<Self, LocomotionParamsError> {
        params.validate()?;
        let converter = Direction2DTo3DConverter::new(params.fly_enabled, params.min_angle_to_fly);
        Ok(Self {
            params,
            feet,
            session: CollisionRuntimeParams::new(),
            check: CollisionCheck::new(),
            converter,
            teleport: PlayerTeleport::new(),
            snap_done: false,
            stick_idle_count: 0,
            is_flying: false,
        })
    }

    #[inline]
    pub fn params(&self) -> &PlayerLocomotionParams {
        &self.params
    }

    #[inline]
    pub fn feet(&self) -> &Transform {
        &self.feet
    }

    #[inline]
    pub fn session(&self) -> &CollisionRuntimeParams {
        &self.session
    }

    #[inline]
    pub fn is_flying(&self) -> bool {
        self.is_flying
    }

    #[inline]
    pub fn teleport(&self) -> &PlayerTeleport {
        &self.teleport
    }

    pub fn teleport_result(&self) -> &TeleportDetectionResult {
        self.teleport.result()
    }

    /// Place the player without any check, forgetting the collision history.
    pub fn set_feet(&mut self, feet: Transform) {
        self.feet = feet;
        self.session.reset();
        self.teleport.cancel();
    }

    /// Refresh ground and ceiling info at the current feet, e.g. after spawning.
    pub fn refresh_surface_info<W: RaycastProvider>(&mut self, world: &W) {
        self.check
            .update_surface_info(world, &self.feet, &self.params.collision, &mut self.session);
    }

    /// Tracked head, or the default head height above the feet.
    pub fn head_position(&self, input: &LocomotionInput) -> Vec3 {
        input
            .head_position
            .unwrap_or_else(|| self.feet.translation + self.feet.up() * self.params.head_height)
    }

    /// Advance the player by `dt` seconds.
    ///
    /// The movement stick is ignored while a teleport is being aimed, gravity is not.
    pub fn update<W: RaycastProvider>(&mut self, dt: f32, input: &LocomotionInput, world: &W) {
        self.update_rotation(dt, input);

        let request = {
            let ctx = DetectionContext {
                world,
                params: &self.params,
                session: &self.session,
                pose: PlayerPose {
                    feet: self.feet,
                    head_position: self.head_position(input),
                },
            };
            self.teleport.update(input, &ctx)
        };
        if let Some(request) = request {
            self.perform_teleport(world, &request);
            return;
        }

        let movement = if self.teleport.is_detecting() {
            Vec3::zeros()
        } else {
            self.stick_movement(dt, input)
        };
        self.apply_movement(world, dt, movement);
    }

    fn stick_movement(&mut self, dt: f32, input: &LocomotionInput) -> Vec3 {
        let up = self.feet.up();
        let stick = input.move_stick;
        let intensity = stick.norm().min(1.0);
        let pushing = intensity > self.params.stick_idle_threshold;

        if pushing {
            self.stick_idle_count = 0;
        } else {
            self.stick_idle_count = self.stick_idle_count.saturating_add(1);
            if self.stick_idle_count >= STICK_IDLE_FRAMES {
                self.converter.reset();
            }
        }

        let mut direction = if pushing {
            self.converter.convert(&stick, &input.direction_reference, &up)
        } else {
            Vec3::zeros()
        };
        if input.ascend && self.params.fly_enabled {
            direction += up;
        }
        if direction.norm() <= MIN_DIRECTION_LENGTH {
            return Vec3::zeros();
        }

        let direction = direction.normalize();
        if vertical_component(&direction, &up).norm() > MIN_DIRECTION_LENGTH && !self.is_flying {
            log::debug!("Player started flying");
            self.is_flying = true;
        }
        let speed = self.params.max_speed * if pushing { intensity } else { 1.0 };
        direction * speed * dt
    }

    fn apply_movement<W: RaycastProvider>(&mut self, world: &W, dt: f32, movement: Vec3) {
        let up = self.feet.up();
        let movement = if self.is_flying {
            movement
        } else {
            movement - up * (self.params.gravity_speed * dt)
        };

        self.check
            .check_movement(world, movement, &self.feet, &self.params.collision, &mut self.session);
        if self.session.fixed_movement.norm() > MIN_APPLIED_MOVEMENT {
            self.feet.translation = self.session.new_position;
        }

        self.land_if_on_ground();
    }

    fn perform_teleport<W: RaycastProvider>(&mut self, world: &W, request: &TeleportRequest) {
        self.check
            .teleport(world, request.position, &self.feet, &self.params.collision, &mut self.session);
        if self.session.teleport.canceled {
            log::debug!("Teleport to {:?} rejected by the collision check", request.position);
            return;
        }

        self.feet.translation = self.session.new_position;
        if request.rotation_on_up != 0.0 {
            let yaw = self.yaw(request.rotation_on_up);
            self.feet.rotation = yaw * self.feet.rotation;
        }
        self.land_if_on_ground();
    }

    fn land_if_on_ground(&mut self) {
        if self.session.is_on_ground() {
            if self.is_flying {
                log::debug!("Player landed");
            }
            self.is_flying = false;
            self.converter.stop_flying();
        }
    }

    /// Snap or smooth turn from the turn stick, pivoting around the head.
    fn update_rotation(&mut self, dt: f32, input: &LocomotionInput) {
        let axis = input.turn_stick.x;
        let degrees = if self.params.snap_turn {
            if !self.snap_done && axis.abs() > SNAP_TURN_TRIGGER_THRESHOLD {
                self.snap_done = true;
                self.params.snap_turn_angle.copysign(axis)
            } else {
                if self.snap_done && axis.abs() < SNAP_TURN_RELEASE_THRESHOLD {
                    self.snap_done = false;
                }
                0.0
            }
        } else if axis.abs() > self.params.stick_idle_threshold {
            axis * self.params.max_rotation_speed * dt
        } else {
            0.0
        };

        if degrees != 0.0 {
            let head = self.head_position(input);
            let yaw = self.yaw(degrees);
            self.feet.translation = head + yaw * (self.feet.translation - head);
            self.feet.rotation = yaw * self.feet.rotation;
        }
    }

    /// Rotation around the player up; positive turns right.
    fn yaw(&self, degrees: f32) -> Quat {
        Quat::from_axis_angle(&na::Unit::new_normalize(self.feet.up()), degrees.to_radians())
    }
}
