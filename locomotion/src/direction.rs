//! Stick to world direction conversion.

use collision::world::types::{angle_degrees, flatten};
use collision::{Transform, Vec3};

use crate::input::Vec2;

/// Turns a 2D stick value into a 3D direction relative to a reference pose.
///
/// Directions are flattened on the player up unless the converter is flying.
/// Flying is decided once per stick push: pointing at least `min_angle_to_fly`
/// above or below the horizon when the push starts keeps the vertical part
/// until [`Self::stop_flying`] or [`Self::reset`].
#[derive(Clone, Debug)]
pub struct Direction2DTo3DConverter {
    fly_enabled: bool,
    min_angle_to_fly: f32,
    fly_decided: bool,
    is_flying: bool,
}

impl Direction2DTo3DConverter {
    pub fn new(fly_enabled: bool, min_angle_to_fly: f32) -> Self {
        Self {
            fly_enabled,
            min_angle_to_fly,
            fly_decided: false,
            is_flying: false,
        }
    }

    /// Direction for `axes`; its length is the stick intensity along the
    /// reference axes, not normalized.
    pub fn convert(&mut self, axes: &Vec2, reference: &Transform, up: &Vec3) -> Vec3 {
        let forward = reference.forward();
        let right = reference.right();

        if !self.fly_decided {
            self.fly_decided = true;
            let elevation = (90.0 - angle_degrees(&forward, up)).abs();
            self.is_flying = self.fly_enabled && elevation >= self.min_angle_to_fly;
            if self.is_flying {
                log::debug!("Started flying, pointing {elevation} degrees off the horizon");
            }
        }

        if self.is_flying {
            return right * axes.x + forward * axes.y;
        }

        let flat_forward = match flatten(&forward, up) {
            f if f.norm_squared() > 0.0 => f,
            // Looking straight up or down: the top of the reference points forward or back.
            _ if forward.dot(up) < 0.0 => flatten(&reference.up(), up),
            _ => -flatten(&reference.up(), up),
        };
        let flat_right = match flatten(&right, up) {
            r if r.norm_squared() > 0.0 => r,
            _ => up.cross(&flat_forward),
        };
        flat_right * axes.x + flat_forward * axes.y
    }

    #[inline]
    pub fn is_flying(&self) -> bool {
        self.is_flying
    }

    pub fn stop_flying(&mut self) {
        self.is_flying = false;
    }

    /// Forget the fly decision; the next push decides again.
    pub fn reset(&mut self) {
        self.fly_decided = false;
        self.is_flying = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use collision::world::types::Quat;

    fn pitched(degrees: f32) -> Transform {
        // Positive pitch looks down.
        Transform::new(Vec3::zeros(), Quat::from_axis_angle(&Vec3::x_axis(), degrees.to_radians()))
    }

    #[test]
    fn walking_directions_are_flat() {
        let mut converter = Direction2DTo3DConverter::new(false, 45.0);
        let up = Vec3::y();

        let forward = converter.convert(&Vec2::new(0.0, 1.0), &pitched(60.0), &up);
        assert_relative_eq!(forward, Vec3::z(), epsilon = 1.0e-5);

        let right = converter.convert(&Vec2::new(0.5, 0.0), &pitched(30.0), &up);
        assert_relative_eq!(right, Vec3::new(0.5, 0.0, 0.0), epsilon = 1.0e-5);
        assert!(!converter.is_flying());
    }

    #[test]
    fn looking_straight_down_still_walks_forward() {
        let mut converter = Direction2DTo3DConverter::new(false, 45.0);
        let direction = converter.convert(&Vec2::new(0.0, 1.0), &pitched(90.0), &Vec3::y());
        assert_relative_eq!(direction, Vec3::z(), epsilon = 1.0e-5);
    }

    #[test]
    fn steep_push_starts_flying_until_stopped() {
        let mut converter = Direction2DTo3DConverter::new(true, 45.0);
        let up = Vec3::y();

        let direction = converter.convert(&Vec2::new(0.0, 1.0), &pitched(60.0), &up);
        assert!(converter.is_flying());
        assert!(direction.y < -0.8);

        // The decision holds for the rest of the push.
        converter.stop_flying();
        let direction = converter.convert(&Vec2::new(0.0, 1.0), &pitched(60.0), &up);
        assert_relative_eq!(direction.y, 0.0, epsilon = 1.0e-6);

        converter.reset();
        converter.convert(&Vec2::new(0.0, 1.0), &pitched(20.0), &up);
        assert!(!converter.is_flying());
    }
}
