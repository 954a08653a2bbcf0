//! Teleport arc sampling.
//!
//! The arc is a projectile launched from `start` along `forward` at `speed`,
//! pulled along `up` by `gravity` (negative pulls down). Sample `i` is taken at
//! time `i * step_length / speed`, so the first segments are about
//! `step_length` long. Distances are measured along the sampled polyline.

use collision::Vec3;
use collision::world::types::horizontal_component;

use crate::params::ParableParams;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parable {
    pub start: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub speed: f32,
    pub gravity: f32,
    pub step_length: f32,
}

impl Parable {
    pub fn new(start: Vec3, forward: Vec3, up: Vec3, params: &ParableParams) -> Self {
        Self {
            start,
            forward: forward.try_normalize(1.0e-6).unwrap_or(Vec3::z()),
            up: up.try_normalize(1.0e-6).unwrap_or(Vec3::y()),
            speed: params.speed,
            gravity: params.gravity,
            step_length: params.step_length,
        }
    }

    fn time_step(&self) -> f32 {
        self.step_length / self.speed
    }

    pub fn position(&self, index: u32) -> Vec3 {
        let t = index as f32 * self.time_step();
        self.start + self.forward * (self.speed * t) + self.up * (0.5 * self.gravity * t * t)
    }

    /// Polyline length from the start to sample `index`.
    pub fn distance(&self, index: u32) -> f32 {
        (1..=index)
            .map(|i| (self.position(i) - self.position(i - 1)).norm())
            .sum()
    }

    /// Point at `distance` along the polyline.
    pub fn position_by_distance(&self, distance: f32) -> Vec3 {
        if distance <= 0.0 {
            return self.start;
        }

        let mut walked = 0.0;
        let mut index = 1;
        loop {
            let from = self.position(index - 1);
            let to = self.position(index);
            let length = (to - from).norm();
            if length <= 0.0 {
                return from;
            }
            if walked + length >= distance {
                return from + (to - from) * ((distance - walked) / length);
            }
            walked += length;
            index += 1;
        }
    }

    /// Polyline distance at which the flat distance from the start reaches
    /// `flat_distance`, or `max_distance` if that comes first.
    pub fn distance_over_flat_distance(&self, flat_distance: f32, max_distance: f32) -> f32 {
        let flat = |point: Vec3| horizontal_component(&(point - self.start), &self.up).norm();

        let mut walked = 0.0;
        let mut index = 1;
        loop {
            let from = self.position(index - 1);
            let to = self.position(index);
            let length = (to - from).norm();
            if length <= 0.0 || walked >= max_distance {
                return walked.min(max_distance);
            }

            let (flat_from, flat_to) = (flat(from), flat(to));
            if flat_to >= flat_distance {
                let covered = if flat_to > flat_from {
                    (flat_distance - flat_from) / (flat_to - flat_from)
                } else {
                    0.0
                };
                return (walked + length * covered).min(max_distance);
            }

            walked += length;
            index += 1;
        }
    }
}
