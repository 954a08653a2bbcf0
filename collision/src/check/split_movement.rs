/*!
Split movement.

A long movement is performed as a sequence of shorter steps, each one a full
[`move_step`] starting where the previous one ended, so thin obstacles cannot be
skipped. Per-axis results are accumulated over the performed steps.

Stop rules are checked after every step:
- `stop_and_fail_if_movement_would_be_reduced`: the whole movement fails and the
  character stays at the start;
- horizontal failed, vertical failed or reduced, or the caller's stop condition:
  the movement ends after this step, or before it with `stop_return_previous_results`.
*/

use super::movement::move_step;
use super::params::{CollisionCheckParams, SplitMovementParams, Tolerances};
use super::runtime::{AxisMovementResults, CollisionRuntimeParams, SplitMovementResult};
use super::settings::MAX_SPLIT_STEPS;
use super::surface::refresh_surface_info;
use super::{Caster, Frame};
use crate::world::types::{Vec3, flatten, horizontal_component, vertical_component};

/// How a movement of a given length is split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SplitPlan {
    pub steps: u32,
    /// Length of every step but the last.
    pub step_length: f32,
    pub last_step_length: f32,
    pub last_step_longer: bool,
}

impl SplitPlan {
    pub fn new(length: f32, params: &SplitMovementParams, tolerances: &Tolerances) -> Self {
        if length <= tolerances.zero_epsilon {
            return Self {
                steps: 1,
                step_length: length,
                last_step_length: length,
                last_step_longer: false,
            };
        }

        let mut steps = match params.max_step_length {
            Some(max) if params.last_step_can_be_longer => (length / max + tolerances.distance_epsilon).floor(),
            Some(max) => (length / max - tolerances.distance_epsilon).ceil(),
            None => 1.0,
        }
        .max(1.0) as u32;
        if let Some(min) = params.min_step_length {
            steps = steps.min(((length / min + tolerances.distance_epsilon).floor() as u32).max(1));
        }
        steps = steps.min(params.max_steps.unwrap_or(MAX_SPLIT_STEPS).clamp(1, MAX_SPLIT_STEPS));

        let (step_length, last_step_length) = match params.max_step_length {
            Some(max) if params.last_step_can_be_longer && steps > 1 => (max, length - max * (steps - 1) as f32),
            _ => (length / steps as f32, length / steps as f32),
        };
        let last_step_longer = params
            .max_step_length
            .is_some_and(|max| last_step_length.max(step_length) > max + tolerances.distance_epsilon);

        Self {
            steps,
            step_length,
            last_step_length,
            last_step_longer,
        }
    }

    fn step(&self, index: u32, direction: &Vec3) -> Vec3 {
        if index + 1 == self.steps {
            direction * self.last_step_length
        } else {
            direction * self.step_length
        }
    }
}

pub(crate) fn perform_split_movement(
    caster: &mut Caster<'_>,
    params: &CollisionCheckParams,
    runtime: &mut CollisionRuntimeParams,
    start: Vec3,
    frame: &Frame,
    movement: Vec3,
) -> Vec3 {
    let split = &params.split_movement;
    let tolerances = &params.tolerances;
    let length = movement.norm();
    let direction = if length > tolerances.zero_epsilon {
        movement / length
    } else {
        Vec3::zeros()
    };
    let plan = SplitPlan::new(length, split, tolerances);

    let mut result = SplitMovementResult {
        steps_to_perform: plan.steps,
        last_step_longer_than_max_length: plan.last_step_longer,
        ..SplitMovementResult::default()
    };
    let mut horizontal = AxisMovementResults::default();
    let mut vertical = AxisMovementResults::default();
    let mut position = start;

    for index in 0..plan.steps {
        let step = if length > tolerances.zero_epsilon {
            plan.step(index, &direction)
        } else {
            movement
        };
        let snapshot = split.stop_return_previous_results.then(|| runtime.clone());
        let end = move_step(caster, params, runtime, position, frame, step);
        let step_horizontal = runtime.horizontal;
        let step_vertical = runtime.vertical;

        let would_reduce = step_horizontal.reduced || step_horizontal.canceled || step_vertical.reduced;
        if split.stop_and_fail_if_movement_would_be_reduced && would_reduce {
            log::debug!("Split movement failed at step {} of {}", index + 1, plan.steps);
            result.movement_interrupted = true;
            result.movement_reduced = true;
            runtime.horizontal = AxisMovementResults {
                requested: horizontal_component(&movement, &frame.up),
                colliding: true,
                canceled: true,
                ..AxisMovementResults::default()
            };
            runtime.vertical = AxisMovementResults {
                requested: vertical_component(&movement, &frame.up),
                colliding: step_vertical.colliding,
                canceled: true,
                ..AxisMovementResults::default()
            };
            runtime.split_movement = result;
            let reference = flatten(&movement, &frame.up);
            refresh_surface_info(caster, params, runtime, start, frame, &reference);
            return start;
        }

        let stop = (split.stop_on_horizontal_movement_failed && step_horizontal.canceled)
            || (split.stop_on_vertical_movement_failed && step_vertical.canceled)
            || (split.stop_on_vertical_movement_reduced && step_vertical.reduced)
            || split.stop_condition.is_some_and(|condition| condition(runtime));

        if stop {
            result.movement_interrupted = true;
            if let Some(snapshot) = snapshot {
                log::trace!("Split movement stopped before step {}", index + 1);
                *runtime = snapshot;
                break;
            }
        }

        horizontal.accumulate(&step_horizontal, tolerances.zero_epsilon);
        vertical.accumulate(&step_vertical, tolerances.zero_epsilon);
        result.steps_performed += 1;
        result.movement_checked += step;
        result.movement_reduced |= would_reduce;
        position = end;

        if stop {
            log::trace!("Split movement stopped after step {}", index + 1);
            break;
        }
    }

    runtime.horizontal = horizontal;
    runtime.vertical = vertical;
    runtime.split_movement = result;
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(length: f32, params: SplitMovementParams) -> SplitPlan {
        SplitPlan::new(length, &params, &Tolerances::default())
    }

    #[test]
    fn equal_steps_cover_the_length() {
        let p = plan(1.0, SplitMovementParams::default());
        assert_eq!(p.steps, 5);
        assert!((p.step_length - 0.2).abs() < 1.0e-6);
        assert!(!p.last_step_longer);

        let p = plan(0.5, SplitMovementParams::default());
        assert_eq!(p.steps, 3);
        assert!((p.step_length * 3.0 - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn last_step_absorbs_remainder() {
        let p = plan(
            0.5,
            SplitMovementParams {
                last_step_can_be_longer: true,
                ..SplitMovementParams::default()
            },
        );
        assert_eq!(p.steps, 2);
        assert!((p.step_length - 0.2).abs() < 1.0e-6);
        assert!((p.last_step_length - 0.3).abs() < 1.0e-6);
        assert!(p.last_step_longer);
    }

    #[test]
    fn step_count_limits() {
        let p = plan(
            1.0,
            SplitMovementParams {
                max_steps: Some(2),
                ..SplitMovementParams::default()
            },
        );
        assert_eq!(p.steps, 2);
        assert!(p.last_step_longer);

        let p = plan(
            1.0,
            SplitMovementParams {
                max_step_length: Some(0.1),
                min_step_length: Some(0.25),
                ..SplitMovementParams::default()
            },
        );
        assert_eq!(p.steps, 4);
    }

    #[test]
    fn step_count_is_capped_without_max_steps() {
        let p = plan(1000.0, SplitMovementParams::default());
        assert_eq!(p.steps, MAX_SPLIT_STEPS);
        assert!((p.step_length * MAX_SPLIT_STEPS as f32 - 1000.0).abs() < 1.0e-2);
        assert!(p.last_step_longer);

        let p = plan(
            1000.0,
            SplitMovementParams {
                max_steps: Some(u32::MAX),
                ..SplitMovementParams::default()
            },
        );
        assert_eq!(p.steps, MAX_SPLIT_STEPS);
    }

    #[test]
    fn zero_length_is_a_single_step() {
        let p = plan(0.0, SplitMovementParams::default());
        assert_eq!(p.steps, 1);
    }
}
