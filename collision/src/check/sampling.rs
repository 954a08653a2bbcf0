//! Sample points used by the vertical resolver and the surface classifier.

use super::Frame;
use super::params::VerticalCheckParams;
use crate::world::types::{Vec3, flatten, rotate_around_axis};

/// Any unit vector orthogonal to `up`.
pub(crate) fn perpendicular(up: &Vec3) -> Vec3 {
    let candidate = if up.x.abs() < 0.9 { Vec3::x() } else { Vec3::z() };
    flatten(&candidate, up)
}

/// Points on concentric rings around `center`, in the plane orthogonal to `frame.up`.
///
/// The center comes first when `central_check_enabled`. Ring `s` (1-based) has radius
/// `radius * s / radial_steps` and its slices are rotated by
/// `circumference_rotation_per_step * (s - 1)` degrees so rings do not align.
pub(crate) fn circumference_points<'a>(
    center: Vec3,
    frame: &'a Frame,
    radius: f32,
    params: &'a VerticalCheckParams,
) -> impl Iterator<Item = Vec3> + 'a {
    let has_rings = radius > 0.0 && params.circumference_slices > 0;
    let steps = if has_rings {
        params.circumference_radial_steps.max(1)
    } else {
        0
    };
    let slices = params.circumference_slices.max(1);
    let central = (params.central_check_enabled || !has_rings).then_some(center);

    let rings = (1..=steps).flat_map(move |step| {
        let ring_radius = radius * step as f32 / steps as f32;
        let offset = params.circumference_rotation_per_step * (step - 1) as f32;
        (0..slices).map(move |slice| {
            let angle = 360.0 * slice as f32 / slices as f32 + offset;
            center + rotate_around_axis(&frame.forward, angle, &frame.up) * ring_radius
        })
    });

    central.into_iter().chain(rings)
}

/// Heights above the feet sampled by horizontal checks, lowest first.
pub(crate) fn height_levels(low: f32, high: f32, steps: u32, enabled: bool) -> impl Iterator<Item = f32> {
    let steps = if enabled && high > low { steps.max(1) } else { 0 };
    std::iter::once(low).chain((1..=steps).map(move |i| low + (high - low) * i as f32 / steps as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame() -> Frame {
        Frame {
            up: Vec3::y(),
            forward: Vec3::z(),
            right: Vec3::x(),
        }
    }

    #[test]
    fn center_then_rings() {
        let frame = frame();
        let params = VerticalCheckParams {
            circumference_slices: 4,
            circumference_radial_steps: 2,
            circumference_rotation_per_step: 45.0,
            ..VerticalCheckParams::default()
        };

        let points: Vec<Vec3> = circumference_points(Vec3::zeros(), &frame, 0.2, &params).collect();
        assert_eq!(points.len(), 1 + 2 * 4);
        assert_eq!(points[0], Vec3::zeros());
        assert_relative_eq!(points[1], Vec3::new(0.0, 0.0, 0.1), epsilon = 1.0e-6);
        // Second ring is rotated by 45 degrees.
        assert_relative_eq!(points[5].norm(), 0.2, epsilon = 1.0e-6);
        assert_relative_eq!(points[5].x.abs(), points[5].z.abs(), epsilon = 1.0e-6);
        assert!(points.iter().all(|p| p.y.abs() < 1.0e-6));
    }

    #[test]
    fn zero_radius_still_samples_center() {
        let frame = frame();
        let params = VerticalCheckParams {
            central_check_enabled: false,
            ..VerticalCheckParams::default()
        };
        let points: Vec<Vec3> = circumference_points(Vec3::new(1.0, 2.0, 3.0), &frame, 0.0, &params).collect();
        assert_eq!(points, vec![Vec3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn height_levels_span_band() {
        let levels: Vec<f32> = height_levels(0.1, 1.7, 2, true).collect();
        assert_eq!(levels.len(), 3);
        assert_relative_eq!(levels[0], 0.1);
        assert_relative_eq!(levels[1], 0.9, epsilon = 1.0e-6);
        assert_relative_eq!(levels[2], 1.7, epsilon = 1.0e-6);

        let single: Vec<f32> = height_levels(0.1, 1.7, 2, false).collect();
        assert_eq!(single, vec![0.1]);
    }
}
