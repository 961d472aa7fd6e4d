//! Camera states and planned polylines between them.

use glam::Vec3;
use starfield_math::CameraPose;

use crate::guardrail::ValidationReport;

/// A keyframe for scripted camera motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl CameraState {
    pub fn new(position: Vec3, target: Vec3, fov_y: f32) -> Self {
        Self {
            position,
            target,
            fov_y,
        }
    }

    /// Component-wise interpolation.
    pub fn lerp(&self, other: &CameraState, t: f32) -> CameraState {
        CameraState {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
            fov_y: self.fov_y + (other.fov_y - self.fov_y) * t,
        }
    }

    pub fn to_pose(&self) -> CameraPose {
        CameraPose::look_at(self.position, self.target, self.fov_y)
    }
}

/// How a [`PathPlan`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// The straight path validated.
    Direct,
    /// A detour through a displaced midpoint validated on this trial (1-based).
    Rerouted { trial: usize },
    /// Nothing validated; the straight path is used anyway.
    Fallback,
}

/// A validated (or knowingly unvalidated) camera polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlan {
    waypoints: Vec<CameraState>,
    outcome: PathOutcome,
    report: ValidationReport,
}

impl PathPlan {
    pub(crate) fn new(waypoints: Vec<CameraState>, outcome: PathOutcome, report: ValidationReport) -> Self {
        Self {
            waypoints,
            outcome,
            report,
        }
    }

    pub fn waypoints(&self) -> &[CameraState] {
        &self.waypoints
    }

    pub fn outcome(&self) -> PathOutcome {
        self.outcome
    }

    /// Validation result for the returned waypoints.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn length(&self) -> f32 {
        polyline_length(&self.waypoints)
    }

    /// Camera state at arc-length fraction `t` in `[0, 1]`.
    pub fn sample(&self, t: f32) -> CameraState {
        sample_polyline(&self.waypoints, t)
    }
}

pub(crate) fn polyline_length(waypoints: &[CameraState]) -> f32 {
    waypoints
        .windows(2)
        .map(|w| w[0].position.distance(w[1].position))
        .sum()
}

/// Interpolate along `waypoints` by arc length. Degenerate (zero-length)
/// polylines interpolate by segment index instead.
pub(crate) fn sample_polyline(waypoints: &[CameraState], t: f32) -> CameraState {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    match waypoints {
        [] => CameraState::new(Vec3::ZERO, Vec3::NEG_Z, std::f32::consts::FRAC_PI_3),
        [only] => *only,
        [.., last] if t >= 1.0 => *last,
        _ => {
            let total = polyline_length(waypoints);
            if total <= f32::EPSILON {
                let segments = (waypoints.len() - 1) as f32;
                let scaled = t * segments;
                let i = (scaled.floor() as usize).min(waypoints.len() - 2);
                return waypoints[i].lerp(&waypoints[i + 1], scaled - i as f32);
            }

            let mut remaining = t * total;
            for w in waypoints.windows(2) {
                let segment = w[0].position.distance(w[1].position);
                if remaining <= segment && segment > 0.0 {
                    return w[0].lerp(&w[1], remaining / segment);
                }
                remaining -= segment;
            }
            waypoints[waypoints.len() - 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32, y: f32) -> CameraState {
        CameraState::new(Vec3::new(x, y, 0.0), Vec3::new(x, y, -10.0), 1.0)
    }

    /// Interpolation is component-wise.
    #[test]
    fn test_lerp_components() {
        let a = CameraState::new(Vec3::ZERO, Vec3::X, 1.0);
        let b = CameraState::new(Vec3::splat(10.0), Vec3::Y, 2.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.position, Vec3::splat(5.0));
        assert_eq!(mid.target, Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(mid.fov_y, 1.5);
    }

    /// Sampling follows arc length across segments.
    #[test]
    fn test_sample_by_arc_length() {
        let waypoints = [state(0.0, 0.0), state(10.0, 0.0), state(10.0, 30.0)];
        assert_eq!(polyline_length(&waypoints), 40.0);
        let quarter = sample_polyline(&waypoints, 0.25).position;
        assert!((quarter - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4, "{quarter:?}");
        let half = sample_polyline(&waypoints, 0.5).position;
        assert!((half - Vec3::new(10.0, 10.0, 0.0)).length() < 1e-4, "{half:?}");
        assert_eq!(sample_polyline(&waypoints, 1.0), waypoints[2]);
        assert_eq!(sample_polyline(&waypoints, -3.0), waypoints[0]);
    }

    /// A stationary path still interpolates its targets.
    #[test]
    fn test_sample_zero_length() {
        let a = CameraState::new(Vec3::ZERO, Vec3::X, 1.0);
        let b = CameraState::new(Vec3::ZERO, Vec3::Y, 1.0);
        let mid = sample_polyline(&[a, b], 0.5);
        assert_eq!(mid.target, Vec3::new(0.5, 0.5, 0.0));
    }

    /// States convert to poses looking at their target.
    #[test]
    fn test_to_pose_faces_target() {
        let s = CameraState::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), 1.0);
        let pose = s.to_pose();
        assert!((pose.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(pose.fov_y, 1.0);
    }
}
