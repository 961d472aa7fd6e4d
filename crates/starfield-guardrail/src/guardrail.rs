//! Path validation against local density and perpendicular-detour rerouting.
//!
//! Straight interpolation between camera states can cross regions with
//! almost nothing generated, which reads as an empty tunnel during scripted
//! flight. The guardrail samples density along a path, rejects paths that
//! spend too long in sparse space, and tries a few bent alternatives.

use glam::Vec3;
use starfield_octree::DensityProbe;

use crate::path::{CameraState, PathOutcome, PathPlan, polyline_length, sample_polyline};

/// Tuning for [`PathGuardrail`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardrailConfig {
    /// Density samples taken along a path.
    pub samples: usize,
    /// Stars per unit volume below which a sample counts as sparse.
    pub min_density: f32,
    /// Half-extent of the cube probed around each sample.
    pub density_probe_radius: f32,
    /// Longest continuous sparse stretch a valid path may contain.
    pub max_low_density_distance: f32,
    pub max_reroute_trials: usize,
    /// Midpoint displacement of the first detour. Trial `k` moves it
    /// `k` times as far, on alternating sides.
    pub base_deviation: f32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            samples: 50,
            min_density: 2.0e-9,
            density_probe_radius: 1_000.0,
            max_low_density_distance: 5_000.0,
            max_reroute_trials: 6,
            base_deviation: 2_000.0,
        }
    }
}

/// Why a path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    /// A continuous sparse stretch exceeded the configured distance.
    LowDensityRun,
    /// More than half the samples were sparse.
    MostlyEmpty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub samples: usize,
    pub low_density_samples: usize,
    /// Longest continuous sparse stretch, in world units.
    pub max_low_density_run: f32,
    pub path_length: f32,
    pub failure: Option<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }
}

/// Validates and reroutes camera paths against a [`DensityProbe`].
pub struct PathGuardrail<'a, P: DensityProbe + ?Sized> {
    probe: &'a P,
    config: GuardrailConfig,
}

impl<'a, P: DensityProbe + ?Sized> PathGuardrail<'a, P> {
    pub fn new(probe: &'a P, config: GuardrailConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Validate the straight path from `start` to `end`.
    pub fn validate_path(&self, start: &CameraState, end: &CameraState) -> ValidationReport {
        self.validate_waypoints(&[*start, *end])
    }

    /// Validate an arbitrary polyline by sampling it evenly by arc length.
    pub fn validate_waypoints(&self, waypoints: &[CameraState]) -> ValidationReport {
        let samples = self.config.samples.max(2);
        let mut low = 0;
        let mut run = 0.0f32;
        let mut max_run = 0.0f32;
        let mut previous: Option<Vec3> = None;

        for i in 0..samples {
            let t = i as f32 / (samples - 1) as f32;
            let position = sample_polyline(waypoints, t).position;
            let step = previous.map_or(0.0, |p| p.distance(position));
            previous = Some(position);

            let density = self
                .probe
                .density_at(position, self.config.density_probe_radius);
            if density < self.config.min_density {
                low += 1;
                run += step;
                max_run = max_run.max(run);
            } else {
                run = 0.0;
            }
        }

        let failure = if max_run > self.config.max_low_density_distance {
            Some(ValidationFailure::LowDensityRun)
        } else if low * 2 > samples {
            Some(ValidationFailure::MostlyEmpty)
        } else {
            None
        };

        ValidationReport {
            samples,
            low_density_samples: low,
            max_low_density_run: max_run,
            path_length: polyline_length(waypoints),
            failure,
        }
    }

    /// Return the direct path if it validates, otherwise the first valid
    /// detour, otherwise the direct path flagged as [`PathOutcome::Fallback`].
    pub fn adjust_path(&self, start: &CameraState, end: &CameraState) -> PathPlan {
        let direct = vec![*start, *end];
        let direct_report = self.validate_waypoints(&direct);
        if direct_report.is_valid() {
            return PathPlan::new(direct, PathOutcome::Direct, direct_report);
        }

        let perpendicular = perpendicular_to(end.position - start.position);
        let midpoint = start.lerp(end, 0.5);
        for trial in 0..self.config.max_reroute_trials {
            let magnitude = self.config.base_deviation * (trial + 1) as f32;
            let sign = if trial % 2 == 0 { 1.0 } else { -1.0 };
            let offset = perpendicular * magnitude * sign;
            let detour = CameraState {
                position: midpoint.position + offset,
                target: midpoint.target + offset,
                fov_y: midpoint.fov_y,
            };

            let waypoints = vec![*start, detour, *end];
            let report = self.validate_waypoints(&waypoints);
            if report.is_valid() {
                tracing::debug!(trial = trial + 1, ?offset, "rerouted camera path");
                return PathPlan::new(waypoints, PathOutcome::Rerouted { trial: trial + 1 }, report);
            }
        }

        tracing::warn!(
            from = ?start.position,
            to = ?end.position,
            failure = ?direct_report.failure,
            trials = self.config.max_reroute_trials,
            "no valid reroute found, using direct path"
        );
        PathPlan::new(direct, PathOutcome::Fallback, direct_report)
    }
}

/// A unit vector perpendicular to `direction`, preferring the horizontal plane.
fn perpendicular_to(direction: Vec3) -> Vec3 {
    let Some(dir) = direction.try_normalize() else {
        return Vec3::Y;
    };
    dir.cross(Vec3::Y)
        .try_normalize()
        .or_else(|| dir.cross(Vec3::X).try_normalize())
        .unwrap_or(Vec3::Y)
}
