//! Linear camera motion prediction over a short rolling history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Vec3;

/// Extrapolates the camera position `look_ahead` into the future from the
/// average velocity across the recorded history.
#[derive(Debug, Clone)]
pub struct CameraPredictor {
    history: VecDeque<(Instant, Vec3)>,
    capacity: usize,
    look_ahead: Duration,
}

impl CameraPredictor {
    pub fn new(capacity: usize, look_ahead: Duration) -> Self {
        let capacity = capacity.max(2);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            look_ahead,
        }
    }

    pub fn record(&mut self, now: Instant, position: Vec3) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((now, position));
    }

    /// Average velocity in units per second, zero until two samples exist.
    pub fn velocity(&self) -> Vec3 {
        let (Some(&(t0, p0)), Some(&(t1, p1))) = (self.history.front(), self.history.back()) else {
            return Vec3::ZERO;
        };
        let dt = t1.saturating_duration_since(t0).as_secs_f32();
        if dt <= f32::EPSILON {
            return Vec3::ZERO;
        }
        (p1 - p0) / dt
    }

    /// Predicted position, or the latest sample if motion is unknown.
    pub fn predict(&self) -> Option<Vec3> {
        let &(_, latest) = self.history.back()?;
        Some(latest + self.velocity() * self.look_ahead.as_secs_f32())
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
