//! Streaming counters and load-latency tracking for external reporting.

use std::time::Duration;

/// Ring buffer of recent load latencies.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    history: Vec<Duration>,
    index: usize,
    filled: bool,
}

impl LatencyTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![Duration::ZERO; capacity.max(1)],
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.history[self.index] = latency;
        self.index = (self.index + 1) % self.history.len();
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn samples(&self) -> &[Duration] {
        if self.filled {
            &self.history
        } else {
            &self.history[..self.index]
        }
    }

    pub fn average(&self) -> Duration {
        let samples = self.samples();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.samples().len()
    }

    pub fn clear(&mut self) {
        self.index = 0;
        self.filled = false;
    }
}

/// Point-in-time view of the loader. For observability only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub unloaded: usize,
    pub loading: usize,
    pub loaded: usize,
    pub errored: usize,
    /// Chunks waiting in the priority queue.
    pub queue_len: usize,
    pub in_flight: usize,
    pub memory_bytes: usize,
    pub memory_budget_bytes: usize,
    pub average_latency: Duration,
    pub max_latency: Duration,
    pub loads_succeeded: u64,
    /// Every failed load, timeouts included.
    pub load_errors: u64,
    pub timeouts: u64,
    pub chunks_created: u64,
    /// Chunks dropped by the memory governor.
    pub chunks_evicted: u64,
    /// Chunks dropped for being out of range.
    pub chunks_unloaded: u64,
    pub late_results: u64,
    pub resident_stars: usize,
    pub ticks: u64,
}

impl StreamStats {
    pub fn total_chunks(&self) -> usize {
        self.unloaded + self.loading + self.loaded + self.errored
    }
}
