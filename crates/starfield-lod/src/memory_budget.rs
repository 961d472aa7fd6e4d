//! Memory budget tracking and least-recently-used eviction for loaded chunks.
//!
//! Provides [`MemoryBudgetTracker`] to monitor the estimated memory of loaded
//! chunks and [`select_evictions`] to pick which chunks to drop when the
//! budget is exceeded.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

/// Eviction stops once usage falls to this fraction of the budget.
pub const EVICTION_TARGET_RATIO: f64 = 0.8;

/// Tracks estimated memory across all loaded chunks.
pub struct MemoryBudgetTracker<K> {
    budget_bytes: usize,
    /// Per-chunk memory estimate.
    chunk_usage: HashMap<K, usize>,
    /// Running total of tracked bytes.
    total_bytes: usize,
}

impl<K: Copy + Eq + Hash> MemoryBudgetTracker<K> {
    /// Create a new tracker with the given budget in bytes.
    #[must_use]
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            chunk_usage: HashMap::new(),
            total_bytes: 0,
        }
    }

    /// Record that a chunk has been loaded with the given memory estimate.
    pub fn on_chunk_loaded(&mut self, key: K, bytes: usize) {
        if let Some(old) = self.chunk_usage.insert(key, bytes) {
            self.total_bytes -= old;
        }
        self.total_bytes += bytes;
    }

    /// Record that a chunk has been unloaded.
    pub fn on_chunk_unloaded(&mut self, key: &K) {
        if let Some(bytes) = self.chunk_usage.remove(key) {
            self.total_bytes -= bytes;
        }
    }

    /// Whether tracked usage exceeds the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total_bytes > self.budget_bytes
    }

    /// Total bytes currently tracked.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Configured budget in bytes.
    #[must_use]
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Memory estimate for one chunk, if tracked.
    #[must_use]
    pub fn usage_of(&self, key: &K) -> Option<usize> {
        self.chunk_usage.get(key).copied()
    }

    /// Number of chunks currently tracked.
    #[must_use]
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunk_usage.len()
    }

    /// Forget every chunk.
    pub fn clear(&mut self) {
        self.chunk_usage.clear();
        self.total_bytes = 0;
    }
}

/// Determine which chunks to evict to bring usage down to
/// [`EVICTION_TARGET_RATIO`] of the budget.
///
/// `candidates` pairs each evictable chunk with its last-access time; chunks
/// not listed are never chosen. Returns keys in eviction order, least recently
/// accessed first. Returns nothing when the tracker is within budget.
pub fn select_evictions<K: Copy + Eq + Hash>(
    tracker: &MemoryBudgetTracker<K>,
    candidates: impl IntoIterator<Item = (K, Instant)>,
) -> Vec<K> {
    if !tracker.is_over_budget() {
        return Vec::new();
    }

    let mut candidates: Vec<(K, Instant)> = candidates
        .into_iter()
        .filter(|(key, _)| tracker.chunk_usage.contains_key(key))
        .collect();
    candidates.sort_by_key(|&(_, accessed)| accessed);

    let target = (tracker.budget_bytes as f64 * EVICTION_TARGET_RATIO) as usize;
    let mut remaining = tracker.total_bytes;
    let mut evictions = Vec::new();

    for (key, _) in candidates {
        if remaining <= target {
            break;
        }
        if let Some(bytes) = tracker.usage_of(&key) {
            remaining -= bytes;
            evictions.push(key);
        }
    }

    evictions
}
