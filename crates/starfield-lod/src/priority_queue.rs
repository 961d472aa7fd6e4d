//! Priority queue for ordering chunk loads by current and predicted camera proximity.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

/// Factors that determine a chunk's load priority.
#[derive(Clone, Debug)]
pub struct ChunkPriorityFactors {
    /// Distance from the camera to the chunk center.
    pub distance: f64,
    /// Distance from the extrapolated future camera position to the chunk center.
    pub predicted_distance: f64,
    /// LOD level of the chunk (0 = highest detail, higher = coarser).
    pub lod: u8,
    /// Quality-policy aggressiveness in `[0, 1]`.
    pub aggressiveness: f64,
}

/// Compute a priority score from the given factors.
/// Higher scores mean higher priority (loaded first).
///
/// Non-increasing in both distances for fixed LOD and aggressiveness.
#[must_use]
pub fn compute_priority(factors: &ChunkPriorityFactors) -> f64 {
    let current = factors.distance.max(1.0);
    let predicted = factors.predicted_distance.max(1.0);

    // Current proximity dominates; prediction only biases.
    let mut score = 1.0e8 / (current * current);
    score += 0.5e8 / (predicted * predicted);

    // Lower LOD numbers (higher detail) get a bonus.
    score += 100.0 / (1_u32 << factors.lod.min(31)) as f64;

    score * (1.0 + factors.aggressiveness.clamp(0.0, 1.0))
}

/// An entry in the priority queue.
#[derive(Clone, Debug)]
struct PriorityEntry<K> {
    key: K,
    priority: f64,
    /// Generation counter to handle stale entries after priority updates.
    generation: u64,
}

impl<K> PartialEq for PriorityEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.generation == other.generation
    }
}

impl<K> Eq for PriorityEntry<K> {}

impl<K> PartialOrd for PriorityEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for PriorityEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties go to the older entry so equal priorities drain FIFO.
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Max-priority queue of chunk keys.
///
/// Pushing a key that is already queued replaces its priority; the old heap
/// entry becomes stale and is skipped on pop.
pub struct ChunkPriorityQueue<K> {
    heap: BinaryHeap<PriorityEntry<K>>,
    /// Maps keys to their current generation counter.
    generations: HashMap<K, u64>,
    /// Monotonically increasing generation counter.
    next_generation: u64,
}

impl<K: Copy + Eq + Hash> Default for ChunkPriorityQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> ChunkPriorityQueue<K> {
    /// Create a new empty priority queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            generations: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Insert or update a key's priority.
    pub fn push(&mut self, key: K, priority: f64) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(key, generation);
        self.heap.push(PriorityEntry {
            key,
            priority,
            generation,
        });
        // Bound stale-entry growth when priorities are refreshed every tick.
        if self.heap.len() > 4 * self.generations.len() + 64 {
            self.compact();
        }
    }

    /// Remove and return the highest-priority key with its priority.
    pub fn pop(&mut self) -> Option<(K, f64)> {
        while let Some(entry) = self.heap.pop() {
            if self.generations.get(&entry.key) == Some(&entry.generation) {
                self.generations.remove(&entry.key);
                return Some((entry.key, entry.priority));
            }
        }
        None
    }

    /// Drop a key from the queue. Returns whether it was queued.
    pub fn remove(&mut self, key: &K) -> bool {
        self.generations.remove(key).is_some()
    }

    /// Whether `key` is currently queued.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.generations.contains_key(key)
    }

    /// Number of valid entries in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Clear all entries from the queue.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.generations.clear();
    }

    fn compact(&mut self) {
        let generations = &self.generations;
        self.heap
            .retain(|entry| generations.get(&entry.key) == Some(&entry.generation));
    }
}
