//! Level-of-detail management: distance-based LOD selection, quality policy,
//! chunk load priority, and memory budget eviction.

mod memory_budget;
mod priority_queue;
mod quality;
mod selector;

pub use memory_budget::{EVICTION_TARGET_RATIO, MemoryBudgetTracker, select_evictions};
pub use priority_queue::{ChunkPriorityFactors, ChunkPriorityQueue, compute_priority};
pub use quality::{QualityPolicy, QualityTier};
pub use selector::{LodSelector, LodThresholds};
