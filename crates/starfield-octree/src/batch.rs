//! Renderer-owned point batches, keyed by octree node.
//!
//! The octree never holds renderer state. A [`BatchCache`] maps node ids to
//! decimated point lists and decides when a stale batch may be rebuilt.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use starfield_lod::LodSelector;

use crate::octree::{NodeId, OctreeNode};

/// Default minimum time between rebuilds of the same node's batch.
pub const DEFAULT_BATCH_REFRESH: Duration = Duration::from_millis(250);

/// Point data for one visible node, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBatch {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    sizes: Vec<f32>,
    lod: u8,
    revision: u64,
    built_at: Instant,
}

impl RenderBatch {
    /// Build from a node's stars, keeping every `2^lod`-th star.
    pub fn build(node: &OctreeNode, lod: u8, now: Instant) -> Self {
        let stride = LodSelector::stride_for_lod(lod);
        let capacity = node.star_count().div_ceil(stride);
        let mut batch = Self {
            positions: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            sizes: Vec::with_capacity(capacity),
            lod,
            revision: node.revision(),
            built_at: now,
        };
        for star in node.stars().step_by(stride) {
            batch.positions.push(star.position.to_array());
            batch.colors.push(star.color);
            batch.sizes.push(star.size);
        }
        batch
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn lod(&self) -> u8 {
        self.lod
    }

    /// Node revision this batch was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    fn is_current(&self, node: &OctreeNode, lod: u8) -> bool {
        self.revision == node.revision() && self.lod == lod
    }
}

/// Map of node id to render batch with per-node rebuild throttling.
#[derive(Debug)]
pub struct BatchCache {
    batches: FxHashMap<NodeId, RenderBatch>,
    refresh_interval: Duration,
    rebuilds: u64,
}

impl Default for BatchCache {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_REFRESH)
    }
}

impl BatchCache {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            batches: FxHashMap::default(),
            refresh_interval,
            rebuilds: 0,
        }
    }

    /// Ensure `id` has a batch for `node` at `lod`.
    ///
    /// A missing batch is built immediately. A stale one is rebuilt only once
    /// `refresh_interval` has passed since its last build; until then the old
    /// batch keeps being served. Returns whether a build happened.
    pub fn refresh(&mut self, id: NodeId, node: &OctreeNode, lod: u8, now: Instant) -> bool {
        match self.batches.get(&id) {
            Some(batch) if batch.is_current(node, lod) => return false,
            Some(batch) if now.saturating_duration_since(batch.built_at) < self.refresh_interval => {
                return false;
            }
            _ => {}
        }
        self.batches.insert(id, RenderBatch::build(node, lod, now));
        self.rebuilds += 1;
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&RenderBatch> {
        self.batches.get(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<RenderBatch> {
        self.batches.remove(&id)
    }

    /// Release every batch for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.batches.retain(|&id, _| keep(id));
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total builds since construction.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
