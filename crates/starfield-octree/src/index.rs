//! The spatial index consumed by the streaming loader and the renderer.

use std::time::{Duration, Instant};

use glam::Vec3;
use starfield_lod::{LodSelector, LodThresholds, QualityPolicy};
use starfield_math::{Aabb, CameraPose, Frustum};
use starfield_universe::StarRecord;

use crate::batch::{BatchCache, DEFAULT_BATCH_REFRESH, RenderBatch};
use crate::octree::{NodeId, Octree, OctreeParams, OctreeStats};

/// Local star density lookups. Implemented by [`SpatialIndex`]; path
/// validation depends only on this trait.
pub trait DensityProbe {
    /// Stars per unit volume in the cube of half-extent `radius` around `point`.
    fn density_at(&self, point: Vec3, radius: f32) -> f32;
}

/// Construction parameters for a [`SpatialIndex`].
#[derive(Debug, Clone)]
pub struct SpatialIndexConfig {
    pub octree: OctreeParams,
    pub batch_refresh_interval: Duration,
    pub lod_thresholds: LodThresholds,
}

impl Default for SpatialIndexConfig {
    fn default() -> Self {
        Self {
            octree: OctreeParams::default(),
            batch_refresh_interval: DEFAULT_BATCH_REFRESH,
            lod_thresholds: LodThresholds::default_starfield(),
        }
    }
}

/// A node that survived the last visibility pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleNode {
    pub id: NodeId,
    pub distance: f32,
    pub lod: u8,
    pub star_count: usize,
}

/// Octree plus culling state and the render batch cache.
#[derive(Debug)]
pub struct SpatialIndex {
    octree: Octree,
    batches: BatchCache,
    selector: LodSelector,
    visible: Vec<VisibleNode>,
}

impl SpatialIndex {
    pub fn new(bounds: Aabb, config: SpatialIndexConfig) -> Self {
        Self {
            octree: Octree::new(bounds, config.octree),
            batches: BatchCache::new(config.batch_refresh_interval),
            selector: LodSelector::new(config.lod_thresholds),
            visible: Vec::new(),
        }
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    pub fn insert(&mut self, star: StarRecord) -> bool {
        self.octree.insert(star)
    }

    pub fn insert_grouped(&mut self, star: StarRecord, group: u64) -> bool {
        self.octree.insert_grouped(star, group)
    }

    /// Remove a group's stars and forget anything the removal invalidated.
    pub fn remove_group(&mut self, group: u64) -> usize {
        let removed = self.octree.remove_group(group);
        if removed > 0 {
            let octree = &self.octree;
            self.batches
                .retain(|id| octree.node(id).is_some_and(|n| n.is_leaf()));
            self.visible
                .retain(|v| octree.node(v.id).is_some_and(|n| n.is_leaf()));
        }
        removed
    }

    /// Cull against `camera` and refresh batches for what remains.
    pub fn update_visibility(&mut self, camera: &CameraPose, quality: &QualityPolicy) {
        self.update_visibility_at(camera, quality, Instant::now());
    }

    /// [`SpatialIndex::update_visibility`] with an explicit clock.
    pub fn update_visibility_at(
        &mut self,
        camera: &CameraPose,
        quality: &QualityPolicy,
        now: Instant,
    ) {
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        let eye = camera.position;
        self.visible.clear();

        let mut culled = 0usize;
        let mut stack = vec![self.octree.root()];
        while let Some(id) = stack.pop() {
            let node = self.octree.node_mut(id);
            let distance = node.bounds().distance_to_point(eye);
            node.camera_distance = distance;
            if distance > quality.max_view_distance || !frustum.intersects_aabb(node.bounds()) {
                culled += 1;
                continue;
            }
            if let Some(children) = node.children() {
                stack.extend(children.iter().copied());
                continue;
            }
            if node.star_count() == 0 {
                continue;
            }

            let lod = self.selector.select_lod(distance, quality.lod_distance_scale);
            node.lod = lod;
            let star_count = node.star_count();
            let node = &*node;
            self.batches.refresh(id, node, lod, now);
            self.visible.push(VisibleNode {
                id,
                distance,
                lod,
                star_count,
            });
        }

        let visible = &self.visible;
        self.batches.retain(|id| visible.iter().any(|v| v.id == id));
        tracing::trace!(visible = visible.len(), culled, "visibility pass");
    }

    /// Nodes that survived the last visibility pass.
    pub fn get_visible_nodes(&self) -> &[VisibleNode] {
        &self.visible
    }

    /// Render batch for a visible node.
    pub fn batch(&self, id: NodeId) -> Option<&RenderBatch> {
        self.batches.get(id)
    }

    pub fn batches(&self) -> &BatchCache {
        &self.batches
    }

    pub fn density_at(&self, point: Vec3, radius: f32) -> f32 {
        self.octree.density_at(point, radius)
    }

    pub fn star_count(&self) -> usize {
        self.octree.star_count()
    }

    pub fn stats(&self) -> OctreeStats {
        self.octree.stats()
    }

    /// Drop all nodes, batches and visibility state.
    pub fn clear(&mut self) {
        self.octree.clear();
        self.batches.clear();
        self.visible.clear();
    }
}

impl DensityProbe for SpatialIndex {
    fn density_at(&self, point: Vec3, radius: f32) -> f32 {
        SpatialIndex::density_at(self, point, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfield_lod::QualityTier;
    use starfield_universe::Universe;

    fn populated(count: u64) -> SpatialIndex {
        let universe = Universe::new(count, 21, 2_000.0);
        let mut index = SpatialIndex::new(universe.bounds(), SpatialIndexConfig::default());
        for i in 1..=count {
            index.insert(universe.star(i).unwrap());
        }
        index
    }

    fn camera_at(position: Vec3, target: Vec3) -> CameraPose {
        CameraPose::look_at(position, target, std::f32::consts::FRAC_PI_3)
    }

    /// Looking at the populated box from outside yields visible nodes with batches.
    #[test]
    fn test_visible_nodes_have_batches() {
        let mut index = populated(2_000);
        let camera = camera_at(Vec3::new(0.0, 0.0, 3_000.0), Vec3::ZERO);
        index.update_visibility(&camera, &QualityPolicy::default());

        let visible = index.get_visible_nodes();
        assert!(!visible.is_empty());
        let total: usize = visible.iter().map(|v| v.star_count).sum();
        assert_eq!(total, 2_000);
        for v in visible {
            assert!(index.batch(v.id).is_some());
        }
    }

    /// Looking away culls everything.
    #[test]
    fn test_looking_away_culls_all() {
        let mut index = populated(500);
        let camera = camera_at(Vec3::new(0.0, 0.0, 3_000.0), Vec3::new(0.0, 0.0, 6_000.0));
        index.update_visibility(&camera, &QualityPolicy::default());
        assert!(index.get_visible_nodes().is_empty());
        assert!(index.batches().is_empty());
    }

    /// Nodes beyond the quality view distance are culled.
    #[test]
    fn test_max_view_distance_culls() {
        let mut index = populated(500);
        let camera = camera_at(Vec3::new(0.0, 0.0, 20_000.0), Vec3::ZERO);
        index.update_visibility(&camera, &QualityPolicy::for_tier(QualityTier::Low));
        assert!(index.get_visible_nodes().is_empty());

        index.update_visibility(&camera, &QualityPolicy::for_tier(QualityTier::Ultra));
        assert!(!index.get_visible_nodes().is_empty());
    }

    /// Higher quality scales LOD thresholds outward.
    #[test]
    fn test_quality_scales_lod() {
        let mut index = populated(50);
        let camera = camera_at(Vec3::new(0.0, 0.0, 4_000.0), Vec3::ZERO);

        index.update_visibility(&camera, &QualityPolicy::for_tier(QualityTier::Low));
        let low = index.get_visible_nodes()[0].lod;
        index.update_visibility(&camera, &QualityPolicy::for_tier(QualityTier::Ultra));
        let ultra = index.get_visible_nodes()[0].lod;
        assert!(low > ultra, "low {low} ultra {ultra}");
    }

    /// Removing a group drops its batches along with its stars.
    #[test]
    fn test_remove_group_releases_batches() {
        let universe = Universe::new(300, 4, 2_000.0);
        let mut index = SpatialIndex::new(universe.bounds(), SpatialIndexConfig::default());
        for i in 1..=300 {
            index.insert_grouped(universe.star(i).unwrap(), 1);
        }
        let camera = camera_at(Vec3::new(0.0, 0.0, 3_000.0), Vec3::ZERO);
        index.update_visibility(&camera, &QualityPolicy::default());
        assert!(!index.batches().is_empty());

        assert_eq!(index.remove_group(1), 300);
        assert!(index.get_visible_nodes().is_empty());
        index.update_visibility(&camera, &QualityPolicy::default());
        assert!(index.batches().is_empty());
    }

    /// Density probing goes through the trait.
    #[test]
    fn test_density_probe_trait() {
        let index = populated(1_000);
        let probe: &dyn DensityProbe = &index;
        assert!(probe.density_at(Vec3::ZERO, 1_000.0) > 0.0);
        assert_eq!(probe.density_at(Vec3::splat(50_000.0), 10.0), 0.0);
    }

    /// Clearing drops every star and batch.
    #[test]
    fn test_clear() {
        let mut index = populated(200);
        let camera = camera_at(Vec3::new(0.0, 0.0, 3_000.0), Vec3::ZERO);
        index.update_visibility(&camera, &QualityPolicy::default());
        index.clear();
        assert_eq!(index.star_count(), 0);
        assert!(index.batches().is_empty());
        assert!(index.get_visible_nodes().is_empty());
    }
}
