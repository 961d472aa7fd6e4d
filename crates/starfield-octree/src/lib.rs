//! Adaptive octree over generated stars, with frustum/distance culling and
//! per-node render batches kept outside the tree.

mod batch;
mod index;
mod octree;

pub use batch::{BatchCache, DEFAULT_BATCH_REFRESH, RenderBatch};
pub use index::{DensityProbe, SpatialIndex, SpatialIndexConfig, VisibleNode};
pub use octree::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_STARS_PER_NODE, NodeId, Octree, OctreeNode, OctreeParams,
    OctreeStats, StarEntry,
};
