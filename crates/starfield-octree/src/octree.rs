//! Arena-backed adaptive octree.
//!
//! Nodes live in a flat `Vec` addressed by [`NodeId`]; freed slots are
//! recycled through a free list. A leaf holds stars directly. When a leaf
//! exceeds `max_stars_per_node` and is above `max_depth` it splits into eight
//! equal octants and hands its stars down, so internal nodes never hold stars.

use glam::Vec3;
use starfield_math::Aabb;
use starfield_universe::StarRecord;

/// Default leaf capacity before a split.
pub const DEFAULT_MAX_STARS_PER_NODE: usize = 100;

/// Default maximum subdivision depth (the root is depth 0).
pub const DEFAULT_MAX_DEPTH: u8 = 8;

/// Index of a node in the octree arena.
///
/// Ids are recycled after a subtree collapses, so an id is only meaningful
/// together with the node's [`OctreeNode::revision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A star stored in a leaf, tagged with the group that inserted it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarEntry {
    pub star: StarRecord,
    pub group: Option<u64>,
}

/// A single octree node.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    bounds: Aabb,
    depth: u8,
    parent: Option<NodeId>,
    children: Option<[NodeId; 8]>,
    entries: Vec<StarEntry>,
    revision: u64,
    live: bool,
    pub(crate) camera_distance: f32,
    pub(crate) lod: u8,
}

impl OctreeNode {
    fn leaf(bounds: Aabb, depth: u8, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            depth,
            parent,
            children: None,
            entries: Vec::new(),
            revision: 0,
            live: true,
            camera_distance: f32::INFINITY,
            lod: 0,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> Option<&[NodeId; 8]> {
        self.children.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn entries(&self) -> &[StarEntry] {
        &self.entries
    }

    pub fn stars(&self) -> impl Iterator<Item = &StarRecord> {
        self.entries.iter().map(|e| &e.star)
    }

    pub fn star_count(&self) -> usize {
        self.entries.len()
    }

    /// Bumped whenever this node's contents or shape change. Unique across
    /// the whole tree, so a recycled id never repeats an old revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Distance to the camera from the last visibility pass.
    pub fn camera_distance(&self) -> f32 {
        self.camera_distance
    }

    /// LOD bucket from the last visibility pass.
    pub fn lod(&self) -> u8 {
        self.lod
    }
}

/// Subdivision limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctreeParams {
    pub max_stars_per_node: usize,
    pub max_depth: u8,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            max_stars_per_node: DEFAULT_MAX_STARS_PER_NODE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Structural counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub star_count: usize,
    pub deepest_leaf: u8,
    /// Stars rejected because they fell outside the root bounds.
    pub dropped: u64,
    pub splits: u64,
    pub collapses: u64,
}

/// Adaptive octree over a fixed root box.
#[derive(Debug, Clone)]
pub struct Octree {
    bounds: Aabb,
    params: OctreeParams,
    nodes: Vec<OctreeNode>,
    free: Vec<NodeId>,
    star_count: usize,
    next_revision: u64,
    dropped: u64,
    splits: u64,
    collapses: u64,
}

const ROOT: NodeId = NodeId(0);

impl Octree {
    pub fn new(bounds: Aabb, params: OctreeParams) -> Self {
        Self {
            bounds,
            params,
            nodes: vec![OctreeNode::leaf(bounds, 0, None)],
            free: Vec::new(),
            star_count: 0,
            next_revision: 0,
            dropped: 0,
            splits: 0,
            collapses: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn params(&self) -> &OctreeParams {
        &self.params
    }

    pub fn star_count(&self) -> usize {
        self.star_count
    }

    pub fn is_empty(&self) -> bool {
        self.star_count == 0
    }

    /// The node behind `id`, if it is currently part of the tree.
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id.index()).filter(|n| n.live)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut OctreeNode {
        &mut self.nodes[id.index()]
    }

    /// Insert an ungrouped star. Returns `false` if it lies outside the root.
    pub fn insert(&mut self, star: StarRecord) -> bool {
        self.insert_entry(StarEntry { star, group: None })
    }

    /// Insert a star tagged with `group` so it can later be removed in bulk.
    pub fn insert_grouped(&mut self, star: StarRecord, group: u64) -> bool {
        self.insert_entry(StarEntry {
            star,
            group: Some(group),
        })
    }

    fn insert_entry(&mut self, entry: StarEntry) -> bool {
        let position = entry.star.position;
        if !self.bounds.contains_point(position) {
            self.dropped += 1;
            tracing::trace!(?position, "dropped star outside octree bounds");
            return false;
        }

        let leaf = self.leaf_containing(position);
        self.nodes[leaf.index()].entries.push(entry);
        self.bump_revision(leaf);
        self.star_count += 1;
        self.split_if_needed(leaf);
        true
    }

    /// Descend from the root by octant. The root test already happened.
    fn leaf_containing(&self, p: Vec3) -> NodeId {
        let mut id = ROOT;
        while let Some(children) = self.nodes[id.index()].children {
            id = children[self.nodes[id.index()].bounds.octant_of(p)];
        }
        id
    }

    fn split_if_needed(&mut self, id: NodeId) {
        let node = &self.nodes[id.index()];
        if node.entries.len() > self.params.max_stars_per_node && node.depth < self.params.max_depth {
            self.split(id);
        }
    }

    fn split(&mut self, id: NodeId) {
        let bounds = self.nodes[id.index()].bounds;
        let depth = self.nodes[id.index()].depth + 1;
        let octants = bounds.subdivide();
        let children: [NodeId; 8] =
            std::array::from_fn(|i| self.alloc(OctreeNode::leaf(octants[i], depth, Some(id))));

        let entries = std::mem::take(&mut self.nodes[id.index()].entries);
        self.nodes[id.index()].children = Some(children);
        self.bump_revision(id);

        for entry in entries {
            let child = children[bounds.octant_of(entry.star.position)];
            self.nodes[child.index()].entries.push(entry);
        }
        self.splits += 1;

        for child in children {
            self.bump_revision(child);
            self.split_if_needed(child);
        }
    }

    /// Remove every star inserted under `group`, collapsing subtrees whose
    /// leaves together fit in a single node again. Returns the number removed.
    pub fn remove_group(&mut self, group: u64) -> usize {
        let removed = self.remove_group_from(ROOT, group);
        self.star_count -= removed;
        removed
    }

    fn remove_group_from(&mut self, id: NodeId, group: u64) -> usize {
        if let Some(children) = self.nodes[id.index()].children {
            let removed: usize = children
                .iter()
                .map(|&child| self.remove_group_from(child, group))
                .sum();
            if removed > 0 {
                self.try_collapse(id);
            }
            return removed;
        }

        let node = &mut self.nodes[id.index()];
        let before = node.entries.len();
        node.entries.retain(|e| e.group != Some(group));
        let removed = before - node.entries.len();
        if removed > 0 {
            self.bump_revision(id);
        }
        removed
    }

    fn try_collapse(&mut self, id: NodeId) {
        let Some(children) = self.nodes[id.index()].children else {
            return;
        };
        let mut total = 0;
        for child in &children {
            let node = &self.nodes[child.index()];
            if !node.is_leaf() {
                return;
            }
            total += node.entries.len();
        }
        if total > self.params.max_stars_per_node {
            return;
        }

        let mut entries = Vec::with_capacity(total);
        for child in children {
            entries.append(&mut self.nodes[child.index()].entries);
            self.release(child);
        }
        let node = &mut self.nodes[id.index()];
        node.children = None;
        node.entries = entries;
        self.bump_revision(id);
        self.collapses += 1;
    }

    /// Ids of every leaf, depth-first.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            match self.nodes[id.index()].children {
                Some(children) => stack.extend(children.iter().rev()),
                None => leaves.push(id),
            }
        }
        leaves
    }

    /// Stars per unit volume inside the cube of half-extent `radius` around `point`.
    pub fn density_at(&self, point: Vec3, radius: f32) -> f32 {
        if radius.is_nan() || radius <= 0.0 {
            return 0.0;
        }
        let probe = Aabb::from_center_half_extents(point, Vec3::splat(radius));
        let mut count = 0usize;
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if !node.bounds.intersects(&probe) {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => {
                    count += node
                        .entries
                        .iter()
                        .filter(|e| probe.contains_point(e.star.position))
                        .count();
                }
            }
        }
        (count as f64 / probe.volume()) as f32
    }

    /// Drop every node and star. The root box and params are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(OctreeNode::leaf(self.bounds, 0, None));
        self.free.clear();
        self.star_count = 0;
        self.dropped = 0;
        self.splits = 0;
        self.collapses = 0;
        self.bump_revision(ROOT);
    }

    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats {
            star_count: self.star_count,
            dropped: self.dropped,
            splits: self.splits,
            collapses: self.collapses,
            ..Default::default()
        };
        for node in self.nodes.iter().filter(|n| n.live) {
            stats.node_count += 1;
            if node.is_leaf() {
                stats.leaf_count += 1;
                stats.deepest_leaf = stats.deepest_leaf.max(node.depth);
            }
        }
        stats
    }

    fn alloc(&mut self, node: OctreeNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        node.live = false;
        node.children = None;
        node.entries = Vec::new();
        self.free.push(id);
    }

    fn bump_revision(&mut self, id: NodeId) {
        self.next_revision += 1;
        self.nodes[id.index()].revision = self.next_revision;
    }
}
