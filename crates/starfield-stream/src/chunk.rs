//! Chunk addressing and the per-chunk load state machine.

use std::fmt;
use std::time::Instant;

use glam::{IVec3, Vec3};
use starfield_math::Aabb;
use thiserror::Error;

/// Integer grid address of a cubic chunk plus its edge length.
///
/// Two chunks with the same grid coordinate but different sizes are distinct,
/// so a quality-tier change never aliases old records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Edge length in world units.
    pub size: u32,
}

impl ChunkId {
    pub fn new(x: i64, y: i64, z: i64, size: u32) -> Self {
        Self { x, y, z, size }
    }

    /// The chunk of edge `size` containing `point`.
    pub fn containing(point: Vec3, size: u32) -> Self {
        let edge = f64::from(size.max(1));
        let cell = |v: f32| (f64::from(v) / edge).floor() as i64;
        Self::new(cell(point.x), cell(point.y), cell(point.z), size.max(1))
    }

    /// Neighbor at a grid offset, same size.
    pub fn offset(&self, delta: IVec3) -> Self {
        Self::new(
            self.x + i64::from(delta.x),
            self.y + i64::from(delta.y),
            self.z + i64::from(delta.z),
            self.size,
        )
    }

    pub fn bounds(&self) -> Aabb {
        let edge = f64::from(self.size);
        let min = Vec3::new(
            (self.x as f64 * edge) as f32,
            (self.y as f64 * edge) as f32,
            (self.z as f64 * edge) as f32,
        );
        Aabb::new(min, min + Vec3::splat(self.size as f32))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})@{}", self.x, self.y, self.z, self.size)
    }
}

/// Load state of a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChunkState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Error,
}

impl ChunkState {
    /// Unloaded to Loading, Loading to Loaded or Error, and Loaded back to
    /// Unloaded on eviction. Nothing else.
    pub fn can_transition_to(self, next: ChunkState) -> bool {
        matches!(
            (self, next),
            (ChunkState::Unloaded, ChunkState::Loading)
                | (ChunkState::Loading, ChunkState::Loaded)
                | (ChunkState::Loading, ChunkState::Error)
                | (ChunkState::Loaded, ChunkState::Unloaded)
        )
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: ChunkId,
        from: ChunkState,
        to: ChunkState,
    },
}

/// A streaming chunk record, owned by the loader.
#[derive(Debug, Clone)]
pub struct Chunk {
    id: ChunkId,
    bounds: Aabb,
    state: ChunkState,
    group: u64,
    pub(crate) priority: f64,
    pub(crate) last_accessed: Instant,
    pub(crate) lod: u8,
    star_count: usize,
    memory_bytes: usize,
}

impl Chunk {
    /// A fresh unloaded record. `group` tags this chunk's stars in the octree.
    pub fn new(id: ChunkId, group: u64, now: Instant) -> Self {
        Self {
            id,
            bounds: id.bounds(),
            state: ChunkState::Unloaded,
            group,
            priority: 0.0,
            last_accessed: now,
            lod: 0,
            star_count: 0,
            memory_bytes: 0,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn group(&self) -> u64 {
        self.group
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn lod(&self) -> u8 {
        self.lod
    }

    pub fn star_count(&self) -> usize {
        self.star_count
    }

    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    fn transition(&mut self, to: ChunkState) -> Result<(), ChunkError> {
        if !self.state.can_transition_to(to) {
            return Err(ChunkError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        tracing::debug!(chunk = %self.id, from = ?self.state, ?to, "chunk transition");
        self.state = to;
        Ok(())
    }

    pub(crate) fn begin_loading(&mut self) -> Result<(), ChunkError> {
        self.transition(ChunkState::Loading)
    }

    pub(crate) fn finish_loaded(
        &mut self,
        star_count: usize,
        memory_bytes: usize,
        now: Instant,
    ) -> Result<(), ChunkError> {
        self.transition(ChunkState::Loaded)?;
        self.star_count = star_count;
        self.memory_bytes = memory_bytes;
        self.last_accessed = now;
        Ok(())
    }

    pub(crate) fn fail(&mut self) -> Result<(), ChunkError> {
        self.transition(ChunkState::Error)
    }

    pub(crate) fn evict(&mut self) -> Result<(), ChunkError> {
        self.transition(ChunkState::Unloaded)?;
        self.star_count = 0;
        self.memory_bytes = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points map to the chunk whose bounds contain them, negatives included.
    #[test]
    fn test_containing_chunk_contains_point() {
        for p in [
            Vec3::ZERO,
            Vec3::new(-1.0, 0.5, 1999.0),
            Vec3::new(-4000.0, 12_345.0, -0.001),
        ] {
            let id = ChunkId::containing(p, 2_000);
            assert!(id.bounds().contains_point(p), "{p:?} not in {id}");
        }
        assert_eq!(ChunkId::containing(Vec3::new(-1.0, 0.0, 0.0), 2_000).x, -1);
    }

    /// Grid neighbors share a face.
    #[test]
    fn test_offset_bounds_adjacent() {
        let id = ChunkId::new(0, 0, 0, 1_000);
        let right = id.offset(IVec3::X);
        assert_eq!(id.bounds().max.x, right.bounds().min.x);
        assert_eq!(right.size, 1_000);
    }

    /// The full happy path plus eviction is allowed.
    #[test]
    fn test_lifecycle_happy_path() {
        let now = Instant::now();
        let mut chunk = Chunk::new(ChunkId::new(1, 2, 3, 1_000), 9, now);
        chunk.begin_loading().unwrap();
        chunk.finish_loaded(150, 9_600, now).unwrap();
        assert_eq!(chunk.state(), ChunkState::Loaded);
        assert_eq!(chunk.memory_bytes(), 9_600);
        chunk.evict().unwrap();
        assert_eq!(chunk.state(), ChunkState::Unloaded);
        assert_eq!(chunk.star_count(), 0);
    }

    /// Every other transition is rejected and leaves the state untouched.
    #[test]
    fn test_invalid_transitions_rejected() {
        let now = Instant::now();
        let mut chunk = Chunk::new(ChunkId::new(0, 0, 0, 1_000), 1, now);
        assert!(chunk.finish_loaded(1, 1, now).is_err());
        assert!(chunk.evict().is_err());
        assert!(chunk.fail().is_err());
        assert_eq!(chunk.state(), ChunkState::Unloaded);

        chunk.begin_loading().unwrap();
        chunk.fail().unwrap();
        assert!(chunk.begin_loading().is_err());
        assert!(chunk.evict().is_err());
        assert_eq!(chunk.state(), ChunkState::Error);
    }

    /// The transition table matches the lifecycle exactly.
    #[test]
    fn test_transition_table() {
        let all = [
            ChunkState::Unloaded,
            ChunkState::Loading,
            ChunkState::Loaded,
            ChunkState::Error,
        ];
        let allowed: Vec<_> = all
            .iter()
            .flat_map(|&a| all.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| a.can_transition_to(b))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (ChunkState::Unloaded, ChunkState::Loading),
                (ChunkState::Loading, ChunkState::Loaded),
                (ChunkState::Loading, ChunkState::Error),
                (ChunkState::Loaded, ChunkState::Unloaded),
            ]
        );
    }
}
