//! The streaming loader: owns every chunk record and the spatial index, and
//! advances both once per simulation tick.

use std::time::{Duration, Instant};

use glam::{IVec3, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use starfield_lod::{
    ChunkPriorityFactors, ChunkPriorityQueue, LodSelector, MemoryBudgetTracker, QualityPolicy,
    compute_priority, select_evictions,
};
use starfield_math::{Aabb, CameraPose};
use starfield_octree::{SpatialIndex, SpatialIndexConfig, VisibleNode};
use starfield_universe::{ChunkSampler, SamplerParams, Universe};

use crate::chunk::{Chunk, ChunkError, ChunkId, ChunkState};
use crate::executor::{InlineExecutor, LoadError, RequestId, SampleExecutor, SampleRequest};
use crate::predictor::CameraPredictor;
use crate::stats::{LatencyTracker, StreamStats};

/// Runtime tuning for [`StreamingLoader`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub universe: Universe,
    pub sampler: SamplerParams,
    pub index: SpatialIndexConfig,
    /// Load distance in chunks of the current quality tier's size.
    pub load_radius_chunks: u32,
    /// Unload distance as a multiple of the load distance. Clamped to >= 1.
    pub unload_hysteresis: f32,
    /// Camera travel that triggers a chunk creation pass.
    pub creation_distance_threshold: f32,
    /// Time after which a creation pass runs even without travel.
    pub creation_cooldown: Duration,
    pub max_concurrent_loads: usize,
    pub load_timeout: Duration,
    pub memory_budget_bytes: usize,
    pub bytes_per_star: usize,
    pub prediction_history: usize,
    pub look_ahead: Duration,
    pub latency_window: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            universe: Universe::canonical(),
            sampler: SamplerParams::default(),
            index: SpatialIndexConfig::default(),
            load_radius_chunks: 2,
            unload_hysteresis: 1.5,
            creation_distance_threshold: 300.0,
            creation_cooldown: Duration::from_millis(1_000),
            max_concurrent_loads: 4,
            load_timeout: Duration::from_millis(5_000),
            memory_budget_bytes: 256 * 1024 * 1024,
            bytes_per_star: 64,
            prediction_history: 8,
            look_ahead: Duration::from_millis(500),
            latency_window: 64,
        }
    }
}

/// An in-flight chunk load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingTask {
    pub chunk: ChunkId,
    pub bounds: Aabb,
    pub request_id: RequestId,
    pub started: Instant,
    /// `None` when the timeout is too long to represent; such a load never expires.
    pub deadline: Option<Instant>,
}

/// Drives chunk lifecycles around a moving camera.
///
/// Each [`StreamingLoader::update`] runs, in order: priority recomputation,
/// throttled chunk creation, queue draining, range unloading, and the memory
/// governor, then refreshes octree visibility.
pub struct StreamingLoader {
    config: StreamConfig,
    executor: Box<dyn SampleExecutor>,
    index: SpatialIndex,
    selector: LodSelector,
    chunks: FxHashMap<ChunkId, Chunk>,
    queue: ChunkPriorityQueue<ChunkId>,
    tasks: FxHashMap<ChunkId, LoadingTask>,
    memory: MemoryBudgetTracker<ChunkId>,
    predictor: CameraPredictor,
    latency: LatencyTracker,
    loaded_this_tick: FxHashSet<ChunkId>,
    /// Position, time, and chunk edge of the last creation pass.
    last_creation: Option<(Vec3, Instant, u32)>,
    next_request_id: RequestId,
    next_group: u64,
    totals: StreamStats,
}

impl StreamingLoader {
    pub fn new(config: StreamConfig, executor: Box<dyn SampleExecutor>) -> Self {
        let index = SpatialIndex::new(config.universe.bounds(), config.index.clone());
        tracing::debug!(executor = executor.name(), "streaming loader created");
        Self {
            executor,
            index,
            selector: LodSelector::new(config.index.lod_thresholds.clone()),
            chunks: FxHashMap::default(),
            queue: ChunkPriorityQueue::new(),
            tasks: FxHashMap::default(),
            memory: MemoryBudgetTracker::new(config.memory_budget_bytes),
            predictor: CameraPredictor::new(config.prediction_history, config.look_ahead),
            latency: LatencyTracker::new(config.latency_window),
            loaded_this_tick: FxHashSet::default(),
            last_creation: None,
            next_request_id: 1,
            next_group: 1,
            totals: StreamStats::default(),
            config,
        }
    }

    /// A loader that samples on the calling thread.
    pub fn with_inline(config: StreamConfig) -> Self {
        Self::new(config, Box::new(InlineExecutor::new()))
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Nodes that survived the last tick's visibility pass.
    pub fn get_visible_nodes(&self) -> &[VisibleNode] {
        self.index.get_visible_nodes()
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &LoadingTask> {
        self.tasks.values()
    }

    /// Advance one tick.
    pub fn update(&mut self, camera: &CameraPose, quality: &QualityPolicy) {
        self.update_at(camera, quality, Instant::now());
    }

    /// [`StreamingLoader::update`] with an explicit clock.
    pub fn update_at(&mut self, camera: &CameraPose, quality: &QualityPolicy, now: Instant) {
        let _span = tracing::info_span!("stream_update").entered();
        self.totals.ticks += 1;
        self.loaded_this_tick.clear();

        let position = camera.position;
        self.predictor.record(now, position);
        let predicted = self.predictor.predict().unwrap_or(position);

        self.recompute_priorities(position, predicted, quality, now);
        if self.should_create(position, chunk_edge(quality), now) {
            self.create_chunks(position, predicted, quality, now);
        }
        self.collect_completed(now);
        self.expire_timeouts(now);
        self.dispatch(quality, now);
        self.unload_out_of_range(position, quality);
        self.enforce_memory_budget();

        self.index.update_visibility_at(camera, quality, now);

        tracing::trace!(
            chunks = self.chunks.len(),
            queued = self.queue.len(),
            in_flight = self.tasks.len(),
            memory = self.memory.total_bytes(),
            visible = self.index.get_visible_nodes().len(),
            "stream tick"
        );
    }

    fn load_distance(&self, quality: &QualityPolicy) -> f32 {
        self.config.load_radius_chunks as f32 * quality.chunk_size
    }

    fn unload_distance(&self, quality: &QualityPolicy) -> f32 {
        self.load_distance(quality) * self.config.unload_hysteresis.max(1.0)
    }

    fn recompute_priorities(
        &mut self,
        position: Vec3,
        predicted: Vec3,
        quality: &QualityPolicy,
        now: Instant,
    ) {
        let load_distance = self.load_distance(quality);
        let size = chunk_edge(quality);

        for chunk in self.chunks.values_mut() {
            let (priority, lod) = score(&self.selector, chunk.bounds(), position, predicted, quality);
            chunk.priority = priority;
            chunk.lod = lod;

            let in_range =
                chunk.id().size == size && chunk.bounds().distance_to_point(position) <= load_distance;
            match chunk.state() {
                ChunkState::Unloaded if in_range => self.queue.push(chunk.id(), priority),
                ChunkState::Unloaded => {
                    self.queue.remove(&chunk.id());
                }
                ChunkState::Loaded if in_range => chunk.last_accessed = now,
                _ => {}
            }
        }
    }

    fn should_create(&self, position: Vec3, size: u32, now: Instant) -> bool {
        match self.last_creation {
            None => true,
            Some((at, when, last_size)) => {
                last_size != size
                    || at.distance(position) >= self.config.creation_distance_threshold
                    || now.saturating_duration_since(when) >= self.config.creation_cooldown
            }
        }
    }

    fn create_chunks(&mut self, position: Vec3, predicted: Vec3, quality: &QualityPolicy, now: Instant) {
        let size = chunk_edge(quality);
        let load_distance = self.load_distance(quality);
        let universe_bounds = self.config.universe.bounds();
        let center = ChunkId::containing(position, size);
        let reach = self.config.load_radius_chunks as i32 + 1;

        let mut created = 0u64;
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let id = center.offset(IVec3::new(dx, dy, dz));
                    if self.chunks.contains_key(&id) {
                        continue;
                    }
                    let bounds = id.bounds();
                    if bounds.distance_to_point(position) > load_distance
                        || !bounds.overlaps_interior(&universe_bounds)
                    {
                        continue;
                    }

                    let mut chunk = Chunk::new(id, self.next_group, now);
                    self.next_group += 1;
                    let (priority, lod) = score(&self.selector, &bounds, position, predicted, quality);
                    chunk.priority = priority;
                    chunk.lod = lod;
                    self.queue.push(id, priority);
                    self.chunks.insert(id, chunk);
                    created += 1;
                }
            }
        }

        self.totals.chunks_created += created;
        self.last_creation = Some((position, now, size));
        if created > 0 {
            tracing::debug!(created, total = self.chunks.len(), "created chunks");
        }
    }

    fn collect_completed(&mut self, now: Instant) {
        for response in self.executor.drain_completed() {
            let id = response.chunk;
            let current = self
                .tasks
                .get(&id)
                .is_some_and(|task| task.request_id == response.request_id);
            if !current {
                self.totals.late_results += 1;
                tracing::debug!(chunk = %id, request = response.request_id, "discarded late result");
                continue;
            }
            let Some(task) = self.tasks.remove(&id) else {
                continue;
            };
            let Some(chunk) = self.chunks.get_mut(&id) else {
                continue;
            };

            match response.result {
                Ok(stars) => {
                    let group = chunk.group();
                    let index = &mut self.index;
                    let inserted = stars
                        .into_iter()
                        .filter(|star| index.insert_grouped(*star, group))
                        .count();
                    let bytes = inserted * self.config.bytes_per_star;
                    match chunk.finish_loaded(inserted, bytes, now) {
                        Ok(()) => {
                            self.memory.on_chunk_loaded(id, bytes);
                            self.latency.record(now.saturating_duration_since(task.started));
                            self.totals.loads_succeeded += 1;
                            self.loaded_this_tick.insert(id);
                        }
                        Err(error) => {
                            self.index.remove_group(group);
                            warn_transition(error);
                        }
                    }
                }
                Err(error) => {
                    self.totals.load_errors += 1;
                    tracing::warn!(chunk = %id, %error, "chunk load failed");
                    if let Err(error) = chunk.fail() {
                        warn_transition(error);
                    }
                }
            }
        }
    }

    fn expire_timeouts(&mut self, now: Instant) {
        let expired: Vec<ChunkId> = self
            .tasks
            .values()
            .filter(|task| task.deadline.is_some_and(|deadline| now >= deadline))
            .map(|task| task.chunk)
            .collect();

        for id in expired {
            self.tasks.remove(&id);
            self.totals.timeouts += 1;
            self.totals.load_errors += 1;
            let error = LoadError::SamplingTimeout {
                chunk: id,
                timeout: self.config.load_timeout,
            };
            tracing::warn!(%error, "chunk load timed out");
            if let Some(chunk) = self.chunks.get_mut(&id)
                && let Err(error) = chunk.fail()
            {
                warn_transition(error);
            }
        }
    }

    fn dispatch(&mut self, quality: &QualityPolicy, now: Instant) {
        let free = self.config.max_concurrent_loads.saturating_sub(self.tasks.len());
        let params = SamplerParams {
            min_density: quality.scaled_star_count(self.config.sampler.min_density),
            ..self.config.sampler
        };
        let sampler = ChunkSampler::new(self.config.universe, params);

        let mut dispatched = 0;
        while dispatched < free {
            let Some((id, _)) = self.queue.pop() else {
                break;
            };
            let Some(chunk) = self.chunks.get_mut(&id) else {
                continue;
            };
            if let Err(error) = chunk.begin_loading() {
                warn_transition(error);
                continue;
            }

            let request_id = self.next_request_id;
            self.next_request_id += 1;
            let bounds = *chunk.bounds();
            let request = SampleRequest {
                request_id,
                chunk: id,
                bounds,
                sampler,
            };
            match self.executor.submit(request) {
                Ok(()) => {
                    self.tasks.insert(
                        id,
                        LoadingTask {
                            chunk: id,
                            bounds,
                            request_id,
                            started: now,
                            deadline: now.checked_add(self.config.load_timeout),
                        },
                    );
                    dispatched += 1;
                }
                Err(error) => {
                    self.totals.load_errors += 1;
                    tracing::warn!(chunk = %id, %error, "failed to dispatch chunk load");
                    if let Err(error) = chunk.fail() {
                        warn_transition(error);
                    }
                }
            }
        }
    }

    fn unload_out_of_range(&mut self, position: Vec3, quality: &QualityPolicy) {
        let size = chunk_edge(quality);
        let unload_distance = self.unload_distance(quality);
        let forget_distance = unload_distance * 2.0;

        let mut unload = Vec::new();
        let mut forget = Vec::new();
        for chunk in self.chunks.values() {
            let stale = chunk.id().size != size;
            let distance = chunk.bounds().distance_to_point(position);
            match chunk.state() {
                ChunkState::Loaded
                    if (stale || distance > unload_distance)
                        && !self.loaded_this_tick.contains(&chunk.id()) =>
                {
                    unload.push(chunk.id());
                }
                ChunkState::Unloaded if stale || distance > unload_distance => {
                    forget.push(chunk.id());
                }
                ChunkState::Error if stale || distance > forget_distance => {
                    forget.push(chunk.id());
                }
                _ => {}
            }
        }

        for id in unload {
            if self.evict(id) {
                self.totals.chunks_unloaded += 1;
            }
        }
        for id in forget {
            self.queue.remove(&id);
            self.chunks.remove(&id);
        }
    }

    fn enforce_memory_budget(&mut self) {
        if !self.memory.is_over_budget() {
            return;
        }
        let before = self.memory.total_bytes();
        let candidates = self
            .chunks
            .values()
            .filter(|c| c.state() == ChunkState::Loaded && !self.loaded_this_tick.contains(&c.id()))
            .map(|c| (c.id(), c.last_accessed()));
        let victims = select_evictions(&self.memory, candidates);

        let mut evicted = 0u64;
        for id in victims {
            if self.evict(id) {
                evicted += 1;
            }
        }
        self.totals.chunks_evicted += evicted;
        tracing::debug!(
            before,
            after = self.memory.total_bytes(),
            budget = self.memory.budget_bytes(),
            evicted,
            "memory governor"
        );
    }

    /// Loaded to unloaded: detach the chunk's stars and release its memory.
    fn evict(&mut self, id: ChunkId) -> bool {
        let Some(chunk) = self.chunks.get_mut(&id) else {
            return false;
        };
        let group = chunk.group();
        if let Err(error) = chunk.evict() {
            warn_transition(error);
            return false;
        }
        self.index.remove_group(group);
        self.memory.on_chunk_unloaded(&id);
        true
    }

    /// Replace every errored record with a fresh unloaded one. Returns the
    /// number requeued. They are queued on the next tick if still in range.
    pub fn requeue_errored(&mut self) -> usize {
        let now = Instant::now();
        let mut requeued = 0;
        for chunk in self.chunks.values_mut() {
            if chunk.state() == ChunkState::Error {
                *chunk = Chunk::new(chunk.id(), chunk.group(), now);
                requeued += 1;
            }
        }
        if requeued > 0 {
            tracing::debug!(requeued, "requeued errored chunks");
        }
        requeued
    }

    /// Drop all chunk state, pending work, and the spatial index.
    ///
    /// Responses still in flight are discarded when they arrive.
    pub fn teardown(&mut self) {
        self.tasks.clear();
        self.queue.clear();
        self.chunks.clear();
        self.memory.clear();
        self.index.clear();
        self.predictor.clear();
        self.loaded_this_tick.clear();
        self.last_creation = None;
        tracing::debug!("streaming loader torn down");
    }

    pub fn get_stats_snapshot(&self) -> StreamStats {
        let mut stats = StreamStats {
            queue_len: self.queue.len(),
            in_flight: self.tasks.len(),
            memory_bytes: self.memory.total_bytes(),
            memory_budget_bytes: self.memory.budget_bytes(),
            average_latency: self.latency.average(),
            max_latency: self.latency.max(),
            resident_stars: self.index.star_count(),
            ..self.totals.clone()
        };
        for chunk in self.chunks.values() {
            match chunk.state() {
                ChunkState::Unloaded => stats.unloaded += 1,
                ChunkState::Loading => stats.loading += 1,
                ChunkState::Loaded => stats.loaded += 1,
                ChunkState::Error => stats.errored += 1,
            }
        }
        stats
    }
}

fn chunk_edge(quality: &QualityPolicy) -> u32 {
    quality.chunk_size.round().max(1.0) as u32
}

fn score(
    selector: &LodSelector,
    bounds: &Aabb,
    position: Vec3,
    predicted: Vec3,
    quality: &QualityPolicy,
) -> (f64, u8) {
    let center = bounds.center();
    let lod = selector.select_lod(bounds.distance_to_point(position), quality.lod_distance_scale);
    let priority = compute_priority(&ChunkPriorityFactors {
        distance: f64::from(center.distance(position)),
        predicted_distance: f64::from(center.distance(predicted)),
        lod,
        aggressiveness: f64::from(quality.lod_aggressiveness),
    });
    (priority, lod)
}

fn warn_transition(error: ChunkError) {
    tracing::warn!(%error, "rejected chunk transition");
}
