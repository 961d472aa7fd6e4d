//! Chunk sampling executors.
//!
//! The loader hands [`SampleRequest`]s to a [`SampleExecutor`] and polls for
//! [`SampleResponse`]s once per tick. Requests and responses are plain data,
//! so workers never touch the octree or the chunk table.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use starfield_math::Aabb;
use starfield_universe::{ChunkSampler, StarRecord};
use thiserror::Error;

use crate::chunk::ChunkId;

/// Correlates a response with the request that produced it.
pub type RequestId = u64;

/// Why a chunk failed to load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("sampling chunk {chunk} exceeded its {timeout:?} deadline")]
    SamplingTimeout { chunk: ChunkId, timeout: Duration },
    #[error("sampling worker failed: {0}")]
    WorkerFailed(String),
    #[error("sample executor disconnected")]
    ExecutorDisconnected,
}

/// One chunk to sample.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub request_id: RequestId,
    pub chunk: ChunkId,
    pub bounds: Aabb,
    pub sampler: ChunkSampler,
}

impl SampleRequest {
    /// Run the sampler on the calling thread, turning a panic into an error.
    pub fn run(&self) -> SampleResponse {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.sampler.get_stars_in_bounds(&self.bounds)
        }))
        .map_err(|payload| LoadError::WorkerFailed(panic_message(payload.as_ref())));
        SampleResponse {
            request_id: self.request_id,
            chunk: self.chunk,
            result,
            elapsed: start.elapsed(),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "sampler panicked".to_owned()
    }
}

/// Outcome of one [`SampleRequest`].
#[derive(Debug, Clone)]
pub struct SampleResponse {
    pub request_id: RequestId,
    pub chunk: ChunkId,
    pub result: Result<Vec<StarRecord>, LoadError>,
    /// Time spent sampling, excluding queueing.
    pub elapsed: Duration,
}

/// Where chunk sampling runs.
pub trait SampleExecutor: Send {
    /// Queue a request. Never blocks on the sampling itself.
    fn submit(&mut self, request: SampleRequest) -> Result<(), LoadError>;

    /// Every response that finished since the last call.
    fn drain_completed(&mut self) -> Vec<SampleResponse>;

    fn name(&self) -> &'static str;
}

/// Samples synchronously inside `submit`. Results are handed out on the next
/// drain, so the loader sees the same timing shape as with a pool.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    completed: Vec<SampleResponse>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleExecutor for InlineExecutor {
    fn submit(&mut self, request: SampleRequest) -> Result<(), LoadError> {
        self.completed.push(request.run());
        Ok(())
    }

    fn drain_completed(&mut self) -> Vec<SampleResponse> {
        mem::take(&mut self.completed)
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

/// Samples on a fixed pool of background threads.
pub struct WorkerPoolExecutor {
    request_sender: Sender<SampleRequest>,
    response_receiver: Receiver<SampleResponse>,
    thread_count: usize,
}

impl WorkerPoolExecutor {
    /// Spawn `thread_count` workers (at least one).
    pub fn new(thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        let (request_sender, request_receiver) = unbounded::<SampleRequest>();
        let (response_sender, response_receiver) = unbounded::<SampleResponse>();

        for i in 0..thread_count {
            let receiver = request_receiver.clone();
            let sender = response_sender.clone();
            std::thread::Builder::new()
                .name(format!("starfield-sampler-{i}"))
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        if sender.send(request.run()).is_err() {
                            break;
                        }
                    }
                })
                .expect("Failed to spawn chunk sampling worker thread");
        }

        Self {
            request_sender,
            response_receiver,
            thread_count,
        }
    }

    /// Leave two cores for the tick and the renderer.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 2).max(1))
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }
}

impl SampleExecutor for WorkerPoolExecutor {
    fn submit(&mut self, request: SampleRequest) -> Result<(), LoadError> {
        self.request_sender
            .send(request)
            .map_err(|_| LoadError::ExecutorDisconnected)
    }

    fn drain_completed(&mut self) -> Vec<SampleResponse> {
        let mut responses = Vec::new();
        loop {
            match self.response_receiver.try_recv() {
                Ok(response) => responses.push(response),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("all sampling workers have exited");
                    break;
                }
            }
        }
        responses
    }

    fn name(&self) -> &'static str {
        "worker-pool"
    }
}
