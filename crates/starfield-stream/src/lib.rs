//! Chunk streaming: lifecycle tracking, predictive prioritization, bounded
//! concurrent sampling, hysteresis unloading, and memory-budget eviction.

mod chunk;
mod executor;
mod loader;
mod predictor;
mod stats;

pub use chunk::{Chunk, ChunkError, ChunkId, ChunkState};
pub use executor::{
    InlineExecutor, LoadError, RequestId, SampleExecutor, SampleRequest, SampleResponse,
    WorkerPoolExecutor,
};
pub use loader::{LoadingTask, StreamConfig, StreamingLoader};
pub use predictor::CameraPredictor;
pub use stats::{LatencyTracker, StreamStats};
