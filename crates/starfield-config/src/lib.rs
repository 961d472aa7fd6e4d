//! Configuration for the star field runtime.
//!
//! Settings persist to disk as `config.ron`, tolerate missing or unknown
//! fields, and accept CLI overrides. Each section converts into the runtime
//! config of the crate it tunes.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, GuardrailSection, OctreeSection, QualitySection, StreamingSection,
    UniverseSection, resolve_config_dir,
};
pub use error::ConfigError;
