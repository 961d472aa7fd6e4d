//! Configuration structs with defaults, RON persistence, and runtime conversion.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use starfield_guardrail::GuardrailConfig;
use starfield_lod::{LodThresholds, QualityPolicy, QualityTier};
use starfield_octree::{OctreeParams, SpatialIndexConfig};
use starfield_stream::{InlineExecutor, SampleExecutor, StreamConfig, WorkerPoolExecutor};
use starfield_universe::{SamplerParams, Universe};

use crate::error::ConfigError;

/// Top-level star field configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Region sampling settings.
    pub universe: UniverseSection,
    /// Spatial index settings.
    pub octree: OctreeSection,
    /// Chunk streaming settings.
    pub streaming: StreamingSection,
    /// Camera path validation settings.
    pub guardrail: GuardrailSection,
    /// Quality tier.
    pub quality: QualitySection,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Region sampling. The universe seed and star count are fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniverseSection {
    /// Upper bound on universe indices scanned per chunk.
    pub max_candidates: u64,
    /// Chunks sampling fewer stars than this are topped up with fillers.
    pub min_chunk_density: usize,
}

/// Octree and render-batch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OctreeSection {
    /// Leaf capacity before a split.
    pub max_stars_per_node: usize,
    /// Deepest allowed subdivision level.
    pub max_depth: u8,
    /// Minimum interval between rebuilds of one node's batch.
    pub batch_refresh_ms: u64,
    /// Strictly increasing LOD distance boundaries.
    pub lod_thresholds: Vec<f32>,
}

/// Chunk streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingSection {
    /// Load radius in chunks.
    pub load_radius_chunks: u32,
    /// Unload distance as a multiple of the load distance.
    pub unload_hysteresis: f32,
    /// Camera travel that triggers chunk creation.
    pub creation_distance_threshold: f32,
    /// Time after which chunk creation runs without travel.
    pub creation_cooldown_ms: u64,
    /// Maximum chunks sampling at once.
    pub max_concurrent_loads: usize,
    /// Per-load deadline.
    pub load_timeout_ms: u64,
    /// Memory budget for resident stars in MiB.
    pub memory_budget_mb: usize,
    /// Estimated resident cost of one star.
    pub bytes_per_star: usize,
    /// Camera samples kept for motion prediction.
    pub prediction_history: usize,
    /// How far ahead the predicted camera position looks.
    pub look_ahead_ms: u64,
    /// Sampling threads (0 = sample inline on the calling thread).
    pub worker_threads: usize,
}

/// Camera path validation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailSection {
    pub samples: usize,
    pub min_density: f32,
    pub density_probe_radius: f32,
    pub max_low_density_distance: f32,
    pub max_reroute_trials: usize,
    pub base_deviation: f32,
}

/// Quality tier selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualitySection {
    pub tier: QualityTier,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Loader ticks between stats reports in the demo.
    pub stats_interval_ticks: u64,
}

// --- Default implementations ---

impl Default for UniverseSection {
    fn default() -> Self {
        let params = SamplerParams::default();
        Self {
            max_candidates: params.max_candidates,
            min_chunk_density: params.min_density,
        }
    }
}

impl Default for OctreeSection {
    fn default() -> Self {
        let index = SpatialIndexConfig::default();
        Self {
            max_stars_per_node: index.octree.max_stars_per_node,
            max_depth: index.octree.max_depth,
            batch_refresh_ms: index.batch_refresh_interval.as_millis() as u64,
            lod_thresholds: index.lod_thresholds.thresholds().to_vec(),
        }
    }
}

impl Default for StreamingSection {
    fn default() -> Self {
        let stream = StreamConfig::default();
        Self {
            load_radius_chunks: stream.load_radius_chunks,
            unload_hysteresis: stream.unload_hysteresis,
            creation_distance_threshold: stream.creation_distance_threshold,
            creation_cooldown_ms: stream.creation_cooldown.as_millis() as u64,
            max_concurrent_loads: stream.max_concurrent_loads,
            load_timeout_ms: stream.load_timeout.as_millis() as u64,
            memory_budget_mb: stream.memory_budget_bytes / (1024 * 1024),
            bytes_per_star: stream.bytes_per_star,
            prediction_history: stream.prediction_history,
            look_ahead_ms: stream.look_ahead.as_millis() as u64,
            worker_threads: 0,
        }
    }
}

impl Default for GuardrailSection {
    fn default() -> Self {
        let g = GuardrailConfig::default();
        Self {
            samples: g.samples,
            min_density: g.min_density,
            density_probe_radius: g.density_probe_radius,
            max_low_density_distance: g.max_low_density_distance,
            max_reroute_trials: g.max_reroute_trials,
            base_deviation: g.base_deviation,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_ticks: 30,
        }
    }
}

// --- Runtime conversion ---

impl UniverseSection {
    pub fn sampler_params(&self) -> SamplerParams {
        SamplerParams {
            max_candidates: self.max_candidates.max(1),
            min_density: self.min_chunk_density,
        }
    }
}

impl OctreeSection {
    /// LOD thresholds, or the defaults when the configured list is unusable.
    pub fn thresholds(&self) -> LodThresholds {
        LodThresholds::try_new(self.lod_thresholds.clone()).unwrap_or_else(|| {
            log::warn!(
                "Ignoring invalid lod_thresholds {:?}, using defaults",
                self.lod_thresholds
            );
            LodThresholds::default_starfield()
        })
    }

    pub fn index_config(&self) -> SpatialIndexConfig {
        SpatialIndexConfig {
            octree: OctreeParams {
                max_stars_per_node: self.max_stars_per_node.max(1),
                max_depth: self.max_depth,
            },
            batch_refresh_interval: Duration::from_millis(self.batch_refresh_ms),
            lod_thresholds: self.thresholds(),
        }
    }
}

impl GuardrailSection {
    pub fn guardrail_config(&self) -> GuardrailConfig {
        GuardrailConfig {
            samples: self.samples,
            min_density: self.min_density,
            density_probe_radius: self.density_probe_radius,
            max_low_density_distance: self.max_low_density_distance,
            max_reroute_trials: self.max_reroute_trials,
            base_deviation: self.base_deviation,
        }
    }
}

impl QualitySection {
    pub fn policy(&self) -> QualityPolicy {
        QualityPolicy::for_tier(self.tier)
    }
}

impl Config {
    /// Loader configuration over the canonical universe.
    pub fn stream_config(&self) -> StreamConfig {
        let s = &self.streaming;
        StreamConfig {
            universe: Universe::canonical(),
            sampler: self.universe.sampler_params(),
            index: self.octree.index_config(),
            load_radius_chunks: s.load_radius_chunks,
            unload_hysteresis: s.unload_hysteresis,
            creation_distance_threshold: s.creation_distance_threshold,
            creation_cooldown: Duration::from_millis(s.creation_cooldown_ms),
            max_concurrent_loads: s.max_concurrent_loads,
            load_timeout: Duration::from_millis(s.load_timeout_ms),
            memory_budget_bytes: s.memory_budget_mb.saturating_mul(1024 * 1024),
            bytes_per_star: s.bytes_per_star,
            prediction_history: s.prediction_history,
            look_ahead: Duration::from_millis(s.look_ahead_ms),
            ..StreamConfig::default()
        }
    }

    /// The sampling executor selected by `streaming.worker_threads`.
    pub fn executor(&self) -> Box<dyn SampleExecutor> {
        match self.streaming.worker_threads {
            0 => Box::new(InlineExecutor::new()),
            n => Box::new(WorkerPoolExecutor::new(n)),
        }
    }
}

// --- Load / Save / Reload ---

/// `explicit` if given, otherwise the platform's `starfield` config directory.
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    explicit
        .or_else(|| dirs::config_dir().map(|dir| dir.join("starfield")))
        .ok_or(ConfigError::NoConfigDir)
}

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Defaults serialize to readable RON.
    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_candidates: 50000"));
        assert!(ron_str.contains("tier: Medium"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.quality.tier = QualityTier::Ultra;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    /// A missing section falls back to its defaults.
    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(universe: (max_candidates: 10), quality: (tier: Low))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.universe.max_candidates, 10);
        assert_eq!(config.universe.min_chunk_density, 150);
        assert_eq!(config.streaming, StreamingSection::default());
        assert_eq!(config.quality.tier, QualityTier::Low);
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    /// Section defaults agree with the library defaults.
    #[test]
    fn test_defaults_match_runtime() {
        let config = Config::default();
        let stream = config.stream_config();
        let base = StreamConfig::default();
        assert_eq!(stream.memory_budget_bytes, base.memory_budget_bytes);
        assert_eq!(stream.load_timeout, base.load_timeout);
        assert_eq!(stream.sampler, base.sampler);
        assert_eq!(stream.index.lod_thresholds, base.index.lod_thresholds);
        assert_eq!(stream.universe, Universe::canonical());
        assert_eq!(config.guardrail.guardrail_config(), GuardrailConfig::default());
        assert_eq!(config.quality.policy(), QualityPolicy::for_tier(QualityTier::Medium));
    }

    /// Bad thresholds fall back instead of panicking.
    #[test]
    fn test_invalid_thresholds_fall_back() {
        let mut section = OctreeSection::default();
        section.lod_thresholds = vec![5.0, 1.0];
        assert_eq!(section.thresholds(), LodThresholds::default_starfield());
        section.lod_thresholds = vec![];
        assert_eq!(section.thresholds(), LodThresholds::default_starfield());
        section.lod_thresholds = vec![100.0, 200.0];
        assert_eq!(section.thresholds().thresholds(), &[100.0, 200.0]);
    }

    /// Zero worker threads samples inline.
    #[test]
    fn test_executor_selection() {
        let mut config = Config::default();
        assert_eq!(config.executor().name(), "inline");
        config.streaming.worker_threads = 2;
        assert_eq!(config.executor().name(), "worker-pool");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.streaming.memory_budget_mb = 64;
        config.guardrail.samples = 80;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    /// A missing file is created with defaults.
    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.quality.tier = QualityTier::High;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().quality.tier, QualityTier::High);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    /// An explicit directory wins over the platform default.
    #[test]
    fn test_resolve_explicit_dir() {
        let dir = PathBuf::from("/tmp/starfield-test");
        assert_eq!(resolve_config_dir(Some(dir.clone())).unwrap(), dir);
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
