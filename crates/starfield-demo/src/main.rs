//! Headless demo that flies a scripted camera through the canonical universe.
//!
//! Each leg of the flight is validated by the path guardrail against the
//! stars streamed in so far, then flown tick by tick while the streaming
//! loader keeps chunks resident around the camera.
//!
//! Run with `cargo run -p starfield-demo -- --ticks 600 --quality high`.

use std::error::Error;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3;
use starfield_config::{CliArgs, Config, resolve_config_dir};
use starfield_guardrail::{CameraState, PathGuardrail, PathOutcome};
use starfield_lod::QualityPolicy;
use starfield_stream::StreamingLoader;
use tracing::info;

/// Simulated frame time.
const FRAME: Duration = Duration::from_millis(16);

/// Ticks spent settling before the first leg is planned.
const WARMUP_TICKS: u64 = 12;

/// Ticks spent flying each leg.
const TICKS_PER_LEG: u64 = 60;

/// Closed tour of camera keyframes near the origin.
fn tour() -> Vec<CameraState> {
    let fov = 60f32.to_radians();
    [
        (Vec3::new(0.0, 0.0, 0.0), Vec3::new(3_000.0, 0.0, 0.0)),
        (Vec3::new(3_000.0, 0.0, 0.0), Vec3::new(3_000.0, 0.0, 3_000.0)),
        (Vec3::new(3_000.0, 500.0, 3_000.0), Vec3::new(0.0, 500.0, 3_000.0)),
        (Vec3::new(0.0, 0.0, 3_000.0), Vec3::new(0.0, 0.0, 0.0)),
    ]
    .into_iter()
    .map(|(position, target)| CameraState::new(position, target, fov))
    .collect()
}

struct Flight {
    loader: StreamingLoader,
    quality: QualityPolicy,
    start: Instant,
    tick: u64,
    stats_interval: u64,
}

impl Flight {
    fn step(&mut self, state: &CameraState) {
        let now = self.start + FRAME * self.tick as u32;
        self.loader.update_at(&state.to_pose(), &self.quality, now);
        self.tick += 1;
        if self.tick % self.stats_interval != 0 {
            return;
        }

        let stats = self.loader.get_stats_snapshot();
        info!(
            tick = self.tick,
            loaded = stats.loaded,
            loading = stats.loading,
            errored = stats.errored,
            resident_stars = stats.resident_stars,
            memory_mb = stats.memory_bytes / (1024 * 1024),
            avg_latency_ms = stats.average_latency.as_secs_f64() * 1_000.0,
            visible = self.loader.get_visible_nodes().len(),
            "stream stats"
        );
        if stats.errored > 0 {
            let requeued = self.loader.requeue_errored();
            info!(requeued, "requeued errored chunks");
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_dir = resolve_config_dir(args.config.clone())?;

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    starfield_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let quality = config.quality.policy();
    let guardrail_config = config.guardrail.guardrail_config();
    let loader = StreamingLoader::new(config.stream_config(), config.executor());
    info!(
        executor = loader.executor_name(),
        tier = ?quality.tier,
        chunk_size = quality.chunk_size,
        ticks = args.ticks,
        "starting star field flight"
    );

    let mut flight = Flight {
        loader,
        quality,
        start: Instant::now(),
        tick: 0,
        stats_interval: config.debug.stats_interval_ticks.max(1),
    };
    let keyframes = tour();

    for _ in 0..WARMUP_TICKS.min(args.ticks) {
        flight.step(&keyframes[0]);
    }

    let mut leg = 0usize;
    let mut rerouted = 0usize;
    let mut fallbacks = 0usize;
    while flight.tick < args.ticks {
        let from = keyframes[leg % keyframes.len()];
        let to = keyframes[(leg + 1) % keyframes.len()];

        let plan = PathGuardrail::new(flight.loader.spatial_index(), guardrail_config)
            .adjust_path(&from, &to);
        match plan.outcome() {
            PathOutcome::Direct => {}
            PathOutcome::Rerouted { trial } => {
                rerouted += 1;
                info!(leg, trial, length = plan.length(), "leg rerouted");
            }
            PathOutcome::Fallback => fallbacks += 1,
        }

        let leg_ticks = TICKS_PER_LEG.min(args.ticks - flight.tick);
        for i in 0..leg_ticks {
            let t = (i + 1) as f32 / TICKS_PER_LEG as f32;
            flight.step(&plan.sample(t));
        }
        leg += 1;
    }

    let mut loader = flight.loader;
    let stats = loader.get_stats_snapshot();
    info!(
        ticks = stats.ticks,
        legs = leg,
        rerouted,
        fallbacks,
        chunks_created = stats.chunks_created,
        loads_succeeded = stats.loads_succeeded,
        load_errors = stats.load_errors,
        chunks_unloaded = stats.chunks_unloaded,
        chunks_evicted = stats.chunks_evicted,
        max_latency_ms = stats.max_latency.as_secs_f64() * 1_000.0,
        "flight complete"
    );

    loader.teardown();
    Ok(())
}
