//! Command-line argument parsing for the star field demo.

use std::path::PathBuf;

use clap::Parser;
use starfield_lod::QualityTier;

use crate::Config;

fn parse_tier(s: &str) -> Result<QualityTier, String> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(QualityTier::Low),
        "medium" => Ok(QualityTier::Medium),
        "high" => Ok(QualityTier::High),
        "ultra" => Ok(QualityTier::Ultra),
        other => Err(format!("unknown quality tier '{other}'")),
    }
}

/// Star field command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "starfield", about = "Deterministic star field streaming demo")]
pub struct CliArgs {
    /// Quality tier (low, medium, high, ultra).
    #[arg(long, value_parser = parse_tier)]
    pub quality: Option<QualityTier>,

    /// Memory budget for resident stars in MiB.
    #[arg(long)]
    pub memory_budget_mb: Option<usize>,

    /// Sampling threads (0 = inline).
    #[arg(long)]
    pub worker_threads: Option<usize>,

    /// Number of loader ticks to simulate.
    #[arg(long, default_value_t = 240)]
    pub ticks: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(tier) = args.quality {
            self.quality.tier = tier;
        }
        if let Some(mb) = args.memory_budget_mb {
            self.streaming.memory_budget_mb = mb;
        }
        if let Some(n) = args.worker_threads {
            self.streaming.worker_threads = n;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
