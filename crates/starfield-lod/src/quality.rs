//! Quality tier policy injected by the host each tick.
//!
//! Choosing the tier (frame-time heuristics, device probing) happens outside
//! this workspace; the streaming and culling code only reads the scaled values.

use serde::{Deserialize, Serialize};

/// Discrete quality tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

/// Values derived from a [`QualityTier`] that scale chunking, density, and LOD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPolicy {
    pub tier: QualityTier,
    /// Edge length of a streaming chunk in world units.
    pub chunk_size: f32,
    /// Multiplier applied to the minimum per-chunk star density.
    pub star_count_multiplier: f32,
    /// Multiplier applied to every LOD distance threshold.
    pub lod_distance_scale: f32,
    /// Nodes farther than this are culled regardless of frustum.
    pub max_view_distance: f32,
    /// How eagerly detail is traded for load speed. Raises chunk priority.
    pub lod_aggressiveness: f32,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self::for_tier(QualityTier::default())
    }
}

impl QualityPolicy {
    /// The canonical policy for a tier.
    pub fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Low => Self {
                tier,
                chunk_size: 4_000.0,
                star_count_multiplier: 0.5,
                lod_distance_scale: 0.5,
                max_view_distance: 15_000.0,
                lod_aggressiveness: 1.0,
            },
            QualityTier::Medium => Self {
                tier,
                chunk_size: 2_000.0,
                star_count_multiplier: 1.0,
                lod_distance_scale: 1.0,
                max_view_distance: 25_000.0,
                lod_aggressiveness: 0.5,
            },
            QualityTier::High => Self {
                tier,
                chunk_size: 2_000.0,
                star_count_multiplier: 1.5,
                lod_distance_scale: 1.5,
                max_view_distance: 40_000.0,
                lod_aggressiveness: 0.25,
            },
            QualityTier::Ultra => Self {
                tier,
                chunk_size: 1_000.0,
                star_count_multiplier: 2.0,
                lod_distance_scale: 2.0,
                max_view_distance: 60_000.0,
                lod_aggressiveness: 0.0,
            },
        }
    }

    /// Scale a base star count by the tier multiplier, never below one.
    pub fn scaled_star_count(&self, base: usize) -> usize {
        ((base as f32 * self.star_count_multiplier).round() as usize).max(1)
    }
}
