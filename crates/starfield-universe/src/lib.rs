//! Deterministic universe: star identity, position, and attributes as a pure
//! function of `(index, seed)`, plus bounded-latency sampling of spatial regions.

mod palette;
mod sampler;
mod seed;
mod star;
mod universe;

pub use palette::{PALETTE_TEMPERATURES, blackbody_to_rgb, color_for};
pub use sampler::{ChunkSampler, DEFAULT_MAX_CANDIDATES, DEFAULT_MIN_DENSITY, SamplerParams};
pub use seed::{derive_region_seed, derive_star_seed, position_key, splitmix64};
pub use star::{StarId, StarRecord};
pub use universe::{
    UNIVERSE_EXTENT, UNIVERSE_SEED, UNIVERSE_STAR_COUNT, Universe, UniverseError, get_position,
};
