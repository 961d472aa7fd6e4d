//! Categorical star colors derived from blackbody temperatures.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Palette entries in Kelvin, roughly M through O spectral classes.
pub const PALETTE_TEMPERATURES: [f32; 8] = [
    2_800.0, 3_600.0, 4_500.0, 5_200.0, 5_900.0, 7_400.0, 10_000.0, 25_000.0,
];

/// Pick a palette color for a position-derived integer key.
///
/// Seeds the same generator as star placement, so the choice is a pure
/// function of `key`.
pub fn color_for(key: u64) -> [f32; 3] {
    let mut rng = ChaCha8Rng::seed_from_u64(key);
    let slot = rng.random_range(0..PALETTE_TEMPERATURES.len());
    blackbody_to_rgb(PALETTE_TEMPERATURES[slot])
}

/// Convert a blackbody temperature in Kelvin to an approximate sRGB color.
///
/// Uses a simplified Planckian locus approximation (Tanner Helland algorithm),
/// evaluated through `libm` for bit-identical results across platforms.
pub fn blackbody_to_rgb(temperature_k: f32) -> [f32; 3] {
    let t = temperature_k / 100.0;
    let r = if t <= 66.0 {
        1.0
    } else {
        (329.698_73 * libm::powf(t - 60.0, -0.133_204_76) / 255.0).clamp(0.0, 1.0)
    };
    let g = if t <= 66.0 {
        (99.470_8 * libm::logf(t) - 161.119_57).clamp(0.0, 255.0) / 255.0
    } else {
        (288.122_17 * libm::powf(t - 60.0, -0.075_514_85) / 255.0).clamp(0.0, 1.0)
    };
    let b = if t >= 66.0 {
        1.0
    } else if t <= 19.0 {
        0.0
    } else {
        (138.517_73 * libm::logf(t - 10.0) - 305.044_8).clamp(0.0, 255.0) / 255.0
    };
    [r, g, b]
}
