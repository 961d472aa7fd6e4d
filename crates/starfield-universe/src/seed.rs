//! Seed derivation for per-star and per-region random streams.
//!
//! Everything here is integer-only so derived seeds are bit-identical on
//! every platform and toolchain.

use starfield_math::Aabb;

/// Splitmix64 finalizer: a fast, well-distributed 64-bit mixing step.
#[inline]
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Derive the RNG seed for universe star `index`.
#[inline]
pub fn derive_star_seed(seed: u64, index: u64) -> u64 {
    splitmix64(seed ^ splitmix64(index))
}

/// Derive the RNG seed for filler stars of a region from its exact bounds.
///
/// Uses the raw float bits, so two boxes differing in one ULP get unrelated fillers.
pub fn derive_region_seed(seed: u64, bounds: &Aabb) -> u64 {
    let coords = [
        bounds.min.x,
        bounds.min.y,
        bounds.min.z,
        bounds.max.x,
        bounds.max.y,
        bounds.max.z,
    ];
    coords
        .iter()
        .fold(splitmix64(seed ^ 0xf111_e4f1_11e4_f111), |acc, c| {
            splitmix64(acc ^ u64::from(c.to_bits()))
        })
}

/// Integer key derived from a position, used to seed categorical choices.
pub fn position_key(p: glam::Vec3) -> u64 {
    let xy = u64::from(p.x.to_bits()) | (u64::from(p.y.to_bits()) << 32);
    splitmix64(xy) ^ splitmix64(u64::from(p.z.to_bits()).rotate_left(17))
}
