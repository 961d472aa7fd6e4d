//! The deterministic universe: every star is a pure function of `(index, seed)`.
//!
//! Nothing here holds state beyond three constants, and every query is O(1),
//! so the N stars are never materialized.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use starfield_math::Aabb;

use crate::palette::color_for;
use crate::seed::{derive_star_seed, position_key};
use crate::star::{StarId, StarRecord};

/// Number of stars in the universe: C(49, 6) × 10.
pub const UNIVERSE_STAR_COUNT: u64 = 139_838_160;

/// Fixed universe seed.
pub const UNIVERSE_SEED: u64 = 0x57A2_F1E1_D000_0001;

/// Edge length of the cubic universe, centered on the origin.
pub const UNIVERSE_EXTENT: f32 = 1_000_000.0;

/// Errors from universe queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    /// The index lies outside `[1, max]`.
    #[error("star index {index} outside [1, {max}]")]
    OutOfRange { index: u64, max: u64 },
}

/// Parameters of a deterministic universe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Universe {
    star_count: u64,
    seed: u64,
    extent: f32,
}

impl Default for Universe {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Universe {
    /// The universe the application ships: fixed count, seed, and extent.
    pub const fn canonical() -> Self {
        Self::new(UNIVERSE_STAR_COUNT, UNIVERSE_SEED, UNIVERSE_EXTENT)
    }

    /// A universe with custom parameters (smaller test universes, alternate seeds).
    pub const fn new(star_count: u64, seed: u64, extent: f32) -> Self {
        Self {
            star_count,
            seed,
            extent,
        }
    }

    pub fn star_count(&self) -> u64 {
        self.star_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// The cube containing every universe star.
    pub fn bounds(&self) -> Aabb {
        Aabb::centered_cube(self.extent)
    }

    /// Volume of [`Universe::bounds`] in cubic world units.
    pub fn volume(&self) -> f64 {
        let e = self.extent as f64;
        e * e * e
    }

    fn check_index(&self, index: u64) -> Result<(), UniverseError> {
        if index == 0 || index > self.star_count {
            return Err(UniverseError::OutOfRange {
                index,
                max: self.star_count,
            });
        }
        Ok(())
    }

    /// Position of star `index`.
    pub fn position(&self, index: u64) -> Result<Vec3, UniverseError> {
        self.check_index(index)?;
        let mut rng = ChaCha8Rng::seed_from_u64(derive_star_seed(self.seed, index));
        Ok(draw_position(&mut rng, self.extent))
    }

    /// Full record of star `index`.
    pub fn star(&self, index: u64) -> Result<StarRecord, UniverseError> {
        self.check_index(index)?;
        let mut rng = ChaCha8Rng::seed_from_u64(derive_star_seed(self.seed, index));
        let position = draw_position(&mut rng, self.extent);
        Ok(draw_attributes(&mut rng, StarId::Universe(index), position))
    }
}

/// Position of star `index` in the canonical universe under `seed`.
pub fn get_position(index: u64, seed: u64) -> Result<Vec3, UniverseError> {
    Universe::new(UNIVERSE_STAR_COUNT, seed, UNIVERSE_EXTENT).position(index)
}

/// Uniform position in the origin-centered cube of edge `extent`.
pub(crate) fn draw_position(rng: &mut ChaCha8Rng, extent: f32) -> Vec3 {
    let x: f32 = rng.random();
    let y: f32 = rng.random();
    let z: f32 = rng.random();
    (Vec3::new(x, y, z) - Vec3::splat(0.5)) * extent
}

/// Size, intensity, and color for a star already placed at `position`.
///
/// Power-law brightness: many dim stars, few bright ones.
pub(crate) fn draw_attributes(rng: &mut ChaCha8Rng, id: StarId, position: Vec3) -> StarRecord {
    let raw: f32 = rng.random();
    let intensity = libm::powf(raw, 4.0).clamp(0.0, 1.0);
    StarRecord {
        id,
        position,
        color: color_for(position_key(position)),
        size: 0.5 + intensity * 2.5,
        intensity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Repeated lookups of one index return bit-identical positions.
    #[test]
    fn test_position_repeatable_small_universe() {
        let universe = Universe::new(1_000, 7, UNIVERSE_EXTENT);
        let first = universe.position(500).unwrap();
        for _ in 0..100 {
            let again = universe.position(500).unwrap();
            assert_eq!(first.to_array().map(f32::to_bits), again.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn test_get_position_matches_universe() {
        let universe = Universe::new(UNIVERSE_STAR_COUNT, 99, UNIVERSE_EXTENT);
        assert_eq!(get_position(12_345, 99), universe.position(12_345));
    }

    #[test]
    fn test_index_zero_is_out_of_range() {
        let universe = Universe::canonical();
        assert_eq!(
            universe.position(0),
            Err(UniverseError::OutOfRange {
                index: 0,
                max: UNIVERSE_STAR_COUNT
            })
        );
    }

    #[test]
    fn test_index_past_n_is_out_of_range() {
        let universe = Universe::new(1_000, 7, UNIVERSE_EXTENT);
        assert!(universe.position(1_000).is_ok());
        assert!(matches!(
            universe.star(1_001),
            Err(UniverseError::OutOfRange { index: 1_001, max: 1_000 })
        ));
    }

    #[test]
    fn test_positions_inside_bounds() {
        let universe = Universe::canonical();
        let bounds = universe.bounds();
        for index in (1..UNIVERSE_STAR_COUNT).step_by(1_398_381) {
            let p = universe.position(index).unwrap();
            assert!(bounds.contains_point(p), "star {index} at {p} escaped");
        }
    }

    #[test]
    fn test_star_position_matches_position() {
        let universe = Universe::canonical();
        for index in [1, 2, 1_000, UNIVERSE_STAR_COUNT] {
            let star = universe.star(index).unwrap();
            assert_eq!(star.id, StarId::Universe(index));
            assert_eq!(Ok(star.position), universe.position(index));
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = Universe::new(1_000, 1, UNIVERSE_EXTENT);
        let b = Universe::new(1_000, 2, UNIVERSE_EXTENT);
        let differing = (1..=100)
            .filter(|&i| a.position(i).unwrap() != b.position(i).unwrap())
            .count();
        assert!(differing > 95);
    }

    #[test]
    fn test_brightness_distribution_skews_dim() {
        let universe = Universe::canonical();
        let stars: Vec<_> = (1..=5_000).map(|i| universe.star(i).unwrap()).collect();
        let dim = stars.iter().filter(|s| s.intensity < 0.1).count();
        let bright = stars.iter().filter(|s| s.intensity > 0.5).count();
        assert!(dim > bright * 3, "dim {dim} vs bright {bright}");
        for star in &stars {
            assert!((0.0..=1.0).contains(&star.intensity));
            assert!(star.size >= 0.5 && star.size <= 3.0);
        }
    }
}
