//! Distance buckets for star batches.

/// Ascending distance boundaries. Distances below `bounds[k]` (and at or above
/// `bounds[k - 1]`) map to LOD `k`; anything past the last bound is the
/// coarsest LOD, `bounds.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct LodThresholds {
    bounds: Vec<f32>,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self::default_starfield()
    }
}

impl LodThresholds {
    /// 2k, 5k, 10k, 20k world units.
    pub fn default_starfield() -> Self {
        Self {
            bounds: vec![2_000.0, 5_000.0, 10_000.0, 20_000.0],
        }
    }

    /// `None` unless `bounds` is non-empty, finite, positive, strictly
    /// ascending, and short enough for a `u8` LOD.
    pub fn try_new(bounds: Vec<f32>) -> Option<Self> {
        let ascending = bounds.windows(2).all(|w| w[0] < w[1]);
        let usable = bounds.iter().all(|b| b.is_finite() && *b > 0.0);
        (!bounds.is_empty() && bounds.len() < usize::from(u8::MAX) && ascending && usable)
            .then_some(Self { bounds })
    }

    /// The coarsest LOD.
    pub fn max_lod(&self) -> u8 {
        self.bounds.len() as u8
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.bounds
    }
}

/// Maps camera distance to an LOD, stretched by a quality scale.
#[derive(Clone, Debug)]
pub struct LodSelector {
    thresholds: LodThresholds,
}

impl LodSelector {
    pub fn new(thresholds: LodThresholds) -> Self {
        Self { thresholds }
    }

    /// LOD at `distance` with every bound multiplied by `scale`. NaN distances
    /// map to the coarsest LOD.
    pub fn select_lod(&self, distance: f32, scale: f32) -> u8 {
        let scale = scale.max(f32::EPSILON);
        let lod = self
            .thresholds
            .bounds
            .iter()
            .take_while(|&&bound| distance >= bound * scale || distance.is_nan())
            .count();
        lod as u8
    }

    /// Batch decimation for `lod`: keep one star in every `2^lod`.
    pub fn stride_for_lod(lod: u8) -> usize {
        1usize << lod.min(16)
    }

    pub fn thresholds(&self) -> &LodThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> LodSelector {
        LodSelector::new(LodThresholds::default_starfield())
    }

    /// Bucket edges are half-open: a bound belongs to the coarser bucket.
    #[test]
    fn test_bucket_edges() {
        let s = selector();
        assert_eq!(s.select_lod(0.0, 1.0), 0);
        assert_eq!(s.select_lod(1_999.0, 1.0), 0);
        assert_eq!(s.select_lod(2_000.0, 1.0), 1);
        assert_eq!(s.select_lod(9_999.0, 1.0), 2);
        assert_eq!(s.select_lod(20_000.0, 1.0), 4);
        assert_eq!(s.select_lod(f32::MAX, 1.0), s.thresholds().max_lod());
    }

    /// Higher quality scales push every bound outward.
    #[test]
    fn test_scale_stretches_buckets() {
        let s = selector();
        assert_eq!(s.select_lod(3_000.0, 0.5), 2);
        assert_eq!(s.select_lod(3_000.0, 1.0), 1);
        assert_eq!(s.select_lod(3_000.0, 2.0), 0);
        // Degenerate scales clamp instead of dividing the world into LOD 0.
        assert_eq!(s.select_lod(1.0, 0.0), 4);
    }

    /// Farther never means finer.
    #[test]
    fn test_lod_non_decreasing() {
        let s = selector();
        let lods: Vec<u8> = (0..60).map(|i| s.select_lod(i as f32 * 500.0, 1.5)).collect();
        assert!(lods.windows(2).all(|w| w[0] <= w[1]), "{lods:?}");
    }

    #[test]
    fn test_nan_is_coarsest() {
        assert_eq!(selector().select_lod(f32::NAN, 1.0), 4);
    }

    #[test]
    fn test_stride_doubles() {
        assert_eq!(LodSelector::stride_for_lod(0), 1);
        assert_eq!(LodSelector::stride_for_lod(2), 4);
        assert_eq!(LodSelector::stride_for_lod(40), 1 << 16);
    }

    /// Unusable bound lists are rejected.
    #[test]
    fn test_try_new_validation() {
        assert!(LodThresholds::try_new(vec![]).is_none());
        assert!(LodThresholds::try_new(vec![100.0, 50.0]).is_none());
        assert!(LodThresholds::try_new(vec![100.0, 100.0]).is_none());
        assert!(LodThresholds::try_new(vec![-1.0, 10.0]).is_none());
        assert!(LodThresholds::try_new(vec![1.0, f32::INFINITY]).is_none());
        let t = LodThresholds::try_new(vec![10.0, 20.0]).unwrap();
        assert_eq!(t.max_lod(), 2);
    }
}
