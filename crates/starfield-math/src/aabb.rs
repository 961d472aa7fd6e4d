use glam::Vec3;

/// Axis-aligned bounding box in f32 world space.
///
/// Invariant: `min <= max` on every axis. [`Aabb::new`] sorts the corners.
/// Containment is inclusive on every face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB from a center point and half-extents.
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self::new(center - half, center + half)
    }

    /// A cube of edge `extent` centered on the origin.
    pub fn centered_cube(extent: f32) -> Self {
        Self::from_center_half_extents(Vec3::ZERO, Vec3::splat(extent * 0.5))
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half-size along each axis).
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns the size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Volume in cubic world units, computed in f64 so astronomical boxes do not overflow.
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x as f64 * s.y as f64 * s.z as f64
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Returns true if this AABB overlaps `other` (touching faces count).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns true if the interiors overlap (shared faces do not count).
    pub fn overlaps_interior(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Euclidean distance from `p` to the closest point of the box (0 inside).
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        p.clamp(self.min, self.max).distance(p)
    }

    /// Octant index of `p` relative to the center: bit 0 = +X, bit 1 = +Y, bit 2 = +Z.
    ///
    /// A coordinate exactly on the center plane goes to the upper octant, so
    /// every point maps to exactly one child even though child boxes share faces.
    pub fn octant_of(&self, p: Vec3) -> usize {
        let c = self.center();
        (p.x >= c.x) as usize | (((p.y >= c.y) as usize) << 1) | (((p.z >= c.z) as usize) << 2)
    }

    /// The bounds of octant `index` as produced by [`Aabb::octant_of`].
    pub fn octant(&self, index: usize) -> Aabb {
        let c = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit != 0 { (mid, hi) } else { (lo, mid) }
        };
        let (x0, x1) = pick(1, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, c.z, self.max.z);
        Aabb {
            min: Vec3::new(x0, y0, z0),
            max: Vec3::new(x1, y1, z1),
        }
    }

    /// Split into eight equal octants, indexed like [`Aabb::octant_of`].
    pub fn subdivide(&self) -> [Aabb; 8] {
        std::array::from_fn(|i| self.octant(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::splat(10.0))
    }

    #[test]
    fn test_new_sorts_corners() {
        let aabb = Aabb::new(Vec3::new(10.0, 0.0, 5.0), Vec3::new(0.0, 10.0, -5.0));
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(aabb.max, Vec3::new(10.0, 10.0, 5.0));
    }

    #[test]
    fn test_contains_point_on_edge() {
        let aabb = unit();
        assert!(aabb.contains_point(Vec3::ZERO));
        assert!(aabb.contains_point(Vec3::splat(10.0)));
        assert!(aabb.contains_point(Vec3::new(10.0, 5.0, 5.0)));
        assert!(!aabb.contains_point(Vec3::new(10.01, 5.0, 5.0)));
    }

    #[test]
    fn test_touching_boxes_intersect_but_interiors_do_not() {
        let a = unit();
        let b = Aabb::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 10.0, 10.0));
        assert!(a.intersects(&b));
        assert!(!a.overlaps_interior(&b));
    }

    #[test]
    fn test_volume_is_f64() {
        let universe = Aabb::centered_cube(1_000_000.0);
        assert_eq!(universe.volume(), 1e18);
    }

    #[test]
    fn test_octants_partition_volume() {
        let aabb = unit();
        let children = aabb.subdivide();
        let total: f64 = children.iter().map(Aabb::volume).sum();
        assert_eq!(total, aabb.volume());
        for (i, a) in children.iter().enumerate() {
            for b in children.iter().skip(i + 1) {
                assert!(!a.overlaps_interior(b));
            }
        }
    }

    #[test]
    fn test_octant_of_matches_octant_bounds() {
        let aabb = unit();
        let points = [
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(9.0, 1.0, 1.0),
            Vec3::new(1.0, 9.0, 9.0),
            Vec3::splat(5.0),
            Vec3::splat(10.0),
            Vec3::ZERO,
        ];
        for p in points {
            let idx = aabb.octant_of(p);
            assert!(aabb.octant(idx).contains_point(p), "{p} not in octant {idx}");
        }
    }

    #[test]
    fn test_distance_to_point() {
        let aabb = unit();
        assert_eq!(aabb.distance_to_point(Vec3::splat(5.0)), 0.0);
        assert!((aabb.distance_to_point(Vec3::new(13.0, 14.0, 5.0)) - 5.0).abs() < 1e-5);
    }
}
