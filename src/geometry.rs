//! Geometric helpers for collision detection and support checks.
//!
//! All coordinates are integer units (see [`crate::engine::SCALE`]), so the
//! comparisons below are exact.

/// An axis-aligned cuboid at a position inside a box.
///
/// `position` is the lower left front corner (x, y, z); `dims` the extent
/// along the same axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cuboid {
    pub position: [u64; 3],
    pub dims: [u64; 3],
}

impl Cuboid {
    pub const fn new(position: [u64; 3], dims: [u64; 3]) -> Self {
        Self { position, dims }
    }

    /// Upper bound along one axis.
    #[inline]
    pub fn end(&self, axis: usize) -> u64 {
        self.position[axis] + self.dims[axis]
    }

    #[inline]
    pub fn top_z(&self) -> u64 {
        self.end(2)
    }

    #[inline]
    pub fn base_area(&self) -> u128 {
        u128::from(self.dims[0]) * u128::from(self.dims[1])
    }

    #[inline]
    pub fn volume(&self) -> u128 {
        self.base_area().saturating_mul(u128::from(self.dims[2]))
    }

    /// Centre of the footprint in doubled coordinates, which keeps it integral.
    #[inline]
    pub fn doubled_center_xy(&self) -> (u128, u128) {
        (
            2 * u128::from(self.position[0]) + u128::from(self.dims[0]),
            2 * u128::from(self.position[1]) + u128::from(self.dims[1]),
        )
    }
}

/// Checks whether two cuboids overlap in space.
///
/// Two cuboids do NOT overlap when they are separated along at least one axis;
/// touching faces do not count as overlap.
pub fn intersects(a: &Cuboid, b: &Cuboid) -> bool {
    (0..3).all(|axis| a.position[axis] < b.end(axis) && b.position[axis] < a.end(axis))
}

/// Length of the overlap of two intervals, at least 0.
///
/// ```
/// use packwise::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0, 5, 3, 8), 2);
/// assert_eq!(overlap_1d(0, 2, 3, 8), 0);
/// ```
pub fn overlap_1d(a1: u64, a2: u64, b1: u64, b2: u64) -> u64 {
    a2.min(b2).saturating_sub(a1.max(b1))
}

/// Overlap area of the footprints of two cuboids.
pub fn overlap_area_xy(a: &Cuboid, b: &Cuboid) -> u128 {
    let x = overlap_1d(a.position[0], a.end(0), b.position[0], b.end(0));
    let y = overlap_1d(a.position[1], a.end(1), b.position[1], b.end(1));
    u128::from(x) * u128::from(y)
}

/// Whether a doubled-coordinate point lies on the footprint of `cuboid`.
pub fn footprint_contains_doubled(point: (u128, u128), cuboid: &Cuboid) -> bool {
    let (px, py) = point;
    let doubled = |value: u64| 2 * u128::from(value);
    px >= doubled(cuboid.position[0])
        && px <= doubled(cuboid.end(0))
        && py >= doubled(cuboid.position[1])
        && py <= doubled(cuboid.end(1))
}

/// Whether `inner` dims fit inside `outer` dims without rotation.
pub fn fits_within(inner: [u64; 3], outer: [u64; 3]) -> bool {
    inner.iter().zip(outer.iter()).all(|(i, o)| i <= o)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_cuboids_do_not_intersect() {
        let a = Cuboid::new([0, 0, 0], [10, 10, 10]);
        let b = Cuboid::new([10, 0, 0], [10, 10, 10]);
        let c = Cuboid::new([5, 5, 5], [10, 10, 10]);
        assert!(!intersects(&a, &b));
        assert!(intersects(&a, &c));
        assert!(intersects(&b, &c));
    }

    #[test]
    fn footprint_overlap_area() {
        let a = Cuboid::new([0, 0, 0], [10, 10, 10]);
        let b = Cuboid::new([5, 5, 10], [10, 10, 10]);
        assert_eq!(overlap_area_xy(&a, &b), 25);
    }

    #[test]
    fn doubled_center_is_exact_for_odd_sizes() {
        let a = Cuboid::new([0, 0, 0], [3, 5, 1]);
        assert_eq!(a.doubled_center_xy(), (3, 5));
        assert!(footprint_contains_doubled((3, 5), &a));
        assert!(!footprint_contains_doubled((7, 5), &a));
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let a = Cuboid::new([u64::MAX / 2, 0, 0], [u64::MAX / 2, u64::MAX, u64::MAX]);
        let (cx, _) = a.doubled_center_xy();
        assert!(cx > u128::from(u64::MAX));
        assert!(footprint_contains_doubled(a.doubled_center_xy(), &a));
        assert_eq!(a.volume(), u128::MAX);
    }

    #[test]
    fn fits_within_is_componentwise() {
        assert!(fits_within([1, 2, 3], [1, 2, 3]));
        assert!(!fits_within([1, 4, 3], [1, 2, 3]));
    }
}
