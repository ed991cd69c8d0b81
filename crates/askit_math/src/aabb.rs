//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create from min and max corners (corners are sorted per axis)
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min_components(b),
            max: a.max_components(b),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        Self { min: center - h, max: center + h }
    }

    /// Smallest box containing every point; `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min_components(p),
            max: acc.max.max_components(p),
        }))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when the boxes overlap or touch
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Union of two boxes
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.min_components(other.min),
            max: self.max.max_components(other.max),
        }
    }

    /// Grow uniformly by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::splat(margin);
        Self { min: self.min - m, max: self.max + m }
    }

    /// Grow to cover the box swept along `displacement`
    pub fn swept(&self, displacement: Vec3) -> Self {
        Self {
            min: self.min.min_components(self.min + displacement),
            max: self.max.max_components(self.max + displacement),
        }
    }

    /// Closest point inside the box to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp_components(self.min, self.max)
    }

    /// Grid of points spaced `spacing` apart filling the box, starting at `min`
    ///
    /// Points lie at `min + spacing * (i, j, k)` for every index that stays
    /// inside the box (with a small tolerance for rounding).
    pub fn lattice(&self, spacing: f64) -> Vec<Vec3> {
        let size = self.size();
        let count = |extent: f64| (extent / spacing + 1e-9).floor() as usize + 1;
        let (nx, ny, nz) = (count(size.x), count(size.y), count(size.z));
        let mut points = Vec::with_capacity(nx * ny * nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    points.push(
                        self.min + Vec3::new(i as f64, j as f64, k as f64) * spacing,
                    );
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_corners() {
        let b = Aabb::new(Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(b.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn test_overlaps() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center_half_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE);
        let c = Aabb::from_center_half_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::ONE);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_swept_and_expanded() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));
        let s = a.swept(Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(s.min.y, -2.5);
        assert_eq!(s.max.y, 0.5);
        let e = a.expanded(0.25);
        assert_eq!(e.max, Vec3::splat(0.75));
    }

    #[test]
    fn test_from_points() {
        let b = Aabb::from_points([Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 2.0, 0.5)]).unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_lattice_count() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(0.9, 0.9, 0.9));
        // 0.0, 0.1, ..., 0.9 -> 10 per axis
        assert_eq!(b.lattice(0.1).len(), 1000);
    }

    #[test]
    fn test_closest_point() {
        let b = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert_eq!(b.closest_point(Vec3::new(3.0, 0.5, -4.0)), Vec3::new(1.0, 0.5, -1.0));
    }
}
