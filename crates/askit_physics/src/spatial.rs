//! Uniform spatial hash grid
//!
//! Shared by the rigid-body broad phase and the SPH neighbour search. Cells
//! are cubes of a fixed side length keyed by their integer coordinates, so
//! the grid is unbounded and only occupied cells cost memory.

use std::collections::HashMap;

use askit_math::{Aabb, Vec3};

/// Integer cell coordinates
pub type CellKey = (i64, i64, i64);

/// Sparse hash grid storing item indices per cell
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialHash {
    /// Create a grid with cubic cells of side `cell_size` (clamped to a small positive value)
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 1e-9 { cell_size } else { 1.0 };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Remove all items but keep allocated cells for reuse
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    /// Cell containing `p`
    #[inline]
    pub fn key(&self, p: Vec3) -> CellKey {
        (
            (p.x * self.inv_cell_size).floor() as i64,
            (p.y * self.inv_cell_size).floor() as i64,
            (p.z * self.inv_cell_size).floor() as i64,
        )
    }

    /// Insert a point item
    pub fn insert_point(&mut self, index: usize, p: Vec3) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(index);
    }

    /// Insert an item into every cell its bounds overlap
    pub fn insert_aabb(&mut self, index: usize, aabb: &Aabb) {
        let lo = self.key(aabb.min);
        let hi = self.key(aabb.max);
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    self.cells.entry((x, y, z)).or_default().push(index);
                }
            }
        }
    }

    /// Items in the cell of `p` and its 26 neighbours
    ///
    /// With a cell size equal to the query radius this visits every item
    /// within that radius (and some beyond it).
    pub fn for_each_near<F: FnMut(usize)>(&self, p: Vec3, mut visit: F) {
        let (cx, cy, cz) = self.key(p);
        for x in cx - 1..=cx + 1 {
            for y in cy - 1..=cy + 1 {
                for z in cz - 1..=cz + 1 {
                    if let Some(items) = self.cells.get(&(x, y, z)) {
                        for &i in items {
                            visit(i);
                        }
                    }
                }
            }
        }
    }

    /// Every unordered pair of distinct items sharing at least one cell,
    /// sorted and deduplicated
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for items in self.cells.values() {
            for (n, &a) in items.iter().enumerate() {
                for &b in &items[n + 1..] {
                    if a != b {
                        pairs.push((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Number of occupied cells
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|c| !c.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_floor() {
        let grid = SpatialHash::new(1.0);
        assert_eq!(grid.key(Vec3::new(0.5, -0.5, 1.0)), (0, -1, 1));
    }

    #[test]
    fn test_near_query_finds_neighbours() {
        let mut grid = SpatialHash::new(0.5);
        grid.insert_point(0, Vec3::new(0.1, 0.1, 0.1));
        grid.insert_point(1, Vec3::new(0.55, 0.1, 0.1));
        grid.insert_point(2, Vec3::new(5.0, 5.0, 5.0));

        let mut found = Vec::new();
        grid.for_each_near(Vec3::new(0.1, 0.1, 0.1), |i| found.push(i));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_candidate_pairs_deduplicated() {
        let mut grid = SpatialHash::new(1.0);
        // Both boxes span several shared cells
        grid.insert_aabb(0, &Aabb::new(Vec3::ZERO, Vec3::splat(1.5)));
        grid.insert_aabb(1, &Aabb::new(Vec3::splat(0.5), Vec3::splat(2.5)));
        grid.insert_aabb(2, &Aabb::new(Vec3::splat(10.0), Vec3::splat(11.0)));
        assert_eq!(grid.candidate_pairs(), vec![(0, 1)]);
    }

    #[test]
    fn test_clear_keeps_nothing() {
        let mut grid = SpatialHash::new(1.0);
        grid.insert_point(0, Vec3::ZERO);
        grid.clear();
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.candidate_pairs().is_empty());
    }
}
