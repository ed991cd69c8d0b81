//! Regular grids and boundary descriptors
//!
//! A [`Grid`] stores node values in row-major order, `data[j * nx + i]`,
//! with node `(i, j)` at `(i * dx, j * dy)`. A grid with `ny == 1` is a 1-D
//! line and only has left and right boundaries.

use serde::{Deserialize, Serialize};

use crate::error::PdeError;

/// Scalar field on a regular 1-D or 2-D grid of nodes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
    data: Vec<f64>,
}

impl Grid {
    /// Zero-filled grid of `nx * ny` nodes
    ///
    /// Needs at least three nodes along x and, for 2-D grids, along y, so
    /// every axis has an interior.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Result<Self, PdeError> {
        if nx < 3 {
            return Err(PdeError::InvalidParameter(format!("grid needs nx >= 3, got {nx}")));
        }
        if ny == 0 || ny == 2 {
            return Err(PdeError::InvalidParameter(format!(
                "grid needs ny == 1 (line) or ny >= 3, got {ny}"
            )));
        }
        for (name, h) in [("dx", dx), ("dy", dy)] {
            if !(h > 0.0 && h.is_finite()) {
                return Err(PdeError::InvalidParameter(format!("{name} must be positive, got {h}")));
            }
        }
        Ok(Self {
            nx,
            ny,
            dx,
            dy,
            data: vec![0.0; nx * ny],
        })
    }

    /// 1-D grid of `nx` nodes spaced `dx`
    pub fn line(nx: usize, dx: f64) -> Result<Self, PdeError> {
        Self::new(nx, 1, dx, 1.0)
    }

    /// Grid whose node values are `f(x, y)`
    pub fn from_fn(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, PdeError> {
        let mut grid = Self::new(nx, ny, dx, dy)?;
        for j in 0..ny {
            for i in 0..nx {
                let v = f(grid.x(i), grid.y(j));
                grid.set(i, j, v);
            }
        }
        Ok(grid)
    }

    /// Same shape and spacing, filled with zeros
    pub fn zeros_like(&self) -> Self {
        Self {
            data: vec![0.0; self.data.len()],
            ..self.clone()
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn dx(&self) -> f64 {
        self.dx
    }

    #[inline]
    pub fn dy(&self) -> f64 {
        self.dy
    }

    #[inline]
    pub fn is_1d(&self) -> bool {
        self.ny == 1
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn x(&self, i: usize) -> f64 {
        i as f64 * self.dx
    }

    #[inline]
    pub fn y(&self, j: usize) -> f64 {
        j as f64 * self.dy
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// True when `other` has the same node counts and spacing
    pub fn same_shape(&self, other: &Grid) -> bool {
        self.nx == other.nx && self.ny == other.ny && self.dx == other.dx && self.dy == other.dy
    }

    pub(crate) fn check_shape(&self, other: &Grid, what: &str) -> Result<(), PdeError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(PdeError::InvalidParameter(format!(
                "{what} grid is {}x{} (dx {}, dy {}), expected {}x{} (dx {}, dy {})",
                other.nx, other.ny, other.dx, other.dy, self.nx, self.ny, self.dx, self.dy
            )))
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    /// Largest node-wise difference to a grid of the same shape
    pub fn max_abs_difference(&self, other: &Grid) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .fold(0.0, |m, (a, b)| m.max((a - b).abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// True for nodes that do not lie on a boundary
    #[inline]
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        let x_inner = i > 0 && i + 1 < self.nx;
        if self.is_1d() {
            x_inner
        } else {
            x_inner && j > 0 && j + 1 < self.ny
        }
    }

    /// Iterate interior node coordinates in storage order
    pub fn interior(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (j0, j1) = if self.is_1d() { (0, 1) } else { (1, self.ny - 1) };
        (j0..j1).flat_map(move |j| (1..self.nx - 1).map(move |i| (i, j)))
    }

    /// Five-point (three-point in 1-D) Laplacian at an interior node
    #[inline]
    pub fn laplacian(&self, i: usize, j: usize) -> f64 {
        let idx = self.index(i, j);
        let c = self.data[idx];
        let mut lap = (self.data[idx - 1] + self.data[idx + 1] - 2.0 * c) / (self.dx * self.dx);
        if !self.is_1d() {
            lap += (self.data[idx - self.nx] + self.data[idx + self.nx] - 2.0 * c) / (self.dy * self.dy);
        }
        lap
    }

    /// `1/dx^2 + 1/dy^2`, or `1/dx^2` for lines
    pub fn inverse_spacing_sq(&self) -> f64 {
        let mut s = 1.0 / (self.dx * self.dx);
        if !self.is_1d() {
            s += 1.0 / (self.dy * self.dy);
        }
        s
    }
}

/// Condition on one side of the domain
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Keep the edge values of the initial grid
    #[default]
    Fixed,
    /// Hold the edge at a constant value
    Dirichlet(f64),
    /// Prescribed outward derivative; zero is an insulated or free edge
    Neumann(f64),
}

/// Boundary conditions for every side of the domain
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    /// `x = 0`
    pub left: BoundaryCondition,
    /// `x = (nx - 1) dx`
    pub right: BoundaryCondition,
    /// `y = 0` (ignored for lines)
    pub bottom: BoundaryCondition,
    /// `y = (ny - 1) dy` (ignored for lines)
    pub top: BoundaryCondition,
}

impl Boundaries {
    /// The same condition on every side
    pub fn uniform(condition: BoundaryCondition) -> Self {
        Self {
            left: condition,
            right: condition,
            bottom: condition,
            top: condition,
        }
    }

    pub fn validate(&self) -> Result<(), PdeError> {
        for bc in [self.left, self.right, self.bottom, self.top] {
            match bc {
                BoundaryCondition::Dirichlet(v) | BoundaryCondition::Neumann(v) if !v.is_finite() => {
                    return Err(PdeError::InvalidParameter(format!("boundary value must be finite: {bc:?}")));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Overwrite the edge nodes of `grid`
    ///
    /// `Fixed` edges are copied from `initial`. Neumann edges use a one-sided
    /// difference against the adjacent interior node. Top and bottom are
    /// applied last, so they own the corners.
    pub fn apply(&self, grid: &mut Grid, initial: &Grid) {
        let (nx, ny) = (grid.nx, grid.ny);
        let (dx, dy) = (grid.dx, grid.dy);
        let apply_node = |grid: &mut Grid, bc: BoundaryCondition, edge: (usize, usize), inner: (usize, usize), h: f64| {
            let value = match bc {
                BoundaryCondition::Fixed => initial.get(edge.0, edge.1),
                BoundaryCondition::Dirichlet(v) => v,
                BoundaryCondition::Neumann(flux) => grid.get(inner.0, inner.1) + h * flux,
            };
            grid.set(edge.0, edge.1, value);
        };

        for j in 0..ny {
            apply_node(grid, self.left, (0, j), (1, j), dx);
            apply_node(grid, self.right, (nx - 1, j), (nx - 2, j), dx);
        }
        if !grid.is_1d() {
            for i in 0..nx {
                apply_node(grid, self.bottom, (i, 0), (i, 1), dy);
                apply_node(grid, self.top, (i, ny - 1), (i, ny - 2), dy);
            }
        }
    }
}
