//! Poisson equation `laplacian(u) = f`
//!
//! Successive over-relaxation (Gauss-Seidel with relaxation factor omega)
//! sweeping interior nodes in storage order. Boundary nodes come from the
//! boundary descriptors, with `Fixed` edges taken from the initial guess.
//! Convergence is declared when the largest interior residual
//! `|f - laplacian(u)|` falls to `tolerance * max(1, max|f|)`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::PdeError;
use crate::grid::{Boundaries, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoissonParams {
    /// Relative residual target
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Relaxation factor in (0, 2); `None` picks the optimum for the grid
    pub omega: Option<f64>,
    pub boundaries: Boundaries,
}

impl Default for PoissonParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 10_000,
            omega: None,
            boundaries: Boundaries::default(),
        }
    }
}

impl PoissonParams {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_omega(mut self, omega: f64) -> Self {
        self.omega = Some(omega);
        self
    }
}

/// Converged field with solver statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoissonSolution {
    pub solution: Grid,
    pub iterations: usize,
    /// Largest interior residual at exit
    pub residual: f64,
}

/// Optimal SOR factor for the model problem on a grid with `n` intervals per side
pub fn optimal_omega(grid: &Grid) -> f64 {
    let intervals = if grid.is_1d() {
        grid.nx() - 1
    } else {
        (grid.nx() - 1).max(grid.ny() - 1)
    };
    2.0 / (1.0 + (PI / intervals as f64).sin())
}

/// Relax `guess` toward the solution of `laplacian(u) = source`
pub fn solve_poisson(guess: &Grid, source: &Grid, params: &PoissonParams) -> Result<PoissonSolution, PdeError> {
    guess.check_shape(source, "source")?;
    if !(params.tolerance > 0.0 && params.tolerance.is_finite()) {
        return Err(PdeError::InvalidParameter(format!(
            "tolerance must be positive, got {}",
            params.tolerance
        )));
    }
    if params.max_iterations == 0 {
        return Err(PdeError::InvalidParameter("max_iterations must be at least 1".into()));
    }
    let omega = params.omega.unwrap_or_else(|| optimal_omega(guess));
    if !(omega > 0.0 && omega < 2.0) {
        return Err(PdeError::InvalidParameter(format!("omega must lie in (0, 2), got {omega}")));
    }
    params.boundaries.validate()?;
    if !guess.is_finite() || !source.is_finite() {
        return Err(PdeError::InvalidParameter("guess and source must be finite".into()));
    }

    let threshold = params.tolerance * source.max_abs().max(1.0);
    let inv_dx2 = 1.0 / (guess.dx() * guess.dx());
    let inv_dy2 = if guess.is_1d() { 0.0 } else { 1.0 / (guess.dy() * guess.dy()) };
    let diagonal = 2.0 * (inv_dx2 + inv_dy2);
    let nx = guess.nx();

    let mut u = guess.clone();
    params.boundaries.apply(&mut u, guess);
    let interior: Vec<(usize, usize)> = u.interior().collect();
    let mut residual = max_residual(&u, source);
    let mut iterations = 0;
    while residual > threshold {
        if iterations == params.max_iterations {
            log::warn!(
                "Poisson relaxation stopped after {iterations} iterations with residual {residual:.3e} (target {threshold:.3e})"
            );
            return Err(PdeError::ConvergenceFailure { iterations, residual });
        }
        let values = u.values_mut();
        for &(i, j) in &interior {
            let idx = j * nx + i;
            let mut neighbours = (values[idx - 1] + values[idx + 1]) * inv_dx2;
            if inv_dy2 > 0.0 {
                neighbours += (values[idx - nx] + values[idx + nx]) * inv_dy2;
            }
            let gauss_seidel = (neighbours - source.values()[idx]) / diagonal;
            values[idx] += omega * (gauss_seidel - values[idx]);
        }
        params.boundaries.apply(&mut u, guess);
        iterations += 1;
        residual = max_residual(&u, source);
        if !residual.is_finite() {
            log::warn!("Poisson relaxation diverged after {iterations} iterations");
            return Err(PdeError::ConvergenceFailure { iterations, residual });
        }
    }

    log::debug!("Poisson converged in {iterations} iterations (residual {residual:.3e}, omega {omega:.3})");
    Ok(PoissonSolution {
        solution: u,
        iterations,
        residual,
    })
}

fn max_residual(u: &Grid, source: &Grid) -> f64 {
    u.interior()
        .map(|(i, j)| (source.get(i, j) - u.laplacian(i, j)).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryCondition;
    use approx::assert_abs_diff_eq;

    const N: usize = 21;
    const H: f64 = 0.05;

    #[test]
    fn test_quadratic_solved_exactly() {
        // u = x^2 + y^2 has laplacian 4 and the five-point stencil is exact for it
        let exact = Grid::from_fn(N, N, H, H, |x, y| x * x + y * y).unwrap();
        let source = Grid::from_fn(N, N, H, H, |_, _| 4.0).unwrap();
        let mut guess = exact.clone();
        for (i, j) in exact.interior().collect::<Vec<_>>() {
            guess.set(i, j, 0.0);
        }
        let result = solve_poisson(&guess, &source, &PoissonParams::new(1e-10, 10_000)).unwrap();
        assert!(result.iterations > 0);
        assert!(result.residual <= 4e-10);
        assert!(result.solution.max_abs_difference(&exact) < 1e-8);
    }

    #[test]
    fn test_sine_source_within_discretisation_error() {
        let exact = Grid::from_fn(N, N, H, H, |x, y| (PI * x).sin() * (PI * y).sin()).unwrap();
        let source =
            Grid::from_fn(N, N, H, H, |x, y| -2.0 * PI * PI * (PI * x).sin() * (PI * y).sin()).unwrap();
        let params = PoissonParams::new(1e-9, 10_000)
            .with_boundaries(Boundaries::uniform(BoundaryCondition::Dirichlet(0.0)));
        let guess = Grid::new(N, N, H, H).unwrap();
        let result = solve_poisson(&guess, &source, &params).unwrap();
        assert!(result.solution.max_abs_difference(&exact) < 5e-3);
    }

    #[test]
    fn test_iteration_cap_reports_failure() {
        let source = Grid::from_fn(N, N, H, H, |_, _| 4.0).unwrap();
        let guess = Grid::new(N, N, H, H).unwrap();
        match solve_poisson(&guess, &source, &PoissonParams::new(1e-10, 5)) {
            Err(PdeError::ConvergenceFailure { iterations, residual }) => {
                assert_eq!(iterations, 5);
                assert!(residual > 4e-10);
            }
            other => panic!("expected ConvergenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_one_dimensional_problem() {
        // u'' = 2 with u(0) = 0, u(1) = 1 gives u = x^2
        let exact = Grid::from_fn(11, 1, 0.1, 1.0, |x, _| x * x).unwrap();
        let source = Grid::from_fn(11, 1, 0.1, 1.0, |_, _| 2.0).unwrap();
        let params = PoissonParams::new(1e-12, 10_000).with_boundaries(Boundaries {
            left: BoundaryCondition::Dirichlet(0.0),
            right: BoundaryCondition::Dirichlet(1.0),
            ..Boundaries::default()
        });
        let result = solve_poisson(&Grid::line(11, 0.1).unwrap(), &source, &params).unwrap();
        assert_abs_diff_eq!(result.solution.get(5, 0), 0.25, epsilon = 1e-9);
        assert!(result.solution.max_abs_difference(&exact) < 1e-9);
    }

    #[test]
    fn test_bad_omega_rejected() {
        let grid = Grid::new(5, 5, 0.25, 0.25).unwrap();
        let params = PoissonParams::default().with_omega(2.5);
        assert!(matches!(solve_poisson(&grid, &grid, &params), Err(PdeError::InvalidParameter(_))));
        assert!(optimal_omega(&grid) > 1.0 && optimal_omega(&grid) < 2.0);
    }
}
