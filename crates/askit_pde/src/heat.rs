//! Heat equation `du/dt = alpha * laplacian(u) + s`
//!
//! Forward-time centred-space stepping. The scheme is stable when the
//! diffusion number `alpha * dt * (1/dx^2 + 1/dy^2)` is at most 1/2; larger
//! steps are rejected up front rather than producing a diverging grid.

use serde::{Deserialize, Serialize};

use crate::error::PdeError;
use crate::grid::{Boundaries, Grid};

/// Largest stable diffusion number for FTCS
pub const HEAT_STABILITY_LIMIT: f64 = 0.5;

/// Coefficients and stepping for one heat solve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatParams {
    /// Thermal diffusivity
    pub diffusivity: f64,
    pub dt: f64,
    pub steps: usize,
    pub boundaries: Boundaries,
}

impl HeatParams {
    pub fn new(diffusivity: f64, dt: f64, steps: usize) -> Self {
        Self {
            diffusivity,
            dt,
            steps,
            boundaries: Boundaries::default(),
        }
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    /// Diffusion number of these parameters on `grid`
    pub fn diffusion_number(&self, grid: &Grid) -> f64 {
        self.diffusivity * self.dt * grid.inverse_spacing_sq()
    }
}

/// Advance `initial` by `params.steps` steps and return the final field
///
/// `source`, when given, is a per-node heat source with the grid's shape.
pub fn solve_heat(initial: &Grid, params: &HeatParams, source: Option<&Grid>) -> Result<Grid, PdeError> {
    if !(params.diffusivity >= 0.0 && params.diffusivity.is_finite()) {
        return Err(PdeError::InvalidParameter(format!(
            "diffusivity must be non-negative, got {}",
            params.diffusivity
        )));
    }
    if !(params.dt > 0.0 && params.dt.is_finite()) {
        return Err(PdeError::InvalidParameter(format!("dt must be positive, got {}", params.dt)));
    }
    params.boundaries.validate()?;
    if let Some(source) = source {
        initial.check_shape(source, "source")?;
    }
    if !initial.is_finite() {
        return Err(PdeError::InvalidParameter("initial field must be finite".into()));
    }
    let number = params.diffusion_number(initial);
    if number > HEAT_STABILITY_LIMIT {
        log::warn!("Rejected heat solve: diffusion number {number:.4} > {HEAT_STABILITY_LIMIT}");
        return Err(PdeError::UnstableConfiguration {
            scheme: "heat",
            number,
            limit: HEAT_STABILITY_LIMIT,
        });
    }

    let mut current = initial.clone();
    params.boundaries.apply(&mut current, initial);
    let mut next = current.clone();
    let alpha_dt = params.diffusivity * params.dt;
    for _ in 0..params.steps {
        for (i, j) in current.interior() {
            let mut du = alpha_dt * current.laplacian(i, j);
            if let Some(source) = source {
                du += params.dt * source.get(i, j);
            }
            next.set(i, j, current.get(i, j) + du);
        }
        params.boundaries.apply(&mut next, initial);
        std::mem::swap(&mut current, &mut next);
    }
    log::debug!(
        "Heat solve: {} steps on {}x{} grid (diffusion number {number:.3})",
        params.steps,
        initial.nx(),
        initial.ny()
    );
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryCondition;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_sine_mode_decays_analytically() {
        let dx = 0.02;
        let initial = Grid::from_fn(51, 1, dx, 1.0, |x, _| (PI * x).sin()).unwrap();
        let params = HeatParams::new(1.0, 1e-4, 1000);
        let result = solve_heat(&initial, &params, None).unwrap();
        let decay = (-PI * PI * 0.1).exp();
        for i in 0..51 {
            let exact = decay * (PI * initial.x(i)).sin();
            assert_abs_diff_eq!(result.get(i, 0), exact, epsilon = 2e-3);
        }
    }

    #[test]
    fn test_unstable_step_rejected() {
        let initial = Grid::line(51, 0.02).unwrap();
        let params = HeatParams::new(1.0, 1e-3, 10);
        match solve_heat(&initial, &params, None) {
            Err(PdeError::UnstableConfiguration { number, limit, .. }) => {
                assert_abs_diff_eq!(number, 2.5, epsilon = 1e-9);
                assert_eq!(limit, 0.5);
            }
            other => panic!("expected UnstableConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_insulated_source_heats_uniformly() {
        let initial = Grid::from_fn(6, 6, 0.1, 0.1, |_, _| 20.0).unwrap();
        let source = Grid::from_fn(6, 6, 0.1, 0.1, |_, _| 3.0).unwrap();
        let params = HeatParams::new(0.5, 0.002, 50)
            .with_boundaries(Boundaries::uniform(BoundaryCondition::Neumann(0.0)));
        let result = solve_heat(&initial, &params, Some(&source)).unwrap();
        for v in result.values() {
            assert_abs_diff_eq!(*v, 20.0 + 3.0 * 0.1, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_dirichlet_edges_reach_steady_state() {
        let initial = Grid::line(11, 0.1).unwrap();
        let params = HeatParams::new(1.0, 0.004, 5000).with_boundaries(Boundaries {
            left: BoundaryCondition::Dirichlet(0.0),
            right: BoundaryCondition::Dirichlet(1.0),
            ..Boundaries::default()
        });
        let result = solve_heat(&initial, &params, None).unwrap();
        // Steady state is linear between the edges
        for i in 0..11 {
            assert_abs_diff_eq!(result.get(i, 0), i as f64 * 0.1, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mismatched_source_rejected() {
        let initial = Grid::line(11, 0.1).unwrap();
        let source = Grid::line(12, 0.1).unwrap();
        let params = HeatParams::new(1.0, 0.001, 1);
        assert!(matches!(
            solve_heat(&initial, &params, Some(&source)),
            Err(PdeError::InvalidParameter(_))
        ));
    }
}
