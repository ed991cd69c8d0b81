//! PDE error types

use thiserror::Error;

/// Error returned by the grid solvers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PdeError {
    /// Bad grid dimensions, spacing, coefficient or mismatched field; nothing was solved
    #[error("invalid PDE parameter: {0}")]
    InvalidParameter(String),

    /// The time step breaks the explicit scheme's stability bound
    #[error("unstable {scheme} configuration: stability number {number:.4} exceeds {limit}")]
    UnstableConfiguration {
        scheme: &'static str,
        /// Dimensionless number the bound is expressed in (diffusion or Courant number)
        number: f64,
        limit: f64,
    },

    /// Relaxation stopped at the iteration cap with the residual still too large
    #[error("Poisson relaxation did not converge in {iterations} iterations (residual {residual:.3e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },
}
