//! ODE error types

use thiserror::Error;

/// Error returned by the integrators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdeError {
    /// Bad step size, tolerance, or state layout; nothing was integrated
    #[error("invalid ODE parameter: {0}")]
    InvalidParameter(String),

    /// The adaptive integrator could not meet its tolerance
    #[error(
        "ODE integration failed to converge after {attempts} attempts \
         (error norm {error_norm:.3e}, step {step:.3e})"
    )]
    ConvergenceFailure {
        /// Step attempts made before giving up
        attempts: usize,
        /// Scaled error norm of the last attempt (1.0 = exactly on tolerance)
        error_norm: f64,
        /// Step size of the last attempt
        step: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = OdeError::InvalidParameter("dt must be positive".to_string());
        let msg = err.to_string();
        assert!(msg.contains("invalid ODE parameter"));
        assert!(msg.contains("dt must be positive"));
    }

    #[test]
    fn test_convergence_failure_display() {
        let err = OdeError::ConvergenceFailure { attempts: 12, error_norm: 3.5, step: 1e-9 };
        let msg = err.to_string();
        assert!(msg.contains("12 attempts"));
        assert!(msg.contains("3.500e0"));
    }
}
