//! ODE integrators over plain `f64` state vectors
//!
//! The library never touches world state: callers hand in a state slice and
//! an [`OdeSystem`] and get the advanced state back. The rigid-body world uses
//! it for spring dynamics and it is equally usable for scripted dynamics.
//!
//! ```
//! use askit_ode::{integrate, Method};
//!
//! let decay = |_t: f64, y: &[f64], out: &mut [f64]| out[0] = -y[0];
//! let next = integrate(&decay, &[1.0], 0.0, 0.1, Method::Rk4, None).unwrap();
//! assert!((next[0] - (-0.1_f64).exp()).abs() < 1e-6);
//! ```

mod adaptive;
mod error;
mod fixed;
mod system;

use serde::{Deserialize, Serialize};

pub use adaptive::{AdaptiveConfig, AdaptiveIntegrator, AdaptiveStats, AdaptiveStep, Tolerance};
pub use error::OdeError;
pub use fixed::{euler_step, rk4_step, semi_implicit_euler_step};
pub use system::{OdeSystem, Workspace};

/// Integration scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Explicit forward Euler
    Euler,
    /// Symplectic Euler, state laid out as `[q.., v..]`
    #[default]
    SemiImplicitEuler,
    /// Classic fourth-order Runge-Kutta
    Rk4,
    /// Dormand-Prince 5(4) with adaptive step control
    Rk45,
}

impl Method {
    /// True for methods that choose their own step size
    pub fn is_adaptive(self) -> bool {
        matches!(self, Method::Rk45)
    }
}

/// Advance `state` from `t` by `dt` and return the new state
///
/// Fixed-step methods take exactly one step of size `dt`. `Rk45` covers `dt`
/// with as many adaptive steps as the tolerance needs (default tolerance when
/// `None`). The input slice is never modified; on error nothing is returned.
pub fn integrate<S: OdeSystem + ?Sized>(
    system: &S,
    state: &[f64],
    t: f64,
    dt: f64,
    method: Method,
    tolerance: Option<Tolerance>,
) -> Result<Vec<f64>, OdeError> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(OdeError::InvalidParameter(format!("dt must be positive and finite, got {dt}")));
    }
    if !t.is_finite() {
        return Err(OdeError::InvalidParameter(format!("start time must be finite, got {t}")));
    }
    if let Some(i) = state.iter().position(|v| !v.is_finite()) {
        return Err(OdeError::InvalidParameter(format!("state component {i} is not finite")));
    }
    if method == Method::SemiImplicitEuler && state.len() % 2 != 0 {
        return Err(OdeError::InvalidParameter(format!(
            "semi-implicit Euler needs an even [q, v] state, got {} values",
            state.len()
        )));
    }

    let mut next = state.to_vec();
    let mut ws = Workspace::new();
    match method {
        Method::Euler => euler_step(system, t, &mut next, dt, &mut ws),
        Method::SemiImplicitEuler => semi_implicit_euler_step(system, t, &mut next, dt, &mut ws),
        Method::Rk4 => rk4_step(system, t, &mut next, dt, &mut ws),
        Method::Rk45 => {
            let config = AdaptiveConfig::default().with_tolerance(tolerance.unwrap_or_default());
            let mut integrator = AdaptiveIntegrator::new(config);
            integrator.integrate(system, t, &mut next, dt)?;
        }
    }
    Ok(next)
}
