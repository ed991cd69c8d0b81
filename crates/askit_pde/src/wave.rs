//! Wave equation `d2u/dt2 = c^2 * laplacian(u)`
//!
//! Explicit leapfrog in time with centred differences in space. Stable while
//! the Courant number `c * dt * sqrt(1/dx^2 + 1/dy^2)` stays at or below one.

use serde::{Deserialize, Serialize};

use crate::error::PdeError;
use crate::grid::{Boundaries, Grid};

/// Largest stable Courant number for leapfrog
pub const WAVE_STABILITY_LIMIT: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    /// Propagation speed
    pub speed: f64,
    pub dt: f64,
    pub steps: usize,
    pub boundaries: Boundaries,
}

impl WaveParams {
    pub fn new(speed: f64, dt: f64, steps: usize) -> Self {
        Self {
            speed,
            dt,
            steps,
            boundaries: Boundaries::default(),
        }
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn courant_number(&self, grid: &Grid) -> f64 {
        self.speed * self.dt * grid.inverse_spacing_sq().sqrt()
    }
}

/// Displacement and velocity after a wave solve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveSolution {
    pub displacement: Grid,
    pub velocity: Grid,
}

/// Advance a displacement field (and optional velocity field) by `params.steps` steps
pub fn solve_wave(
    initial: &Grid,
    initial_velocity: Option<&Grid>,
    params: &WaveParams,
) -> Result<WaveSolution, PdeError> {
    if !(params.speed >= 0.0 && params.speed.is_finite()) {
        return Err(PdeError::InvalidParameter(format!("wave speed must be non-negative, got {}", params.speed)));
    }
    if !(params.dt > 0.0 && params.dt.is_finite()) {
        return Err(PdeError::InvalidParameter(format!("dt must be positive, got {}", params.dt)));
    }
    params.boundaries.validate()?;
    if let Some(v0) = initial_velocity {
        initial.check_shape(v0, "initial velocity")?;
    }
    if !initial.is_finite() || initial_velocity.is_some_and(|v| !v.is_finite()) {
        return Err(PdeError::InvalidParameter("initial fields must be finite".into()));
    }
    let number = params.courant_number(initial);
    if number > WAVE_STABILITY_LIMIT {
        log::warn!("Rejected wave solve: Courant number {number:.4} > {WAVE_STABILITY_LIMIT}");
        return Err(PdeError::UnstableConfiguration {
            scheme: "wave",
            number,
            limit: WAVE_STABILITY_LIMIT,
        });
    }

    let dt = params.dt;
    let c2 = params.speed * params.speed;
    let mut current = initial.clone();
    params.boundaries.apply(&mut current, initial);

    if params.steps == 0 {
        let velocity = initial_velocity.cloned().unwrap_or_else(|| initial.zeros_like());
        return Ok(WaveSolution {
            displacement: current,
            velocity,
        });
    }

    // Taylor start: u1 = u0 + dt v0 + dt^2/2 c^2 lap(u0)
    let mut previous = current.clone();
    for (i, j) in initial.interior() {
        let v0 = initial_velocity.map_or(0.0, |v| v.get(i, j));
        let u = previous.get(i, j) + dt * v0 + 0.5 * dt * dt * c2 * previous.laplacian(i, j);
        current.set(i, j, u);
    }
    params.boundaries.apply(&mut current, initial);

    let mut next = current.clone();
    for _ in 1..params.steps {
        for (i, j) in initial.interior() {
            let u = 2.0 * current.get(i, j) - previous.get(i, j) + dt * dt * c2 * current.laplacian(i, j);
            next.set(i, j, u);
        }
        params.boundaries.apply(&mut next, initial);
        std::mem::swap(&mut previous, &mut current);
        std::mem::swap(&mut current, &mut next);
    }

    // Second-order velocity at the final level: (u_n - u_{n-1}) / dt + dt/2 c^2 lap(u_n)
    let mut velocity = current.zeros_like();
    for (i, j) in initial.interior() {
        let v = (current.get(i, j) - previous.get(i, j)) / dt + 0.5 * dt * c2 * current.laplacian(i, j);
        velocity.set(i, j, v);
    }
    log::debug!(
        "Wave solve: {} steps on {}x{} grid (Courant number {number:.3})",
        params.steps,
        initial.nx(),
        initial.ny()
    );
    Ok(WaveSolution {
        displacement: current,
        velocity,
    })
}
