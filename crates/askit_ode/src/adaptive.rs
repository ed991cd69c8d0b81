//! Adaptive Runge-Kutta integration (Dormand-Prince 5(4))
//!
//! Every attempt evaluates a fifth-order solution together with an embedded
//! fourth-order estimate. The difference, scaled by the absolute/relative
//! tolerances, gives an error norm where `1.0` means "exactly on tolerance".
//! Attempts above tolerance are retried with a smaller step; accepted steps
//! suggest the size of the next one.

use serde::{Deserialize, Serialize};

use crate::error::OdeError;
use crate::system::{OdeSystem, Workspace};

// Dormand-Prince tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last stage row)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Fifth minus fourth order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Absolute and relative error tolerance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { absolute: 1e-8, relative: 1e-6 }
    }
}

impl Tolerance {
    pub fn new(absolute: f64, relative: f64) -> Self {
        Self { absolute, relative }
    }

    /// Same value for both parts
    pub fn uniform(tol: f64) -> Self {
        Self { absolute: tol, relative: tol }
    }

    pub fn is_valid(&self) -> bool {
        self.absolute >= 0.0
            && self.relative >= 0.0
            && self.absolute.is_finite()
            && self.relative.is_finite()
            && (self.absolute > 0.0 || self.relative > 0.0)
    }
}

/// Step-size control parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    pub tolerance: Tolerance,
    /// Consecutive rejected attempts allowed before a step fails
    pub max_rejections: usize,
    /// Accepted steps allowed when covering an interval
    pub max_steps: usize,
    /// Smallest step size considered meaningful
    pub min_step: f64,
    /// Safety factor applied to the optimal step estimate
    pub safety: f64,
    /// Largest growth factor between consecutive steps
    pub max_growth: f64,
    /// Smallest shrink factor after a rejected attempt
    pub min_shrink: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            max_rejections: 16,
            max_steps: 100_000,
            min_step: 1e-12,
            safety: 0.9,
            max_growth: 5.0,
            min_shrink: 0.2,
        }
    }
}

impl AdaptiveConfig {
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_rejections(mut self, max_rejections: usize) -> Self {
        self.max_rejections = max_rejections;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Result of one accepted adaptive step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptiveStep {
    /// Step size actually taken
    pub h_used: f64,
    /// Suggested size for the next step
    pub h_next: f64,
    /// Scaled error norm of the accepted attempt
    pub error_norm: f64,
    /// Attempts rejected before this one was accepted
    pub rejections: usize,
}

/// Counters accumulated across calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdaptiveStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

/// Dormand-Prince 5(4) integrator with step-size control
#[derive(Debug, Clone, Default)]
pub struct AdaptiveIntegrator {
    config: AdaptiveConfig,
    stats: AdaptiveStats,
    /// Step size suggested by the last accepted step
    suggested: Option<f64>,
    ws: Workspace,
}

impl AdaptiveIntegrator {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            stats: AdaptiveStats::default(),
            suggested: None,
            ws: Workspace::new(),
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn stats(&self) -> AdaptiveStats {
        self.stats
    }

    /// Step size the controller would try next, if it has taken a step before
    pub fn suggested_step(&self) -> Option<f64> {
        self.suggested
    }

    /// One attempt of size `h`; writes the fifth-order solution into the
    /// workspace output buffer and returns the scaled error norm
    fn attempt<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, y: &[f64], h: f64) -> f64 {
        let n = y.len();
        self.ws.resize(n);
        let tol = self.config.tolerance;
        let Workspace { k, tmp, out } = &mut self.ws;
        let [k1, k2, k3, k4, k5, k6, k7] = k;

        system.derivative(t, y, k1);
        for i in 0..n {
            tmp[i] = y[i] + h * A21 * k1[i];
        }
        system.derivative(t + C2 * h, tmp, k2);
        for i in 0..n {
            tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        system.derivative(t + C3 * h, tmp, k3);
        for i in 0..n {
            tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        system.derivative(t + C4 * h, tmp, k4);
        for i in 0..n {
            tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        system.derivative(t + C5 * h, tmp, k5);
        for i in 0..n {
            tmp[i] = y[i]
                + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        system.derivative(t + h, tmp, k6);
        for i in 0..n {
            out[i] = y[i]
                + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
        }
        system.derivative(t + h, out, k7);
        self.stats.evaluations += 7;

        let mut sum = 0.0;
        for i in 0..n {
            let err = h
                * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            let scale = tol.absolute + tol.relative * y[i].abs().max(out[i].abs());
            let scaled = if scale > 0.0 { err / scale } else { err };
            sum += scaled * scaled;
        }
        let norm = if n > 0 { (sum / n as f64).sqrt() } else { 0.0 };
        if norm.is_finite() {
            norm
        } else {
            f64::INFINITY
        }
    }

    fn growth_factor(&self, error_norm: f64) -> f64 {
        if error_norm <= 0.0 {
            self.config.max_growth
        } else {
            (self.config.safety * error_norm.powf(-0.2))
                .clamp(self.config.min_shrink, self.config.max_growth)
        }
    }

    /// Take one accepted step starting with size `h`, shrinking and retrying
    /// while the error is above tolerance
    ///
    /// On success `state` holds the solution at `t + h_used`. On failure
    /// `state` is left exactly as it was passed in.
    pub fn step<S: OdeSystem + ?Sized>(
        &mut self,
        system: &S,
        t: f64,
        state: &mut [f64],
        h: f64,
    ) -> Result<AdaptiveStep, OdeError> {
        if !(h.is_finite() && h > 0.0) {
            return Err(OdeError::InvalidParameter(format!("step size must be positive, got {h}")));
        }
        if !self.config.tolerance.is_valid() {
            return Err(OdeError::InvalidParameter(format!(
                "invalid tolerance {:?}",
                self.config.tolerance
            )));
        }

        let mut h = h;
        let mut rejections = 0;
        loop {
            let error_norm = self.attempt(system, t, state, h);
            if error_norm <= 1.0 {
                state.copy_from_slice(&self.ws.out[..state.len()]);
                let h_next = h * self.growth_factor(error_norm);
                self.stats.accepted += 1;
                self.suggested = Some(h_next);
                return Ok(AdaptiveStep { h_used: h, h_next, error_norm, rejections });
            }

            rejections += 1;
            self.stats.rejected += 1;
            let shrink = if error_norm.is_finite() {
                self.growth_factor(error_norm).min(1.0)
            } else {
                self.config.min_shrink
            };
            let next = h * shrink;
            if rejections > self.config.max_rejections || next < self.config.min_step {
                log::warn!(
                    "RK45 step rejected {rejections} times at t={t} (error norm {error_norm:.3e})"
                );
                return Err(OdeError::ConvergenceFailure {
                    attempts: rejections,
                    error_norm,
                    step: h,
                });
            }
            h = next;
        }
    }

    /// Advance `state` from `t` to exactly `t + dt`, taking as many adaptive
    /// steps as needed
    ///
    /// The state is only written on success.
    pub fn integrate<S: OdeSystem + ?Sized>(
        &mut self,
        system: &S,
        t: f64,
        state: &mut [f64],
        dt: f64,
    ) -> Result<(), OdeError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(OdeError::InvalidParameter(format!("dt must be positive, got {dt}")));
        }

        let mut y = state.to_vec();
        let t_end = t + dt;
        let end_tolerance = 1e-12 * t_end.abs().max(dt);
        let mut now = t;
        let mut h = self.suggested.unwrap_or(dt).min(dt);
        let mut steps = 0;

        while t_end - now > end_tolerance {
            if steps >= self.config.max_steps {
                return Err(OdeError::ConvergenceFailure {
                    attempts: steps,
                    error_norm: f64::NAN,
                    step: h,
                });
            }
            let remaining = t_end - now;
            // Stretch a step that would leave a sliver of the interval
            let take = if h >= remaining * 0.999 { remaining } else { h };
            let accepted = self.step(system, now, &mut y, take)?;
            now += accepted.h_used;
            h = accepted.h_next;
            steps += 1;
        }

        state.copy_from_slice(&y);
        Ok(())
    }
}
