//! The derivative function seam shared by every integrator

/// A first-order system `dy/dt = f(t, y)`
///
/// Implementations write the derivative of `state` at time `t` into `out`,
/// which always has the same length as `state`. Any closure of the form
/// `Fn(f64, &[f64], &mut [f64])` is a system.
pub trait OdeSystem {
    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    #[inline]
    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        self(t, state, out)
    }
}

/// Scratch buffers reused across steps to keep the hot loop allocation-free
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    pub(crate) k: [Vec<f64>; 7],
    pub(crate) tmp: Vec<f64>,
    pub(crate) out: Vec<f64>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every buffer hold exactly `n` values
    pub(crate) fn resize(&mut self, n: usize) {
        for k in &mut self.k {
            k.resize(n, 0.0);
        }
        self.tmp.resize(n, 0.0);
        self.out.resize(n, 0.0);
    }
}
