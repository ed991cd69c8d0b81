//! Fixed-step integrators
//!
//! Each function advances `state` in place by exactly one step of size `h`.

use crate::system::{OdeSystem, Workspace};

/// Explicit (forward) Euler: `y += h * f(t, y)`
pub fn euler_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: f64,
    state: &mut [f64],
    h: f64,
    ws: &mut Workspace,
) {
    ws.resize(state.len());
    system.derivative(t, state, &mut ws.k[0]);
    for (y, dy) in state.iter_mut().zip(&ws.k[0]) {
        *y += h * dy;
    }
}

/// Semi-implicit (symplectic) Euler for second-order systems
///
/// The state is laid out as `[q_0 .. q_n, v_0 .. v_n]` and the system must
/// return `[dq/dt, dv/dt]` with `dq/dt = v`. Velocities are advanced first
/// and the positions then move with the *new* velocities, which keeps
/// oscillators bounded where explicit Euler would gain energy.
pub fn semi_implicit_euler_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: f64,
    state: &mut [f64],
    h: f64,
    ws: &mut Workspace,
) {
    let n = state.len() / 2;
    ws.resize(state.len());
    system.derivative(t, state, &mut ws.k[0]);
    let (q, v) = state.split_at_mut(n);
    for (vi, ai) in v.iter_mut().zip(&ws.k[0][n..]) {
        *vi += h * ai;
    }
    for (qi, vi) in q.iter_mut().zip(v.iter()) {
        *qi += h * vi;
    }
}

/// Classic fourth-order Runge-Kutta
pub fn rk4_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: f64,
    state: &mut [f64],
    h: f64,
    ws: &mut Workspace,
) {
    let n = state.len();
    ws.resize(n);
    let Workspace { k, tmp, .. } = ws;
    let [k1, k2, k3, k4, ..] = k;

    system.derivative(t, state, k1);

    for i in 0..n {
        tmp[i] = state[i] + 0.5 * h * k1[i];
    }
    system.derivative(t + 0.5 * h, tmp, k2);

    for i in 0..n {
        tmp[i] = state[i] + 0.5 * h * k2[i];
    }
    system.derivative(t + 0.5 * h, tmp, k3);

    for i in 0..n {
        tmp[i] = state[i] + h * k3[i];
    }
    system.derivative(t + h, tmp, k4);

    for i in 0..n {
        state[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
}
