//! Finite-difference field solvers
//!
//! Each solver takes a [`Grid`] plus coefficients and returns a finished
//! grid. Nothing is retained between calls:
//!
//! - [`solve_heat`] - explicit diffusion with an optional source
//! - [`solve_wave`] - leapfrog wave propagation
//! - [`solve_poisson`] - successive over-relaxation to a residual tolerance
//!
//! ```
//! use askit_pde::{solve_heat, Grid, HeatParams};
//!
//! let rod = Grid::from_fn(11, 1, 0.1, 1.0, |x, _| if x == 0.5 { 1.0 } else { 0.0 }).unwrap();
//! let cooled = solve_heat(&rod, &HeatParams::new(1.0, 0.004, 10), None).unwrap();
//! assert!(cooled.get(5, 0) < 1.0);
//! ```

mod error;
pub mod grid;
pub mod heat;
pub mod poisson;
pub mod wave;

pub use error::PdeError;
pub use grid::{BoundaryCondition, Boundaries, Grid};
pub use heat::{solve_heat, HeatParams, HEAT_STABILITY_LIMIT};
pub use poisson::{optimal_omega, solve_poisson, PoissonParams, PoissonSolution};
pub use wave::{solve_wave, WaveParams, WaveSolution, WAVE_STABILITY_LIMIT};
