//! Physics error types

use thiserror::Error;

use crate::body::BodyId;
use crate::constraint::ConstraintId;
use crate::fluid::FluidId;

/// Error returned by world and fluid operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Rejected construction or configuration argument; nothing was changed
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintId),

    #[error("unknown fluid block {0:?}")]
    UnknownFluid(FluidId),

    /// The fluid would need more substeps than allowed; the step was not taken
    #[error("step of {dt}s needs {required} fluid substeps (limit {limit})")]
    StepTooLarge { dt: f64, required: usize, limit: usize },

    /// Non-finite or otherwise corrupt state detected after a step
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    /// A previous step hit an invariant violation; the world refuses to advance
    #[error("world is poisoned by an earlier invariant violation")]
    WorldPoisoned,
}
