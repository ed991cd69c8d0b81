//! Error types for the world, timeline and bridge

use askit_ode::OdeError;
use askit_pde::PdeError;
use askit_physics::PhysicsError;
use thiserror::Error;

use crate::binding::PhysicalId;

/// Error returned by timeline configuration and queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    /// The timeline is empty or the requested time precedes the first snapshot
    #[error("no snapshot recorded at or before t = {0}")]
    NoData(f64),

    #[error("invalid timeline parameter: {0}")]
    InvalidParameter(String),
}

/// Error returned by sliders, buttons and named variables
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("invalid control parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown control '{0}'")]
    UnknownControl(String),
}

/// Any error surfaced through [`PhysicsBridge`](crate::PhysicsBridge)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Ode(#[from] OdeError),

    #[error(transparent)]
    Pde(#[from] PdeError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Control(#[from] ControlError),

    /// No render handle is bound to this physical id
    #[error("no render handle bound to {0:?}")]
    UnknownHandle(PhysicalId),
}

impl BridgeError {
    /// True for errors after which the world refuses to advance
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Physics(PhysicsError::InvariantViolation(_) | PhysicsError::WorldPoisoned)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_error_converts() {
        let err: BridgeError = PhysicsError::WorldPoisoned.into();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), PhysicsError::WorldPoisoned.to_string());
    }

    #[test]
    fn test_step_too_large_is_not_fatal() {
        let err: BridgeError = PhysicsError::StepTooLarge { dt: 1.0, required: 100, limit: 64 }.into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_no_data_display() {
        let err = TimelineError::NoData(0.5);
        assert!(err.to_string().contains("0.5"));
    }
}
