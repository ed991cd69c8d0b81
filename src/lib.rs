//! askit - real-time physics engine with a recorded timeline
//!
//! The engine lives in the workspace crates; this crate adds layered
//! configuration and the headless demo driver.

pub mod config;

pub use askit_core;
pub use askit_math;
pub use askit_ode;
pub use askit_pde;
pub use askit_physics;
