//! Simulation world and engine facade for askit
//!
//! This crate ties the solvers together:
//! - [`World`] - rigid bodies, fluids and controls advanced by one `step`
//! - [`Timeline`] - fixed-interval snapshots of the world, queryable by time
//! - [`BindingTable`] - physical id to render handle map with pose sync
//! - [`Controls`] - sliders, buttons and named variables recorded in snapshots
//! - [`PhysicsBridge`] - the facade an animation layer drives
//!
//! ```
//! use askit_core::PhysicsBridge;
//! use askit_math::Vec3;
//!
//! let mut bridge: PhysicsBridge<&str> = PhysicsBridge::new();
//! bridge.create_ground(0.0).unwrap();
//! let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 2.0, 0.0)).unwrap();
//! bridge.bind_mobject(ball, "ball").unwrap();
//! bridge.step(0.02).unwrap();
//! assert_eq!(bridge.get_history().count(), 2);
//! ```

mod binding;
mod bridge;
mod controls;
mod error;
mod timeline;
mod world;

pub use binding::{BindingTable, PhysicalId, Pose, PoseSink};
pub use bridge::PhysicsBridge;
pub use controls::{Controls, Slider};
pub use error::{BridgeError, ControlError, TimelineError};
pub use timeline::{BodyState, FluidState, Snapshot, Timeline, TimelineConfig};
pub use world::{World, WorldConfig};
