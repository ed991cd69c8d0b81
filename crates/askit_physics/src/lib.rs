//! Rigid-body and particle-fluid simulation for askit
//!
//! This crate provides:
//! - Rigid bodies with sphere, box, cylinder and ground-plane shapes
//! - Broad phase (spatial hash) and narrow phase contact generation
//! - A sequential impulse solver for contacts, springs and hinges
//! - An SPH fluid solver with one-way coupling to rigid shapes

pub mod body;
pub mod collision;
pub mod constraint;
pub mod error;
pub mod fluid;
pub mod material;
pub mod solver;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use body::{BodyId, BodyType, RigidBody};
pub use collision::{collide, CollisionFilter, CollisionLayer, Contact, ContactManifold};
pub use constraint::{Constraint, ConstraintId, Hinge, HingeAnchor, Spring};
pub use error::PhysicsError;
pub use fluid::{BoundaryCollider, FluidConfig, FluidId, FluidSolver, FluidSummary, Particle};
pub use material::PhysicsMaterial;
pub use world::{Integrator, PhysicsConfig, PhysicsWorld};
