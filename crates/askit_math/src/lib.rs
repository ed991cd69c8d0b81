//! 3D Mathematics and Geometry Kernel
//!
//! This crate provides the vector, rotation and shape types shared by every
//! other askit crate.
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components
//! - [`Quat`] - Unit quaternion rotation
//! - [`Mat3`] - 3x3 matrix (inertia tensors, rotation matrices)
//! - [`Transform`] - Rigid transform (position + orientation)
//!
//! ## Shape Types
//!
//! - [`Shape`] - Closed set of collision primitives: sphere, box, cylinder, plane
//! - [`Aabb`] - Axis-aligned bounding box used by broad-phase culling
//!
//! The [`geometry`] module holds the intersection and distance primitives the
//! narrow phase builds on.

mod vec3;
mod quat;
pub mod mat3;
pub mod aabb;
pub mod shape;
pub mod transform;
pub mod geometry;

pub use vec3::Vec3;
pub use quat::Quat;
pub use mat3::Mat3;
pub use aabb::Aabb;
pub use shape::{Shape, ShapeKind};
pub use transform::Transform;
