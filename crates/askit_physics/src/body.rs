//! Rigid body types

use askit_math::{Mat3, Quat, Shape, Transform, Vec3};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::collision::CollisionFilter;
use crate::material::PhysicsMaterial;

new_key_type! {
    /// Key to a rigid body in the physics world
    ///
    /// Generational: once a body is removed its key never resolves again,
    /// even if the slot is reused.
    pub struct BodyId;
}

/// Whether a body responds to forces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Finite mass, moved by forces, impulses and contacts
    Dynamic,
    /// Zero mass: ignores gravity, forces and impulses and only moves with
    /// an explicitly set velocity
    Static,
}

/// A rigid body with shape, pose, velocity and accumulated loads
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub shape: Shape,
    /// Mass; zero means static/kinematic
    pub(crate) mass: f64,
    pub(crate) inv_mass: f64,
    /// Principal inverse inertia in the body frame
    pub(crate) inv_inertia_local: Vec3,
    /// Position and orientation
    pub transform: Transform,
    pub linear_velocity: Vec3,
    /// Angular velocity in world space (radians per second)
    pub angular_velocity: Vec3,
    /// Force accumulated for the current step
    pub(crate) force: Vec3,
    /// Torque accumulated for the current step
    pub(crate) torque: Vec3,
    pub material: PhysicsMaterial,
    pub filter: CollisionFilter,
}

impl RigidBody {
    /// Create a body of `mass` at `position`; the caller validates inputs
    pub fn new(shape: Shape, mass: f64, position: Vec3) -> Self {
        let (inv_mass, inv_inertia_local) = if mass > 0.0 && shape.is_bounded() {
            let inertia = shape.inertia_diagonal(mass);
            let inv = |i: f64| if i > 0.0 { 1.0 / i } else { 0.0 };
            (1.0 / mass, Vec3::new(inv(inertia.x), inv(inertia.y), inv(inertia.z)))
        } else {
            (0.0, Vec3::ZERO)
        };
        let filter = if inv_mass == 0.0 {
            CollisionFilter::static_world()
        } else {
            CollisionFilter::default()
        };
        Self {
            shape,
            mass: if inv_mass == 0.0 { 0.0 } else { mass },
            inv_mass,
            inv_inertia_local,
            transform: Transform::from_position(position),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            material: PhysicsMaterial::default(),
            filter,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation.normalize();
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn body_type(&self) -> BodyType {
        if self.inv_mass > 0.0 {
            BodyType::Dynamic
        } else {
            BodyType::Static
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Inverse inertia tensor in world space
    pub fn inv_inertia_world(&self) -> Mat3 {
        if self.is_static() {
            return Mat3::ZERO;
        }
        Mat3::rotate_diagonal(self.transform.rotation, self.inv_inertia_local)
    }

    /// Inertia tensor in world space
    pub fn inertia_world(&self) -> Mat3 {
        if self.is_static() {
            return Mat3::ZERO;
        }
        Mat3::rotate_diagonal(self.transform.rotation, self.shape.inertia_diagonal(self.mass))
    }

    /// Velocity of the material point at world position `point`
    #[inline]
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.transform.position)
    }

    /// Apply an impulse through the centre of mass
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Apply an impulse at a world point, changing both linear and angular velocity
    pub fn apply_impulse_at(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        let r = point - self.transform.position;
        self.angular_velocity += self.inv_inertia_world() * r.cross(impulse);
    }

    /// Apply an angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += self.inv_inertia_world() * impulse;
    }

    /// Accumulate a force through the centre of mass for the current step
    pub fn add_force(&mut self, force: Vec3) {
        if !self.is_static() {
            self.force += force;
        }
    }

    /// Accumulate a force applied at a world point
    pub fn add_force_at_point(&mut self, force: Vec3, point: Vec3) {
        if !self.is_static() {
            self.force += force;
            self.torque += (point - self.transform.position).cross(force);
        }
    }

    pub fn add_torque(&mut self, torque: Vec3) {
        if !self.is_static() {
            self.torque += torque;
        }
    }

    pub(crate) fn clear_loads(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Translational plus rotational kinetic energy
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        let linear = 0.5 * self.mass * self.linear_velocity.length_squared();
        let angular = 0.5 * self.angular_velocity.dot(self.inertia_world() * self.angular_velocity);
        linear + angular
    }

    /// Gravitational potential energy relative to the origin
    pub fn potential_energy(&self, gravity: Vec3) -> f64 {
        -self.mass * gravity.dot(self.transform.position)
    }

    /// Kinetic plus gravitational potential energy
    pub fn energy(&self, gravity: Vec3) -> f64 {
        self.kinetic_energy() + self.potential_energy(gravity)
    }

    /// True when pose and velocities are finite and the orientation is a unit rotation
    pub fn is_sane(&self) -> bool {
        self.transform.position.is_finite()
            && self.linear_velocity.is_finite()
            && self.angular_velocity.is_finite()
            && self.transform.rotation.is_unit()
    }
}
