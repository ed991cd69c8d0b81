//! Unit quaternion rotations
//!
//! Orientation of every rigid body is stored as a unit quaternion
//! `q = w + xi + yj + zk`. Composition follows the Hamilton convention, so
//! `a * b` applies `b` first and then `a`.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Quaternion used to represent 3D rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity rotation
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Tolerance used by [`Quat::is_unit`]
    pub const UNIT_TOLERANCE: f64 = 1e-6;

    #[inline]
    pub const fn from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about `axis` (normalized internally)
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = match axis.try_normalized() {
            Some(a) => a,
            None => return Self::IDENTITY,
        };
        let (s, c) = (angle * 0.5).sin_cos();
        Self::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Shortest rotation taking unit vector `from` onto unit vector `to`
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let d = from.dot(to);
        if d < -1.0 + 1e-12 {
            // Opposite vectors: rotate half a turn about any perpendicular axis
            let (axis, _) = from.orthonormal_basis();
            return Self::from_axis_angle(axis, std::f64::consts::PI);
        }
        let c = from.cross(to);
        Self::from_xyzw(c.x, c.y, c.z, 1.0 + d).normalize()
    }

    /// Vector part
    #[inline]
    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Normalize to unit length; degenerate quaternions collapse to identity
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 1e-12 && len.is_finite() {
            let inv = 1.0 / len;
            Self::from_xyzw(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// True when the quaternion is a valid rotation
    #[inline]
    pub fn is_unit(self) -> bool {
        (self.length_squared() - 1.0).abs() < Self::UNIT_TOLERANCE
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.w.is_finite()
    }

    /// Inverse of a unit quaternion
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::from_xyzw(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate a vector
    #[inline]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(q x v) + 2 q x (q x v)
        let q = self.xyz();
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }

    /// Rotate a vector by the inverse rotation
    #[inline]
    pub fn inverse_rotate(self, v: Vec3) -> Vec3 {
        self.conjugate().rotate(v)
    }

    /// Advance the orientation by angular velocity `omega` (world frame) over `dt`
    ///
    /// First-order update `q += 0.5 * (omega, 0) * q * dt` followed by
    /// renormalization.
    pub fn integrate(self, omega: Vec3, dt: f64) -> Self {
        let spin = Self::from_xyzw(omega.x, omega.y, omega.z, 0.0) * self;
        let half_dt = 0.5 * dt;
        Self::from_xyzw(
            self.x + spin.x * half_dt,
            self.y + spin.y * half_dt,
            self.z + spin.z * half_dt,
            self.w + spin.w * half_dt,
        )
        .normalize()
    }

    /// Rotation angle in radians, in `[0, pi]`
    pub fn angle(self) -> f64 {
        2.0 * self.w.abs().clamp(0.0, 1.0).acos()
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self::from_xyzw(
            self.w * o.x + self.x * o.w + self.y * o.z - self.z * o.y,
            self.w * o.y - self.x * o.z + self.y * o.w + self.z * o.x,
            self.w * o.z + self.x * o.y - self.y * o.x + self.z * o.w,
            self.w * o.w - self.x * o.x - self.y * o.y - self.z * o.z,
        )
    }
}
