//! 3x3 matrix type
//!
//! Used for inertia tensors, rotation matrices and the small dense systems
//! that appear in point constraints.

use serde::{Deserialize, Serialize};

use crate::{Quat, Vec3};

/// Row-major 3x3 matrix
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat3 {
    /// Rows of the matrix
    pub rows: [Vec3; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const ZERO: Self = Self { rows: [Vec3::ZERO; 3] };
    pub const IDENTITY: Self = Self { rows: [Vec3::X, Vec3::Y, Vec3::Z] };

    #[inline]
    pub const fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Self {
        Self { rows: [r0, r1, r2] }
    }

    /// Diagonal matrix
    #[inline]
    pub const fn from_diagonal(d: Vec3) -> Self {
        Self::from_rows(
            Vec3::new(d.x, 0.0, 0.0),
            Vec3::new(0.0, d.y, 0.0),
            Vec3::new(0.0, 0.0, d.z),
        )
    }

    /// Rotation matrix equivalent to a unit quaternion
    pub fn from_quat(q: Quat) -> Self {
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, yy, zz) = (x * x2, y * y2, z * z2);
        let (xy, xz, yz) = (x * y2, x * z2, y * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);
        Self::from_rows(
            Vec3::new(1.0 - (yy + zz), xy - wz, xz + wy),
            Vec3::new(xy + wz, 1.0 - (xx + zz), yz - wx),
            Vec3::new(xz - wy, yz + wx, 1.0 - (xx + yy)),
        )
    }

    /// Skew-symmetric cross-product matrix: `skew(a) * b == a.cross(b)`
    pub fn skew(v: Vec3) -> Self {
        Self::from_rows(
            Vec3::new(0.0, -v.z, v.y),
            Vec3::new(v.z, 0.0, -v.x),
            Vec3::new(-v.y, v.x, 0.0),
        )
    }

    /// Column `i`
    #[inline]
    pub fn col(&self, i: usize) -> Vec3 {
        Vec3::new(self.rows[0][i], self.rows[1][i], self.rows[2][i])
    }

    pub fn transpose(&self) -> Self {
        Self::from_rows(self.col(0), self.col(1), self.col(2))
    }

    #[inline]
    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        Vec3::new(self.rows[0].dot(v), self.rows[1].dot(v), self.rows[2].dot(v))
    }

    pub fn determinant(&self) -> f64 {
        self.rows[0].dot(self.rows[1].cross(self.rows[2]))
    }

    /// Inverse, or `None` when the matrix is (numerically) singular
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-14 || !det.is_finite() {
            return None;
        }
        let [r0, r1, r2] = self.rows;
        // Columns of the inverse are cross products of the rows
        let c0 = r1.cross(r2);
        let c1 = r2.cross(r0);
        let c2 = r0.cross(r1);
        let inv_det = 1.0 / det;
        Some(Self::from_rows(c0, c1, c2).transpose().scale(inv_det))
    }

    pub fn scale(&self, s: f64) -> Self {
        Self::from_rows(self.rows[0] * s, self.rows[1] * s, self.rows[2] * s)
    }

    /// `R * D * R^T` for a diagonal `D`, the world-space form of a body-frame tensor
    pub fn rotate_diagonal(rotation: Quat, diagonal: Vec3) -> Self {
        let r = Self::from_quat(rotation);
        r * Self::from_diagonal(diagonal) * r.transpose()
    }
}

impl std::ops::Mul for Mat3 {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        let ot = o.transpose();
        let row = |r: Vec3| Vec3::new(r.dot(ot.rows[0]), r.dot(ot.rows[1]), r.dot(ot.rows[2]));
        Self::from_rows(row(self.rows[0]), row(self.rows[1]), row(self.rows[2]))
    }
}

impl std::ops::Mul<Vec3> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        self.mul_vec(v)
    }
}

impl std::ops::Add for Mat3 {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::from_rows(
            self.rows[0] + o.rows[0],
            self.rows[1] + o.rows[1],
            self.rows[2] + o.rows[2],
        )
    }
}

impl std::ops::Sub for Mat3 {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::from_rows(
            self.rows[0] - o.rows[0],
            self.rows[1] - o.rows[1],
            self.rows[2] - o.rows[2],
        )
    }
}
