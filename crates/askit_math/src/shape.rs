//! Collision shape primitives
//!
//! [`Shape`] is a closed set of primitives. Each variant carries only its own
//! geometric parameters, expressed in the shape's local frame; a
//! [`Transform`] places it in the world. Collision code matches on pairs of
//! variants instead of dispatching through trait objects.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::geometry::{
    cuboid_signed_distance, cylinder_signed_distance, plane_signed_distance,
    sphere_signed_distance,
};
use crate::{Aabb, Transform, Vec3};

/// Number of rim samples per cylinder cap used by point-sampled contacts
pub const CYLINDER_RIM_SAMPLES: usize = 8;

/// Geometric primitive
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Sphere centred on the local origin
    Sphere { radius: f64 },
    /// Box centred on the local origin
    Cuboid { half_extents: Vec3 },
    /// Cylinder centred on the local origin, axis along local Y
    Cylinder { radius: f64, half_height: f64 },
    /// Infinite plane `normal . x = offset` in local space; solid below
    Plane { normal: Vec3, offset: f64 },
}

/// Tag of a [`Shape`] variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Cuboid,
    Cylinder,
    Plane,
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents }
    }

    pub fn cylinder(radius: f64, half_height: f64) -> Self {
        Self::Cylinder { radius, half_height }
    }

    /// Horizontal ground plane through the local origin, facing +Y
    pub fn ground() -> Self {
        Self::Plane { normal: Vec3::Y, offset: 0.0 }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Cuboid { .. } => ShapeKind::Cuboid,
            Shape::Cylinder { .. } => ShapeKind::Cylinder,
            Shape::Plane { .. } => ShapeKind::Plane,
        }
    }

    /// All dimensions strictly positive and finite, plane normals non-zero
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v > 0.0 && v.is_finite();
        match *self {
            Shape::Sphere { radius } => positive(radius),
            Shape::Cuboid { half_extents: h } => positive(h.x) && positive(h.y) && positive(h.z),
            Shape::Cylinder { radius, half_height } => positive(radius) && positive(half_height),
            Shape::Plane { normal, offset } => {
                offset.is_finite() && normal.is_finite() && normal.length_squared() > 1e-12
            }
        }
    }

    /// Finite shapes have a bounding box; planes do not
    pub fn is_bounded(&self) -> bool {
        !matches!(self, Shape::Plane { .. })
    }

    /// Volume (zero for planes)
    pub fn volume(&self) -> f64 {
        match *self {
            Shape::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Shape::Cuboid { half_extents: h } => 8.0 * h.x * h.y * h.z,
            Shape::Cylinder { radius, half_height } => PI * radius * radius * 2.0 * half_height,
            Shape::Plane { .. } => 0.0,
        }
    }

    /// Principal moments of inertia in the local frame for a body of `mass`
    pub fn inertia_diagonal(&self, mass: f64) -> Vec3 {
        match *self {
            Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Shape::Cuboid { half_extents: h } => {
                let (x2, y2, z2) = (4.0 * h.x * h.x, 4.0 * h.y * h.y, 4.0 * h.z * h.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 12.0)
            }
            Shape::Cylinder { radius, half_height } => {
                let r2 = radius * radius;
                let height = 2.0 * half_height;
                let side = mass * (3.0 * r2 + height * height) / 12.0;
                Vec3::new(side, 0.5 * mass * r2, side)
            }
            Shape::Plane { .. } => Vec3::ZERO,
        }
    }

    /// Radius of the smallest origin-centred sphere enclosing the shape
    pub fn bounding_radius(&self) -> f64 {
        match *self {
            Shape::Sphere { radius } => radius,
            Shape::Cuboid { half_extents } => half_extents.length(),
            Shape::Cylinder { radius, half_height } => (radius * radius + half_height * half_height).sqrt(),
            Shape::Plane { .. } => f64::INFINITY,
        }
    }

    /// World-space bounding box, `None` for unbounded shapes
    pub fn aabb(&self, transform: &Transform) -> Option<Aabb> {
        let center = transform.position;
        let extents = match *self {
            Shape::Sphere { radius } => Vec3::splat(radius),
            Shape::Cuboid { half_extents: h } => {
                let ax = transform.transform_vector(Vec3::X * h.x).abs();
                let ay = transform.transform_vector(Vec3::Y * h.y).abs();
                let az = transform.transform_vector(Vec3::Z * h.z).abs();
                ax + ay + az
            }
            Shape::Cylinder { radius, half_height } => {
                let axis = transform.transform_vector(Vec3::Y);
                let radial = |a: f64| radius * (1.0 - a * a).max(0.0).sqrt();
                Vec3::new(
                    axis.x.abs() * half_height + radial(axis.x),
                    axis.y.abs() * half_height + radial(axis.y),
                    axis.z.abs() * half_height + radial(axis.z),
                )
            }
            Shape::Plane { .. } => return None,
        };
        Some(Aabb::from_center_half_extents(center, extents))
    }

    /// World-space normal and offset of a plane shape
    pub fn world_plane(&self, transform: &Transform) -> Option<(Vec3, f64)> {
        match *self {
            Shape::Plane { normal, offset } => {
                let n = transform.transform_vector(normal.normalized());
                Some((n, n.dot(transform.position) + offset))
            }
            _ => None,
        }
    }

    /// Signed distance from a world point to the surface, with the outward normal
    pub fn signed_distance(&self, transform: &Transform, point: Vec3) -> (f64, Vec3) {
        if let Some((n, offset)) = self.world_plane(transform) {
            return (plane_signed_distance(n, offset, point), n);
        }
        let local = transform.inverse_transform_point(point);
        let (d, local_normal) = match *self {
            Shape::Sphere { radius } => sphere_signed_distance(radius, local),
            Shape::Cuboid { half_extents } => cuboid_signed_distance(half_extents, local),
            Shape::Cylinder { radius, half_height } => {
                cylinder_signed_distance(radius, half_height, local)
            }
            Shape::Plane { .. } => unreachable!("planes handled above"),
        };
        (d, transform.transform_vector(local_normal))
    }

    /// Farthest point of the shape along `direction` (world space)
    pub fn support(&self, transform: &Transform, direction: Vec3) -> Vec3 {
        let local_dir = transform.inverse_transform_vector(direction);
        let local = match *self {
            Shape::Sphere { radius } => local_dir.normalized() * radius,
            Shape::Cuboid { half_extents } => local_dir.sign().component_mul(half_extents),
            Shape::Cylinder { radius, half_height } => {
                let radial = Vec3::new(local_dir.x, 0.0, local_dir.z).normalized() * radius;
                let y = if local_dir.y >= 0.0 { half_height } else { -half_height };
                radial + Vec3::Y * y
            }
            Shape::Plane { .. } => return transform.position,
        };
        transform.transform_point(local)
    }

    /// Characteristic surface points used for point-sampled contact generation
    ///
    /// Boxes yield their eight corners, cylinders a ring of rim points on
    /// each cap, spheres and planes nothing (they are handled analytically).
    pub fn surface_samples(&self, transform: &Transform) -> Vec<Vec3> {
        match *self {
            Shape::Cuboid { half_extents: h } => {
                let mut corners = Vec::with_capacity(8);
                for sx in [-1.0, 1.0] {
                    for sy in [-1.0, 1.0] {
                        for sz in [-1.0, 1.0] {
                            corners.push(transform.transform_point(Vec3::new(sx * h.x, sy * h.y, sz * h.z)));
                        }
                    }
                }
                corners
            }
            Shape::Cylinder { radius, half_height } => {
                let mut rim = Vec::with_capacity(2 * CYLINDER_RIM_SAMPLES);
                for y in [-half_height, half_height] {
                    for i in 0..CYLINDER_RIM_SAMPLES {
                        let angle = 2.0 * PI * i as f64 / CYLINDER_RIM_SAMPLES as f64;
                        let local = Vec3::new(radius * angle.cos(), y, radius * angle.sin());
                        rim.push(transform.transform_point(local));
                    }
                }
                rim
            }
            Shape::Sphere { .. } | Shape::Plane { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quat;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_validity() {
        assert!(Shape::sphere(0.5).is_valid());
        assert!(!Shape::sphere(0.0).is_valid());
        assert!(!Shape::sphere(-1.0).is_valid());
        assert!(!Shape::cuboid(Vec3::new(1.0, 0.0, 1.0)).is_valid());
        assert!(!Shape::cylinder(1.0, f64::NAN).is_valid());
        assert!(Shape::ground().is_valid());
        assert!(!Shape::Plane { normal: Vec3::ZERO, offset: 0.0 }.is_valid());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(Shape::sphere(1.0).kind(), ShapeKind::Sphere);
        assert_eq!(Shape::cuboid(Vec3::ONE).kind(), ShapeKind::Cuboid);
        assert_eq!(Shape::cylinder(1.0, 1.0).kind(), ShapeKind::Cylinder);
        assert_eq!(Shape::ground().kind(), ShapeKind::Plane);
    }

    #[test]
    fn test_inertia_sphere_and_box() {
        let sphere = Shape::sphere(1.0).inertia_diagonal(5.0);
        assert_abs_diff_eq!(sphere.x, 2.0, epsilon = 1e-12);

        // Unit cube of mass 6: I = m * (1 + 1) / 12 = 1
        let cube = Shape::cuboid(Vec3::splat(0.5)).inertia_diagonal(6.0);
        assert_abs_diff_eq!(cube.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cube.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_aabb_upright_and_lying() {
        let cyl = Shape::cylinder(0.5, 2.0);
        let upright = cyl.aabb(&Transform::IDENTITY).unwrap();
        assert_abs_diff_eq!(upright.max.y, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(upright.max.x, 0.5, epsilon = 1e-12);

        let lying = Transform::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::Z, FRAC_PI_2));
        let b = cyl.aabb(&lying).unwrap();
        assert_abs_diff_eq!(b.max.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.max.y, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_box_aabb_grows() {
        let cube = Shape::cuboid(Vec3::ONE);
        let t = Transform::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::Y, std::f64::consts::FRAC_PI_4));
        let b = cube.aabb(&t).unwrap();
        assert_abs_diff_eq!(b.max.x, 2.0_f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(b.max.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plane_has_no_aabb() {
        assert!(Shape::ground().aabb(&Transform::IDENTITY).is_none());
        assert!(!Shape::ground().is_bounded());
    }

    #[test]
    fn test_ground_signed_distance_uses_position() {
        let ground = Shape::ground();
        let t = Transform::from_position(Vec3::new(0.0, -2.0, 0.0));
        let (d, n) = ground.signed_distance(&t, Vec3::new(4.0, 1.0, 0.0));
        assert_abs_diff_eq!(d, 3.0, epsilon = 1e-12);
        assert_eq!(n, Vec3::Y);
    }

    #[test]
    fn test_rotated_box_signed_distance() {
        let cube = Shape::cuboid(Vec3::ONE);
        let t = Transform::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_axis_angle(Vec3::Z, FRAC_PI_2));
        let (d, n) = cube.signed_distance(&t, Vec3::new(10.0, 3.0, 0.0));
        assert_abs_diff_eq!(d, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(n.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_support_points() {
        let cube = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0));
        let p = cube.support(&Transform::IDENTITY, Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(p, Vec3::new(1.0, -2.0, 3.0));

        let cyl = Shape::cylinder(1.0, 1.0);
        let p = cyl.support(&Transform::IDENTITY, -Vec3::Y + Vec3::X);
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_surface_samples() {
        assert_eq!(Shape::cuboid(Vec3::ONE).surface_samples(&Transform::IDENTITY).len(), 8);
        assert_eq!(
            Shape::cylinder(1.0, 1.0).surface_samples(&Transform::IDENTITY).len(),
            2 * CYLINDER_RIM_SAMPLES
        );
        assert!(Shape::sphere(1.0).surface_samples(&Transform::IDENTITY).is_empty());
    }

    #[test]
    fn test_volume() {
        assert_abs_diff_eq!(Shape::cuboid(Vec3::ONE).volume(), 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(Shape::cylinder(1.0, 0.5).volume(), PI, epsilon = 1e-12);
    }
}
