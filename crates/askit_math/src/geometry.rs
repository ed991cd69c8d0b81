//! Intersection and distance primitives
//!
//! Signed distance functions return negative values inside the shape. The
//! accompanying normal is the outward surface direction at the closest
//! surface point, in the same frame as the query point.

use crate::Vec3;

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between the segments `p1`-`q1` and `p2`-`q2`
pub fn closest_points_on_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);
    if a <= f64::EPSILON && e <= f64::EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a <= f64::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= f64::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: any point of the first will do
            let s = if denom > f64::EPSILON { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// Signed distance from a plane `normal . x = offset` (positive on the normal side)
#[inline]
pub fn plane_signed_distance(normal: Vec3, offset: f64, p: Vec3) -> f64 {
    normal.dot(p) - offset
}

/// Signed distance from a sphere centred at the origin
pub fn sphere_signed_distance(radius: f64, p: Vec3) -> (f64, Vec3) {
    let len = p.length();
    let normal = if len > 1e-12 { p / len } else { Vec3::Y };
    (len - radius, normal)
}

/// Signed distance from an origin-centred box with the given half extents
pub fn cuboid_signed_distance(half_extents: Vec3, p: Vec3) -> (f64, Vec3) {
    let q = p.abs() - half_extents;
    if q.x > 0.0 || q.y > 0.0 || q.z > 0.0 {
        // Outside: distance to the clamped point
        let clamped = p.clamp_components(-half_extents, half_extents);
        let delta = p - clamped;
        let dist = delta.length();
        let normal = if dist > 1e-12 { delta / dist } else { Vec3::Y };
        (dist, normal)
    } else {
        // Inside: nearest face wins
        let mut axis = 0;
        if q[1] > q[axis] {
            axis = 1;
        }
        if q[2] > q[axis] {
            axis = 2;
        }
        let mut normal = Vec3::ZERO;
        normal[axis] = if p[axis] >= 0.0 { 1.0 } else { -1.0 };
        (q[axis], normal)
    }
}

/// Signed distance from an origin-centred cylinder aligned with the Y axis
pub fn cylinder_signed_distance(radius: f64, half_height: f64, p: Vec3) -> (f64, Vec3) {
    let radial = Vec3::new(p.x, 0.0, p.z);
    let r = radial.length();
    let radial_dir = if r > 1e-12 { radial / r } else { Vec3::X };
    let axial_dir = if p.y >= 0.0 { Vec3::Y } else { -Vec3::Y };

    let dr = r - radius;
    let dy = p.y.abs() - half_height;

    if dr > 0.0 && dy > 0.0 {
        // Outside, nearest feature is the rim circle
        let delta = radial_dir * dr + axial_dir * dy;
        let dist = delta.length();
        (dist, delta / dist)
    } else if dr > dy {
        (dr, radial_dir)
    } else {
        (dy, axial_dir)
    }
}
