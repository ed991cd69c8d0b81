//! Collision filtering and narrow-phase contact generation
//!
//! [`collide`] switches on the pair of shape variants and produces contact
//! points whose normal points from the first shape toward the second. Every
//! point carries a signed separation (negative when overlapping); points are
//! reported up to a caller-supplied margin so the solver can treat nearly
//! touching pairs as speculative contacts.

use bitflags::bitflags;

use askit_math::geometry::{closest_point_on_segment, closest_points_on_segments};
use askit_math::{Shape, Transform, Vec3};

use crate::body::BodyId;

bitflags! {
    /// Collision layers for filtering which objects can collide
    ///
    /// Each layer is a bit in a 32-bit mask. Objects can belong to multiple
    /// layers and choose which layers they collide with via a mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CollisionLayer: u32 {
        /// Default layer for dynamic bodies
        const DEFAULT = 1 << 0;
        /// Static world geometry (ground, walls)
        const STATIC = 1 << 1;
        /// Fluid particles
        const FLUID = 1 << 2;
        /// Small props that should not disturb anything else
        const DEBRIS = 1 << 3;
        /// All layers (collide with everything)
        const ALL = 0xFFFFFFFF;
    }
}

/// Collision filter determining what an object collides with
///
/// Two objects A and B collide if `A.layer & B.mask != 0` and
/// `B.layer & A.mask != 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    /// Which layer(s) this object belongs to
    pub layer: CollisionLayer,
    /// Which layer(s) this object can collide with
    pub mask: CollisionLayer,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            layer: CollisionLayer::DEFAULT,
            mask: CollisionLayer::ALL,
        }
    }
}

impl CollisionFilter {
    pub fn new(layer: CollisionLayer, mask: CollisionLayer) -> Self {
        Self { layer, mask }
    }

    /// Both objects' layers must match each other's masks
    pub fn collides_with(&self, other: &Self) -> bool {
        self.layer.intersects(other.mask) && other.layer.intersects(self.mask)
    }

    /// Static world geometry, detected by everything
    pub fn static_world() -> Self {
        Self {
            layer: CollisionLayer::STATIC,
            mask: CollisionLayer::ALL,
        }
    }

    /// Filter carried by fluid particles when they meet rigid shapes
    pub fn fluid() -> Self {
        Self {
            layer: CollisionLayer::FLUID,
            mask: CollisionLayer::ALL,
        }
    }

    /// Debris collides with static geometry only
    pub fn debris() -> Self {
        Self {
            layer: CollisionLayer::DEBRIS,
            mask: CollisionLayer::STATIC,
        }
    }

    /// Collides with nothing
    pub fn ghost() -> Self {
        Self {
            layer: CollisionLayer::DEFAULT,
            mask: CollisionLayer::empty(),
        }
    }
}

/// One contact point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// World-space point midway between the two surfaces
    pub point: Vec3,
    /// Unit normal pointing from the first shape toward the second
    pub normal: Vec3,
    /// Signed gap between the surfaces (negative means overlapping)
    pub separation: f64,
}

impl Contact {
    pub fn new(point: Vec3, normal: Vec3, separation: f64) -> Self {
        Self { point, normal, separation }
    }

    /// Penetration depth, zero for separated points
    #[inline]
    pub fn depth(&self) -> f64 {
        (-self.separation).max(0.0)
    }

    /// Check if this represents actual overlap
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.separation < 0.0
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// Contacts between one pair of bodies, normals pointing from `body_a` to `body_b`
#[derive(Clone, Debug, PartialEq)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub contacts: Vec<Contact>,
}

impl ContactManifold {
    /// Deepest penetration among the points
    pub fn max_depth(&self) -> f64 {
        self.contacts.iter().map(Contact::depth).fold(0.0, f64::max)
    }
}

/// Contact points between two placed shapes with separation below `margin`
pub fn collide(a: &Shape, ta: &Transform, b: &Shape, tb: &Transform, margin: f64) -> Vec<Contact> {
    match (a, b) {
        (Shape::Plane { .. }, Shape::Plane { .. }) => Vec::new(),
        (Shape::Plane { .. }, _) => plane_vs_shape(a, ta, b, tb, margin),
        (_, Shape::Plane { .. }) => flip(plane_vs_shape(b, tb, a, ta, margin)),
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_vs_sphere(ta.position, *ra, tb.position, *rb, margin).into_iter().collect()
        }
        (Shape::Sphere { radius }, _) => {
            sphere_vs_solid(ta.position, *radius, b, tb, margin).into_iter().collect()
        }
        (_, Shape::Sphere { radius }) => {
            flip(sphere_vs_solid(tb.position, *radius, a, ta, margin).into_iter().collect())
        }
        (Shape::Cuboid { half_extents: ha }, Shape::Cuboid { half_extents: hb }) => {
            cuboid_vs_cuboid(*ha, ta, *hb, tb, margin)
        }
        _ => sampled_vs_solid(a, ta, b, tb, margin),
    }
}

fn flip(contacts: Vec<Contact>) -> Vec<Contact> {
    contacts.into_iter().map(Contact::flipped).collect()
}

/// Sphere against sphere
pub fn sphere_vs_sphere(ca: Vec3, ra: f64, cb: Vec3, rb: f64, margin: f64) -> Option<Contact> {
    let delta = cb - ca;
    let dist = delta.length();
    let separation = dist - ra - rb;
    if separation >= margin {
        return None;
    }
    let normal = delta.try_normalized().unwrap_or(Vec3::Y);
    let point = ca + normal * (ra + 0.5 * separation);
    Some(Contact::new(point, normal, separation))
}

/// Plane (first) against any bounded shape (second)
fn plane_vs_shape(plane: &Shape, tp: &Transform, other: &Shape, to: &Transform, margin: f64) -> Vec<Contact> {
    let Some((n, offset)) = plane.world_plane(tp) else {
        return Vec::new();
    };
    let point_contact = |p: Vec3, extra: f64| {
        let separation = n.dot(p) - offset - extra;
        (separation < margin).then(|| Contact::new(p - n * (extra + 0.5 * separation), n, separation))
    };
    match *other {
        Shape::Sphere { radius } => point_contact(to.position, radius).into_iter().collect(),
        _ => other
            .surface_samples(to)
            .into_iter()
            .filter_map(|p| point_contact(p, 0.0))
            .collect(),
    }
}

/// Sphere (first) against a box or cylinder (second)
fn sphere_vs_solid(center: Vec3, radius: f64, solid: &Shape, ts: &Transform, margin: f64) -> Option<Contact> {
    let (d, outward) = solid.signed_distance(ts, center);
    let separation = d - radius;
    if separation >= margin {
        return None;
    }
    let on_solid = center - outward * d;
    let on_sphere = center - outward * radius;
    Some(Contact::new(on_solid.lerp(on_sphere, 0.5), -outward, separation))
}

/// Point-sampled contacts between two solids: samples of each shape are
/// tested against the other's signed distance
fn sampled_vs_solid(a: &Shape, ta: &Transform, b: &Shape, tb: &Transform, margin: f64) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for p in a.surface_samples(ta) {
        let (d, outward_b) = b.signed_distance(tb, p);
        if d < margin {
            contacts.push(Contact::new(p - outward_b * (0.5 * d), -outward_b, d));
        }
    }
    for p in b.surface_samples(tb) {
        let (d, outward_a) = a.signed_distance(ta, p);
        if d < margin {
            contacts.push(Contact::new(p - outward_a * (0.5 * d), outward_a, d));
        }
    }
    if contacts.is_empty() {
        contacts.extend(axis_contact(a, ta, b, tb, margin));
    }
    contacts
}

/// Fallback for solids whose samples miss each other: closest approach of
/// the two centre segments (cylinder axes, box centres)
fn axis_contact(a: &Shape, ta: &Transform, b: &Shape, tb: &Transform, margin: f64) -> Option<Contact> {
    let core = |s: &Shape, t: &Transform| match *s {
        Shape::Cylinder { half_height, .. } => {
            let axis = t.transform_vector(Vec3::Y) * half_height;
            (t.position - axis, t.position + axis)
        }
        _ => (t.position, t.position),
    };
    let (a0, a1) = core(a, ta);
    let (b0, b1) = core(b, tb);
    let on_a = closest_point_on_segment(a0, a1, tb.position);
    let on_b = closest_point_on_segment(b0, b1, on_a);
    let normal = (on_b - on_a).try_normalized()?;
    let surface_a = a.support(ta, normal);
    let surface_b = b.support(tb, -normal);
    let separation = (surface_b - surface_a).dot(normal);
    (separation < margin.min(0.0)).then(|| Contact::new(surface_a.lerp(surface_b, 0.5), normal, separation))
}

/// Face axes win over edge axes unless the edge gap is larger by this much
const EDGE_AXIS_TOLERANCE: f64 = 1e-4;
/// Edge pairs closer to parallel than this produce no cross-product axis
const PARALLEL_EPSILON: f64 = 1e-6;
/// Slack when clipping incident vertices against reference side planes
const CLIP_TOLERANCE: f64 = 1e-9;

/// Oriented box in world space
#[derive(Clone, Copy, Debug)]
struct BoxFrame {
    center: Vec3,
    axes: [Vec3; 3],
    half: [f64; 3],
}

impl BoxFrame {
    fn new(half_extents: Vec3, t: &Transform) -> Self {
        Self {
            center: t.position,
            axes: [
                t.transform_vector(Vec3::X),
                t.transform_vector(Vec3::Y),
                t.transform_vector(Vec3::Z),
            ],
            half: half_extents.to_array(),
        }
    }

    /// Half width of the box projected onto `axis`
    fn radius_along(&self, axis: Vec3) -> f64 {
        (0..3).map(|i| self.half[i] * self.axes[i].dot(axis).abs()).sum()
    }

    /// Centre of the edge parallel to `axes[edge]` lying furthest along `dir`
    fn edge_center(&self, edge: usize, dir: Vec3) -> Vec3 {
        (0..3).filter(|&i| i != edge).fold(self.center, |acc, i| {
            let side = if self.axes[i].dot(dir) >= 0.0 { 1.0 } else { -1.0 };
            acc + self.axes[i] * (side * self.half[i])
        })
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        (0..3).fold(self.center, |acc, i| {
            let side = if self.axes[i].dot(dir) >= 0.0 { 1.0 } else { -1.0 };
            acc + self.axes[i] * (side * self.half[i])
        })
    }
}

/// Which feature pair produced the separating-axis candidate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BoxAxis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

#[derive(Clone, Copy, Debug)]
struct BoxSeparation {
    kind: BoxAxis,
    /// Unit axis oriented from A toward B
    normal: Vec3,
    /// Largest gap over the candidate axes (negative when overlapping)
    separation: f64,
}

fn box_separation(a: &BoxFrame, b: &BoxFrame) -> BoxSeparation {
    let delta = b.center - a.center;
    let evaluate = |kind: BoxAxis, axis: Vec3| {
        let along = delta.dot(axis);
        BoxSeparation {
            kind,
            normal: if along >= 0.0 { axis } else { -axis },
            separation: along.abs() - a.radius_along(axis) - b.radius_along(axis),
        }
    };

    let mut best = evaluate(BoxAxis::FaceA(0), a.axes[0]);
    for i in 1..3 {
        let candidate = evaluate(BoxAxis::FaceA(i), a.axes[i]);
        if candidate.separation > best.separation {
            best = candidate;
        }
    }
    for i in 0..3 {
        let candidate = evaluate(BoxAxis::FaceB(i), b.axes[i]);
        if candidate.separation > best.separation {
            best = candidate;
        }
    }
    for i in 0..3 {
        for k in 0..3 {
            let cross = a.axes[i].cross(b.axes[k]);
            let len = cross.length();
            if len < PARALLEL_EPSILON {
                continue;
            }
            let candidate = evaluate(BoxAxis::Edge(i, k), cross / len);
            if candidate.separation > best.separation + EDGE_AXIS_TOLERANCE {
                best = candidate;
            }
        }
    }
    best
}

/// Separating-axis test for two oriented boxes
///
/// Returns the axis of least overlap, oriented from A toward B, and the
/// overlap depth, or `None` when a separating axis exists.
pub fn cuboid_sat(ha: Vec3, ta: &Transform, hb: Vec3, tb: &Transform) -> Option<(Vec3, f64)> {
    let best = box_separation(&BoxFrame::new(ha, ta), &BoxFrame::new(hb, tb));
    (best.separation < 0.0).then_some((best.normal, -best.separation))
}

/// Box against box
///
/// Face contacts clip the incident face of one box against the side planes
/// of the reference face on the other; every point shares the reference
/// normal. Edge contacts give a single point between the two closest edges.
fn cuboid_vs_cuboid(ha: Vec3, ta: &Transform, hb: Vec3, tb: &Transform, margin: f64) -> Vec<Contact> {
    let a = BoxFrame::new(ha, ta);
    let b = BoxFrame::new(hb, tb);
    let best = box_separation(&a, &b);
    if best.separation >= margin {
        return Vec::new();
    }
    let contacts = match best.kind {
        BoxAxis::FaceA(axis) => face_contacts(&a, axis, &b, best.normal, margin),
        BoxAxis::FaceB(axis) => flip(face_contacts(&b, axis, &a, -best.normal, margin)),
        BoxAxis::Edge(i, k) => {
            let ca = a.edge_center(i, best.normal);
            let cb = b.edge_center(k, -best.normal);
            let (ea, eb) = (a.axes[i] * a.half[i], b.axes[k] * b.half[k]);
            let (on_a, on_b) = closest_points_on_segments(ca - ea, ca + ea, cb - eb, cb + eb);
            vec![Contact::new(on_a.lerp(on_b, 0.5), best.normal, best.separation)]
        }
    };
    if contacts.is_empty() {
        let point = a.support(best.normal).lerp(b.support(-best.normal), 0.5);
        return vec![Contact::new(point, best.normal, best.separation)];
    }
    contacts
}

/// Incident-face vertices of `incident` clipped to the face of `reference`
/// along `axis`; `normal` points from the reference box toward the incident one
fn face_contacts(reference: &BoxFrame, axis: usize, incident: &BoxFrame, normal: Vec3, margin: f64) -> Vec<Contact> {
    let k = (0..3)
        .max_by(|&p, &q| {
            let dp = incident.axes[p].dot(normal).abs();
            let dq = incident.axes[q].dot(normal).abs();
            dp.total_cmp(&dq)
        })
        .unwrap_or(0);
    let face_normal = if incident.axes[k].dot(normal) > 0.0 {
        -incident.axes[k]
    } else {
        incident.axes[k]
    };
    let face_center = incident.center + face_normal * incident.half[k];
    let eu = incident.axes[(k + 1) % 3] * incident.half[(k + 1) % 3];
    let ev = incident.axes[(k + 2) % 3] * incident.half[(k + 2) % 3];
    let mut polygon = vec![
        face_center + eu + ev,
        face_center - eu + ev,
        face_center - eu - ev,
        face_center + eu - ev,
    ];

    for side in [(axis + 1) % 3, (axis + 2) % 3] {
        let side_axis = reference.axes[side];
        let offset = side_axis.dot(reference.center);
        let extent = reference.half[side];
        polygon = clip_polygon(&polygon, side_axis, offset + extent);
        polygon = clip_polygon(&polygon, -side_axis, extent - offset);
    }

    let face_offset = normal.dot(reference.center) + reference.half[axis];
    polygon
        .into_iter()
        .filter_map(|p| {
            let separation = normal.dot(p) - face_offset;
            (separation < margin).then(|| Contact::new(p - normal * (0.5 * separation), normal, separation))
        })
        .collect()
}

/// Sutherland-Hodgman step keeping the part of `points` with `normal . p <= bound`
fn clip_polygon(points: &[Vec3], normal: Vec3, bound: f64) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(points.len() + 1);
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let dp = normal.dot(p) - bound;
        let dq = normal.dot(q) - bound;
        let p_inside = dp <= CLIP_TOLERANCE;
        if p_inside {
            out.push(p);
        }
        if p_inside != (dq <= CLIP_TOLERANCE) {
            let t = (dp / (dp - dq)).clamp(0.0, 1.0);
            out.push(p.lerp(q, t));
        }
    }
    out
}
