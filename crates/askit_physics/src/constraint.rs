//! Persistent joints: springs and hinges
//!
//! Constraints only store body ids and body-local parameters; the world
//! resolves ids at solve time and removes every constraint that references a
//! body when that body is removed.

use askit_math::{Transform, Vec3};
use slotmap::new_key_type;

use crate::body::BodyId;

new_key_type! {
    /// Key to a spring or hinge in the physics world
    pub struct ConstraintId;
}

/// Damped spring between the centres of two bodies
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub rest_length: f64,
    /// Hooke stiffness (N/m)
    pub stiffness: f64,
    /// Linear damping along the spring axis (N s/m)
    pub damping: f64,
}

impl Spring {
    /// Elastic potential energy for the given centre positions
    pub fn potential_energy(&self, pa: Vec3, pb: Vec3) -> f64 {
        let stretch = pa.distance(pb) - self.rest_length;
        0.5 * self.stiffness * stretch * stretch
    }

    /// Force acting on body B (body A receives the opposite)
    pub fn force_on_b(&self, pa: Vec3, pb: Vec3, va: Vec3, vb: Vec3) -> Vec3 {
        let delta = pb - pa;
        let Some(dir) = delta.try_normalized() else {
            return Vec3::ZERO;
        };
        let stretch = delta.length() - self.rest_length;
        let closing = (vb - va).dot(dir);
        dir * (-self.stiffness * stretch - self.damping * closing)
    }
}

/// Other side of a hinge
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HingeAnchor {
    /// Fixed to the world at a world-space pivot and axis
    World { pivot: Vec3, axis: Vec3 },
    /// Fixed to another body at a body-local pivot and axis
    Body { body: BodyId, local_pivot: Vec3, local_axis: Vec3 },
}

/// Revolute joint: the bodies share a pivot point and may only rotate
/// relative to each other about the hinge axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hinge {
    pub body: BodyId,
    pub local_pivot: Vec3,
    /// Unit hinge axis in the body frame
    pub local_axis: Vec3,
    pub anchor: HingeAnchor,
}

impl Hinge {
    /// Hinge from `body` to the world frame through world `pivot` about world `axis`
    pub fn to_world(body: BodyId, transform: &Transform, pivot: Vec3, axis: Vec3) -> Self {
        Self {
            body,
            local_pivot: transform.inverse_transform_point(pivot),
            local_axis: transform.inverse_transform_vector(axis),
            anchor: HingeAnchor::World { pivot, axis },
        }
    }

    /// Hinge joining two bodies at a world-space pivot and axis
    pub fn between(
        body_a: BodyId,
        transform_a: &Transform,
        body_b: BodyId,
        transform_b: &Transform,
        pivot: Vec3,
        axis: Vec3,
    ) -> Self {
        Self {
            body: body_a,
            local_pivot: transform_a.inverse_transform_point(pivot),
            local_axis: transform_a.inverse_transform_vector(axis),
            anchor: HingeAnchor::Body {
                body: body_b,
                local_pivot: transform_b.inverse_transform_point(pivot),
                local_axis: transform_b.inverse_transform_vector(axis),
            },
        }
    }

    /// Second body, if the hinge is not anchored to the world
    pub fn other_body(&self) -> Option<BodyId> {
        match self.anchor {
            HingeAnchor::World { .. } => None,
            HingeAnchor::Body { body, .. } => Some(body),
        }
    }
}

/// A persistent constraint
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint {
    Spring(Spring),
    Hinge(Hinge),
}

impl Constraint {
    /// The one or two bodies this constraint references
    pub fn bodies(&self) -> (BodyId, Option<BodyId>) {
        match self {
            Constraint::Spring(s) => (s.body_a, Some(s.body_b)),
            Constraint::Hinge(h) => (h.body, h.other_body()),
        }
    }

    pub fn references(&self, id: BodyId) -> bool {
        let (a, b) = self.bodies();
        a == id || b == Some(id)
    }

    pub fn as_spring(&self) -> Option<&Spring> {
        match self {
            Constraint::Spring(s) => Some(s),
            Constraint::Hinge(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use slotmap::SlotMap;

    fn two_ids() -> (BodyId, BodyId) {
        let mut map: SlotMap<BodyId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn test_spring_energy_and_force() {
        let (a, b) = two_ids();
        let spring = Spring { body_a: a, body_b: b, rest_length: 1.0, stiffness: 10.0, damping: 0.0 };
        let pa = Vec3::ZERO;
        let pb = Vec3::new(1.5, 0.0, 0.0);
        assert_abs_diff_eq!(spring.potential_energy(pa, pb), 1.25, epsilon = 1e-12);
        // Stretched: pulls B back toward A
        let f = spring.force_on_b(pa, pb, Vec3::ZERO, Vec3::ZERO);
        assert_abs_diff_eq!(f.x, -5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spring_damping_opposes_separation() {
        let (a, b) = two_ids();
        let spring = Spring { body_a: a, body_b: b, rest_length: 1.0, stiffness: 0.0, damping: 2.0 };
        let f = spring.force_on_b(Vec3::ZERO, Vec3::X, Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        assert_abs_diff_eq!(f.x, -6.0, epsilon = 1e-12);
        assert_eq!(spring.force_on_b(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::X), Vec3::ZERO);
    }

    #[test]
    fn test_constraint_references() {
        let (a, b) = two_ids();
        let hinge = Hinge::to_world(a, &Transform::from_position(Vec3::Y), Vec3::ZERO, Vec3::Z);
        let c = Constraint::Hinge(hinge);
        assert!(c.references(a));
        assert!(!c.references(b));
        assert_eq!(hinge.local_pivot, -Vec3::Y);
        assert!(c.as_spring().is_none());

        let joined = Hinge::between(
            a,
            &Transform::IDENTITY,
            b,
            &Transform::from_position(Vec3::X * 2.0),
            Vec3::X,
            Vec3::Z,
        );
        assert_eq!(joined.other_body(), Some(b));
        assert!(Constraint::Hinge(joined).references(b));
    }
}
