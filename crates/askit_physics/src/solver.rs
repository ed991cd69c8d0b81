//! Sequential impulse solver
//!
//! Contacts, springs and hinges are turned into velocity rows once per step
//! and then relaxed together for a fixed number of iterations. Contacts use
//! accumulated, clamped impulses with Coulomb friction on two tangents and a
//! Baumgarte bias for residual penetration; separated (speculative) contacts
//! only forbid closing more than the gap within the step.
//!
//! The normal rows of one manifold are solved as a block: projected Jacobi
//! sweeps over the manifold's coupling matrix, so every point sees the same
//! velocity state and a symmetric contact patch gets symmetric impulses.
//! Manifolds are relaxed against each other Gauss-Seidel style. Springs are soft
//! constraints (stiffness and damping mapped to a softness/bias pair), hinges
//! are a point constraint plus two angular rows.

use std::ops::Range;

use askit_math::{Mat3, Quat, Vec3};

use crate::collision::Contact;
use crate::material::PhysicsMaterial;

/// Velocity-level view of a body during one solve
#[derive(Clone, Copy, Debug)]
pub struct SolverBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub inv_mass: f64,
    pub inv_inertia: Mat3,
}

impl SolverBody {
    /// Immovable frame at the origin, used as the other side of world hinges
    pub const WORLD: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
        inv_mass: 0.0,
        inv_inertia: Mat3::ZERO,
    };

    #[inline]
    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    #[inline]
    fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * r.cross(impulse);
    }

    #[inline]
    fn apply_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_velocity += self.inv_inertia * impulse;
    }

    /// Inverse effective mass along `dir` applied at arm `r`
    #[inline]
    fn inv_effective_mass(&self, r: Vec3, dir: Vec3) -> f64 {
        let rn = r.cross(dir);
        self.inv_mass + rn.dot(self.inv_inertia * rn)
    }
}

/// Tuning shared by every row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    pub iterations: usize,
    /// Fraction of position error fed back per step
    pub baumgarte: f64,
    /// Penetration allowed without correction
    pub linear_slop: f64,
    /// Cap on the velocity used to push overlapping bodies apart
    pub max_correction_velocity: f64,
    /// Closing speed below which contacts do not bounce
    pub restitution_threshold: f64,
}

#[derive(Clone, Copy, Debug)]
struct ContactRow {
    a: usize,
    b: usize,
    ra: Vec3,
    rb: Vec3,
    normal: Vec3,
    tangents: [Vec3; 2],
    tangent_mass: [f64; 2],
    friction: f64,
    restitution: f64,
    /// Normal velocity the row drives toward: closing the speculative gap
    /// or pushing out of penetration
    target_velocity: f64,
    /// Normal velocity before solving, used for restitution
    approach_velocity: f64,
    normal_impulse: f64,
    tangent_impulse: [f64; 2],
    max_normal_impulse: f64,
}

#[derive(Clone, Copy, Debug)]
struct SpringRow {
    a: usize,
    b: usize,
    normal: Vec3,
    soft_mass: f64,
    gamma: f64,
    bias: f64,
    impulse: f64,
}

#[derive(Clone, Copy, Debug)]
struct HingeRow {
    a: usize,
    b: usize,
    ra: Vec3,
    rb: Vec3,
    /// Inverse of the 3x3 point-constraint mass matrix
    point_mass: Mat3,
    point_bias: Vec3,
    axes: [Vec3; 2],
    angular_mass: [f64; 2],
    angular_bias: [f64; 2],
}

/// Rows for one step
#[derive(Debug)]
pub struct ContactSolver {
    settings: SolverSettings,
    inv_h: f64,
    contacts: Vec<ContactRow>,
    /// Row ranges of `contacts`, one per body pair
    manifolds: Vec<Range<usize>>,
    springs: Vec<SpringRow>,
    hinges: Vec<HingeRow>,
}

impl ContactSolver {
    pub fn new(settings: SolverSettings, h: f64) -> Self {
        Self {
            settings,
            inv_h: if h > 0.0 { 1.0 / h } else { 0.0 },
            contacts: Vec::new(),
            manifolds: Vec::new(),
            springs: Vec::new(),
            hinges: Vec::new(),
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Sum of the normal impulses applied to contacts during the last solve
    pub fn total_normal_impulse(&self) -> f64 {
        self.contacts.iter().map(|c| c.normal_impulse).sum()
    }

    /// Add a single contact between bodies `a` and `b` (normal from `a` to `b`)
    pub fn add_contact(
        &mut self,
        bodies: &[SolverBody],
        a: usize,
        b: usize,
        contact: &Contact,
        material: PhysicsMaterial,
    ) {
        self.add_manifold(bodies, a, b, std::slice::from_ref(contact), material);
    }

    /// Add every contact point between bodies `a` and `b` as one block
    pub fn add_manifold(
        &mut self,
        bodies: &[SolverBody],
        a: usize,
        b: usize,
        contacts: &[Contact],
        material: PhysicsMaterial,
    ) {
        if contacts.is_empty() {
            return;
        }
        let (ba, bb) = (&bodies[a], &bodies[b]);
        let settings = self.settings;
        let first = self.contacts.len();
        for contact in contacts {
            let ra = contact.point - ba.position;
            let rb = contact.point - bb.position;
            let normal = contact.normal;
            let (t1, t2) = normal.orthonormal_basis();

            let mass = |dir: Vec3| {
                let k = ba.inv_effective_mass(ra, dir) + bb.inv_effective_mass(rb, dir);
                if k > 0.0 {
                    1.0 / k
                } else {
                    0.0
                }
            };

            let s = contact.separation + settings.linear_slop;
            let target_velocity = if s > 0.0 {
                // Speculative: may close at most the remaining gap
                -s * self.inv_h
            } else {
                (-settings.baumgarte * s * self.inv_h).min(settings.max_correction_velocity)
            };

            let approach_velocity = (bb.velocity_at(rb) - ba.velocity_at(ra)).dot(normal);
            self.contacts.push(ContactRow {
                a,
                b,
                ra,
                rb,
                normal,
                tangents: [t1, t2],
                tangent_mass: [mass(t1), mass(t2)],
                friction: material.friction,
                restitution: material.restitution,
                target_velocity,
                approach_velocity,
                normal_impulse: 0.0,
                tangent_impulse: [0.0; 2],
                max_normal_impulse: 0.0,
            });
        }
        self.manifolds.push(first..self.contacts.len());
    }

    /// Add a soft spring between the centres of `a` and `b`
    pub fn add_spring(
        &mut self,
        bodies: &[SolverBody],
        a: usize,
        b: usize,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
        h: f64,
    ) {
        let delta = bodies[b].position - bodies[a].position;
        let Some(normal) = delta.try_normalized() else {
            return;
        };
        let denom = damping + h * stiffness;
        let inv_mass = bodies[a].inv_mass + bodies[b].inv_mass;
        if denom <= 0.0 || inv_mass <= 0.0 {
            return;
        }
        let gamma = 1.0 / (h * denom);
        let beta = h * stiffness / denom;
        let error = delta.length() - rest_length;
        self.springs.push(SpringRow {
            a,
            b,
            normal,
            soft_mass: 1.0 / (inv_mass + gamma),
            gamma,
            bias: beta * error * self.inv_h,
            impulse: 0.0,
        });
    }

    /// Add a hinge; pivots and axes are given in each body's local frame
    pub fn add_hinge(
        &mut self,
        bodies: &[SolverBody],
        a: usize,
        local_pivot_a: Vec3,
        local_axis_a: Vec3,
        b: usize,
        local_pivot_b: Vec3,
        local_axis_b: Vec3,
    ) {
        let (ba, bb) = (&bodies[a], &bodies[b]);
        let ra = ba.rotation.rotate(local_pivot_a);
        let rb = bb.rotation.rotate(local_pivot_b);

        let k = Mat3::IDENTITY.scale(ba.inv_mass + bb.inv_mass)
            - Mat3::skew(ra) * ba.inv_inertia * Mat3::skew(ra)
            - Mat3::skew(rb) * bb.inv_inertia * Mat3::skew(rb);
        let Some(point_mass) = k.inverse() else {
            return;
        };
        let beta = self.settings.baumgarte * self.inv_h;
        let point_error = (bb.position + rb) - (ba.position + ra);

        let axis_a = ba.rotation.rotate(local_axis_a).normalized();
        let axis_b = bb.rotation.rotate(local_axis_b).normalized();
        let (t1, t2) = axis_a.orthonormal_basis();
        let misalignment = axis_a.cross(axis_b);
        let inv_inertia = ba.inv_inertia + bb.inv_inertia;
        let angular = |t: Vec3| {
            let k = t.dot(inv_inertia * t);
            if k > 0.0 {
                1.0 / k
            } else {
                0.0
            }
        };

        self.hinges.push(HingeRow {
            a,
            b,
            ra,
            rb,
            point_mass,
            point_bias: point_error * beta,
            axes: [t1, t2],
            angular_mass: [angular(t1), angular(t2)],
            angular_bias: [misalignment.dot(t1) * beta, misalignment.dot(t2) * beta],
        });
    }

    /// Run the velocity iterations followed by the restitution pass
    pub fn solve(&mut self, bodies: &mut [SolverBody]) {
        for _ in 0..self.settings.iterations {
            for i in 0..self.hinges.len() {
                self.solve_hinge(i, bodies);
            }
            for i in 0..self.springs.len() {
                self.solve_spring(i, bodies);
            }
            for m in 0..self.manifolds.len() {
                self.solve_manifold(m, bodies);
            }
        }
        self.apply_restitution(bodies);
    }

    fn solve_manifold(&mut self, m: usize, bodies: &mut [SolverBody]) {
        let range = self.manifolds[m].clone();

        // Friction first so the normal rows get the last word on penetration
        for row in &mut self.contacts[range.clone()] {
            let (a, b) = (row.a, row.b);
            let limit = row.friction * row.normal_impulse;
            for k in 0..2 {
                let t = row.tangents[k];
                let vt = (bodies[b].velocity_at(row.rb) - bodies[a].velocity_at(row.ra)).dot(t);
                let lambda = -row.tangent_mass[k] * vt;
                let accumulated = (row.tangent_impulse[k] + lambda).clamp(-limit, limit);
                let delta = accumulated - row.tangent_impulse[k];
                row.tangent_impulse[k] = accumulated;
                bodies[a].apply_impulse(-t * delta, row.ra);
                bodies[b].apply_impulse(t * delta, row.rb);
            }
        }

        let rows = &mut self.contacts[range];
        let members: Vec<usize> = (0..rows.len()).collect();
        let targets: Vec<f64> = rows.iter().map(|row| row.target_velocity).collect();
        solve_normal_block(rows, &members, &targets, bodies);
        for row in rows.iter_mut() {
            row.max_normal_impulse = row.max_normal_impulse.max(row.normal_impulse);
        }
    }

    fn apply_restitution(&mut self, bodies: &mut [SolverBody]) {
        let threshold = self.settings.restitution_threshold;
        for m in 0..self.manifolds.len() {
            let rows = &mut self.contacts[self.manifolds[m].clone()];
            let members: Vec<usize> = (0..rows.len())
                .filter(|&i| {
                    let row = &rows[i];
                    row.restitution > 0.0 && row.approach_velocity <= -threshold && row.max_normal_impulse > 0.0
                })
                .collect();
            let targets: Vec<f64> = members
                .iter()
                .map(|&i| -rows[i].restitution * rows[i].approach_velocity)
                .collect();
            solve_normal_block(rows, &members, &targets, bodies);
        }
    }

    fn solve_spring(&mut self, i: usize, bodies: &mut [SolverBody]) {
        let row = &mut self.springs[i];
        let (a, b) = (row.a, row.b);
        let vn = (bodies[b].linear_velocity - bodies[a].linear_velocity).dot(row.normal);
        let lambda = -row.soft_mass * (vn + row.bias + row.gamma * row.impulse);
        row.impulse += lambda;
        let impulse = row.normal * lambda;
        let (ima, imb) = (bodies[a].inv_mass, bodies[b].inv_mass);
        bodies[a].linear_velocity -= impulse * ima;
        bodies[b].linear_velocity += impulse * imb;
    }

    fn solve_hinge(&mut self, i: usize, bodies: &mut [SolverBody]) {
        let row = self.hinges[i];
        let (a, b) = (row.a, row.b);

        for k in 0..2 {
            let t = row.axes[k];
            let w = (bodies[b].angular_velocity - bodies[a].angular_velocity).dot(t);
            let lambda = -row.angular_mass[k] * (w + row.angular_bias[k]);
            bodies[a].apply_angular_impulse(-t * lambda);
            bodies[b].apply_angular_impulse(t * lambda);
        }

        let cdot = bodies[b].velocity_at(row.rb) - bodies[a].velocity_at(row.ra);
        let impulse = row.point_mass * -(cdot + row.point_bias);
        bodies[a].apply_impulse(-impulse, row.ra);
        bodies[b].apply_impulse(impulse, row.rb);
    }
}

/// Upper bound on Jacobi sweeps inside one manifold block
const BLOCK_SWEEPS: usize = 64;
/// Sweeps stop once no impulse moves by more than this
const BLOCK_TOLERANCE: f64 = 1e-12;

/// Drive the normal velocity of each selected row toward its target
///
/// All rows share the same body pair. Each sweep evaluates every row against
/// the impulses of the previous sweep, with the diagonal scaled by the row
/// count so the iteration cannot overshoot; the resulting impulse changes are
/// applied to the bodies once at the end.
fn solve_normal_block(rows: &mut [ContactRow], members: &[usize], targets: &[f64], bodies: &mut [SolverBody]) {
    let Some(&first) = members.first() else {
        return;
    };
    let n = members.len();
    let (a, b) = (rows[first].a, rows[first].b);
    let (ba, bb) = (bodies[a], bodies[b]);

    let error: Vec<f64> = members
        .iter()
        .zip(targets)
        .map(|(&i, &target)| {
            let row = &rows[i];
            (bb.velocity_at(row.rb) - ba.velocity_at(row.ra)).dot(row.normal) - target
        })
        .collect();

    // J M^-1 J^T restricted to the block
    let arms: Vec<(Vec3, Vec3, Vec3)> = members
        .iter()
        .map(|&i| {
            let row = &rows[i];
            (row.normal, row.ra.cross(row.normal), row.rb.cross(row.normal))
        })
        .collect();
    let mut coupling = vec![0.0; n * n];
    for (i, &(ni, rai, rbi)) in arms.iter().enumerate() {
        for (j, &(nj, raj, rbj)) in arms.iter().enumerate() {
            coupling[i * n + j] = ni.dot(nj) * (ba.inv_mass + bb.inv_mass)
                + rai.dot(ba.inv_inertia * raj)
                + rbi.dot(bb.inv_inertia * rbj);
        }
    }

    let start: Vec<f64> = members.iter().map(|&i| rows[i].normal_impulse).collect();
    let mut impulse = start.clone();
    let mut next = start.clone();
    for _ in 0..BLOCK_SWEEPS {
        let mut change = 0.0_f64;
        for i in 0..n {
            let diagonal = n as f64 * coupling[i * n + i];
            if diagonal <= 0.0 {
                next[i] = impulse[i];
                continue;
            }
            let residual = error[i]
                + (0..n)
                    .map(|j| coupling[i * n + j] * (impulse[j] - start[j]))
                    .sum::<f64>();
            next[i] = (impulse[i] - residual / diagonal).max(0.0);
            change = change.max((next[i] - impulse[i]).abs());
        }
        std::mem::swap(&mut impulse, &mut next);
        if change <= BLOCK_TOLERANCE {
            break;
        }
    }

    for (k, &i) in members.iter().enumerate() {
        let row = &mut rows[i];
        let delta = impulse[k] - start[k];
        row.normal_impulse = impulse[k];
        bodies[a].apply_impulse(-row.normal * delta, row.ra);
        bodies[b].apply_impulse(row.normal * delta, row.rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn settings() -> SolverSettings {
        SolverSettings {
            iterations: 10,
            baumgarte: 0.2,
            linear_slop: 0.005,
            max_correction_velocity: 4.0,
            restitution_threshold: 1.0,
        }
    }

    fn ball(y: f64, vy: f64) -> SolverBody {
        SolverBody {
            position: Vec3::new(0.0, y, 0.0),
            linear_velocity: Vec3::new(0.0, vy, 0.0),
            inv_mass: 1.0,
            inv_inertia: Mat3::IDENTITY.scale(10.0),
            ..SolverBody::WORLD
        }
    }

    fn ground_contact(y: f64) -> Contact {
        // Ground (index 0) below a ball of radius 0.5 (index 1)
        Contact::new(Vec3::new(0.0, y - 0.5, 0.0), Vec3::Y, y - 0.5)
    }

    #[test]
    fn test_resting_contact_stops_fall() {
        // Already sunk by the slop: no further approach allowed
        let mut bodies = vec![SolverBody::WORLD, ball(0.495, -0.2)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.495), PhysicsMaterial::default());
        solver.solve(&mut bodies);
        assert!(bodies[1].linear_velocity.y.abs() < 1e-9);
        assert!(solver.total_normal_impulse() > 0.0);
    }

    #[test]
    fn test_speculative_contact_allows_closing_gap() {
        // 0.1 gap, 1/50 s step: may approach at up to 0.105 / 0.02 = 5.25 m/s
        let mut bodies = vec![SolverBody::WORLD, ball(0.6, -10.0)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.6), PhysicsMaterial::default());
        solver.solve(&mut bodies);
        assert_abs_diff_eq!(bodies[1].linear_velocity.y, -5.25, epsilon = 1e-9);

        // Slow approach is left alone
        let mut bodies = vec![SolverBody::WORLD, ball(0.6, -1.0)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.6), PhysicsMaterial::default());
        solver.solve(&mut bodies);
        assert_abs_diff_eq!(bodies[1].linear_velocity.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_penetration_pushes_out() {
        let mut bodies = vec![SolverBody::WORLD, ball(0.4, 0.0)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.4), PhysicsMaterial::default());
        solver.solve(&mut bodies);
        // s = -0.095, bias = 0.2 * 0.095 / 0.02
        assert_abs_diff_eq!(bodies[1].linear_velocity.y, 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_restitution_bounces() {
        let mut bodies = vec![SolverBody::WORLD, ball(0.5, -4.0)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.5), PhysicsMaterial::new(0.0, 0.5));
        solver.solve(&mut bodies);
        assert_abs_diff_eq!(bodies[1].linear_velocity.y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_friction_bounded_by_normal_impulse() {
        let mut body = ball(0.495, -1.0);
        body.linear_velocity.x = 10.0;
        body.inv_inertia = Mat3::ZERO;
        let mut bodies = vec![SolverBody::WORLD, body];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_contact(&bodies, 0, 1, &ground_contact(0.495), PhysicsMaterial::new(0.5, 0.0));
        solver.solve(&mut bodies);
        // Normal impulse 1.0, friction removes at most 0.5 of tangential speed
        assert_abs_diff_eq!(bodies[1].linear_velocity.x, 9.5, epsilon = 1e-9);
    }

    #[test]
    fn test_symmetric_manifold_gets_symmetric_impulses() {
        // Box-like body landing flat on four corner contacts
        let mut body = ball(0.5, -2.0);
        body.inv_inertia = Mat3::IDENTITY.scale(6.0);
        let mut bodies = vec![SolverBody::WORLD, body];
        let corners: Vec<Contact> = [(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.5, -0.5)]
            .iter()
            .map(|&(x, z)| Contact::new(Vec3::new(x, 0.0, z), Vec3::Y, 0.0))
            .collect();
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_manifold(&bodies, 0, 1, &corners, PhysicsMaterial::new(0.5, 0.0));
        assert_eq!(solver.contact_count(), 4);
        solver.solve(&mut bodies);

        // Gap of one slop closes at 0.005 / 0.02
        assert_abs_diff_eq!(bodies[1].linear_velocity.y, -0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(bodies[1].linear_velocity.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bodies[1].linear_velocity.z, 0.0, epsilon = 1e-12);
        assert!(bodies[1].angular_velocity.length() < 1e-12);
        let impulses: Vec<f64> = solver.contacts.iter().map(|c| c.normal_impulse).collect();
        for impulse in &impulses {
            assert_abs_diff_eq!(*impulse, impulses[0], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_manifold_is_ignored() {
        let bodies = vec![SolverBody::WORLD, ball(0.5, 0.0)];
        let mut solver = ContactSolver::new(settings(), 0.02);
        solver.add_manifold(&bodies, 0, 1, &[], PhysicsMaterial::default());
        assert_eq!(solver.contact_count(), 0);
    }

    #[test]
    fn test_soft_spring_pulls_together() {
        let mut a = ball(0.0, 0.0);
        a.position = Vec3::ZERO;
        let mut b = ball(0.0, 0.0);
        b.position = Vec3::new(2.0, 0.0, 0.0);
        let mut bodies = vec![a, b];
        let mut solver = ContactSolver::new(settings(), 0.01);
        solver.add_spring(&bodies, 0, 1, 1.0, 100.0, 0.0, 0.01);
        solver.solve(&mut bodies);
        assert!(bodies[0].linear_velocity.x > 0.0);
        assert!(bodies[1].linear_velocity.x < 0.0);
        // Momentum is conserved
        assert_abs_diff_eq!(bodies[0].linear_velocity.x + bodies[1].linear_velocity.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hinge_removes_off_axis_spin() {
        let mut body = ball(0.0, 0.0);
        body.position = Vec3::ZERO;
        body.angular_velocity = Vec3::new(1.0, 2.0, 3.0);
        let mut bodies = vec![body, SolverBody::WORLD];
        let mut solver = ContactSolver::new(settings(), 0.01);
        solver.add_hinge(&bodies, 0, Vec3::ZERO, Vec3::Z, 1, Vec3::ZERO, Vec3::Z);
        solver.solve(&mut bodies);
        let w = bodies[0].angular_velocity;
        assert_abs_diff_eq!(w.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hinge_holds_pivot() {
        // Pendulum bob one unit below the pivot, moving sideways and down
        let mut body = ball(-1.0, -2.0);
        body.linear_velocity.x = 1.0;
        let mut bodies = vec![body, SolverBody::WORLD];
        let mut solver = ContactSolver::new(settings(), 0.01);
        solver.add_hinge(&bodies, 0, Vec3::Y, Vec3::Z, 1, Vec3::ZERO, Vec3::Z);
        solver.solve(&mut bodies);
        // The pivot point on the body must not move
        let pivot_velocity = bodies[0].velocity_at(Vec3::Y);
        assert!(pivot_velocity.length() < 1e-6, "{pivot_velocity:?}");
    }
}
