//! Physics world and simulation

use askit_math::{Aabb, Quat, Shape, Vec3};
use askit_ode::{rk4_step, Workspace};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::body::{BodyId, RigidBody};
use crate::collision::{collide, CollisionFilter, ContactManifold};
use crate::constraint::{Constraint, ConstraintId, Hinge, HingeAnchor, Spring};
use crate::error::PhysicsError;
use crate::fluid::BoundaryCollider;
use crate::material::PhysicsMaterial;
use crate::solver::{ContactSolver, SolverBody, SolverSettings};
use crate::spatial::SpatialHash;

/// Largest number of broad-phase cells a single body may cover before it is
/// paired with everything instead
const MAX_CELLS_PER_BODY: f64 = 4096.0;

/// How body positions are advanced after the velocity solve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Symplectic Euler: velocities first, then positions
    #[default]
    SemiImplicitEuler,
    /// Bodies attached to springs are advanced with RK4 under the spring
    /// forces; contacts and hinges stay impulse based
    Rk4,
}

/// Configuration for the physics simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration
    pub gravity: Vec3,
    /// Velocity iterations per step
    pub solver_iterations: usize,
    /// Fraction of penetration corrected per step
    pub baumgarte: f64,
    /// Penetration tolerated without correction
    pub linear_slop: f64,
    /// Cap on the push-out velocity for overlapping bodies
    pub max_correction_velocity: f64,
    /// Closing speed below which contacts do not bounce
    pub restitution_threshold: f64,
    pub integrator: Integrator,
    /// Side of a broad-phase grid cell
    pub broadphase_cell_size: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            solver_iterations: 10,
            baumgarte: 0.2,
            linear_slop: 0.005,
            max_correction_velocity: 4.0,
            restitution_threshold: 1.0,
            integrator: Integrator::SemiImplicitEuler,
            broadphase_cell_size: 2.0,
        }
    }
}

impl PhysicsConfig {
    /// Create a config with the given gravity and default solver tuning
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidParameter("gravity must be finite".into()));
        }
        if self.solver_iterations == 0 {
            return Err(PhysicsError::InvalidParameter("solver_iterations must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::InvalidParameter(format!(
                "baumgarte must lie in [0, 1], got {}",
                self.baumgarte
            )));
        }
        for (name, value) in [
            ("linear_slop", self.linear_slop),
            ("max_correction_velocity", self.max_correction_velocity),
            ("restitution_threshold", self.restitution_threshold),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PhysicsError::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !(self.broadphase_cell_size > 0.0 && self.broadphase_cell_size.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "broadphase_cell_size must be positive, got {}",
                self.broadphase_cell_size
            )));
        }
        Ok(())
    }

    fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            iterations: self.solver_iterations,
            baumgarte: self.baumgarte,
            linear_slop: self.linear_slop,
            max_correction_velocity: self.max_correction_velocity,
            restitution_threshold: self.restitution_threshold,
        }
    }
}

/// The physics world containing all rigid bodies and their joints
#[derive(Debug)]
pub struct PhysicsWorld {
    /// All rigid bodies in the world (using generational keys)
    bodies: SlotMap<BodyId, RigidBody>,
    /// Springs and hinges
    constraints: SlotMap<ConstraintId, Constraint>,
    config: PhysicsConfig,
    /// Simulated time in seconds
    time: f64,
    /// Manifolds found by the most recent step
    contacts: Vec<ContactManifold>,
    broadphase: SpatialHash,
    ode_workspace: Workspace,
    poisoned: bool,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::build(PhysicsConfig::default())
    }

    /// Create a new physics world with a validated custom configuration
    pub fn with_config(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PhysicsConfig) -> Self {
        log::debug!(
            "Creating physics world (gravity {:?}, {} iterations, {:?})",
            config.gravity,
            config.solver_iterations,
            config.integrator
        );
        Self {
            bodies: SlotMap::with_key(),
            constraints: SlotMap::with_key(),
            broadphase: SpatialHash::new(config.broadphase_cell_size),
            config,
            time: 0.0,
            contacts: Vec::new(),
            ode_workspace: Workspace::new(),
            poisoned: false,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Replace the configuration; rejected configs change nothing
    pub fn set_config(&mut self, config: PhysicsConfig) -> Result<(), PhysicsError> {
        config.validate()?;
        if config.broadphase_cell_size != self.config.broadphase_cell_size {
            self.broadphase = SpatialHash::new(config.broadphase_cell_size);
        }
        self.config = config;
        Ok(())
    }

    // --- creation ---

    /// Add a sphere; mass zero makes it static
    pub fn create_sphere(&mut self, radius: f64, mass: f64, position: Vec3) -> Result<BodyId, PhysicsError> {
        self.create_body(Shape::sphere(radius), mass, position)
    }

    /// Add an axis-aligned box given its half extents
    pub fn create_box(&mut self, half_extents: Vec3, mass: f64, position: Vec3) -> Result<BodyId, PhysicsError> {
        self.create_body(Shape::cuboid(half_extents), mass, position)
    }

    /// Add a cylinder whose axis is the body's local Y
    pub fn create_cylinder(
        &mut self,
        radius: f64,
        half_height: f64,
        mass: f64,
        position: Vec3,
    ) -> Result<BodyId, PhysicsError> {
        self.create_body(Shape::cylinder(radius, half_height), mass, position)
    }

    /// Add an infinite static ground plane at height `y` facing +Y
    pub fn create_ground(&mut self, y: f64) -> Result<BodyId, PhysicsError> {
        self.create_body(Shape::ground(), 0.0, Vec3::new(0.0, y, 0.0))
    }

    /// Validate and add a body built from a shape, mass and position
    pub fn create_body(&mut self, shape: Shape, mass: f64, position: Vec3) -> Result<BodyId, PhysicsError> {
        if !(mass >= 0.0 && mass.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "mass must be non-negative and finite, got {mass}"
            )));
        }
        self.add_body(RigidBody::new(shape, mass, position))
    }

    /// Add a fully built body after validating it
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyId, PhysicsError> {
        if !body.shape.is_valid() {
            return Err(PhysicsError::InvalidParameter(format!(
                "shape dimensions must be positive and finite: {:?}",
                body.shape
            )));
        }
        if !body.is_sane() {
            return Err(PhysicsError::InvalidParameter(
                "body position and velocities must be finite".into(),
            ));
        }
        let kind = body.shape.kind();
        let static_body = body.is_static();
        let id = self.bodies.insert(body);
        log::debug!("Created {kind:?} body {id:?} (static: {static_body})");
        Ok(id)
    }

    /// Remove a body together with every spring and hinge attached to it
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody, PhysicsError> {
        let body = self.bodies.remove(id).ok_or(PhysicsError::UnknownBody(id))?;
        let before = self.constraints.len();
        self.constraints.retain(|_, c| !c.references(id));
        log::debug!(
            "Removed body {id:?} and {} attached constraint(s)",
            before - self.constraints.len()
        );
        Ok(body)
    }

    // --- dynamics input ---

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<(), PhysicsError> {
        if !gravity.is_finite() {
            return Err(PhysicsError::InvalidParameter("gravity must be finite".into()));
        }
        self.config.gravity = gravity;
        Ok(())
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Set the linear velocity; on a static body this makes it kinematic
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<(), PhysicsError> {
        let velocity = finite(velocity, "velocity")?;
        self.body_mut(id)?.linear_velocity = velocity;
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: Vec3) -> Result<(), PhysicsError> {
        let angular_velocity = finite(angular_velocity, "angular velocity")?;
        self.body_mut(id)?.angular_velocity = angular_velocity;
        Ok(())
    }

    pub fn set_position(&mut self, id: BodyId, position: Vec3) -> Result<(), PhysicsError> {
        let position = finite(position, "position")?;
        self.body_mut(id)?.transform.position = position;
        Ok(())
    }

    pub fn set_orientation(&mut self, id: BodyId, rotation: Quat) -> Result<(), PhysicsError> {
        if !(rotation.length().is_finite() && rotation.length() > 1e-9) {
            return Err(PhysicsError::InvalidParameter("orientation must be a non-zero finite quaternion".into()));
        }
        self.body_mut(id)?.transform.rotation = rotation.normalize();
        Ok(())
    }

    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec3) -> Result<(), PhysicsError> {
        let impulse = finite(impulse, "impulse")?;
        self.body_mut(id)?.apply_impulse(impulse);
        Ok(())
    }

    pub fn apply_impulse_at(&mut self, id: BodyId, impulse: Vec3, point: Vec3) -> Result<(), PhysicsError> {
        let impulse = finite(impulse, "impulse")?;
        let point = finite(point, "point")?;
        self.body_mut(id)?.apply_impulse_at(impulse, point);
        Ok(())
    }

    /// Accumulate a force for the next step only
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) -> Result<(), PhysicsError> {
        let force = finite(force, "force")?;
        self.body_mut(id)?.add_force(force);
        Ok(())
    }

    pub fn apply_force_at_point(&mut self, id: BodyId, force: Vec3, point: Vec3) -> Result<(), PhysicsError> {
        let force = finite(force, "force")?;
        let point = finite(point, "point")?;
        self.body_mut(id)?.add_force_at_point(force, point);
        Ok(())
    }

    pub fn apply_torque(&mut self, id: BodyId, torque: Vec3) -> Result<(), PhysicsError> {
        let torque = finite(torque, "torque")?;
        self.body_mut(id)?.add_torque(torque);
        Ok(())
    }

    pub fn set_material(&mut self, id: BodyId, material: PhysicsMaterial) -> Result<(), PhysicsError> {
        self.body_mut(id)?.material = PhysicsMaterial::new(material.friction, material.restitution);
        Ok(())
    }

    pub fn set_collision_filter(&mut self, id: BodyId, filter: CollisionFilter) -> Result<(), PhysicsError> {
        self.body_mut(id)?.filter = filter;
        Ok(())
    }

    // --- constraints ---

    /// Spring whose rest length is the current centre distance
    pub fn create_spring(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        stiffness: f64,
        damping: f64,
    ) -> Result<ConstraintId, PhysicsError> {
        let pa = self.body(body_a)?.position();
        let pb = self.body(body_b)?.position();
        self.create_spring_with_rest_length(body_a, body_b, pa.distance(pb), stiffness, damping)
    }

    pub fn create_spring_with_rest_length(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> Result<ConstraintId, PhysicsError> {
        self.body(body_a)?;
        self.body(body_b)?;
        if body_a == body_b {
            return Err(PhysicsError::InvalidParameter("a spring needs two distinct bodies".into()));
        }
        for (name, value) in [("rest length", rest_length), ("stiffness", stiffness), ("damping", damping)] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PhysicsError::InvalidParameter(format!(
                    "spring {name} must be non-negative, got {value}"
                )));
            }
        }
        let spring = Spring {
            body_a,
            body_b,
            rest_length,
            stiffness,
            damping,
        };
        let id = self.constraints.insert(Constraint::Spring(spring));
        log::debug!("Created spring {id:?} between {body_a:?} and {body_b:?} (k = {stiffness}, c = {damping})");
        Ok(id)
    }

    /// Hinge `body` to the world at world `pivot`, rotating about world `axis`
    pub fn create_hinge(&mut self, body: BodyId, pivot: Vec3, axis: Vec3) -> Result<ConstraintId, PhysicsError> {
        let transform = self.body(body)?.transform;
        let (pivot, axis) = hinge_frame(pivot, axis)?;
        let id = self.constraints.insert(Constraint::Hinge(Hinge::to_world(body, &transform, pivot, axis)));
        log::debug!("Created world hinge {id:?} on {body:?}");
        Ok(id)
    }

    /// Hinge joining two bodies at a shared world pivot and axis
    pub fn create_hinge_between(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        pivot: Vec3,
        axis: Vec3,
    ) -> Result<ConstraintId, PhysicsError> {
        let ta = self.body(body_a)?.transform;
        let tb = self.body(body_b)?.transform;
        if body_a == body_b {
            return Err(PhysicsError::InvalidParameter("a hinge needs two distinct bodies".into()));
        }
        let (pivot, axis) = hinge_frame(pivot, axis)?;
        let hinge = Hinge::between(body_a, &ta, body_b, &tb, pivot, axis);
        let id = self.constraints.insert(Constraint::Hinge(hinge));
        log::debug!("Created hinge {id:?} between {body_a:?} and {body_b:?}");
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<Constraint, PhysicsError> {
        let constraint = self.constraints.remove(id).ok_or(PhysicsError::UnknownConstraint(id))?;
        log::debug!("Removed constraint {id:?}");
        Ok(constraint)
    }

    // --- introspection ---

    pub fn body(&self, id: BodyId) -> Result<&RigidBody, PhysicsError> {
        self.bodies.get(id).ok_or(PhysicsError::UnknownBody(id))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))
    }

    pub fn constraint(&self, id: ConstraintId) -> Result<&Constraint, PhysicsError> {
        self.constraints.get(id).ok_or(PhysicsError::UnknownConstraint(id))
    }

    pub fn position(&self, id: BodyId) -> Result<Vec3, PhysicsError> {
        self.body(id).map(RigidBody::position)
    }

    pub fn velocity(&self, id: BodyId) -> Result<Vec3, PhysicsError> {
        self.body(id).map(|b| b.linear_velocity)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Bodies in insertion-stable slot order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Contact manifolds found during the last step
    pub fn contacts(&self) -> &[ContactManifold] {
        &self.contacts
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// True once a step has detected corrupt state
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Elastic energy stored in all springs
    pub fn spring_energy(&self) -> f64 {
        self.constraints
            .values()
            .filter_map(Constraint::as_spring)
            .filter_map(|s| {
                let pa = self.bodies.get(s.body_a)?.position();
                let pb = self.bodies.get(s.body_b)?.position();
                Some(s.potential_energy(pa, pb))
            })
            .sum()
    }

    /// Kinetic plus gravitational energy of every body plus spring energy
    pub fn total_energy(&self) -> f64 {
        let gravity = self.config.gravity;
        let bodies: f64 = self.bodies.values().map(|b| b.energy(gravity)).sum();
        bodies + self.spring_energy()
    }

    /// Rigid shapes fluid particles collide with
    pub fn fluid_colliders(&self) -> Vec<BoundaryCollider> {
        let fluid = CollisionFilter::fluid();
        self.bodies
            .values()
            .filter(|b| b.filter.collides_with(&fluid))
            .map(|b| BoundaryCollider {
                shape: b.shape,
                transform: b.transform,
                velocity: b.linear_velocity,
            })
            .collect()
    }

    // --- simulation ---

    /// Step the physics simulation forward by `dt` seconds
    ///
    /// This performs:
    /// 1. Gravity and accumulated loads into velocities
    /// 2. Broad phase over swept bounds
    /// 3. Narrow phase with speculative margins
    /// 4. Joint velocity solve of hinges, springs and contacts
    /// 5. Position and orientation integration
    /// 6. State validation
    pub fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        if self.poisoned {
            return Err(PhysicsError::WorldPoisoned);
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!("dt must be positive and finite, got {dt}")));
        }

        let ids: Vec<BodyId> = self.bodies.keys().collect();
        let mut index: SecondaryMap<BodyId, usize> = SecondaryMap::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            index.insert(id, i);
        }

        // Phase 1: external loads
        let gravity = self.config.gravity;
        let mut solver_bodies: Vec<SolverBody> = Vec::with_capacity(ids.len() + 1);
        for body in self.bodies.values() {
            let mut linear_velocity = body.linear_velocity;
            let mut angular_velocity = body.angular_velocity;
            let inv_inertia = body.inv_inertia_world();
            if !body.is_static() {
                linear_velocity += (gravity + body.force() * body.inv_mass()) * dt;
                angular_velocity += inv_inertia * body.torque() * dt;
            }
            solver_bodies.push(SolverBody {
                position: body.position(),
                rotation: body.rotation(),
                linear_velocity,
                angular_velocity,
                inv_mass: body.inv_mass(),
                inv_inertia,
            });
        }
        let world_index = solver_bodies.len();
        solver_bodies.push(SolverBody::WORLD);

        // Phases 2-3: collision detection
        let pairs = self.broad_phase(&ids, &solver_bodies, dt);
        let mut solver = ContactSolver::new(self.config.solver_settings(), dt);
        let mut manifolds = Vec::new();
        for (i, j) in pairs {
            let (a, b) = (&self.bodies[ids[i]], &self.bodies[ids[j]]);
            let margin = self.speculative_margin(a, &solver_bodies[i], b, &solver_bodies[j], dt);
            let contacts = collide(&a.shape, &a.transform, &b.shape, &b.transform, margin);
            if contacts.is_empty() {
                continue;
            }
            let material = a.material.combine(&b.material);
            solver.add_manifold(&solver_bodies, i, j, &contacts, material);
            manifolds.push(ContactManifold {
                body_a: ids[i],
                body_b: ids[j],
                contacts,
            });
        }

        // Phase 4: joints then contacts, solved together
        let rk4_springs = self.config.integrator == Integrator::Rk4;
        for constraint in self.constraints.values() {
            match constraint {
                Constraint::Hinge(hinge) => {
                    let Some(&a) = index.get(hinge.body) else { continue };
                    let (b, pivot_b, axis_b) = match hinge.anchor {
                        HingeAnchor::World { pivot, axis } => (world_index, pivot, axis),
                        HingeAnchor::Body { body, local_pivot, local_axis } => {
                            let Some(&b) = index.get(body) else { continue };
                            (b, local_pivot, local_axis)
                        }
                    };
                    solver.add_hinge(&solver_bodies, a, hinge.local_pivot, hinge.local_axis, b, pivot_b, axis_b);
                }
                Constraint::Spring(spring) if !rk4_springs => {
                    let (Some(&a), Some(&b)) = (index.get(spring.body_a), index.get(spring.body_b)) else {
                        continue;
                    };
                    solver.add_spring(&solver_bodies, a, b, spring.rest_length, spring.stiffness, spring.damping, dt);
                }
                Constraint::Spring(_) => {}
            }
        }
        solver.solve(&mut solver_bodies);

        // Phase 5: integrate
        let mut positions: Vec<Vec3> = solver_bodies[..world_index]
            .iter()
            .map(|sb| sb.position + sb.linear_velocity * dt)
            .collect();
        if rk4_springs {
            self.integrate_springs_rk4(&index, &mut solver_bodies, &mut positions, dt);
        }
        for (i, &id) in ids.iter().enumerate() {
            let body = &mut self.bodies[id];
            let sb = &solver_bodies[i];
            body.linear_velocity = sb.linear_velocity;
            body.angular_velocity = sb.angular_velocity;
            body.transform.position = positions[i];
            if sb.angular_velocity != Vec3::ZERO {
                body.transform.rotation = body.transform.rotation.integrate(sb.angular_velocity, dt);
            }
            body.clear_loads();
        }
        self.contacts = manifolds;
        self.time += dt;

        // Phase 6: validate
        if let Some((id, _)) = self.bodies.iter().find(|(_, b)| !b.is_sane()) {
            self.poisoned = true;
            log::error!("Body {id:?} left the step with non-finite state; world poisoned");
            return Err(PhysicsError::InvariantViolation(format!(
                "body {id:?} has non-finite pose or velocity"
            )));
        }
        Ok(())
    }

    /// Candidate pairs `(i, j)` with `i < j`, sorted
    fn broad_phase(&mut self, ids: &[BodyId], solver_bodies: &[SolverBody], dt: f64) -> Vec<(usize, usize)> {
        self.broadphase.clear();
        let cell = self.broadphase.cell_size();
        let mut unbounded = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            let body = &self.bodies[id];
            let swept = body.shape.aabb(&body.transform).map(|aabb| {
                aabb.swept(solver_bodies[i].linear_velocity * dt)
                    .expanded(self.config.linear_slop)
            });
            match swept {
                Some(aabb) if cell_count(&aabb, cell) <= MAX_CELLS_PER_BODY => {
                    self.broadphase.insert_aabb(i, &aabb)
                }
                _ => unbounded.push(i),
            }
        }

        let mut pairs = self.broadphase.candidate_pairs();
        for &u in &unbounded {
            for i in 0..ids.len() {
                if i != u {
                    pairs.push((u.min(i), u.max(i)));
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs.retain(|&(i, j)| {
            let (a, b) = (&self.bodies[ids[i]], &self.bodies[ids[j]]);
            !(a.is_static() && b.is_static()) && a.filter.collides_with(&b.filter)
        });
        pairs
    }

    /// Distance within which separated shapes still produce speculative contacts
    fn speculative_margin(&self, a: &RigidBody, sa: &SolverBody, b: &RigidBody, sb: &SolverBody, dt: f64) -> f64 {
        let reach = |body: &RigidBody, s: &SolverBody| {
            let radius = body.shape.bounding_radius();
            let spin = if radius.is_finite() { s.angular_velocity.length() * radius } else { 0.0 };
            s.linear_velocity.length() + spin
        };
        (reach(a, sa) + reach(b, sb)) * dt + self.config.linear_slop
    }

    /// Advance bodies attached to springs with RK4 under the spring forces
    ///
    /// The state is `[positions.., velocities..]` for every dynamic body a
    /// spring touches. Static endpoints are held at their step-start state.
    fn integrate_springs_rk4(
        &mut self,
        index: &SecondaryMap<BodyId, usize>,
        solver_bodies: &mut [SolverBody],
        positions: &mut [Vec3],
        dt: f64,
    ) {
        let springs: Vec<(usize, usize, Spring)> = self
            .constraints
            .values()
            .filter_map(Constraint::as_spring)
            .filter_map(|s| Some((*index.get(s.body_a)?, *index.get(s.body_b)?, *s)))
            .collect();
        if springs.is_empty() {
            return;
        }

        // Map solver index -> slot in the ODE state
        let mut slot = vec![None; positions.len()];
        let mut members = Vec::new();
        for &(a, b, _) in &springs {
            for i in [a, b] {
                if solver_bodies[i].inv_mass > 0.0 && slot[i].is_none() {
                    slot[i] = Some(members.len());
                    members.push(i);
                }
            }
        }
        if members.is_empty() {
            return;
        }

        let n = members.len();
        let mut state = vec![0.0; 6 * n];
        for (k, &i) in members.iter().enumerate() {
            let sb = &solver_bodies[i];
            state[3 * k..3 * k + 3].copy_from_slice(&sb.position.to_array());
            state[3 * n + 3 * k..3 * n + 3 * k + 3].copy_from_slice(&sb.linear_velocity.to_array());
        }

        let fixed: Vec<(Vec3, Vec3, f64)> = solver_bodies
            .iter()
            .map(|sb| (sb.position, sb.linear_velocity, sb.inv_mass))
            .collect();
        let read = |y: &[f64], i: usize| -> (Vec3, Vec3) {
            match slot[i] {
                Some(k) => (
                    Vec3::new(y[3 * k], y[3 * k + 1], y[3 * k + 2]),
                    Vec3::new(y[3 * n + 3 * k], y[3 * n + 3 * k + 1], y[3 * n + 3 * k + 2]),
                ),
                None => (fixed[i].0, fixed[i].1),
            }
        };
        let system = |_t: f64, y: &[f64], out: &mut [f64]| {
            out[..3 * n].copy_from_slice(&y[3 * n..]);
            out[3 * n..].fill(0.0);
            for &(a, b, spring) in &springs {
                let (pa, va) = read(y, a);
                let (pb, vb) = read(y, b);
                let force = spring.force_on_b(pa, pb, va, vb);
                for (i, f) in [(a, -force), (b, force)] {
                    if let Some(k) = slot[i] {
                        let accel = f * fixed[i].2;
                        for axis in 0..3 {
                            out[3 * n + 3 * k + axis] += accel[axis];
                        }
                    }
                }
            }
        };
        rk4_step(&system, self.time, &mut state, dt, &mut self.ode_workspace);

        for (k, &i) in members.iter().enumerate() {
            positions[i] = Vec3::new(state[3 * k], state[3 * k + 1], state[3 * k + 2]);
            solver_bodies[i].linear_velocity =
                Vec3::new(state[3 * n + 3 * k], state[3 * n + 3 * k + 1], state[3 * n + 3 * k + 2]);
        }
    }
}

fn finite(v: Vec3, what: &str) -> Result<Vec3, PhysicsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PhysicsError::InvalidParameter(format!("{what} must be finite")))
    }
}

fn hinge_frame(pivot: Vec3, axis: Vec3) -> Result<(Vec3, Vec3), PhysicsError> {
    let pivot = finite(pivot, "hinge pivot")?;
    let axis = finite(axis, "hinge axis")?
        .try_normalized()
        .ok_or_else(|| PhysicsError::InvalidParameter("hinge axis must be non-zero".into()))?;
    Ok((pivot, axis))
}

fn cell_count(aabb: &Aabb, cell: f64) -> f64 {
    let size = aabb.size();
    ((size.x / cell).floor() + 2.0) * ((size.y / cell).floor() + 2.0) * ((size.z / cell).floor() + 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn world_with_gravity(g: f64) -> PhysicsWorld {
        PhysicsWorld::with_config(PhysicsConfig::new(Vec3::new(0.0, g, 0.0))).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.solver_iterations, 10);
        assert_eq!(config.integrator, Integrator::SemiImplicitEuler);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PhysicsConfig {
            solver_iterations: 0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(PhysicsWorld::with_config(config), Err(PhysicsError::InvalidParameter(_))));
        let mut world = PhysicsWorld::new();
        let bad = PhysicsConfig {
            baumgarte: 3.0,
            ..PhysicsConfig::default()
        };
        assert!(world.set_config(bad).is_err());
        assert_eq!(world.config().baumgarte, 0.2);
    }

    #[test]
    fn test_create_rejects_bad_parameters() {
        let mut world = PhysicsWorld::new();
        assert!(matches!(world.create_sphere(0.0, 1.0, Vec3::ZERO), Err(PhysicsError::InvalidParameter(_))));
        assert!(matches!(world.create_sphere(1.0, -1.0, Vec3::ZERO), Err(PhysicsError::InvalidParameter(_))));
        assert!(world.create_box(Vec3::new(1.0, -1.0, 1.0), 1.0, Vec3::ZERO).is_err());
        assert!(world.create_cylinder(0.5, 0.0, 1.0, Vec3::ZERO).is_err());
        assert!(world.create_sphere(1.0, 1.0, Vec3::new(f64::NAN, 0.0, 0.0)).is_err());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_unknown_body_errors() {
        let mut world = PhysicsWorld::new();
        let id = world.create_sphere(1.0, 1.0, Vec3::ZERO).unwrap();
        world.remove_body(id).unwrap();
        assert_eq!(world.set_velocity(id, Vec3::X), Err(PhysicsError::UnknownBody(id)));
        assert_eq!(world.apply_impulse(id, Vec3::X), Err(PhysicsError::UnknownBody(id)));
        assert_eq!(world.apply_force(id, Vec3::X), Err(PhysicsError::UnknownBody(id)));
        assert!(matches!(world.create_hinge(id, Vec3::ZERO, Vec3::Z), Err(PhysicsError::UnknownBody(_))));
        assert!(matches!(world.remove_body(id), Err(PhysicsError::UnknownBody(_))));
    }

    #[test]
    fn test_gravity_integration() {
        let mut world = world_with_gravity(-10.0);
        let id = world.create_sphere(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)).unwrap();
        world.step(0.1).unwrap();
        assert_abs_diff_eq!(world.velocity(id).unwrap().y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(world.position(id).unwrap().y, 9.9, epsilon = 1e-12);
        assert_abs_diff_eq!(world.time(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = world_with_gravity(-10.0);
        let wall = world.create_box(Vec3::ONE, 0.0, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        world.apply_impulse(wall, Vec3::X * 10.0).unwrap();
        world.apply_force(wall, Vec3::Y * 100.0).unwrap();
        for _ in 0..50 {
            world.step(0.02).unwrap();
        }
        assert_eq!(world.position(wall).unwrap(), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_kinematic_body_moves_with_set_velocity() {
        let mut world = world_with_gravity(-10.0);
        let platform = world.create_box(Vec3::ONE, 0.0, Vec3::ZERO).unwrap();
        world.set_velocity(platform, Vec3::X).unwrap();
        world.step(0.5).unwrap();
        assert_abs_diff_eq!(world.position(platform).unwrap().x, 0.5, epsilon = 1e-12);
        assert_eq!(world.velocity(platform).unwrap(), Vec3::X);
    }

    #[test]
    fn test_force_applies_for_one_step() {
        let mut world = world_with_gravity(0.0);
        let id = world.create_sphere(0.5, 2.0, Vec3::ZERO).unwrap();
        world.apply_force(id, Vec3::X * 4.0).unwrap();
        world.step(0.5).unwrap();
        assert_abs_diff_eq!(world.velocity(id).unwrap().x, 1.0, epsilon = 1e-12);
        world.step(0.5).unwrap();
        assert_abs_diff_eq!(world.velocity(id).unwrap().x, 1.0, epsilon = 1e-12);
        assert_eq!(world.body(id).unwrap().force(), Vec3::ZERO);
    }

    #[test]
    fn test_sphere_lands_on_ground() {
        let mut world = world_with_gravity(-10.0);
        world.create_ground(0.0).unwrap();
        let ball = world.create_sphere(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)).unwrap();
        let mut landed_at = None;
        for n in 1..=100 {
            world.step(0.02).unwrap();
            let y = world.position(ball).unwrap().y;
            if landed_at.is_none() && y <= 0.5 {
                landed_at = Some(n);
            }
            assert!(y >= 0.5 - 2.0 * world.config().linear_slop - 1e-9, "ball sank to {y} at step {n}");
        }
        assert_eq!(landed_at, Some(69));
        assert_abs_diff_eq!(world.position(ball).unwrap().y, 0.495, epsilon = 1e-3);
        assert!(!world.contacts().is_empty());
    }

    #[test]
    fn test_box_rests_on_box() {
        let mut world = world_with_gravity(-10.0);
        world.create_ground(0.0).unwrap();
        let bottom = world.create_box(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        let top = world.create_box(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 1.5, 0.0)).unwrap();
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }
        let yb = world.position(bottom).unwrap().y;
        let yt = world.position(top).unwrap().y;
        assert!((yb - 0.5).abs() < 0.05, "bottom box at {yb}");
        assert!((yt - 1.5).abs() < 0.1, "top box at {yt}");
        assert!(world.velocity(top).unwrap().length() < 0.1);
    }

    #[test]
    fn test_box_dropped_on_static_box() {
        let mut world = world_with_gravity(-10.0);
        world.create_box(Vec3::splat(0.5), 0.0, Vec3::new(3.0, 0.5, 0.0)).unwrap();
        let falling = world.create_box(Vec3::splat(0.5), 1.0, Vec3::new(3.0, 2.5, 0.0)).unwrap();
        let floor = 1.5 - 2.0 * world.config().linear_slop;
        for n in 1..=180 {
            world.step(1.0 / 60.0).unwrap();
            let y = world.position(falling).unwrap().y;
            assert!(y >= floor - 1e-6, "box sank to {y} at step {n}");
        }
        let p = world.position(falling).unwrap();
        assert_abs_diff_eq!(p.y, 1.5, epsilon = 0.01);
        assert_abs_diff_eq!(p.x, 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-6);
        assert!(world.velocity(falling).unwrap().length() < 0.05);

        let manifold = &world.contacts()[0];
        assert_eq!(manifold.contacts.len(), 4);
        for c in &manifold.contacts {
            assert_abs_diff_eq!(c.normal.y.abs(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_box_dropped_on_dynamic_box() {
        let mut world = world_with_gravity(-10.0);
        world.create_ground(0.0).unwrap();
        let bottom = world.create_box(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        let top = world.create_box(Vec3::splat(0.5), 1.0, Vec3::new(0.0, 2.5, 0.0)).unwrap();
        let slop = world.config().linear_slop;
        for n in 1..=180 {
            world.step(1.0 / 60.0).unwrap();
            let yb = world.position(bottom).unwrap().y;
            let yt = world.position(top).unwrap().y;
            assert!(yb >= 0.5 - 2.0 * slop - 1e-6, "bottom box sank to {yb} at step {n}");
            assert!(yt >= yb + 1.0 - 2.0 * slop - 1e-6, "top box sank into bottom at step {n}: {yt} vs {yb}");
        }
        let yb = world.position(bottom).unwrap().y;
        let yt = world.position(top).unwrap().y;
        assert_abs_diff_eq!(yt - yb, 1.0, epsilon = 0.01);
        assert!(world.velocity(top).unwrap().length() < 0.05);
        assert!(world.velocity(bottom).unwrap().length() < 0.05);
    }

    #[test]
    fn test_filtered_pair_passes_through() {
        let mut world = world_with_gravity(-10.0);
        world.create_ground(0.0).unwrap();
        let ghost = world.create_sphere(0.5, 1.0, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        world.set_collision_filter(ghost, CollisionFilter::ghost()).unwrap();
        for _ in 0..50 {
            world.step(0.02).unwrap();
        }
        assert!(world.position(ghost).unwrap().y < 0.0);
    }

    #[test]
    fn test_remove_body_drops_constraints() {
        let mut world = world_with_gravity(0.0);
        let a = world.create_sphere(0.5, 1.0, Vec3::ZERO).unwrap();
        let b = world.create_sphere(0.5, 1.0, Vec3::X * 3.0).unwrap();
        let c = world.create_sphere(0.5, 1.0, Vec3::X * 6.0).unwrap();
        let spring = world.create_spring(a, b, 10.0, 0.0).unwrap();
        world.create_hinge(b, Vec3::X * 3.0, Vec3::Z).unwrap();
        let kept = world.create_spring(a, c, 10.0, 0.0).unwrap();
        assert_eq!(world.constraint_count(), 3);
        world.remove_body(b).unwrap();
        assert_eq!(world.constraint_count(), 1);
        assert!(matches!(world.constraint(spring), Err(PhysicsError::UnknownConstraint(_))));
        assert!(world.constraint(kept).is_ok());
        world.remove_constraint(kept).unwrap();
        assert_eq!(world.remove_constraint(kept), Err(PhysicsError::UnknownConstraint(kept)));
    }

    #[test]
    fn test_spring_rest_length_from_creation() {
        let mut world = world_with_gravity(0.0);
        let a = world.create_sphere(0.5, 1.0, Vec3::ZERO).unwrap();
        let b = world.create_sphere(0.5, 1.0, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        let id = world.create_spring(a, b, 50.0, 1.0).unwrap();
        let spring = world.constraint(id).unwrap().as_spring().copied().unwrap();
        assert_abs_diff_eq!(spring.rest_length, 2.0, epsilon = 1e-12);
        assert!(world.create_spring(a, a, 1.0, 0.0).is_err());
        assert!(world.create_spring_with_rest_length(a, b, -1.0, 1.0, 0.0).is_err());
    }

    fn stretched_oscillator(integrator: Integrator) -> (PhysicsWorld, BodyId) {
        let config = PhysicsConfig {
            gravity: Vec3::ZERO,
            integrator,
            ..PhysicsConfig::default()
        };
        let mut world = PhysicsWorld::with_config(config).unwrap();
        let anchor = world.create_sphere(0.1, 0.0, Vec3::ZERO).unwrap();
        let bob = world.create_sphere(0.1, 1.0, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        world.create_spring_with_rest_length(anchor, bob, 2.0, 20.0, 0.0).unwrap();
        (world, bob)
    }

    #[test]
    fn test_spring_energy_never_grows() {
        for integrator in [Integrator::SemiImplicitEuler, Integrator::Rk4] {
            let (mut world, _) = stretched_oscillator(integrator);
            let start = world.total_energy();
            assert_abs_diff_eq!(start, 10.0, epsilon = 1e-12);
            for _ in 0..300 {
                world.step(0.01).unwrap();
                assert!(world.total_energy() <= start + 1e-6, "{integrator:?} gained energy");
            }
        }
    }

    #[test]
    fn test_rk4_spring_conserves_energy() {
        let (mut world, bob) = stretched_oscillator(Integrator::Rk4);
        for _ in 0..100 {
            world.step(0.01).unwrap();
        }
        assert_abs_diff_eq!(world.total_energy(), 10.0, epsilon = 1e-3);
        // omega = sqrt(20), so after one second x = 2 + cos(sqrt(20))
        let expected = 2.0 + (20.0_f64).sqrt().cos();
        assert_abs_diff_eq!(world.position(bob).unwrap().x, expected, epsilon = 1e-3);
    }

    #[test]
    fn test_hinge_holds_pendulum_pivot() {
        let mut world = world_with_gravity(-10.0);
        let bob = world.create_sphere(0.2, 1.0, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        world.create_hinge(bob, Vec3::ZERO, Vec3::Z).unwrap();
        for _ in 0..50 {
            world.step(0.01).unwrap();
        }
        let p = world.position(bob).unwrap();
        assert!((p.length() - 1.0).abs() < 0.05, "pendulum length drifted to {}", p.length());
        assert!(p.y < -0.5, "pendulum has not swung down: {p:?}");
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_fluid_colliders_respect_filters() {
        let mut world = PhysicsWorld::new();
        world.create_ground(0.0).unwrap();
        let debris = world.create_sphere(0.5, 1.0, Vec3::Y).unwrap();
        world.set_collision_filter(debris, CollisionFilter::debris()).unwrap();
        world.create_sphere(0.5, 1.0, Vec3::Y * 3.0).unwrap();
        assert_eq!(world.fluid_colliders().len(), 2);
    }

    #[test]
    fn test_invalid_dt_rejected() {
        let mut world = PhysicsWorld::new();
        assert!(matches!(world.step(0.0), Err(PhysicsError::InvalidParameter(_))));
        assert!(matches!(world.step(f64::NAN), Err(PhysicsError::InvalidParameter(_))));
        assert_eq!(world.time(), 0.0);
    }

    #[test]
    fn test_non_finite_state_poisons_world() {
        let mut world = world_with_gravity(0.0);
        let id = world.create_sphere(0.5, 1.0, Vec3::ZERO).unwrap();
        world.bodies[id].linear_velocity = Vec3::new(f64::INFINITY, 0.0, 0.0);
        assert!(matches!(world.step(0.01), Err(PhysicsError::InvariantViolation(_))));
        assert!(world.is_poisoned());
        assert_eq!(world.step(0.01), Err(PhysicsError::WorldPoisoned));
    }
}
