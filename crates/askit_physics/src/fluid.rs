//! Smoothed particle hydrodynamics
//!
//! Each fluid block is an independent weakly compressible particle system:
//!
//! 1. Neighbour search on a uniform hash grid with cells of one smoothing radius
//! 2. Density from the poly6 kernel
//! 3. Pressure from the Tait equation of state (negative pressure clamped)
//! 4. Symmetric pressure force (spiky gradient) and viscosity (viscosity
//!    Laplacian), plus gravity
//! 5. Semi-implicit Euler integration
//! 6. Reflect-and-damp response against rigid shapes (one way: particles
//!    never push bodies)
//!
//! Kernels follow Müller, Charypar and Gross (2003). The caller plans the
//! number of substeps from a Courant bound before stepping, so a step that
//! would need too many substeps is rejected without touching any particle.

use std::f64::consts::PI;

use askit_math::{Aabb, Shape, Transform, Vec3};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::error::PhysicsError;
use crate::spatial::SpatialHash;

new_key_type! {
    /// Key to a fluid block
    pub struct FluidId;
}

/// Largest particle count accepted for a single block
pub const MAX_PARTICLES_PER_BLOCK: usize = 1_000_000;

/// Solver parameters shared by every block
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    /// Smoothing radius as a multiple of the particle spacing
    pub smoothing_ratio: f64,
    /// Numerical speed of sound; sets the Tait stiffness
    pub speed_of_sound: f64,
    /// Tait exponent
    pub tait_exponent: f64,
    /// Dynamic viscosity
    pub viscosity: f64,
    /// Courant factor on the velocity bound
    pub cfl_velocity: f64,
    /// Courant factor on the acceleration bound
    pub cfl_force: f64,
    /// Substeps allowed per world step before reporting `StepTooLarge`
    pub max_substeps: usize,
    /// Fraction of normal speed kept when bouncing off a rigid shape
    pub boundary_restitution: f64,
    /// Fraction of tangential speed removed at a rigid shape
    pub boundary_friction: f64,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            smoothing_ratio: 2.0,
            speed_of_sound: 20.0,
            tait_exponent: 7.0,
            viscosity: 0.1,
            cfl_velocity: 0.4,
            cfl_force: 0.25,
            max_substeps: 64,
            boundary_restitution: 0.3,
            boundary_friction: 0.1,
        }
    }
}

impl FluidConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let positive = |name: &str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(PhysicsError::InvalidParameter(format!("fluid {name} must be positive, got {v}")))
            }
        };
        positive("smoothing_ratio", self.smoothing_ratio)?;
        positive("speed_of_sound", self.speed_of_sound)?;
        positive("tait_exponent", self.tait_exponent)?;
        positive("cfl_velocity", self.cfl_velocity)?;
        positive("cfl_force", self.cfl_force)?;
        if !(self.viscosity >= 0.0 && self.viscosity.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "fluid viscosity must be non-negative, got {}",
                self.viscosity
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidParameter("fluid max_substeps must be at least 1".into()));
        }
        for (name, v) in [
            ("boundary_restitution", self.boundary_restitution),
            ("boundary_friction", self.boundary_friction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PhysicsError::InvalidParameter(format!("fluid {name} must lie in [0, 1], got {v}")));
            }
        }
        Ok(())
    }
}

/// A fluid particle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub density: f64,
    pub pressure: f64,
    pub mass: f64,
}

/// Aggregate statistics of one block
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidSummary {
    pub particle_count: usize,
    pub center_of_mass: Vec3,
    pub mean_speed: f64,
    pub max_speed: f64,
    pub mean_density: f64,
    pub max_density: f64,
    pub kinetic_energy: f64,
    pub bounds: Option<Aabb>,
}

/// A rigid shape particles collide with
#[derive(Clone, Copy, Debug)]
pub struct BoundaryCollider {
    pub shape: Shape,
    pub transform: Transform,
    pub velocity: Vec3,
}

#[derive(Debug, Clone)]
struct SphKernels {
    h: f64,
    h2: f64,
    poly6: f64,
    spiky_grad: f64,
    viscosity_laplacian: f64,
}

impl SphKernels {
    fn new(h: f64) -> Self {
        Self {
            h,
            h2: h * h,
            poly6: 315.0 / (64.0 * PI * h.powi(9)),
            spiky_grad: -45.0 / (PI * h.powi(6)),
            viscosity_laplacian: 45.0 / (PI * h.powi(6)),
        }
    }

    #[inline]
    fn poly6(&self, r2: f64) -> f64 {
        if r2 >= self.h2 {
            return 0.0;
        }
        let diff = self.h2 - r2;
        self.poly6 * diff * diff * diff
    }

    /// Magnitude of the spiky gradient along the separation direction
    #[inline]
    fn spiky_grad(&self, r: f64) -> f64 {
        if r >= self.h {
            return 0.0;
        }
        let diff = self.h - r;
        self.spiky_grad * diff * diff
    }

    #[inline]
    fn viscosity_laplacian(&self, r: f64) -> f64 {
        if r >= self.h {
            return 0.0;
        }
        self.viscosity_laplacian * (self.h - r)
    }
}

/// One independent block of particles
#[derive(Debug, Clone)]
pub struct FluidBlock {
    particles: Vec<Particle>,
    spacing: f64,
    rest_density: f64,
    kernels: SphKernels,
    /// Accelerations from the most recent substep
    accelerations: Vec<Vec3>,
    grid: SpatialHash,
}

impl FluidBlock {
    fn new(positions: Vec<Vec3>, spacing: f64, mass: f64, config: &FluidConfig) -> Self {
        let h = config.smoothing_ratio * spacing;
        let kernels = SphKernels::new(h);
        let rest_density = Self::lattice_density(&kernels, spacing, mass);
        let n = positions.len();
        let particles = positions
            .into_iter()
            .map(|position| Particle {
                position,
                velocity: Vec3::ZERO,
                density: rest_density,
                pressure: 0.0,
                mass,
            })
            .collect();
        Self {
            particles,
            spacing,
            rest_density,
            kernels,
            accelerations: vec![Vec3::ZERO; n],
            grid: SpatialHash::new(h),
        }
    }

    /// Kernel sum seen by a particle inside an unbounded lattice
    fn lattice_density(kernels: &SphKernels, spacing: f64, mass: f64) -> f64 {
        let reach = (kernels.h / spacing).ceil() as i64;
        let mut sum = 0.0;
        for i in -reach..=reach {
            for j in -reach..=reach {
                for k in -reach..=reach {
                    let offset = Vec3::new(i as f64, j as f64, k as f64) * spacing;
                    sum += kernels.poly6(offset.length_squared());
                }
            }
        }
        mass * sum
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn smoothing_radius(&self) -> f64 {
        self.kernels.h
    }

    pub fn rest_density(&self) -> f64 {
        self.rest_density
    }

    /// Largest substep the Courant condition allows in the current state
    fn stable_dt(&self, config: &FluidConfig, gravity: Vec3) -> f64 {
        let max_speed = self
            .particles
            .iter()
            .map(|p| p.velocity.length())
            .fold(0.0, f64::max);
        let max_accel = self
            .accelerations
            .iter()
            .map(|a| a.length())
            .fold(gravity.length(), f64::max);
        let h = self.kernels.h;
        let velocity_bound = config.cfl_velocity * h / (config.speed_of_sound + max_speed);
        if max_accel > 0.0 {
            velocity_bound.min(config.cfl_force * (h / max_accel).sqrt())
        } else {
            velocity_bound
        }
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (i, p) in self.particles.iter().enumerate() {
            self.grid.insert_point(i, p.position);
        }
    }

    fn compute_density_pressure(&mut self, config: &FluidConfig) {
        let stiffness = self.rest_density * config.speed_of_sound * config.speed_of_sound / config.tait_exponent;
        let mut densities = vec![0.0; self.particles.len()];
        for (i, density) in densities.iter_mut().enumerate() {
            let xi = self.particles[i].position;
            let mut sum = 0.0;
            self.grid.for_each_near(xi, |j| {
                let pj = &self.particles[j];
                sum += pj.mass * self.kernels.poly6((xi - pj.position).length_squared());
            });
            *density = sum;
        }
        for (p, density) in self.particles.iter_mut().zip(densities) {
            p.density = density;
            let ratio = density / self.rest_density;
            p.pressure = (stiffness * (ratio.powf(config.tait_exponent) - 1.0)).max(0.0);
        }
    }

    fn compute_accelerations(&mut self, config: &FluidConfig, gravity: Vec3) {
        let kernels = &self.kernels;
        let particles = &self.particles;
        for (i, accel) in self.accelerations.iter_mut().enumerate() {
            let pi = &particles[i];
            let mut pressure_force = Vec3::ZERO;
            let mut viscous_force = Vec3::ZERO;
            self.grid.for_each_near(pi.position, |j| {
                if i == j {
                    return;
                }
                let pj = &particles[j];
                let delta = pi.position - pj.position;
                let r = delta.length();
                if r >= kernels.h || r <= 1e-12 || pj.density <= 0.0 {
                    return;
                }
                let dir = delta / r;
                let shared = pj.mass * (pi.pressure + pj.pressure) / (2.0 * pj.density);
                pressure_force -= dir * (shared * kernels.spiky_grad(r));
                viscous_force += (pj.velocity - pi.velocity)
                    * (config.viscosity * pj.mass / pj.density * kernels.viscosity_laplacian(r));
            });
            *accel = if pi.density > 0.0 {
                (pressure_force + viscous_force) / pi.density + gravity
            } else {
                gravity
            };
        }
    }

    fn integrate(&mut self, dt: f64) {
        for (p, a) in self.particles.iter_mut().zip(&self.accelerations) {
            p.velocity += *a * dt;
            p.position += p.velocity * dt;
        }
    }

    fn resolve_boundaries(&mut self, config: &FluidConfig, colliders: &[BoundaryCollider]) {
        let radius = 0.5 * self.spacing;
        for p in &mut self.particles {
            for collider in colliders {
                if let Some(aabb) = collider.shape.aabb(&collider.transform) {
                    if !aabb.expanded(radius).contains_point(p.position) {
                        continue;
                    }
                }
                let (d, normal) = collider.shape.signed_distance(&collider.transform, p.position);
                if d >= radius {
                    continue;
                }
                p.position += normal * (radius - d);
                let relative = p.velocity - collider.velocity;
                let vn = relative.dot(normal);
                if vn < 0.0 {
                    let normal_part = normal * vn;
                    let tangent_part = relative - normal_part;
                    let response = tangent_part * (1.0 - config.boundary_friction)
                        - normal_part * config.boundary_restitution;
                    p.velocity = collider.velocity + response;
                }
            }
        }
    }

    fn substep(&mut self, config: &FluidConfig, gravity: Vec3, colliders: &[BoundaryCollider], dt: f64) {
        self.rebuild_grid();
        self.compute_density_pressure(config);
        self.compute_accelerations(config, gravity);
        self.integrate(dt);
        self.resolve_boundaries(config, colliders);
    }

    pub fn summary(&self) -> FluidSummary {
        let n = self.particles.len();
        if n == 0 {
            return FluidSummary {
                particle_count: 0,
                center_of_mass: Vec3::ZERO,
                mean_speed: 0.0,
                max_speed: 0.0,
                mean_density: 0.0,
                max_density: 0.0,
                kinetic_energy: 0.0,
                bounds: None,
            };
        }
        let mut total_mass = 0.0;
        let mut weighted = Vec3::ZERO;
        let mut speed_sum = 0.0;
        let mut max_speed: f64 = 0.0;
        let mut density_sum = 0.0;
        let mut max_density: f64 = 0.0;
        let mut kinetic = 0.0;
        for p in &self.particles {
            let speed = p.velocity.length();
            total_mass += p.mass;
            weighted += p.position * p.mass;
            speed_sum += speed;
            max_speed = max_speed.max(speed);
            density_sum += p.density;
            max_density = max_density.max(p.density);
            kinetic += 0.5 * p.mass * speed * speed;
        }
        FluidSummary {
            particle_count: n,
            center_of_mass: if total_mass > 0.0 { weighted / total_mass } else { Vec3::ZERO },
            mean_speed: speed_sum / n as f64,
            max_speed,
            mean_density: density_sum / n as f64,
            max_density,
            kinetic_energy: kinetic,
            bounds: Aabb::from_points(self.particles.iter().map(|p| p.position)),
        }
    }

    fn is_sane(&self) -> bool {
        self.particles
            .iter()
            .all(|p| p.position.is_finite() && p.velocity.is_finite() && p.density.is_finite())
    }
}

/// Every fluid block in a world
#[derive(Debug, Clone, Default)]
pub struct FluidSolver {
    blocks: SlotMap<FluidId, FluidBlock>,
    config: FluidConfig,
}

impl FluidSolver {
    pub fn new(config: FluidConfig) -> Self {
        Self {
            blocks: SlotMap::with_key(),
            config,
        }
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Replace the solver parameters; existing blocks keep their smoothing radius
    pub fn set_config(&mut self, config: FluidConfig) -> Result<(), PhysicsError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Fill `bounds` with particles on a cubic lattice
    pub fn create_block(
        &mut self,
        bounds: Aabb,
        spacing: f64,
        mass_per_particle: f64,
    ) -> Result<FluidId, PhysicsError> {
        if !(spacing > 0.0 && spacing.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "particle spacing must be positive, got {spacing}"
            )));
        }
        if !(mass_per_particle > 0.0 && mass_per_particle.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "particle mass must be positive, got {mass_per_particle}"
            )));
        }
        if !(bounds.min.is_finite() && bounds.max.is_finite()) {
            return Err(PhysicsError::InvalidParameter("fluid bounds must be finite".into()));
        }
        let size = bounds.size();
        let per_axis = |extent: f64| (extent / spacing).floor() + 1.0;
        let estimate = per_axis(size.x) * per_axis(size.y) * per_axis(size.z);
        if estimate > MAX_PARTICLES_PER_BLOCK as f64 {
            return Err(PhysicsError::InvalidParameter(format!(
                "fluid block would hold {estimate} particles (limit {MAX_PARTICLES_PER_BLOCK})"
            )));
        }

        let positions = bounds.lattice(spacing);
        let count = positions.len();
        let block = FluidBlock::new(positions, spacing, mass_per_particle, &self.config);
        let id = self.blocks.insert(block);
        log::debug!("Created fluid block {id:?} with {count} particles (spacing {spacing})");
        Ok(id)
    }

    pub fn remove_block(&mut self, id: FluidId) -> Result<(), PhysicsError> {
        self.blocks
            .remove(id)
            .map(|_| log::debug!("Removed fluid block {id:?}"))
            .ok_or(PhysicsError::UnknownFluid(id))
    }

    /// Drop every particle
    pub fn reset(&mut self) {
        self.blocks.clear();
    }

    pub fn block(&self, id: FluidId) -> Result<&FluidBlock, PhysicsError> {
        self.blocks.get(id).ok_or(PhysicsError::UnknownFluid(id))
    }

    pub fn particles(&self, id: FluidId) -> Result<&[Particle], PhysicsError> {
        self.block(id).map(FluidBlock::particles)
    }

    pub fn summary(&self, id: FluidId) -> Result<FluidSummary, PhysicsError> {
        self.block(id).map(FluidBlock::summary)
    }

    /// Summaries of every block in creation order
    pub fn summaries(&self) -> impl Iterator<Item = (FluidId, FluidSummary)> + '_ {
        self.blocks.iter().map(|(id, block)| (id, block.summary()))
    }

    pub fn contains(&self, id: FluidId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = FluidId> + '_ {
        self.blocks.keys()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn particle_count(&self) -> usize {
        self.blocks.values().map(FluidBlock::len).sum()
    }

    /// Substeps needed to cover `dt` stably, or `StepTooLarge` past the limit
    ///
    /// Reads the current state only; nothing is modified.
    pub fn plan_substeps(&self, dt: f64, gravity: Vec3) -> Result<usize, PhysicsError> {
        let mut required = 1;
        for block in self.blocks.values() {
            if block.is_empty() {
                continue;
            }
            let stable = block.stable_dt(&self.config, gravity);
            let needed = if stable > 0.0 && stable.is_finite() {
                (dt / stable).ceil().max(1.0)
            } else {
                f64::INFINITY
            };
            if needed > self.config.max_substeps as f64 {
                let required = if needed.is_finite() { needed as usize } else { usize::MAX };
                return Err(PhysicsError::StepTooLarge {
                    dt,
                    required,
                    limit: self.config.max_substeps,
                });
            }
            required = required.max(needed as usize);
        }
        Ok(required)
    }

    /// Advance every block by `dt` in `substeps` equal substeps
    pub fn step(
        &mut self,
        dt: f64,
        substeps: usize,
        gravity: Vec3,
        colliders: &[BoundaryCollider],
    ) -> Result<(), PhysicsError> {
        let substeps = substeps.max(1);
        let h = dt / substeps as f64;
        if substeps > 1 {
            log::debug!("Fluid step of {dt}s split into {substeps} substeps");
        }
        for (id, block) in &mut self.blocks {
            for _ in 0..substeps {
                block.substep(&self.config, gravity, colliders, h);
            }
            if !block.is_sane() {
                return Err(PhysicsError::InvariantViolation(format!(
                    "fluid block {id:?} has non-finite particle state"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GRAVITY: Vec3 = Vec3::new(0.0, -10.0, 0.0);

    fn cube(min: f64, max: f64) -> Aabb {
        Aabb::new(Vec3::splat(min), Vec3::splat(max))
    }

    fn ground() -> BoundaryCollider {
        BoundaryCollider {
            shape: Shape::ground(),
            transform: Transform::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }

    #[test]
    fn test_poly6_normalised() {
        // Integral of the kernel over its support is one
        let k = SphKernels::new(1.0);
        let n = 60;
        let dr = 1.0 / n as f64;
        let mut integral = 0.0;
        for i in 0..n {
            let r = (i as f64 + 0.5) * dr;
            integral += 4.0 * PI * r * r * k.poly6(r * r) * dr;
        }
        assert_relative_eq!(integral, 1.0, max_relative = 1e-3);
        assert_eq!(k.poly6(1.0), 0.0);
        assert_eq!(k.spiky_grad(1.5), 0.0);
        assert!(k.spiky_grad(0.5) < 0.0);
        assert!(k.viscosity_laplacian(0.5) > 0.0);
    }

    #[test]
    fn test_create_block_lattice() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.3), 0.1, 0.001).unwrap();
        assert_eq!(solver.particles(id).unwrap().len(), 64);
        assert_eq!(solver.particle_count(), 64);
        let block = solver.block(id).unwrap();
        assert_relative_eq!(block.smoothing_radius(), 0.2, max_relative = 1e-12);
        assert!(block.rest_density() > 0.0);
    }

    #[test]
    fn test_create_block_rejects_bad_input() {
        let mut solver = FluidSolver::default();
        assert!(matches!(
            solver.create_block(cube(0.0, 1.0), 0.0, 1.0),
            Err(PhysicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            solver.create_block(cube(0.0, 1.0), 0.1, -1.0),
            Err(PhysicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            solver.create_block(cube(0.0, 100.0), 0.01, 1.0),
            Err(PhysicsError::InvalidParameter(_))
        ));
        assert_eq!(solver.block_count(), 0);
    }

    #[test]
    fn test_interior_density_matches_rest_density() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.8), 0.1, 0.001).unwrap();
        solver.step(1e-4, 1, Vec3::ZERO, &[]).unwrap();
        let block = solver.block(id).unwrap();
        let centre = Vec3::splat(0.4);
        let interior = block
            .particles()
            .iter()
            .find(|p| (p.position - centre).length() < 1e-6)
            .unwrap();
        assert_relative_eq!(interior.density, block.rest_density(), max_relative = 1e-6);
        // Surface particles see fewer neighbours
        assert!(block.particles()[0].density < block.rest_density());
    }

    #[test]
    fn test_free_fall_without_pressure() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.3), 0.1, 0.001).unwrap();
        solver.step(0.01, 1, GRAVITY, &[]).unwrap();
        for p in solver.particles(id).unwrap() {
            assert!((p.velocity.y + 0.1).abs() < 1e-6);
            assert!(p.velocity.x.abs() < 1e-6);
        }
    }

    #[test]
    fn test_compressed_block_expands() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.3), 0.1, 0.001).unwrap();
        // Squeeze the lattice by ten percent
        for p in &mut solver.blocks[id].particles {
            p.position = p.position * 0.9;
        }
        let before = solver.summary(id).unwrap().bounds.unwrap().size();
        for _ in 0..20 {
            let n = solver.plan_substeps(0.001, Vec3::ZERO).unwrap();
            solver.step(0.001, n, Vec3::ZERO, &[]).unwrap();
        }
        let after = solver.summary(id).unwrap().bounds.unwrap().size();
        assert!(after.x > before.x);
        assert!(solver.summary(id).unwrap().max_speed > 0.0);
    }

    #[test]
    fn test_ground_keeps_particles_above() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(Aabb::new(Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.3, 0.4, 0.3)), 0.1, 0.001).unwrap();
        let colliders = [ground()];
        for _ in 0..60 {
            let n = solver.plan_substeps(1.0 / 60.0, GRAVITY).unwrap();
            solver.step(1.0 / 60.0, n, GRAVITY, &colliders).unwrap();
        }
        for p in solver.particles(id).unwrap() {
            assert!(p.position.y >= 0.05 - 1e-9, "particle below ground: {:?}", p.position);
        }
    }

    #[test]
    fn test_plan_rejects_huge_step_without_mutation() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.2), 0.1, 0.001).unwrap();
        let before = solver.particles(id).unwrap().to_vec();
        let err = solver.plan_substeps(10.0, GRAVITY).unwrap_err();
        assert!(matches!(err, PhysicsError::StepTooLarge { limit: 64, .. }));
        assert_eq!(solver.particles(id).unwrap(), before.as_slice());
        assert!(solver.plan_substeps(0.001, GRAVITY).unwrap() >= 1);
    }

    #[test]
    fn test_empty_solver_plans_one_substep() {
        let solver = FluidSolver::default();
        assert_eq!(solver.plan_substeps(1.0, GRAVITY).unwrap(), 1);
    }

    #[test]
    fn test_summary_statistics() {
        let mut solver = FluidSolver::default();
        let id = solver.create_block(cube(0.0, 0.1), 0.1, 0.5).unwrap();
        for p in &mut solver.blocks[id].particles {
            p.velocity = Vec3::new(2.0, 0.0, 0.0);
        }
        let summary = solver.summary(id).unwrap();
        assert_eq!(summary.particle_count, 8);
        assert_relative_eq!(summary.center_of_mass.x, 0.05, max_relative = 1e-12);
        assert_relative_eq!(summary.mean_speed, 2.0);
        assert_relative_eq!(summary.kinetic_energy, 8.0 * 0.5 * 0.5 * 4.0);
        assert_eq!(summary.bounds, Some(cube(0.0, 0.1)));
    }

    #[test]
    fn test_remove_and_reset() {
        let mut solver = FluidSolver::default();
        let a = solver.create_block(cube(0.0, 0.1), 0.1, 0.5).unwrap();
        let b = solver.create_block(cube(1.0, 1.1), 0.1, 0.5).unwrap();
        solver.remove_block(a).unwrap();
        assert_eq!(solver.remove_block(a), Err(PhysicsError::UnknownFluid(a)));
        assert!(solver.contains(b));
        solver.reset();
        assert_eq!(solver.block_count(), 0);
        assert!(matches!(solver.summary(b), Err(PhysicsError::UnknownFluid(_))));
    }

    #[test]
    fn test_config_validation() {
        assert!(FluidConfig::default().validate().is_ok());
        let bad = FluidConfig { max_substeps: 0, ..FluidConfig::default() };
        assert!(bad.validate().is_err());
        let bad = FluidConfig { boundary_friction: 2.0, ..FluidConfig::default() };
        let mut solver = FluidSolver::default();
        assert!(solver.set_config(bad).is_err());
    }
}
