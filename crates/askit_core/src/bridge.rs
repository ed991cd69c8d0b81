//! The `PhysicsBridge` facade
//!
//! This is the surface an animation layer or analysis tool drives: create
//! bodies and fluids, step, bind render handles, and read back history. It
//! also exposes the ODE and PDE solvers for standalone use.

use askit_math::{Aabb, Vec3};
use askit_ode::{Method, OdeSystem, Tolerance};
use askit_pde::{Grid, HeatParams, PoissonParams, PoissonSolution, WaveParams, WaveSolution};
use askit_physics::{
    BodyId, ConstraintId, FluidId, FluidSummary, PhysicsMaterial, RigidBody,
};

use crate::binding::{BindingTable, PhysicalId, PoseSink};
use crate::error::BridgeError;
use crate::timeline::Snapshot;
use crate::world::{World, WorldConfig};

/// Engine facade generic over the caller's render handle type `H`
#[derive(Debug)]
pub struct PhysicsBridge<H> {
    world: World,
    bindings: BindingTable<H>,
}

impl<H> Default for PhysicsBridge<H> {
    fn default() -> Self {
        Self {
            world: World::new(),
            bindings: BindingTable::new(),
        }
    }
}

impl<H> PhysicsBridge<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WorldConfig) -> Result<Self, BridgeError> {
        let world = World::with_config(config)?;
        log::info!("PhysicsBridge ready");
        Ok(Self {
            world,
            bindings: BindingTable::new(),
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for operations the facade does not wrap
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn bindings(&self) -> &BindingTable<H> {
        &self.bindings
    }

    pub fn time(&self) -> f64 {
        self.world.time()
    }

    // --- creation ---

    pub fn create_sphere(&mut self, radius: f64, mass: f64, position: Vec3) -> Result<BodyId, BridgeError> {
        Ok(self.world.physics_mut().create_sphere(radius, mass, position)?)
    }

    pub fn create_box(&mut self, half_extents: Vec3, mass: f64, position: Vec3) -> Result<BodyId, BridgeError> {
        Ok(self.world.physics_mut().create_box(half_extents, mass, position)?)
    }

    pub fn create_cylinder(
        &mut self,
        radius: f64,
        half_height: f64,
        mass: f64,
        position: Vec3,
    ) -> Result<BodyId, BridgeError> {
        Ok(self
            .world
            .physics_mut()
            .create_cylinder(radius, half_height, mass, position)?)
    }

    /// Static infinite plane at height `y`
    pub fn create_ground(&mut self, y: f64) -> Result<BodyId, BridgeError> {
        Ok(self.world.physics_mut().create_ground(y)?)
    }

    pub fn create_fluid_block(
        &mut self,
        bounds: Aabb,
        spacing: f64,
        mass_per_particle: f64,
    ) -> Result<FluidId, BridgeError> {
        self.world.create_fluid_block(bounds, spacing, mass_per_particle)
    }

    /// Remove a body with its constraints and binding
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody, BridgeError> {
        let body = self.world.physics_mut().remove_body(id)?;
        self.bindings.unbind(id);
        Ok(body)
    }

    /// Remove a fluid block and its binding
    pub fn remove_fluid(&mut self, id: FluidId) -> Result<(), BridgeError> {
        self.world.remove_fluid(id)?;
        self.bindings.unbind(id);
        Ok(())
    }

    // --- dynamics input ---

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().set_gravity(gravity)?)
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().set_velocity(id, velocity)?)
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: Vec3) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().set_angular_velocity(id, angular_velocity)?)
    }

    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec3) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().apply_impulse(id, impulse)?)
    }

    /// Force applied for the next step only
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().apply_force(id, force)?)
    }

    pub fn set_material(&mut self, id: BodyId, material: PhysicsMaterial) -> Result<(), BridgeError> {
        Ok(self.world.physics_mut().set_material(id, material)?)
    }

    // --- constraints ---

    pub fn create_spring(
        &mut self,
        a: BodyId,
        b: BodyId,
        stiffness: f64,
        damping: f64,
    ) -> Result<ConstraintId, BridgeError> {
        Ok(self.world.physics_mut().create_spring(a, b, stiffness, damping)?)
    }

    /// Hinge `body` to the world at `pivot` about `axis`
    pub fn create_hinge(&mut self, body: BodyId, pivot: Vec3, axis: Vec3) -> Result<ConstraintId, BridgeError> {
        Ok(self.world.physics_mut().create_hinge(body, pivot, axis)?)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), BridgeError> {
        self.world.physics_mut().remove_constraint(id)?;
        Ok(())
    }

    // --- stepping ---

    pub fn step(&mut self, dt: f64) -> Result<(), BridgeError> {
        self.world.step(dt)
    }

    /// Step, then push every bound pose to `sink`
    pub fn step_and_sync<S>(&mut self, dt: f64, sink: &mut S) -> Result<usize, BridgeError>
    where
        S: PoseSink<H> + ?Sized,
    {
        self.world.step(dt)?;
        Ok(self.sync_mobjects(sink))
    }

    // --- binding ---

    /// Bind a body or fluid block to a render handle, returning the handle it replaces
    pub fn bind_mobject(&mut self, id: impl Into<PhysicalId>, handle: H) -> Result<Option<H>, BridgeError> {
        let id = id.into();
        self.check_exists(id)?;
        Ok(self.bindings.bind(id, handle))
    }

    pub fn unbind_mobject(&mut self, id: impl Into<PhysicalId>) -> Result<H, BridgeError> {
        let id = id.into();
        self.bindings.unbind(id).ok_or(BridgeError::UnknownHandle(id))
    }

    pub fn handle_of(&self, id: impl Into<PhysicalId>) -> Result<&H, BridgeError> {
        let id = id.into();
        self.bindings.handle_of(id).ok_or(BridgeError::UnknownHandle(id))
    }

    /// Push the current pose of every binding to `sink`; returns the count written
    pub fn sync_mobjects<S>(&self, sink: &mut S) -> usize
    where
        S: PoseSink<H> + ?Sized,
    {
        self.bindings.sync_all(|id| self.world.pose_of(id), sink)
    }

    fn check_exists(&self, id: PhysicalId) -> Result<(), BridgeError> {
        match id {
            PhysicalId::Body(body) => {
                self.world.physics().body(body)?;
            }
            PhysicalId::Fluid(fluid) => {
                self.world.fluids().block(fluid)?;
            }
        }
        Ok(())
    }

    // --- introspection ---

    pub fn position(&self, id: BodyId) -> Result<Vec3, BridgeError> {
        Ok(self.world.physics().position(id)?)
    }

    pub fn velocity(&self, id: BodyId) -> Result<Vec3, BridgeError> {
        Ok(self.world.physics().velocity(id)?)
    }

    pub fn fluid_summary(&self, id: FluidId) -> Result<FluidSummary, BridgeError> {
        Ok(self.world.fluids().summary(id)?)
    }

    /// Every recorded snapshot in time order
    pub fn get_history(&self) -> std::slice::Iter<'_, Snapshot> {
        self.world.timeline().history()
    }

    /// Latest snapshot at or before `time`
    pub fn query_at(&self, time: f64) -> Result<&Snapshot, BridgeError> {
        Ok(self.world.timeline().query_at(time)?)
    }

    /// Set the timeline sample interval in seconds of simulation time
    pub fn configure(&mut self, sample_interval: f64) -> Result<(), BridgeError> {
        Ok(self.world.timeline_mut().configure(sample_interval)?)
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.world.timeline_mut().set_recording(recording);
    }

    pub fn reset_history(&mut self) {
        self.world.timeline_mut().reset();
    }

    // --- controls ---

    pub fn add_slider(&mut self, name: &str, min: f64, max: f64, initial: f64) -> Result<(), BridgeError> {
        Ok(self.world.controls_mut().add_slider(name, min, max, initial)?)
    }

    /// Move a slider; returns the clamped value
    pub fn set_slider(&mut self, name: &str, value: f64) -> Result<f64, BridgeError> {
        Ok(self.world.controls_mut().set_slider(name, value)?)
    }

    pub fn add_button(&mut self, name: &str) -> Result<(), BridgeError> {
        Ok(self.world.controls_mut().add_button(name)?)
    }

    pub fn set_button(&mut self, name: &str, pressed: bool) -> Result<(), BridgeError> {
        Ok(self.world.controls_mut().set_button(name, pressed)?)
    }

    pub fn set_variable(&mut self, name: &str, value: f64) -> Result<(), BridgeError> {
        Ok(self.world.controls_mut().set_variable(name, value)?)
    }

    // --- standalone solvers ---

    /// Advance `state` by `dt` from `t = 0` under `system`
    pub fn integrate<S: OdeSystem + ?Sized>(
        &self,
        state: &[f64],
        system: &S,
        dt: f64,
        method: Method,
        tolerance: Option<Tolerance>,
    ) -> Result<Vec<f64>, BridgeError> {
        Ok(askit_ode::integrate(system, state, 0.0, dt, method, tolerance)?)
    }

    pub fn solve_heat(&self, initial: &Grid, params: &HeatParams, source: Option<&Grid>) -> Result<Grid, BridgeError> {
        Ok(askit_pde::solve_heat(initial, params, source)?)
    }

    pub fn solve_wave(
        &self,
        initial: &Grid,
        initial_velocity: Option<&Grid>,
        params: &WaveParams,
    ) -> Result<WaveSolution, BridgeError> {
        Ok(askit_pde::solve_wave(initial, initial_velocity, params)?)
    }

    pub fn solve_poisson(
        &self,
        guess: &Grid,
        source: &Grid,
        params: &PoissonParams,
    ) -> Result<PoissonSolution, BridgeError> {
        Ok(askit_pde::solve_poisson(guess, source, params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Pose;
    use askit_physics::PhysicsError;

    #[test]
    fn test_bind_requires_existing_id() {
        let mut bridge = PhysicsBridge::new();
        let ball = bridge.create_sphere(0.5, 1.0, Vec3::ZERO).unwrap();
        assert_eq!(bridge.bind_mobject(ball, "ball").unwrap(), None);
        assert_eq!(bridge.bind_mobject(ball, "ball2").unwrap(), Some("ball"));

        bridge.remove_body(ball).unwrap();
        assert!(!bridge.bindings().is_bound(ball));
        assert!(matches!(
            bridge.bind_mobject(ball, "ghost"),
            Err(BridgeError::Physics(PhysicsError::UnknownBody(_)))
        ));
        assert!(matches!(bridge.handle_of(ball), Err(BridgeError::UnknownHandle(_))));
    }

    #[test]
    fn test_step_and_sync() {
        let mut bridge = PhysicsBridge::new();
        let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)).unwrap();
        let _unbound = bridge.create_sphere(0.5, 1.0, Vec3::new(5.0, 10.0, 0.0)).unwrap();
        bridge.bind_mobject(ball, 7_u32).unwrap();

        let mut poses: Vec<(u32, Pose)> = Vec::new();
        let written = bridge
            .step_and_sync(0.02, &mut |h: &u32, p: &Pose| poses.push((*h, *p)))
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(poses[0].0, 7);
        assert!(poses[0].1.position[1] < 10.0);
    }

    #[test]
    fn test_fluid_binding_dropped_on_removal() {
        let mut bridge = PhysicsBridge::new();
        let water = bridge
            .create_fluid_block(Aabb::new(Vec3::ZERO, Vec3::splat(0.2)), 0.1, 0.001)
            .unwrap();
        bridge.bind_mobject(water, "water").unwrap();
        assert_eq!(bridge.unbind_mobject(water).unwrap(), "water");
        bridge.bind_mobject(water, "water").unwrap();
        bridge.remove_fluid(water).unwrap();
        assert!(bridge.bindings().is_empty());
    }

    #[test]
    fn test_controls_reach_snapshots() {
        let mut bridge: PhysicsBridge<()> = PhysicsBridge::new();
        bridge.add_slider("stiffness", 0.0, 100.0, 20.0).unwrap();
        bridge.add_button("release").unwrap();
        bridge.step(0.02).unwrap();
        bridge.set_slider("stiffness", 500.0).unwrap();
        bridge.set_button("release", true).unwrap();
        bridge.step(0.02).unwrap();

        assert_eq!(bridge.query_at(0.0).unwrap().variable("stiffness"), Some(20.0));
        let latest = bridge.query_at(1.0).unwrap();
        assert_eq!(latest.variable("stiffness"), Some(100.0));
        assert_eq!(latest.variable("release"), Some(1.0));
    }

    #[test]
    fn test_standalone_solvers() {
        let bridge: PhysicsBridge<()> = PhysicsBridge::new();
        let decay = |_t: f64, y: &[f64], out: &mut [f64]| out[0] = -y[0];
        let next = bridge.integrate(&[1.0], &decay, 1.0, Method::Rk45, None).unwrap();
        assert!((next[0] - (-1.0_f64).exp()).abs() < 1e-5);

        let rod = Grid::line(11, 0.1).unwrap();
        assert!(matches!(
            bridge.solve_heat(&rod, &HeatParams::new(1.0, 1.0, 1), None),
            Err(BridgeError::Pde(_))
        ));
    }
}
