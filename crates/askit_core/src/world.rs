//! The simulation world: rigid bodies, fluids, controls and their history

use askit_math::{Aabb, Vec3};
use askit_physics::{
    FluidConfig, FluidId, FluidSolver, PhysicsConfig, PhysicsError, PhysicsWorld,
};
use serde::{Deserialize, Serialize};

use crate::binding::{PhysicalId, Pose};
use crate::controls::Controls;
use crate::error::BridgeError;
use crate::timeline::{BodyState, FluidState, Snapshot, Timeline, TimelineConfig};

/// Runtime configuration of every world subsystem
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub physics: PhysicsConfig,
    pub fluid: FluidConfig,
    pub timeline: TimelineConfig,
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.physics.validate()?;
        self.fluid.validate()?;
        self.timeline.validate()?;
        Ok(())
    }
}

/// One explicitly owned simulation
///
/// Each [`step`](World::step) advances rigid bodies and fluids by the same
/// `dt` and then lets the timeline record a snapshot if one is due.
#[derive(Debug, Default)]
pub struct World {
    physics: PhysicsWorld,
    fluids: FluidSolver,
    timeline: Timeline,
    controls: Controls,
    /// Set once a fluid step leaves corrupt state behind
    poisoned: bool,
}

impl World {
    /// Create a world with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WorldConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let world = Self {
            physics: PhysicsWorld::with_config(config.physics)?,
            fluids: FluidSolver::new(config.fluid),
            timeline: Timeline::new(config.timeline)?,
            controls: Controls::new(),
            poisoned: false,
        };
        log::debug!("Created world (sample interval {}s)", config.timeline.sample_interval);
        Ok(world)
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn fluids(&self) -> &FluidSolver {
        &self.fluids
    }

    pub fn fluids_mut(&mut self) -> &mut FluidSolver {
        &mut self.fluids
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    /// Simulation time in seconds
    pub fn time(&self) -> f64 {
        self.physics.time()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned || self.physics.is_poisoned()
    }

    pub fn create_fluid_block(
        &mut self,
        bounds: Aabb,
        spacing: f64,
        mass_per_particle: f64,
    ) -> Result<FluidId, BridgeError> {
        Ok(self.fluids.create_block(bounds, spacing, mass_per_particle)?)
    }

    pub fn remove_fluid(&mut self, id: FluidId) -> Result<(), BridgeError> {
        Ok(self.fluids.remove_block(id)?)
    }

    /// Current pose of a body or fluid block
    pub fn pose_of(&self, id: PhysicalId) -> Option<Pose> {
        match id {
            PhysicalId::Body(body) => self.physics.body(body).ok().map(|b| Pose::from_transform(&b.transform)),
            PhysicalId::Fluid(fluid) => self.fluids.summary(fluid).ok().map(|s| Pose::from_fluid(&s)),
        }
    }

    pub fn contains(&self, id: PhysicalId) -> bool {
        match id {
            PhysicalId::Body(body) => self.physics.contains(body),
            PhysicalId::Fluid(fluid) => self.fluids.contains(fluid),
        }
    }

    /// Advance the whole world by `dt` seconds
    ///
    /// The fluid substep count is planned from the current state first; a
    /// `StepTooLarge` rejection leaves everything untouched. Invariant
    /// violations poison the world and every later step fails. A fluid
    /// failure is reported after the rigid bodies have already advanced, so
    /// their state and the clock may reflect the failed step.
    ///
    /// At most one snapshot is recorded per step, however many sample
    /// boundaries `dt` crosses.
    pub fn step(&mut self, dt: f64) -> Result<(), BridgeError> {
        if self.is_poisoned() {
            return Err(PhysicsError::WorldPoisoned.into());
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!("dt must be positive and finite, got {dt}")).into());
        }

        let gravity = self.physics.gravity();
        let substeps = self.fluids.plan_substeps(dt, gravity).map_err(|e| {
            log::warn!("World step rejected: {e}");
            e
        })?;

        if self.timeline.is_empty() && self.timeline.is_due(self.time()) {
            self.record_snapshot();
        }

        self.physics.step(dt)?;

        let colliders = self.physics.fluid_colliders();
        if let Err(e) = self.fluids.step(dt, substeps, gravity, &colliders) {
            log::error!("Fluid step failed, world poisoned: {e}");
            self.poisoned = true;
            return Err(e.into());
        }

        if self.timeline.is_due(self.time()) {
            self.record_snapshot();
        }
        Ok(())
    }

    /// Capture the current observable state
    pub fn snapshot(&self) -> Snapshot {
        let gravity = self.physics.gravity();
        let bodies = self
            .physics
            .bodies()
            .map(|(id, body)| BodyState {
                id,
                position: body.position(),
                rotation: body.rotation(),
                linear_velocity: body.linear_velocity,
                angular_velocity: body.angular_velocity,
                kinetic_energy: body.kinetic_energy(),
                potential_energy: body.potential_energy(gravity),
            })
            .collect();
        let fluids = self
            .fluids
            .summaries()
            .map(|(id, summary)| FluidState { id, summary })
            .collect();
        Snapshot {
            time: self.time(),
            bodies,
            fluids,
            variables: self.controls.values(),
            total_energy: self.physics.total_energy(),
        }
    }

    fn record_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.timeline.record(snapshot);
    }

    /// Gravity shared by bodies and fluids
    pub fn gravity(&self) -> Vec3 {
        self.physics.gravity()
    }
}
