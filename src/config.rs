//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`ASKIT_SECTION__KEY`)

use std::path::Path;

use askit_core::{TimelineConfig, WorldConfig};
use askit_math::Vec3;
use askit_physics::{FluidConfig, Integrator};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rigid-body solver configuration
    #[serde(default)]
    pub physics: PhysicsSection,
    /// SPH fluid configuration
    #[serde(default)]
    pub fluid: FluidSection,
    /// Snapshot timeline configuration
    #[serde(default)]
    pub timeline: TimelineSection,
    /// Demo scenario configuration
    #[serde(default)]
    pub demo: DemoSection,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugSection,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`ASKIT_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();
        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // ASKIT_PHYSICS__SOLVER_ITERATIONS=20 -> physics.solver_iterations = 20
        figment = figment.merge(Env::prefixed("ASKIT_").split("__"));

        Ok(figment.extract()?)
    }

    /// Runtime configuration for a world
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            physics: self.physics.to_physics_config(),
            fluid: self.fluid.to_fluid_config(),
            timeline: self.timeline.to_timeline_config(),
        }
    }
}

/// Rigid-body solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSection {
    /// Gravity acceleration [x, y, z]
    pub gravity: [f64; 3],
    /// Velocity iterations per step
    pub solver_iterations: usize,
    /// Fraction of penetration corrected per step
    pub baumgarte: f64,
    /// Penetration tolerated without correction
    pub linear_slop: f64,
    /// Closing speed below which contacts do not bounce
    pub restitution_threshold: f64,
    /// `semi_implicit_euler` or `rk4`
    pub integrator: Integrator,
}

impl Default for PhysicsSection {
    fn default() -> Self {
        let engine = askit_physics::PhysicsConfig::default();
        Self {
            gravity: engine.gravity.to_array(),
            solver_iterations: engine.solver_iterations,
            baumgarte: engine.baumgarte,
            linear_slop: engine.linear_slop,
            restitution_threshold: engine.restitution_threshold,
            integrator: engine.integrator,
        }
    }
}

impl PhysicsSection {
    pub fn to_physics_config(&self) -> askit_physics::PhysicsConfig {
        askit_physics::PhysicsConfig {
            gravity: Vec3::from_array(self.gravity),
            solver_iterations: self.solver_iterations,
            baumgarte: self.baumgarte,
            linear_slop: self.linear_slop,
            restitution_threshold: self.restitution_threshold,
            integrator: self.integrator,
            ..askit_physics::PhysicsConfig::default()
        }
    }
}

/// SPH fluid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidSection {
    /// Smoothing radius over particle spacing
    pub smoothing_ratio: f64,
    /// Numerical speed of sound (pressure stiffness)
    pub speed_of_sound: f64,
    pub viscosity: f64,
    pub cfl_velocity: f64,
    pub cfl_force: f64,
    /// Substeps per world step before a step is rejected
    pub max_substeps: usize,
    pub boundary_restitution: f64,
    pub boundary_friction: f64,
}

impl Default for FluidSection {
    fn default() -> Self {
        let engine = FluidConfig::default();
        Self {
            smoothing_ratio: engine.smoothing_ratio,
            speed_of_sound: engine.speed_of_sound,
            viscosity: engine.viscosity,
            cfl_velocity: engine.cfl_velocity,
            cfl_force: engine.cfl_force,
            max_substeps: engine.max_substeps,
            boundary_restitution: engine.boundary_restitution,
            boundary_friction: engine.boundary_friction,
        }
    }
}

impl FluidSection {
    pub fn to_fluid_config(&self) -> FluidConfig {
        FluidConfig {
            smoothing_ratio: self.smoothing_ratio,
            speed_of_sound: self.speed_of_sound,
            viscosity: self.viscosity,
            cfl_velocity: self.cfl_velocity,
            cfl_force: self.cfl_force,
            max_substeps: self.max_substeps,
            boundary_restitution: self.boundary_restitution,
            boundary_friction: self.boundary_friction,
            ..FluidConfig::default()
        }
    }
}

/// Snapshot timeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSection {
    /// Simulation seconds between snapshots
    pub sample_interval: f64,
    /// Record snapshots from the first step
    pub recording: bool,
}

impl Default for TimelineSection {
    fn default() -> Self {
        let engine = TimelineConfig::default();
        Self {
            sample_interval: engine.sample_interval,
            recording: engine.recording,
        }
    }
}

impl TimelineSection {
    pub fn to_timeline_config(&self) -> TimelineConfig {
        TimelineConfig {
            sample_interval: self.sample_interval,
            recording: self.recording,
        }
    }
}

/// Demo scenario configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSection {
    /// Simulated seconds to run
    pub duration: f64,
    /// Step size in seconds
    pub dt: f64,
    /// Starting height of the sphere centre
    pub drop_height: f64,
    pub sphere_radius: f64,
    /// Particle spacing of the fluid block
    pub fluid_spacing: f64,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            duration: 2.0,
            dt: 0.02,
            drop_height: 10.0,
            sphere_radius: 0.5,
            fluid_spacing: 0.1,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSection {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(#[from] Box<figment::Error>);

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.physics.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(config.physics.solver_iterations, 10);
        assert_eq!(config.timeline.sample_interval, 0.02);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("gravity"));
        assert!(toml.contains("sample_interval"));
        assert!(toml.contains("integrator = \"semi_implicit_euler\""));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            "[physics]\nintegrator = \"rk4\"\n[fluid]\nviscosity = 0.5\n",
        )
        .unwrap();
        assert_eq!(config.physics.integrator, Integrator::Rk4);
        assert_eq!(config.physics.solver_iterations, 10);
        assert_eq!(config.fluid.viscosity, 0.5);
        assert_eq!(config.fluid.max_substeps, 64);
    }

    #[test]
    fn test_world_config_conversion() {
        let mut config = AppConfig::default();
        config.physics.gravity = [0.0, -10.0, 0.0];
        config.fluid.speed_of_sound = 30.0;
        config.timeline.recording = false;
        let world = config.world_config();
        assert_eq!(world.physics.gravity, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(world.fluid.speed_of_sound, 30.0);
        assert_eq!(world.fluid.tait_exponent, FluidConfig::default().tait_exponent);
        assert!(!world.timeline.recording);
        assert!(world.validate().is_ok());
    }
}
