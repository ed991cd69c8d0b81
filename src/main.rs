//! askit demo driver
//!
//! Drops a sphere onto the ground next to a small block of fluid, steps the
//! world for the configured duration and reports what the timeline saw.

use std::process::ExitCode;

use askit::config::{AppConfig, DemoSection};
use askit_core::{BridgeError, PhysicsBridge, Pose};
use askit_math::{Aabb, Vec3};

/// Render-side stand-in: a named proxy that only logs the poses it receives
#[derive(Debug)]
struct LoggedProxy {
    name: &'static str,
}

fn run(config: &AppConfig) -> Result<(), BridgeError> {
    let demo: &DemoSection = &config.demo;
    let mut bridge = PhysicsBridge::with_config(config.world_config())?;

    bridge.create_ground(0.0)?;
    let ball = bridge.create_sphere(demo.sphere_radius, 1.0, Vec3::new(0.0, demo.drop_height, 0.0))?;
    let fluid_bounds = Aabb::new(Vec3::new(2.0, 0.1, -0.2), Vec3::new(2.4, 0.5, 0.2));
    let water = bridge.create_fluid_block(fluid_bounds, demo.fluid_spacing, 1000.0 * demo.fluid_spacing.powi(3))?;
    bridge.bind_mobject(ball, LoggedProxy { name: "ball" })?;
    bridge.bind_mobject(water, LoggedProxy { name: "water" })?;
    bridge.add_slider("drop_height", 0.0, 100.0, demo.drop_height)?;

    let steps = (demo.duration / demo.dt).round().max(0.0) as usize;
    log::info!("Running {steps} steps of {}s", demo.dt);
    let mut sink = |proxy: &LoggedProxy, pose: &Pose| {
        log::trace!("{} -> {:?}", proxy.name, pose.position);
    };
    for _ in 0..steps {
        bridge.step_and_sync(demo.dt, &mut sink)?;
    }

    let contact = bridge
        .get_history()
        .find(|s| s.body(ball).is_some_and(|b| b.position.y <= demo.sphere_radius))
        .map(|s| s.time);
    match contact {
        Some(t) => log::info!("Sphere reached the ground at t = {t:.3}s"),
        None => log::info!("Sphere did not reach the ground within {}s", demo.duration),
    }
    let summary = bridge.fluid_summary(water)?;
    log::info!(
        "Fluid: {} particles, centre of mass {:?}, max speed {:.3}",
        summary.particle_count,
        summary.center_of_mass,
        summary.max_speed
    );
    log::info!(
        "Recorded {} snapshots over {:.2}s",
        bridge.get_history().count(),
        bridge.time()
    );
    Ok(())
}

fn main() -> ExitCode {
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()))
        .init();
    log::info!("Starting askit");
    if let Some(e) = load_error {
        log::warn!("Failed to load config: {e}. Using defaults.");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Simulation aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
