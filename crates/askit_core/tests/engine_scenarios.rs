//! End-to-end scenarios through the PhysicsBridge
//!
//! Each test drives the facade the way an animation layer would and checks
//! the recorded history:
//! 1. Static bodies never move
//! 2. A dropped sphere meets the ground near the analytic time
//! 3. An undamped spring never gains energy
//! 4. Timeline sampling and queries
//! 5. Standalone PDE solves

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use askit_core::{BridgeError, PhysicsBridge, Pose, TimelineError, WorldConfig};
use askit_math::{Aabb, Vec3};
use askit_pde::{Boundaries, BoundaryCondition, Grid, PdeError, PoissonParams};
use askit_physics::PhysicsConfig;

fn bridge_with_gravity(gravity: Vec3) -> PhysicsBridge<String> {
    let config = WorldConfig {
        physics: PhysicsConfig::new(gravity),
        ..WorldConfig::default()
    };
    PhysicsBridge::with_config(config).unwrap()
}

/// Step until the sphere's centre is within one radius of the ground
fn contact_time(dt: f64) -> f64 {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.create_ground(0.0).unwrap();
    let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)).unwrap();
    while bridge.time() < 3.0 {
        bridge.step(dt).unwrap();
        if bridge.position(ball).unwrap().y <= 0.5 {
            return bridge.time();
        }
    }
    panic!("sphere never reached the ground with dt = {dt}");
}

#[test]
fn test_static_bodies_never_move() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.create_ground(0.0).unwrap();
    let post = bridge.create_box(Vec3::new(0.5, 1.0, 0.5), 0.0, Vec3::new(0.0, 1.0, 0.0)).unwrap();
    let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.2, 4.0, 0.0)).unwrap();
    bridge.apply_impulse(post, Vec3::new(5.0, 0.0, 0.0)).unwrap();
    bridge.apply_force(post, Vec3::new(0.0, 100.0, 0.0)).unwrap();
    for _ in 0..200 {
        bridge.step(0.01).unwrap();
    }
    assert_eq!(bridge.position(post).unwrap(), Vec3::new(0.0, 1.0, 0.0));
    for snapshot in bridge.get_history() {
        assert_eq!(snapshot.body(post).unwrap().position, Vec3::new(0.0, 1.0, 0.0));
    }
    // The ball landed on the post rather than falling through it
    assert!(bridge.position(ball).unwrap().y > 2.0);
}

#[test]
fn test_drop_scenario_contact_time() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.create_ground(0.0).unwrap();
    let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)).unwrap();
    for _ in 0..100 {
        bridge.step(0.02).unwrap();
    }

    let first_contact = bridge
        .get_history()
        .find(|s| s.body(ball).unwrap().position.y <= 0.5)
        .map(|s| s.time)
        .unwrap();
    assert!((1.37..=1.45).contains(&first_contact), "contact at {first_contact}");

    let slop = bridge.world().physics().config().linear_slop;
    let lowest = bridge
        .get_history()
        .map(|s| s.body(ball).unwrap().position.y)
        .fold(f64::INFINITY, f64::min);
    assert!(lowest >= 0.5 - 2.0 * slop, "overshoot to {lowest}");
}

#[test]
fn test_contact_time_tracks_analytic_value() {
    let analytic = (2.0 * 9.5 / 10.0_f64).sqrt();
    for dt in [0.02, 0.005] {
        let t = contact_time(dt);
        assert!((t - analytic).abs() <= 2.0 * dt, "dt {dt}: contact at {t}, expected {analytic}");
    }
}

#[test]
fn test_spring_energy_does_not_grow() {
    let mut bridge = bridge_with_gravity(Vec3::ZERO);
    let anchor = bridge.create_sphere(0.1, 0.0, Vec3::ZERO).unwrap();
    let bob = bridge.create_sphere(0.1, 1.0, Vec3::new(3.0, 0.0, 0.0)).unwrap();
    bridge
        .world_mut()
        .physics_mut()
        .create_spring_with_rest_length(anchor, bob, 2.0, 20.0, 0.0)
        .unwrap();
    for _ in 0..300 {
        bridge.step(0.01).unwrap();
    }

    let energies: Vec<f64> = bridge.get_history().map(|s| s.total_energy).collect();
    assert_abs_diff_eq!(energies[0], 10.0, epsilon = 1e-12);
    for e in &energies {
        assert!(*e <= energies[0] + 1e-6, "energy rose to {e}");
    }
}

#[test]
fn test_history_length_and_order() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 50.0, 0.0)).unwrap();
    for _ in 0..100 {
        bridge.step(0.01).unwrap();
    }
    // One second at 0.02s intervals crosses 50 boundaries
    let len = bridge.get_history().count();
    assert!((50..=52).contains(&len), "history has {len} snapshots");
    let times: Vec<f64> = bridge.get_history().map(|s| s.time).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_query_at_is_idempotent() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(0.0, 5.0, 0.0)).unwrap();
    assert!(matches!(
        bridge.query_at(0.0),
        Err(BridgeError::Timeline(TimelineError::NoData(_)))
    ));
    for _ in 0..25 {
        bridge.step(0.02).unwrap();
    }

    let first = bridge.query_at(0.3).unwrap().clone();
    let second = bridge.query_at(0.3).unwrap().clone();
    assert_eq!(first, second);
    assert!(first.time <= 0.3 && first.time > 0.27);
    assert!(first.body(ball).unwrap().position.y < 5.0);
    assert!(bridge.query_at(-1.0).is_err());
}

#[test]
fn test_configure_sample_interval() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.configure(0.1).unwrap();
    for _ in 0..50 {
        bridge.step(0.02).unwrap();
    }
    assert_eq!(bridge.get_history().count(), 11);
    assert!(bridge.configure(0.0).is_err());

    bridge.reset_history();
    bridge.set_recording(false);
    bridge.step(0.02).unwrap();
    assert_eq!(bridge.get_history().count(), 0);
}

#[test]
fn test_poisson_round_trip() {
    let bridge: PhysicsBridge<()> = PhysicsBridge::new();
    let n = 21;
    let h = 1.0 / (n - 1) as f64;
    let exact = Grid::from_fn(n, n, h, h, |x, y| (PI * x).sin() * (PI * y).sin()).unwrap();
    let source = Grid::from_fn(n, n, h, h, |x, y| -2.0 * PI * PI * (PI * x).sin() * (PI * y).sin()).unwrap();
    let params = PoissonParams::new(1e-9, 10_000)
        .with_boundaries(Boundaries::uniform(BoundaryCondition::Dirichlet(0.0)));
    let guess = Grid::new(n, n, h, h).unwrap();

    let solved = bridge.solve_poisson(&guess, &source, &params).unwrap();
    assert!(solved.solution.max_abs_difference(&exact) < 5e-3);

    let capped = PoissonParams { max_iterations: 3, ..params };
    assert!(matches!(
        bridge.solve_poisson(&guess, &source, &capped),
        Err(BridgeError::Pde(PdeError::ConvergenceFailure { iterations: 3, .. }))
    ));
}

#[test]
fn test_ball_beside_fluid_scenario() {
    let mut bridge = bridge_with_gravity(Vec3::new(0.0, -10.0, 0.0));
    bridge.create_ground(0.0).unwrap();
    let ball = bridge.create_sphere(0.5, 1.0, Vec3::new(2.0, 3.0, 0.0)).unwrap();
    let water = bridge
        .create_fluid_block(Aabb::new(Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.3, 0.4, 0.3)), 0.1, 0.001)
        .unwrap();
    bridge.bind_mobject(ball, "ball".to_string()).unwrap();
    bridge.bind_mobject(water, "water".to_string()).unwrap();

    let mut last: Vec<(String, Pose)> = Vec::new();
    for _ in 0..50 {
        last.clear();
        let written = bridge
            .step_and_sync(0.01, &mut |h: &String, p: &Pose| last.push((h.clone(), *p)))
            .unwrap();
        assert_eq!(written, 2);
    }

    let summary = bridge.fluid_summary(water).unwrap();
    assert_eq!(summary.particle_count, 64);
    assert!(summary.bounds.unwrap().min.y >= 0.0);
    let ball_pose = last.iter().find(|(h, _)| h == "ball").unwrap().1;
    assert!(ball_pose.position[1] < 3.0);

    let latest = bridge.get_history().last().unwrap();
    assert_eq!(latest.fluids.len(), 1);
    assert_eq!(latest.bodies.len(), 2);
}
