//! End-to-end calibration against simulated robot and camera observations.

use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use glam::DVec3;
use kornia_extrinsics::io::{extrinsics_path, read_pose_file};
use kornia_extrinsics::synthetic::{sample_ee_poses, SyntheticRig};
use kornia_extrinsics::{
    compute_residual, CalibrationConfig, CalibrationNode, CalibrationSession, Command,
    CommandOutcome, ExtrinsicsError, FrameConfig, NodeError, TransformSource,
};
use kornia_lie::{Twist, SE3, SO3};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn ground_truth() -> (SE3, SE3) {
    let world_camera = SE3::from_axis_angle(
        DVec3::new(0.2, -1.0, 0.4),
        2.4,
        DVec3::new(1.1, -0.2, 0.9),
    );
    let ee_marker =
        SE3::from_axis_angle(DVec3::new(0.0, 0.3, 1.0), 0.4, DVec3::new(0.01, 0.0, 0.15));
    (world_camera, ee_marker)
}

fn perturb(transform: &SE3, scale: f64) -> SE3 {
    transform.rplus(Twist::new(
        DVec3::new(0.8, -0.5, 0.6) * scale,
        DVec3::new(-0.3, 0.7, 0.5) * scale,
    ))
}

fn make_session(world_camera: &SE3, ee_marker: &SE3, world_ees: &[SE3]) -> CalibrationSession {
    let mut session = CalibrationSession::default();
    for world_ee in world_ees {
        let camera_marker = world_camera.inverse() * *world_ee * *ee_marker;
        session
            .store(*world_ee, camera_marker)
            .expect("synthetic transforms are valid");
    }
    session
}

#[test]
fn test_residual_decreases_to_convergence() -> Result<(), ExtrinsicsError> {
    let (world_camera, ee_marker) = ground_truth();
    let mut session = make_session(&world_camera, &ee_marker, &sample_ee_poses(8));

    let seed_camera = perturb(&world_camera, 0.1);
    let seed_marker = perturb(&ee_marker, -0.05);
    session.seed(seed_camera, seed_marker)?;

    let mut previous = compute_residual(session.samples(), &seed_camera, &seed_marker)
        .summary()
        .stacked_norm;
    let mut converged_at = None;

    for iteration in 0..50 {
        let current = session.refine()?.summary().stacked_norm;
        if previous > 1e-10 {
            assert!(
                current < previous,
                "iteration {iteration}: residual went from {previous:e} to {current:e}"
            );
        }
        if current < 1e-9 && converged_at.is_none() {
            converged_at = Some(iteration);
        }
        previous = current;
    }

    assert!(converged_at.is_some(), "final residual {previous:e}");

    let world_camera_est = session.world_camera().expect("session is seeded");
    let ee_marker_est = session.ee_marker().expect("session is seeded");
    assert!(world_camera_est.rminus(&world_camera).norm() < 1e-9);
    assert!(ee_marker_est.rminus(&ee_marker).norm() < 1e-9);
    Ok(())
}

#[test]
fn test_convergence_from_tiny_rotation_errors() -> Result<(), ExtrinsicsError> {
    let (world_camera, ee_marker) = ground_truth();

    for theta in [1.02e-8, 1.2e-8, 1e-7, 1e-6, 1e-5] {
        let mut session = make_session(&world_camera, &ee_marker, &sample_ee_poses(6));
        let seed_camera = world_camera.rplus(Twist::new(DVec3::new(theta, 0.0, 0.0), DVec3::ZERO));
        let seed_marker = ee_marker.rplus(Twist::new(DVec3::new(0.0, 0.0, theta), DVec3::ZERO));
        session.seed(seed_camera, seed_marker)?;

        let mut previous = compute_residual(session.samples(), &seed_camera, &seed_marker)
            .summary()
            .stacked_norm;
        for _ in 0..5 {
            let current = session.refine()?.summary().stacked_norm;
            if previous > 1e-10 {
                assert!(current < previous, "theta {theta:e}: {previous:e} -> {current:e}");
            }
            previous = current;
        }
        assert!(previous < 1e-9, "theta {theta:e}: final residual {previous:e}");
    }
    Ok(())
}

#[test]
fn test_sample_order_does_not_change_the_estimate() -> Result<(), ExtrinsicsError> {
    let (world_camera, ee_marker) = ground_truth();
    let world_ees = sample_ee_poses(7);
    let mut reversed = world_ees.clone();
    reversed.reverse();

    let mut estimates = Vec::new();
    for poses in [&world_ees, &reversed] {
        let mut session = make_session(&world_camera, &ee_marker, poses);
        session.seed(perturb(&world_camera, 0.05), perturb(&ee_marker, 0.05))?;
        for _ in 0..15 {
            session.refine()?;
        }
        estimates.push((
            session.world_camera().expect("session is seeded"),
            session.ee_marker().expect("session is seeded"),
        ));
    }

    let (camera_a, marker_a) = estimates[0];
    let (camera_b, marker_b) = estimates[1];
    assert!(camera_a.rminus(&camera_b).norm() < 1e-9);
    assert!(marker_a.rminus(&marker_b).norm() < 1e-9);
    Ok(())
}

#[test]
fn test_degenerate_sample_sets() -> Result<(), ExtrinsicsError> {
    let (world_camera, ee_marker) = ground_truth();

    let mut empty = CalibrationSession::default();
    empty.seed(world_camera, ee_marker)?;
    assert_eq!(empty.refine(), Err(ExtrinsicsError::NoSamples));

    // the same arm pose observed several times
    let world_ee = SE3::from_axis_angle(DVec3::X, 0.3, DVec3::new(0.4, 0.0, 0.5));
    let mut repeated = make_session(&world_camera, &ee_marker, &[world_ee; 4]);
    let seed = perturb(&world_camera, 0.01);
    repeated.seed(seed, ee_marker)?;
    assert!(matches!(
        repeated.refine(),
        Err(ExtrinsicsError::SingularSystem { num_samples: 4, .. })
    ));
    assert_eq!(repeated.world_camera(), Some(seed.normalize()));
    Ok(())
}

#[test]
fn test_exact_seed_is_a_fixed_point() -> Result<(), ExtrinsicsError> {
    let (world_camera, ee_marker) = ground_truth();
    let mut session = make_session(&world_camera, &ee_marker, &sample_ee_poses(5));
    session.seed(world_camera, ee_marker)?;

    let residual = session.refine()?;
    assert!(residual.summary().max_norm < 1e-12);

    let world_camera_est = session.world_camera().expect("session is seeded");
    let ee_marker_est = session.ee_marker().expect("session is seeded");
    assert!(world_camera_est.rminus(&world_camera).norm() < 1e-12);
    assert!(ee_marker_est.rminus(&ee_marker).norm() < 1e-12);
    Ok(())
}

#[test]
fn test_concrete_scenario() -> Result<(), ExtrinsicsError> {
    let world_camera = SE3::new(SO3::IDENTITY, DVec3::new(0.0, 0.0, 1.0));
    let ee_marker = SE3::new(SO3::IDENTITY, DVec3::new(0.0, 0.0, 0.1));

    let world_ees = [
        SE3::new(SO3::IDENTITY, DVec3::new(0.4, 0.0, 0.5)),
        SE3::from_axis_angle(DVec3::Z, FRAC_PI_2, DVec3::new(0.4, 0.1, 0.5)),
        SE3::from_axis_angle(DVec3::X, FRAC_PI_2, DVec3::new(0.3, 0.0, 0.6)),
    ];

    let seed_camera = perturb(&world_camera, 0.05);
    let seed_marker = perturb(&ee_marker, 0.05);

    // one relative motion leaves the rotation about its axis unobservable
    let mut two = make_session(&world_camera, &ee_marker, &world_ees[..2]);
    two.seed(seed_camera, seed_marker)?;
    assert!(matches!(
        two.refine(),
        Err(ExtrinsicsError::SingularSystem { num_samples: 2, .. })
    ));

    let mut three = make_session(&world_camera, &ee_marker, &world_ees);
    three.seed(seed_camera, seed_marker)?;
    for _ in 0..20 {
        three.refine()?;
    }

    let world_camera_est = three.world_camera().expect("session is seeded");
    let ee_marker_est = three.ee_marker().expect("session is seeded");

    let camera_error = world_camera.rminus(&world_camera_est);
    let marker_error = ee_marker.rminus(&ee_marker_est);
    assert!(camera_error.rotation.length() < 1e-6);
    assert!(marker_error.rotation.length() < 1e-6);
    assert!((world_camera_est.translation - world_camera.translation).length() < 1e-6);
    assert!((ee_marker_est.translation - ee_marker.translation).length() < 1e-6);
    Ok(())
}

#[test]
fn test_noisy_observations_reach_a_stable_floor() -> Result<(), Box<dyn std::error::Error>> {
    let (world_camera, ee_marker) = ground_truth();
    let mut rig = SyntheticRig::new(FrameConfig::default(), world_camera, ee_marker)
        .with_noise(1e-3, 1e-3, 42);
    let frames = FrameConfig::default();

    let mut session = CalibrationSession::default();
    for world_ee in sample_ee_poses(16) {
        rig.move_to(world_ee);
        let world_ee = rig.lookup(&frames.base_frame, &frames.ee_frame)?;
        let camera_marker = rig.lookup(&frames.camera_frame, &frames.marker_frame)?;
        session.store(world_ee, camera_marker)?;
    }

    session.seed(perturb(&world_camera, 0.05), perturb(&ee_marker, 0.05))?;
    let mut history = Vec::new();
    for _ in 0..30 {
        history.push(session.refine()?.summary());
    }

    let last = history[history.len() - 1];
    let before_last = history[history.len() - 2];
    assert!(last.stacked_norm.is_finite());
    assert!(last.max_norm > 0.0);
    assert_relative_eq!(last.stacked_norm, before_last.stacked_norm, max_relative = 1e-6);

    let world_camera_est = session.world_camera().expect("session is seeded");
    let ee_marker_est = session.ee_marker().expect("session is seeded");
    assert!(world_camera_est.rminus(&world_camera).norm() < 1e-2);
    assert!(ee_marker_est.rminus(&ee_marker).norm() < 1e-2);
    Ok(())
}

#[test]
fn test_node_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("calibration.json");

    let mut config = CalibrationConfig {
        iterations: 40,
        residual_tolerance: Some(1e-12),
        output_dir: Some(dir.path().join("camera_info")),
        ..Default::default()
    };
    config.frames.camera_name = "wrist_camera".to_string();
    std::fs::write(&config_path, config.to_json_string()?)?;

    let config = CalibrationConfig::from_json_file(&config_path)?;
    let world_camera = perturb(&config.nominal_world_camera.to_se3()?, 0.08);
    let ee_marker = perturb(&config.nominal_ee_marker.to_se3()?, -0.04);
    let rig = SyntheticRig::new(config.frames.clone(), world_camera, ee_marker);

    let mut node = CalibrationNode::new(config, rig)?;

    // too few samples: the nominal poses stay in place
    node.source_mut().move_to(sample_ee_poses(1)[0]);
    assert_eq!(node.handle(Command::Collect)?, CommandOutcome::Collected(1));
    let nominal = *node.world_camera();
    assert!(matches!(
        node.handle(Command::Compute),
        Err(NodeError::Calibration(ExtrinsicsError::SingularSystem { .. }))
    ));
    assert_eq!(*node.world_camera(), nominal);

    node.handle(Command::Reset)?;
    for world_ee in sample_ee_poses(10) {
        node.source_mut().move_to(world_ee);
        node.handle("c".parse()?)?;
    }
    assert_eq!(node.num_samples(), 10);

    let CommandOutcome::Computed(report) = node.handle(Command::Compute)? else {
        panic!("compute must produce a report");
    };

    assert!(report.world_camera.rminus(&world_camera).norm() < 1e-9);
    assert!(report.ee_marker.rminus(&ee_marker).norm() < 1e-9);
    assert!(!report.history.is_empty());

    let expected_path = extrinsics_path(dir.path().join("camera_info"), "wrist_camera");
    assert_eq!(report.output_path.as_deref(), Some(expected_path.as_path()));
    let written = read_pose_file(&expected_path)?;
    assert!(written.rminus(&report.world_camera).norm() < 1e-12);

    let [camera_frame, marker_frame] = node.broadcast_frames();
    assert_eq!(camera_frame.transform, report.world_camera);
    assert_eq!(marker_frame.transform, report.ee_marker);
    Ok(())
}

#[test]
fn test_random_mountings() -> Result<(), ExtrinsicsError> {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10 {
        let world_camera = SE3::from_rng(&mut rng);
        let ee_marker = SE3::from_rng(&mut rng);
        let mut session = make_session(&world_camera, &ee_marker, &sample_ee_poses(6));
        session.seed(perturb(&world_camera, 0.03), perturb(&ee_marker, 0.03))?;

        for _ in 0..20 {
            session.refine()?;
        }

        let world_camera_est = session.world_camera().expect("session is seeded");
        let ee_marker_est = session.ee_marker().expect("session is seeded");
        assert!(world_camera_est.rminus(&world_camera).norm() < 1e-8);
        assert!(ee_marker_est.rminus(&ee_marker).norm() < 1e-8);
    }
    Ok(())
}
