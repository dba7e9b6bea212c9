use argh::FromArgs;
use std::io::BufRead;
use std::path::PathBuf;

use glam::DVec3;
use kornia_extrinsics::synthetic::{sample_ee_poses, SyntheticRig};
use kornia_extrinsics::{CalibrationConfig, CalibrationNode, Command, CommandOutcome};
use kornia_lie::Twist;

#[derive(FromArgs)]
/// Calibrate a simulated camera against a simulated robot arm
struct Args {
    /// path to a JSON calibration config
    #[argh(option)]
    config: Option<PathBuf>,

    /// number of arm poses to collect in automatic mode
    #[argh(option, default = "12")]
    num_samples: usize,

    /// amplitude of the observation noise, radians and meters
    #[argh(option, default = "0.0")]
    noise: f64,

    /// number of refinement steps, overrides the config
    #[argh(option)]
    iterations: Option<usize>,

    /// directory for the extrinsics file, overrides the config
    #[argh(option)]
    output_dir: Option<PathBuf>,

    /// read commands from stdin: 'c' collect, 'u' update, 'r' reset
    #[argh(switch, short = 'm')]
    manual: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => CalibrationConfig::from_json_file(path)?,
        None => CalibrationConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if args.output_dir.is_some() {
        config.output_dir = args.output_dir.clone();
    }

    // the true mounting differs from the nominal guess by a few centimeters and degrees
    let world_camera = config.nominal_world_camera.to_se3()?.rplus(Twist::new(
        DVec3::new(0.05, -0.03, 0.04),
        DVec3::new(0.03, 0.02, -0.05),
    ));
    let ee_marker = config.nominal_ee_marker.to_se3()?.rplus(Twist::new(
        DVec3::new(-0.02, 0.04, 0.01),
        DVec3::new(0.01, -0.02, 0.03),
    ));

    let rig = SyntheticRig::new(config.frames.clone(), world_camera, ee_marker)
        .with_noise(args.noise, args.noise, 0);
    let mut node = CalibrationNode::new(config, rig)?;

    if args.manual {
        run_manual(&mut node)?;
    } else {
        for world_ee in sample_ee_poses(args.num_samples) {
            node.source_mut().move_to(world_ee);
            node.handle(Command::Collect)?;
        }
        if let CommandOutcome::Computed(report) = node.handle(Command::Compute)? {
            print_report(&node, &report);
        }
    }

    Ok(())
}

fn run_manual(
    node: &mut CalibrationNode<SyntheticRig>,
) -> Result<(), Box<dyn std::error::Error>> {
    let poses = sample_ee_poses(64);
    let mut next_pose = 0;

    println!("Press 'c' to collect a measurement, 'u' to update the estimate and 'r' to reset");
    for line in std::io::stdin().lock().lines() {
        let command = match line?.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };

        if command == Command::Collect {
            // every collection happens at a new arm pose
            node.source_mut().move_to(poses[next_pose % poses.len()]);
            next_pose += 1;
        }

        match node.handle(command) {
            Ok(CommandOutcome::Collected(n)) => println!("saved so far: {n}"),
            Ok(CommandOutcome::Computed(report)) => print_report(node, &report),
            Ok(CommandOutcome::Reset) => println!("samples cleared"),
            Err(e) => log::error!("{e}"),
        }

        for frame in node.broadcast_frames() {
            log::debug!("{} -> {}: {:?}", frame.parent, frame.child, frame.transform.to_pose7());
        }
    }

    Ok(())
}

fn print_report(
    node: &CalibrationNode<SyntheticRig>,
    report: &kornia_extrinsics::CalibrationReport,
) {
    let rig = node.source();
    println!("iterations: {}", report.history.len());
    if let Some(last) = report.history.last() {
        println!("final residual: {last}");
    }
    println!("world_camera: {:?}", report.world_camera.to_pose7());
    println!("ee_marker: {:?}", report.ee_marker.to_pose7());
    println!(
        "error vs ground truth: camera {:.3e}, marker {:.3e}",
        report.world_camera.rminus(rig.world_camera()).norm(),
        report.ee_marker.rminus(rig.ee_marker()).norm()
    );
    if let Some(path) = &report.output_path {
        println!("written to {}", path.display());
    }
}
