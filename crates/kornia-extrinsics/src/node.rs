//! Operator-facing calibration node.
//!
//! The node reads frame pairs from a [`TransformSource`], feeds them into a
//! [`CalibrationSession`] and runs the refinement loop on request. Results become the
//! new nominal poses, so successive updates continue from the last estimate.

use std::path::PathBuf;
use std::str::FromStr;

use kornia_lie::SE3;

use crate::io::{extrinsics_path, write_pose_file};
use crate::{
    CalibrationConfig, CalibrationSession, EstimatorParams, NodeError, ResidualSummary,
    TransformSource,
};

/// A request issued by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Record the current end-effector and marker poses (`c`).
    Collect,
    /// Run the refinement loop over the stored samples (`u`).
    Compute,
    /// Drop all stored samples (`r`).
    Reset,
}

impl FromStr for Command {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "c" => Ok(Self::Collect),
            "u" => Ok(Self::Compute),
            "r" => Ok(Self::Reset),
            other => Err(NodeError::UnknownCommand(other.to_string())),
        }
    }
}

/// A named transform to be published, `transform` being the pose of `child` in `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransform {
    /// Reference frame.
    pub parent: String,
    /// Frame being placed.
    pub child: String,
    /// Pose of `child` in `parent`.
    pub transform: SE3,
}

/// Outcome of [`CalibrationNode::compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Estimated camera pose in the base frame.
    pub world_camera: SE3,
    /// Estimated marker pose in the end-effector frame.
    pub ee_marker: SE3,
    /// Residual summary after each refinement step.
    pub history: Vec<ResidualSummary>,
    /// File the camera pose was written to, if an output directory is configured.
    pub output_path: Option<PathBuf>,
}

/// Outcome of [`CalibrationNode::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// A sample was stored; holds the new sample count.
    Collected(usize),
    /// The refinement loop finished.
    Computed(CalibrationReport),
    /// The samples were cleared.
    Reset,
}

/// Calibration node driving a [`CalibrationSession`] from a transform source.
pub struct CalibrationNode<S: TransformSource> {
    config: CalibrationConfig,
    source: S,
    session: CalibrationSession,
    world_camera: SE3,
    ee_marker: SE3,
}

impl<S: TransformSource> CalibrationNode<S> {
    /// Create a node, validating the nominal poses of `config`.
    pub fn new(config: CalibrationConfig, source: S) -> Result<Self, NodeError> {
        let world_camera = config.nominal_world_camera.to_se3()?;
        let ee_marker = config.nominal_ee_marker.to_se3()?;
        let params = EstimatorParams::new().with_rank_tolerance(config.rank_tolerance);

        Ok(Self {
            config,
            source,
            session: CalibrationSession::new(params),
            world_camera,
            ee_marker,
        })
    }

    /// The node configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// The transform source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the transform source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The underlying session.
    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    /// Number of stored samples.
    pub fn num_samples(&self) -> usize {
        self.session.size()
    }

    /// Current nominal camera pose in the base frame.
    pub fn world_camera(&self) -> &SE3 {
        &self.world_camera
    }

    /// Current nominal marker pose in the end-effector frame.
    pub fn ee_marker(&self) -> &SE3 {
        &self.ee_marker
    }

    /// Look up the current frame pair and store it as a new sample.
    ///
    /// Returns the number of stored samples.
    pub fn collect(&mut self) -> Result<usize, NodeError> {
        let frames = &self.config.frames;

        let pair = self
            .source
            .lookup(&frames.base_frame, &frames.ee_frame)
            .and_then(|world_ee| {
                let camera_marker = self
                    .source
                    .lookup(&frames.camera_frame, &frames.marker_frame)?;
                Ok((world_ee, camera_marker))
            });

        let (world_ee, camera_marker) = match pair {
            Ok(pair) => pair,
            Err(err) => {
                log::error!(
                    "Error in retrieving frame transforms, is the marker being detected? {err}"
                );
                return Err(err.into());
            }
        };

        self.session.store(world_ee, camera_marker)?;

        log::info!(
            "stored sample {} ({} -> {}, {} -> {})",
            self.session.size(),
            frames.base_frame,
            frames.ee_frame,
            frames.camera_frame,
            frames.marker_frame
        );

        Ok(self.session.size())
    }

    /// Seed from the nominal poses and run the refinement loop.
    ///
    /// On success the estimates replace the nominal poses and, when an output
    /// directory is configured, the camera pose is written to
    /// `<output_dir>/<camera_name>_extrinsics.yaml`. On error the nominal poses are
    /// left unchanged.
    pub fn compute(&mut self) -> Result<CalibrationReport, NodeError> {
        self.session.seed(self.world_camera, self.ee_marker)?;

        let mut history = Vec::with_capacity(self.config.iterations);
        for iteration in 0..self.config.iterations {
            let summary = self.session.refine()?.summary();
            log::debug!("iteration {iteration}: {summary}");

            let converged = self
                .config
                .residual_tolerance
                .is_some_and(|tol| summary.max_norm < tol);
            history.push(summary);

            if converged {
                log::debug!("converged after {} iterations", iteration + 1);
                break;
            }
        }

        let (Some(world_camera), Some(ee_marker)) =
            (self.session.world_camera(), self.session.ee_marker())
        else {
            return Err(crate::ExtrinsicsError::NotSeeded.into());
        };

        let output_path = match &self.config.output_dir {
            Some(dir) => {
                let path = extrinsics_path(dir, &self.config.frames.camera_name);
                write_pose_file(&path, &world_camera)?;
                log::info!("camera pose written to {}", path.display());
                Some(path)
            }
            None => None,
        };

        self.world_camera = world_camera;
        self.ee_marker = ee_marker;

        if let Some(last) = history.last() {
            log::info!("calibration finished: {last}");
        }
        log::info!("world_camera: {:?}", world_camera.to_pose7());
        log::info!("ee_marker: {:?}", ee_marker.to_pose7());

        Ok(CalibrationReport {
            world_camera,
            ee_marker,
            history,
            output_path,
        })
    }

    /// Drop all stored samples. The nominal poses are kept.
    pub fn reset(&mut self) {
        self.session.reset();
        log::info!("samples cleared");
    }

    /// The transforms to publish: the camera in the base frame and the nominal
    /// marker, `<marker_frame>_nominal`, in the end-effector frame.
    pub fn broadcast_frames(&self) -> [FrameTransform; 2] {
        let frames = &self.config.frames;
        [
            FrameTransform {
                parent: frames.base_frame.clone(),
                child: frames.camera_frame.clone(),
                transform: self.world_camera,
            },
            FrameTransform {
                parent: frames.ee_frame.clone(),
                child: format!("{}_nominal", frames.marker_frame),
                transform: self.ee_marker,
            },
        ]
    }

    /// Dispatch an operator command.
    pub fn handle(&mut self, command: Command) -> Result<CommandOutcome, NodeError> {
        match command {
            Command::Collect => self.collect().map(CommandOutcome::Collected),
            Command::Compute => self.compute().map(CommandOutcome::Computed),
            Command::Reset => {
                self.reset();
                Ok(CommandOutcome::Reset)
            }
        }
    }
}
