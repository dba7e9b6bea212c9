//! Configuration of the calibration node.
//!
//! Frame names and nominal poses are read once at construction, either from the
//! defaults below or from a JSON file.

use std::path::{Path, PathBuf};

use glam::{DMat3, DQuat, DVec3};
use kornia_lie::{LieError, SE3, SO3};
use serde::{Deserialize, Serialize};

use crate::{NodeError, TRANSFORM_TOLERANCE};

/// Names of the frames involved in the calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Fixed reference frame of the robot.
    pub base_frame: String,
    /// Optical frame of the camera.
    pub camera_frame: String,
    /// End-effector frame carrying the marker.
    pub ee_frame: String,
    /// Frame of the detected marker.
    pub marker_frame: String,
    /// Camera name, used to name the output file.
    pub camera_name: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            base_frame: "/base_link".to_string(),
            camera_frame: "/camera_link".to_string(),
            ee_frame: "/lwr_arm_link_7".to_string(),
            marker_frame: "/marker_frame".to_string(),
            camera_name: "head_camera".to_string(),
        }
    }
}

/// A pose stored as seven scalars: position followed by an `xyzw` quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Translation `[x, y, z]`.
    pub position: [f64; 3],
    /// Rotation quaternion `[x, y, z, w]`.
    pub orientation: [f64; 4],
}

impl PoseRecord {
    /// Record of a transform.
    pub fn from_se3(transform: &SE3) -> Self {
        let p = transform.to_pose7();
        Self {
            position: [p[0], p[1], p[2]],
            orientation: [p[3], p[4], p[5], p[6]],
        }
    }

    /// Convert back to a validated transform.
    pub fn to_se3(&self) -> Result<SE3, LieError> {
        let [x, y, z] = self.position;
        let [qx, qy, qz, qw] = self.orientation;
        let transform = SE3::from_qxyz(DQuat::from_xyzw(qx, qy, qz, qw), DVec3::new(x, y, z));
        transform.validate(TRANSFORM_TOLERANCE)?;
        Ok(transform.normalize())
    }
}

/// Configuration of a [`crate::CalibrationNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Frame names.
    pub frames: FrameConfig,
    /// Initial guess of the camera pose in the base frame.
    pub nominal_world_camera: PoseRecord,
    /// Initial guess of the marker pose in the end-effector frame.
    pub nominal_ee_marker: PoseRecord,
    /// Number of refinement steps per update.
    pub iterations: usize,
    /// Stop early once the largest per-sample error norm falls below this value.
    pub residual_tolerance: Option<f64>,
    /// Relative singular value threshold of the estimator.
    pub rank_tolerance: f64,
    /// Directory receiving `<camera_name>_extrinsics.yaml`; nothing is written when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        // camera looking back at the robot from below the base, columns are the camera axes
        let world_r_camera = DMat3::from_cols(
            DVec3::new(-0.220699, 0.66163, -0.716615),
            DVec3::new(0.13597, 0.748429, 0.649128),
            DVec3::new(0.965818, 0.0458236, -0.255139),
        );
        let world_camera = SE3::new(
            SO3::from_matrix(&world_r_camera).normalize(),
            DVec3::new(0.126191, 0.00936311, -1.21054),
        );
        let ee_marker = SE3::new(SO3::IDENTITY, DVec3::new(0.0, 0.0, 0.2));

        Self {
            frames: FrameConfig::default(),
            nominal_world_camera: PoseRecord::from_se3(&world_camera),
            nominal_ee_marker: PoseRecord::from_se3(&ee_marker),
            iterations: 80,
            residual_tolerance: None,
            rank_tolerance: crate::EstimatorParams::default().rank_tolerance,
            output_dir: None,
        }
    }
}

impl CalibrationConfig {
    /// Parse a configuration from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, NodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize the configuration as pretty printed JSON.
    pub fn to_json_string(&self) -> Result<String, NodeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
