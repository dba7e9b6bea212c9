#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! A camera is rigidly mounted somewhere around a robot and a fiducial marker is
//! rigidly attached to the end effector. Both mounting poses are unknown. Every time
//! the arm moves, the robot reports `T_world_ee` and the camera detects
//! `T_camera_marker`, and each pair must satisfy
//!
//! `T_world_ee ∘ T_ee_marker == T_world_camera ∘ T_camera_marker`
//!
//! The [`Estimator`] refines `T_world_camera` and `T_ee_marker` jointly with
//! Gauss-Newton steps on SE(3).
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use kornia_extrinsics::CalibrationSession;
//! use kornia_lie::{Twist, SE3};
//!
//! let world_camera = SE3::from_axis_angle(DVec3::Y, 1.2, DVec3::new(1.0, 0.0, 0.8));
//! let ee_marker = SE3::from_axis_angle(DVec3::Z, 0.1, DVec3::new(0.0, 0.0, 0.2));
//!
//! let mut session = CalibrationSession::default();
//! for (axis, angle) in [(DVec3::X, 0.5), (DVec3::Y, -0.6), (DVec3::Z, 0.9), (DVec3::X, -0.4)] {
//!     let world_ee = SE3::from_axis_angle(axis, angle, DVec3::new(0.4, 0.1, 0.5));
//!     let camera_marker = world_camera.inverse() * world_ee * ee_marker;
//!     session.store(world_ee, camera_marker)?;
//! }
//!
//! let guess = Twist::new(DVec3::new(0.02, 0.0, -0.01), DVec3::new(0.01, 0.02, 0.0));
//! session.seed(world_camera.rplus(guess), ee_marker)?;
//!
//! for _ in 0..10 {
//!     session.refine()?;
//! }
//!
//! let estimate = session.world_camera().unwrap();
//! assert!(estimate.rminus(&world_camera).norm() < 1e-9);
//! # Ok::<(), kornia_extrinsics::ExtrinsicsError>(())
//! ```

mod diagnostics;
mod error;
mod estimator;
mod sample;
mod session;
mod source;
mod state;

pub mod config;
pub mod io;
pub mod node;
pub mod synthetic;

pub use config::{CalibrationConfig, FrameConfig, PoseRecord};
pub use diagnostics::{summarize, ResidualSummary};
pub use error::{ExtrinsicsError, NodeError};
pub use estimator::{compute_residual, error_twist, Estimator, EstimatorParams, Residual};
pub use node::{CalibrationNode, CalibrationReport, Command, CommandOutcome, FrameTransform};
pub use sample::{PoseSample, SampleSet};
pub use session::CalibrationSession;
pub use source::{LookupError, StaticTransformSource, TransformSource};
pub use state::UnknownTransforms;

/// Tolerance on the quaternion norm of input transforms.
pub const TRANSFORM_TOLERANCE: f64 = 1e-6;
