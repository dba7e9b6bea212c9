#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Lie Groups
//!
//! Double precision rotations and rigid body transformations for geometric
//! estimation problems that are solved by linearizing on the manifold.
//!
//! ## Supported Groups
//!
//! - **SO(3)**: 3D rotation group, stored as a unit quaternion
//! - **SE(3)**: 3D rigid body transformations (rotation + translation)
//!
//! Tangent vectors of SE(3) are [`se3::Twist`] values ordered as
//! `[rotation, translation]`.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use kornia_lie::se3::{SE3, Twist};
//!
//! let world_t_camera = SE3::from_axis_angle(DVec3::Z, 0.5, DVec3::new(0.0, 0.0, 1.0));
//!
//! // retract a small correction onto the manifold
//! let delta = Twist::from_array([0.0, 0.0, 0.01, 0.0, 0.0, 0.0]);
//! let updated = world_t_camera.rplus(delta);
//!
//! assert!((world_t_camera.rminus(&updated).norm() - 0.01).abs() < 1e-12);
//! ```

use thiserror::Error;

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use se3::{Matrix6, Twist, SE3};
pub use so3::SO3;

/// Error type for malformed group elements.
#[derive(Debug, Error, PartialEq)]
pub enum LieError {
    /// A component is NaN or infinite.
    #[error("transform has non-finite components")]
    NonFinite,

    /// The rotation matrix is not orthonormal with determinant +1.
    #[error("rotation matrix is not orthonormal (deviation {deviation:e})")]
    NotOrthonormal {
        /// Largest deviation of `R^T R` from identity or of `det R` from one.
        deviation: f64,
    },

    /// The quaternion does not have unit norm.
    #[error("rotation quaternion is not unit length (norm {norm})")]
    NotUnitQuaternion {
        /// Norm of the offending quaternion.
        norm: f64,
    },
}
