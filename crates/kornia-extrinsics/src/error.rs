use kornia_lie::LieError;
use thiserror::Error;

use crate::source::LookupError;

/// Error types for the calibration core.
///
/// Every error leaves the samples and the current estimates untouched.
#[derive(Debug, Error, PartialEq)]
pub enum ExtrinsicsError {
    /// An input transform has a malformed rotation or non-finite components.
    #[error("invalid transform: {0}")]
    InvalidTransform(#[from] LieError),

    /// Refinement was requested before the unknown transforms were seeded.
    #[error("the unknown transforms have not been seeded")]
    NotSeeded,

    /// Refinement was requested with no stored samples.
    #[error("no pose samples have been stored")]
    NoSamples,

    /// The linearization or the updated residual is not finite.
    #[error("non-finite values while linearizing {num_samples} samples")]
    NonFinite {
        /// Number of samples evaluated.
        num_samples: usize,
    },

    /// The stacked linear system is numerically rank deficient.
    #[error(
        "rank deficient system with {num_samples} samples \
         (singular values {min_singular_value:e} / {max_singular_value:e}), \
         collect samples with more diverse end-effector orientations"
    )]
    SingularSystem {
        /// Number of samples used to build the system.
        num_samples: usize,
        /// Smallest singular value of the stacked Jacobian.
        min_singular_value: f64,
        /// Largest singular value of the stacked Jacobian.
        max_singular_value: f64,
    },
}

/// Error types for the calibration node and its file handling.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A transform could not be looked up.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The calibration core rejected an operation.
    #[error(transparent)]
    Calibration(#[from] ExtrinsicsError),

    /// A nominal pose in the configuration is malformed.
    #[error("invalid nominal pose: {0}")]
    InvalidNominalPose(#[from] LieError),

    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] serde_json::Error),

    /// A keyboard command was not recognized.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A pose record could not be parsed.
    #[error("malformed pose record: {0}")]
    MalformedPose(String),
}
