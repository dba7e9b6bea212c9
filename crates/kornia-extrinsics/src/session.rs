use kornia_lie::SE3;

use crate::{
    Estimator, EstimatorParams, ExtrinsicsError, Residual, SampleSet, UnknownTransforms,
};

/// One calibration session: the samples, the current estimates and the estimator.
///
/// The session has a single owner. Callers sharing it across threads must serialize
/// `store`, `reset` and `refine` behind one lock, since `refine` reads every sample.
#[derive(Debug, Clone, Default)]
pub struct CalibrationSession {
    samples: SampleSet,
    unknowns: UnknownTransforms,
    estimator: Estimator,
}

impl CalibrationSession {
    /// Create an empty, unseeded session.
    pub fn new(params: EstimatorParams) -> Self {
        Self {
            samples: SampleSet::new(),
            unknowns: UnknownTransforms::new(),
            estimator: Estimator::new(params),
        }
    }

    /// Append a sample `(T_world_ee, T_camera_marker)`.
    pub fn store(&mut self, world_ee: SE3, camera_marker: SE3) -> Result<(), ExtrinsicsError> {
        self.samples.store(world_ee, camera_marker)
    }

    /// Remove all samples. The current estimates are kept.
    pub fn reset(&mut self) {
        self.samples.reset();
    }

    /// Set the initial guesses `(T_world_camera, T_ee_marker)`.
    pub fn seed(&mut self, world_camera: SE3, ee_marker: SE3) -> Result<(), ExtrinsicsError> {
        self.unknowns.seed(world_camera, ee_marker)
    }

    /// Number of stored samples.
    pub fn size(&self) -> usize {
        self.samples.size()
    }

    /// Run one refinement step over all stored samples.
    pub fn refine(&mut self) -> Result<Residual, ExtrinsicsError> {
        self.estimator.refine(&self.samples, &mut self.unknowns)
    }

    /// Current camera pose in the world frame, `None` before seeding.
    pub fn world_camera(&self) -> Option<SE3> {
        self.unknowns.world_camera()
    }

    /// Current marker pose in the end-effector frame, `None` before seeding.
    pub fn ee_marker(&self) -> Option<SE3> {
        self.unknowns.ee_marker()
    }

    /// Whether the session has been seeded.
    pub fn is_seeded(&self) -> bool {
        self.unknowns.is_seeded()
    }

    /// The stored samples.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }
}
