use kornia_lie::SE3;

use crate::{ExtrinsicsError, TRANSFORM_TOLERANCE};

/// The two unknown transforms being estimated.
///
/// Starts unseeded; [`UnknownTransforms::seed`] must be called before any refinement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnknownTransforms {
    estimate: Option<(SE3, SE3)>,
}

impl UnknownTransforms {
    /// Create an unseeded state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state seeded with the given initial guesses.
    pub fn seeded(world_camera: SE3, ee_marker: SE3) -> Result<Self, ExtrinsicsError> {
        let mut state = Self::new();
        state.seed(world_camera, ee_marker)?;
        Ok(state)
    }

    /// Set both current estimates.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if either guess is malformed, in
    /// which case the previous estimates are kept.
    pub fn seed(&mut self, world_camera: SE3, ee_marker: SE3) -> Result<(), ExtrinsicsError> {
        world_camera.validate(TRANSFORM_TOLERANCE)?;
        ee_marker.validate(TRANSFORM_TOLERANCE)?;
        self.estimate = Some((world_camera.normalize(), ee_marker.normalize()));
        Ok(())
    }

    /// Whether the state has been seeded.
    pub fn is_seeded(&self) -> bool {
        self.estimate.is_some()
    }

    /// Current camera pose in the world frame, `None` before seeding.
    pub fn world_camera(&self) -> Option<SE3> {
        self.estimate.map(|(world_camera, _)| world_camera)
    }

    /// Current marker pose in the end-effector frame, `None` before seeding.
    pub fn ee_marker(&self) -> Option<SE3> {
        self.estimate.map(|(_, ee_marker)| ee_marker)
    }

    pub(crate) fn current(&self) -> Result<(SE3, SE3), ExtrinsicsError> {
        self.estimate.ok_or(ExtrinsicsError::NotSeeded)
    }

    pub(crate) fn update(&mut self, world_camera: SE3, ee_marker: SE3) {
        self.estimate = Some((world_camera, ee_marker));
    }
}
