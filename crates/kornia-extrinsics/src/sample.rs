use kornia_lie::SE3;

use crate::{ExtrinsicsError, TRANSFORM_TOLERANCE};

/// One paired observation captured at a single instant.
///
/// `world_ee` is the end-effector pose in the world (robot base) frame and
/// `camera_marker` the marker pose in the camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    world_ee: SE3,
    camera_marker: SE3,
}

impl PoseSample {
    /// Create a sample, validating both transforms.
    ///
    /// Rotations are re-normalized after validation so the stored quaternions are unit length.
    pub fn new(world_ee: SE3, camera_marker: SE3) -> Result<Self, ExtrinsicsError> {
        world_ee.validate(TRANSFORM_TOLERANCE)?;
        camera_marker.validate(TRANSFORM_TOLERANCE)?;
        Ok(Self {
            world_ee: world_ee.normalize(),
            camera_marker: camera_marker.normalize(),
        })
    }

    /// End-effector pose in the world frame.
    #[inline]
    pub fn world_ee(&self) -> &SE3 {
        &self.world_ee
    }

    /// Marker pose in the camera frame.
    #[inline]
    pub fn camera_marker(&self) -> &SE3 {
        &self.camera_marker
    }
}

/// Append-only ordered collection of pose samples.
///
/// Samples are identified only by their insertion index.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<PoseSample>,
}

impl SampleSet {
    /// Create an empty sample set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if either transform has a non unit
    /// rotation or non-finite components. The set is left unchanged in that case.
    pub fn store(&mut self, world_ee: SE3, camera_marker: SE3) -> Result<(), ExtrinsicsError> {
        self.samples.push(PoseSample::new(world_ee, camera_marker)?);
        Ok(())
    }

    /// Remove all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Number of stored samples.
    #[inline]
    pub fn size(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample stored at `index`.
    pub fn get(&self, index: usize) -> Option<&PoseSample> {
        self.samples.get(index)
    }

    /// Iterate over the samples in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, PoseSample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a PoseSample;
    type IntoIter = std::slice::Iter<'a, PoseSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
