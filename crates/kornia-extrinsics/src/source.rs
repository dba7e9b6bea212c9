use std::collections::HashMap;

use kornia_lie::SE3;
use thiserror::Error;

/// Error returned by a [`TransformSource`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    /// The source has no transform between the two frames.
    #[error("no transform available from {parent:?} to {child:?}")]
    Unavailable {
        /// Reference frame of the requested transform.
        parent: String,
        /// Frame whose pose was requested.
        child: String,
    },

    /// The source failed for a backend specific reason.
    #[error("transform lookup failed: {0}")]
    Backend(String),
}

impl LookupError {
    /// Shorthand for [`LookupError::Unavailable`].
    pub fn unavailable(parent: &str, child: &str) -> Self {
        Self::Unavailable {
            parent: parent.to_string(),
            child: child.to_string(),
        }
    }
}

/// Capability to resolve the transform between two named frames.
pub trait TransformSource {
    /// Pose of frame `child` expressed in frame `parent`, i.e. `T_parent_child`.
    fn lookup(&self, parent: &str, child: &str) -> Result<SE3, LookupError>;
}

impl<T: TransformSource + ?Sized> TransformSource for &T {
    fn lookup(&self, parent: &str, child: &str) -> Result<SE3, LookupError> {
        (**self).lookup(parent, child)
    }
}

impl<T: TransformSource + ?Sized> TransformSource for Box<T> {
    fn lookup(&self, parent: &str, child: &str) -> Result<SE3, LookupError> {
        (**self).lookup(parent, child)
    }
}

/// A fixed table of transforms, answering direct and inverse lookups.
#[derive(Debug, Clone, Default)]
pub struct StaticTransformSource {
    transforms: HashMap<(String, String), SE3>,
}

impl StaticTransformSource {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `T_parent_child`.
    pub fn insert(&mut self, parent: &str, child: &str, transform: SE3) {
        self.transforms
            .insert((parent.to_string(), child.to_string()), transform);
    }

    /// Remove `T_parent_child` if present.
    pub fn remove(&mut self, parent: &str, child: &str) -> Option<SE3> {
        self.transforms
            .remove(&(parent.to_string(), child.to_string()))
    }
}

impl TransformSource for StaticTransformSource {
    fn lookup(&self, parent: &str, child: &str) -> Result<SE3, LookupError> {
        let key = (parent.to_string(), child.to_string());
        if let Some(transform) = self.transforms.get(&key) {
            return Ok(*transform);
        }

        let inverse_key = (child.to_string(), parent.to_string());
        self.transforms
            .get(&inverse_key)
            .map(SE3::inverse)
            .ok_or_else(|| LookupError::unavailable(parent, child))
    }
}
