//! A simulated robot with a fixed camera, used by tests, benchmarks and demos.
//!
//! The rig answers the same frame queries a live transform tree would: the
//! kinematic chain reports the end-effector pose and the camera reports the marker
//! it sees, optionally corrupted by bounded noise.

use std::cell::RefCell;

use glam::DVec3;
use kornia_lie::{Twist, SE3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{FrameConfig, LookupError, TransformSource};

/// A robot arm observed by a fixed camera, with known ground truth extrinsics.
#[derive(Debug)]
pub struct SyntheticRig {
    frames: FrameConfig,
    world_camera: SE3,
    ee_marker: SE3,
    world_ee: SE3,
    rotation_noise: f64,
    translation_noise: f64,
    marker_visible: bool,
    rng: RefCell<StdRng>,
}

impl SyntheticRig {
    /// Create a noise free rig with the arm at the base origin.
    pub fn new(frames: FrameConfig, world_camera: SE3, ee_marker: SE3) -> Self {
        Self {
            frames,
            world_camera,
            ee_marker,
            world_ee: SE3::IDENTITY,
            rotation_noise: 0.0,
            translation_noise: 0.0,
            marker_visible: true,
            rng: RefCell::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Perturb each camera observation by a twist drawn uniformly in
    /// `[-rotation, rotation]` (radians) and `[-translation, translation]` (meters)
    /// per axis. `seed` makes the draws reproducible.
    pub fn with_noise(mut self, rotation: f64, translation: f64, seed: u64) -> Self {
        self.rotation_noise = rotation.abs();
        self.translation_noise = translation.abs();
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Ground truth camera pose in the base frame.
    pub fn world_camera(&self) -> &SE3 {
        &self.world_camera
    }

    /// Ground truth marker pose in the end-effector frame.
    pub fn ee_marker(&self) -> &SE3 {
        &self.ee_marker
    }

    /// Current end-effector pose.
    pub fn world_ee(&self) -> &SE3 {
        &self.world_ee
    }

    /// Move the arm.
    pub fn move_to(&mut self, world_ee: SE3) {
        self.world_ee = world_ee;
    }

    /// Hide or show the marker; hidden markers make camera lookups fail.
    pub fn set_marker_visible(&mut self, visible: bool) {
        self.marker_visible = visible;
    }

    /// Noise free `(T_world_ee, T_camera_marker)` pair for an arbitrary arm pose.
    pub fn sample_pair(&self, world_ee: &SE3) -> (SE3, SE3) {
        let camera_marker = self.world_camera.inverse() * *world_ee * self.ee_marker;
        (*world_ee, camera_marker.normalize())
    }

    fn observe_marker(&self) -> SE3 {
        let (_, camera_marker) = self.sample_pair(&self.world_ee);
        if self.rotation_noise == 0.0 && self.translation_noise == 0.0 {
            return camera_marker;
        }

        let mut rng = self.rng.borrow_mut();
        let mut draw = |amp: f64| {
            if amp > 0.0 {
                rng.random_range(-amp..=amp)
            } else {
                0.0
            }
        };
        let noise = Twist::new(
            DVec3::new(
                draw(self.rotation_noise),
                draw(self.rotation_noise),
                draw(self.rotation_noise),
            ),
            DVec3::new(
                draw(self.translation_noise),
                draw(self.translation_noise),
                draw(self.translation_noise),
            ),
        );
        camera_marker.rplus(noise).normalize()
    }
}

impl TransformSource for SyntheticRig {
    fn lookup(&self, parent: &str, child: &str) -> Result<SE3, LookupError> {
        let frames = &self.frames;
        if parent == frames.base_frame && child == frames.ee_frame {
            return Ok(self.world_ee);
        }
        if parent == frames.camera_frame && child == frames.marker_frame {
            if !self.marker_visible {
                return Err(LookupError::unavailable(parent, child));
            }
            return Ok(self.observe_marker());
        }
        Err(LookupError::unavailable(parent, child))
    }
}

/// `n` end-effector poses in front of the robot with well spread orientations.
///
/// The sequence is deterministic; consecutive poses rotate about different axes so
/// that any three or more of them constrain both unknown transforms.
pub fn sample_ee_poses(n: usize) -> Vec<SE3> {
    let axes = [
        DVec3::X,
        DVec3::Y,
        DVec3::Z,
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(0.0, 1.0, 1.0),
        DVec3::new(1.0, 0.0, 1.0),
        DVec3::new(1.0, -1.0, 1.0),
    ];

    (0..n)
        .map(|i| {
            let k = i as f64;
            let axis = axes[i % axes.len()];
            let angle = 0.3 + 0.25 * ((k * 0.7).sin() + 1.0);
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let position = DVec3::new(
                0.4 + 0.1 * (k * 1.3).cos(),
                0.15 * (k * 0.9).sin(),
                0.5 + 0.1 * (k * 0.5).cos(),
            );
            SE3::from_axis_angle(axis, sign * angle, position)
        })
        .collect()
}
