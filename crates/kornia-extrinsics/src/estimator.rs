use faer::prelude::SpSolverLstsq;
use kornia_lie::se3::mat6_mul;
use kornia_lie::{Twist, SE3};

use crate::{ExtrinsicsError, PoseSample, SampleSet, UnknownTransforms};

/// Number of unknowns: 6 for the camera pose and 6 for the marker pose.
const NUM_PARAMS: usize = 12;

/// Parameters controlling the refinement step.
#[derive(Debug, Clone)]
pub struct EstimatorParams {
    /// Relative threshold on `σ_min / σ_max` of the stacked Jacobian below which
    /// the system is reported as singular.
    pub rank_tolerance: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-8,
        }
    }
}

impl EstimatorParams {
    /// Create default estimator parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rank tolerance.
    pub fn with_rank_tolerance(mut self, tol: f64) -> Self {
        self.rank_tolerance = tol;
        self
    }
}

/// Per-sample error twists produced by one refinement call.
///
/// Twist `i` measures how far sample `i` is from satisfying
/// `T_world_ee ∘ T_ee_marker == T_world_camera ∘ T_camera_marker`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Residual {
    twists: Vec<Twist>,
}

impl Residual {
    /// The per-sample error twists in sample order.
    pub fn twists(&self) -> &[Twist] {
        &self.twists
    }

    /// Number of samples in the residual.
    pub fn len(&self) -> usize {
        self.twists.len()
    }

    /// Whether the residual holds no samples.
    pub fn is_empty(&self) -> bool {
        self.twists.is_empty()
    }
}

/// Error twist of one sample:
/// `log((T_world_camera ∘ T_camera_marker)⁻¹ ∘ (T_world_ee ∘ T_ee_marker))`.
///
/// Zero when the marker pose reached through the camera agrees with the one reached
/// through the robot kinematic chain.
pub fn error_twist(world_camera: &SE3, ee_marker: &SE3, sample: &PoseSample) -> Twist {
    let world_marker_camera = *world_camera * *sample.camera_marker();
    let world_marker_robot = *sample.world_ee() * *ee_marker;
    world_marker_camera.rminus(&world_marker_robot)
}

/// Evaluate the error twists of all samples for the given estimates.
pub fn compute_residual(samples: &SampleSet, world_camera: &SE3, ee_marker: &SE3) -> Residual {
    Residual {
        twists: samples
            .iter()
            .map(|sample| error_twist(world_camera, ee_marker, sample))
            .collect(),
    }
}

/// Gauss-Newton estimator for the camera and marker poses.
///
/// Each call to [`Estimator::refine`] performs exactly one linearize-solve-retract step
/// over all stored samples; stopping is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    params: EstimatorParams,
}

impl Estimator {
    /// Create an estimator with the given parameters.
    pub fn new(params: EstimatorParams) -> Self {
        Self { params }
    }

    /// The estimator parameters.
    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Run one refinement step and update `unknowns` in place.
    ///
    /// Both unknowns are perturbed on the right, `T ← T ∘ exp(δ)`. For sample `i`, with
    /// `P_i = T_world_camera⁻¹ ∘ T_world_ee[i] ∘ T_ee_marker` and error twist `e_i`,
    /// the linearized error is
    ///
    /// `e_i + Jr⁻¹(e_i) (δ_marker − Ad(P_i⁻¹) δ_camera)`
    ///
    /// The stacked 6n x 12 system is solved in the least squares sense with a QR
    /// decomposition, and the rotations are re-normalized after the update.
    ///
    /// # Returns
    ///
    /// The residual re-evaluated at the updated estimates.
    ///
    /// # Errors
    ///
    /// * [`ExtrinsicsError::NotSeeded`] if `unknowns` has not been seeded.
    /// * [`ExtrinsicsError::NoSamples`] if `samples` is empty.
    /// * [`ExtrinsicsError::SingularSystem`] if the samples do not constrain all 12
    ///   degrees of freedom.
    /// * [`ExtrinsicsError::NonFinite`] if the Jacobian or an error twist, before or
    ///   after the update, is not finite.
    ///
    /// On error `unknowns` is left unchanged.
    pub fn refine(
        &self,
        samples: &SampleSet,
        unknowns: &mut UnknownTransforms,
    ) -> Result<Residual, ExtrinsicsError> {
        let (world_camera, ee_marker) = unknowns.current()?;

        if samples.is_empty() {
            return Err(ExtrinsicsError::NoSamples);
        }

        let num_samples = samples.size();
        let num_rows = 6 * num_samples;

        let mut jacobian = faer::Mat::<f64>::zeros(num_rows, NUM_PARAMS);
        let mut rhs = faer::Mat::<f64>::zeros(num_rows, 1);

        let camera_world = world_camera.inverse();
        let non_finite = ExtrinsicsError::NonFinite { num_samples };

        for (i, sample) in samples.iter().enumerate() {
            let error = error_twist(&world_camera, &ee_marker, sample);
            if !error.is_finite() {
                return Err(non_finite);
            }
            let jr_inv = SE3::right_jacobian_inverse(&error);

            let camera_marker_robot = camera_world * *sample.world_ee() * ee_marker;
            let jac_camera = mat6_mul(&jr_inv, &camera_marker_robot.inverse().adjoint());
            if jac_camera.iter().chain(jr_inv.iter()).flatten().any(|x| !x.is_finite()) {
                return Err(non_finite);
            }

            let error = error.to_array();
            for r in 0..6 {
                let row = 6 * i + r;
                for c in 0..6 {
                    jacobian[(row, c)] = -jac_camera[r][c];
                    jacobian[(row, 6 + c)] = jr_inv[r][c];
                }
                rhs[(row, 0)] = -error[r];
            }
        }

        // reject systems that leave some degrees of freedom unconstrained, the
        // jacobian is finite here so the singular values are as well
        let singular_values = jacobian.singular_values();
        let max_singular_value = singular_values.iter().copied().fold(0.0, f64::max);
        let min_singular_value = if singular_values.len() < NUM_PARAMS {
            0.0
        } else {
            singular_values.iter().copied().fold(f64::INFINITY, f64::min)
        };

        let singular = ExtrinsicsError::SingularSystem {
            num_samples,
            min_singular_value,
            max_singular_value,
        };

        if max_singular_value <= 0.0
            || min_singular_value <= self.params.rank_tolerance * max_singular_value
        {
            return Err(singular);
        }

        let delta = jacobian.qr().solve_lstsq(rhs);

        let mut step = [0.0; NUM_PARAMS];
        for (k, val) in step.iter_mut().enumerate() {
            *val = delta[(k, 0)];
        }

        if step.iter().any(|x| !x.is_finite()) {
            return Err(singular);
        }

        let (camera_step, marker_step) = step.split_at(6);
        let delta_camera = Twist::from_array(twist_components(camera_step));
        let delta_marker = Twist::from_array(twist_components(marker_step));

        let world_camera = world_camera.rplus(delta_camera).normalize();
        let ee_marker = ee_marker.rplus(delta_marker).normalize();

        let residual = compute_residual(samples, &world_camera, &ee_marker);
        if residual.twists().iter().any(|twist| !twist.is_finite()) {
            return Err(non_finite);
        }

        unknowns.update(world_camera, ee_marker);

        log::debug!(
            "refine: samples: {} step: {:.3e} residual: {}",
            num_samples,
            step.iter().map(|x| x * x).sum::<f64>().sqrt(),
            residual.summary()
        );

        Ok(residual)
    }
}

fn twist_components(step: &[f64]) -> [f64; 6] {
    let mut out = [0.0; 6];
    out.copy_from_slice(&step[..6]);
    out
}
