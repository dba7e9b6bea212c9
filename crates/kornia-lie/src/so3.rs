use glam::{DMat3, DQuat, DVec3};

use crate::LieError;

const SMALL_ANGLE_EPSILON: f64 = 1.0e-8;

/// Below this angle the Jacobian coefficients are evaluated by their Taylor series,
/// the closed forms lose too many digits to cancellation.
const JACOBIAN_TAYLOR_EPSILON: f64 = 1.0e-4;

/// A 3D rotation, stored as a unit quaternion.
///
/// `q` and `-q` represent the same rotation. After repeated compositions call
/// [`SO3::normalize`] to project the quaternion back onto the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    /// The unit quaternion.
    pub q: DQuat,
}

impl SO3 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: DQuat::IDENTITY };

    /// Create a new rotation from a quaternion.
    /// NOTE: quaternion should be normalized
    #[inline]
    pub fn new(q: DQuat) -> Self {
        Self { q }
    }

    /// Create a rotation of `angle` radians about `axis`.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        Self::exp(axis.normalize() * angle)
    }

    /// Create a rotation from a rotation matrix without checking it.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self {
            q: DQuat::from_mat3(mat),
        }
    }

    /// Create a rotation from a matrix, rejecting matrices that are not orthonormal
    /// with determinant +1 within `tol`.
    pub fn try_from_matrix(mat: &DMat3, tol: f64) -> Result<Self, LieError> {
        if !mat.is_finite() {
            return Err(LieError::NonFinite);
        }

        let gram = mat.transpose() * *mat - DMat3::IDENTITY;
        let deviation = gram
            .to_cols_array()
            .iter()
            .fold(0.0f64, |acc, x| acc.max(x.abs()))
            .max((mat.determinant() - 1.0).abs());

        if deviation > tol {
            return Err(LieError::NotOrthonormal { deviation });
        }

        Ok(Self::from_matrix(mat).normalize())
    }

    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// The inverse rotation.
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }

    /// Project the quaternion back onto the unit sphere.
    pub fn normalize(&self) -> Self {
        Self {
            q: self.q.normalize(),
        }
    }

    /// Lie algebra -> Lie group
    pub fn exp(v: DVec3) -> Self {
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();

        let (w, b) = if theta < SMALL_ANGLE_EPSILON {
            // taylor series expansion of cos(x/2) and sin(x/2)/x around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            let theta_half = 0.5 * theta;
            (theta_half.cos(), theta_half.sin() / theta)
        };

        let xyz = b * v;

        Self {
            q: DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w),
        }
    }

    /// Lie group -> Lie algebra
    pub fn log(&self) -> DVec3 {
        let mut w = self.q.w;
        let mut vec = DVec3::new(self.q.x, self.q.y, self.q.z);

        // pick the quaternion in the same hemisphere as the identity
        if w < 0.0 {
            w = -w;
            vec = -vec;
        }

        let sin_half = vec.length();

        if sin_half > SMALL_ANGLE_EPSILON {
            vec * (2.0 * sin_half.atan2(w) / sin_half)
        } else {
            vec * (2.0 / w)
        }
    }

    /// Vector space -> Lie algebra
    pub fn hat(v: DVec3) -> DMat3 {
        let (a, b, c) = (v.x, v.y, v.z);
        DMat3::from_cols_array(&[0.0, c, -b, -c, 0.0, a, b, -a, 0.0])
    }

    /// Left Jacobian of SO(3), also the `V` matrix of the SE(3) exponential.
    pub fn left_jacobian(v: DVec3) -> DMat3 {
        let skew = Self::hat(v);
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();

        let (a, b) = if theta < JACOBIAN_TAYLOR_EPSILON {
            let theta_4 = theta_sq * theta_sq;
            (
                0.5 - theta_sq / 24.0 + theta_4 / 720.0,
                1.0 / 6.0 - theta_sq / 120.0 + theta_4 / 5040.0,
            )
        } else {
            // 1 - cos(x) = 2 sin^2(x/2)
            let sin_half = (0.5 * theta).sin();
            (
                2.0 * sin_half * sin_half / theta_sq,
                (theta - theta.sin()) / (theta_sq * theta),
            )
        };

        DMat3::IDENTITY + a * skew + b * (skew * skew)
    }

    /// Inverse of [`SO3::left_jacobian`].
    pub fn left_jacobian_inverse(v: DVec3) -> DMat3 {
        let skew = Self::hat(v);
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();

        let c = if theta < JACOBIAN_TAYLOR_EPSILON {
            1.0 / 12.0 + theta_sq / 720.0 + theta_sq * theta_sq / 30240.0
        } else {
            let theta_half = 0.5 * theta;
            (1.0 - theta_half * theta_half.cos() / theta_half.sin()) / theta_sq
        };

        DMat3::IDENTITY - 0.5 * skew + c * (skew * skew)
    }
}

impl std::ops::Mul<SO3> for SO3 {
    type Output = SO3;

    fn mul(self, rhs: Self) -> Self::Output {
        Self { q: self.q * rhs.q }
    }
}

impl std::ops::Mul<DVec3> for SO3 {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> Self::Output {
        self.q * rhs
    }
}
