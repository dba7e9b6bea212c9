use glam::{DMat3, DQuat, DVec3};
use rand::Rng;

use crate::{so3::SO3, LieError};

/// Row-major 6x6 matrix acting on twists ordered as `[rotation, translation]`.
pub type Matrix6 = [[f64; 6]; 6];

/// A small rigid displacement: the Lie algebra se(3) as a 6-vector.
///
/// The rotational part comes first, followed by the translational part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twist {
    /// Rotational component (axis-angle), radians.
    pub rotation: DVec3,
    /// Translational component.
    pub translation: DVec3,
}

impl Twist {
    /// The zero twist.
    pub const ZERO: Self = Self {
        rotation: DVec3::ZERO,
        translation: DVec3::ZERO,
    };

    /// Create a twist from its rotational and translational parts.
    pub fn new(rotation: DVec3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a twist from `[wx, wy, wz, vx, vy, vz]`.
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            rotation: DVec3::new(arr[0], arr[1], arr[2]),
            translation: DVec3::new(arr[3], arr[4], arr[5]),
        }
    }

    /// Returns `[wx, wy, wz, vx, vy, vz]`.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
            self.translation.x,
            self.translation.y,
            self.translation.z,
        ]
    }

    /// Euclidean norm of the 6-vector.
    pub fn norm(&self) -> f64 {
        (self.rotation.length_squared() + self.translation.length_squared()).sqrt()
    }

    /// Largest absolute component, NaN if any component is NaN.
    pub fn max_abs(&self) -> f64 {
        if self.rotation.is_nan() || self.translation.is_nan() {
            return f64::NAN;
        }
        self.rotation.abs().max_element().max(self.translation.abs().max_element())
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite()
    }

    /// The small adjoint `ad(τ)`, i.e. the matrix of the Lie bracket `[τ, ·]`.
    pub fn ad(&self) -> Matrix6 {
        let omega = SO3::hat(self.rotation);
        let upsilon = SO3::hat(self.translation);
        from_blocks(&omega, &DMat3::ZERO, &upsilon, &omega)
    }
}

/// A rigid body transformation: rotation followed by translation.
///
/// `T_a_b` maps points expressed in frame `b` into frame `a`, and composes as
/// `T_a_c = T_a_b * T_b_c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    /// Rotation part.
    pub rotation: SO3,
    /// Translation part.
    pub translation: DVec3,
}

impl SE3 {
    /// The identity transformation.
    pub const IDENTITY: Self = Self {
        rotation: SO3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create a transform from a rotation and a translation.
    pub fn new(rotation: SO3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a transform from a quaternion and a translation.
    /// NOTE: quaternion should be normalized
    pub fn from_qxyz(q: DQuat, translation: DVec3) -> Self {
        Self::new(SO3::new(q), translation)
    }

    /// Create a transform rotating `angle` radians about `axis`, then translating.
    pub fn from_axis_angle(axis: DVec3, angle: f64, translation: DVec3) -> Self {
        Self::new(SO3::from_axis_angle(axis, angle), translation)
    }

    /// Create a transform from `[tx, ty, tz, qx, qy, qz, qw]` without validation.
    pub fn from_pose7(pose: [f64; 7]) -> Self {
        Self::from_qxyz(
            DQuat::from_xyzw(pose[3], pose[4], pose[5], pose[6]),
            DVec3::new(pose[0], pose[1], pose[2]),
        )
    }

    /// Returns `[tx, ty, tz, qx, qy, qz, qw]`.
    pub fn to_pose7(&self) -> [f64; 7] {
        let t = self.translation;
        let q = self.rotation.q;
        [t.x, t.y, t.z, q.x, q.y, q.z, q.w]
    }

    /// Random transform with a uniformly sampled rotation and translation in `[-1, 1)^3`.
    pub fn from_random() -> Self {
        Self::from_rng(&mut rand::rng())
    }

    /// Same as [`SE3::from_random`], drawing from `rng`.
    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        let r1: f64 = rng.random();
        let r2: f64 = rng.random();
        let r3: f64 = rng.random();

        // Shoemake method
        let one_minus_r1_sqrt = (1.0 - r1).sqrt();
        let r1_sqrt = r1.sqrt();
        let tau = 2.0 * std::f64::consts::PI;

        let q = DQuat::from_xyzw(
            one_minus_r1_sqrt * (tau * r2).sin(),
            r1_sqrt * (tau * r3).cos(),
            r1_sqrt * (tau * r3).sin(),
            one_minus_r1_sqrt * (tau * r2).cos(),
        )
        .normalize();

        let translation = DVec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );

        Self::from_qxyz(q, translation)
    }

    /// Check that all components are finite and the rotation is a unit quaternion
    /// within `tol`.
    pub fn validate(&self, tol: f64) -> Result<(), LieError> {
        if !self.translation.is_finite() || !self.rotation.q.is_finite() {
            return Err(LieError::NonFinite);
        }
        let norm = self.rotation.q.length();
        if (norm - 1.0).abs() > tol {
            return Err(LieError::NotUnitQuaternion { norm });
        }
        Ok(())
    }

    /// Re-orthonormalize the rotation part.
    pub fn normalize(&self) -> Self {
        Self::new(self.rotation.normalize(), self.translation)
    }

    /// The inverse transformation.
    pub fn inverse(&self) -> Self {
        let r_inv = self.rotation.inverse();
        Self {
            rotation: r_inv,
            translation: -(r_inv * self.translation),
        }
    }

    /// Lie algebra -> Lie group
    pub fn exp(tau: Twist) -> Self {
        Self {
            rotation: SO3::exp(tau.rotation),
            translation: SO3::left_jacobian(tau.rotation) * tau.translation,
        }
    }

    /// Lie group -> Lie algebra
    pub fn log(&self) -> Twist {
        let omega = self.rotation.log();
        Twist::new(omega, SO3::left_jacobian_inverse(omega) * self.translation)
    }

    /// Retraction: `self * exp(tau)`.
    #[inline]
    pub fn rplus(&self, tau: Twist) -> Self {
        *self * SE3::exp(tau)
    }

    /// Logarithmic difference: `log(self^-1 * other)`.
    #[inline]
    pub fn rminus(&self, other: &Self) -> Twist {
        (self.inverse() * *other).log()
    }

    /// Adjoint matrix, satisfying `T * exp(τ) * T^-1 == exp(Ad(T) τ)`.
    pub fn adjoint(&self) -> Matrix6 {
        let r = self.rotation.matrix();
        let tr = SO3::hat(self.translation) * r;
        from_blocks(&r, &DMat3::ZERO, &tr, &r)
    }

    /// Inverse of the right Jacobian of SE(3), truncated after the second order term:
    /// `I + ad(τ)/2 + ad(τ)^2/12`.
    pub fn right_jacobian_inverse(tau: &Twist) -> Matrix6 {
        let ad = tau.ad();
        let ad_sq = mat6_mul(&ad, &ad);
        let mut out = [[0.0; 6]; 6];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, val) in row.iter_mut().enumerate() {
                let identity = if r == c { 1.0 } else { 0.0 };
                *val = identity + 0.5 * ad[r][c] + ad_sq[r][c] / 12.0;
            }
        }
        out
    }
}

impl std::ops::Mul<SE3> for SE3 {
    type Output = SE3;

    fn mul(self, rhs: SE3) -> SE3 {
        SE3::new(
            self.rotation * rhs.rotation,
            self.rotation * rhs.translation + self.translation,
        )
    }
}

impl std::ops::Mul<DVec3> for SE3 {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> Self::Output {
        self.rotation * rhs + self.translation
    }
}

/// Assemble a 6x6 matrix from four 3x3 blocks.
pub fn from_blocks(
    top_left: &DMat3,
    top_right: &DMat3,
    bottom_left: &DMat3,
    bottom_right: &DMat3,
) -> Matrix6 {
    let mut out = [[0.0; 6]; 6];
    for (block, (row0, col0)) in [
        (top_left, (0, 0)),
        (top_right, (0, 3)),
        (bottom_left, (3, 0)),
        (bottom_right, (3, 3)),
    ] {
        for c in 0..3 {
            let col = block.col(c);
            for r in 0..3 {
                out[row0 + r][col0 + c] = col[r];
            }
        }
    }
    out
}

/// Product of two 6x6 matrices.
pub fn mat6_mul(a: &Matrix6, b: &Matrix6) -> Matrix6 {
    let mut out = [[0.0; 6]; 6];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, val) in row.iter_mut().enumerate() {
            *val = (0..6).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

/// Product of a 6x6 matrix and a twist.
pub fn mat6_mul_twist(a: &Matrix6, tau: &Twist) -> Twist {
    let v = tau.to_array();
    let mut out = [0.0; 6];
    for (r, val) in out.iter_mut().enumerate() {
        *val = (0..6).map(|k| a[r][k] * v[k]).sum();
    }
    Twist::from_array(out)
}
