use std::fmt;

use kornia_lie::Twist;

use crate::Residual;

/// Scalar convergence indicators of one [`Residual`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResidualSummary {
    /// Number of per-sample twists summarized.
    pub num_samples: usize,
    /// Largest per-sample twist norm.
    pub max_norm: f64,
    /// Root mean square of the per-sample twist norms.
    pub rms_norm: f64,
    /// Largest absolute component over all twists.
    pub max_abs_component: f64,
    /// Norm of all twists stacked into one 6n-vector.
    pub stacked_norm: f64,
}

impl fmt::Display for ResidualSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} max={:.3e} rms={:.3e} max_abs={:.3e} norm={:.3e}",
            self.num_samples,
            self.max_norm,
            self.rms_norm,
            self.max_abs_component,
            self.stacked_norm
        )
    }
}

/// Summarize a set of error twists. An empty slice yields all zeros.
///
/// A NaN component makes every field NaN, so stopping rules comparing against a
/// tolerance never mistake a failed evaluation for convergence.
pub fn summarize(twists: &[Twist]) -> ResidualSummary {
    if twists.is_empty() {
        return ResidualSummary::default();
    }

    let mut max_norm = 0.0f64;
    let mut max_abs_component = 0.0f64;
    let mut sum_sq = 0.0;

    for twist in twists {
        let norm = twist.norm();
        max_norm = nan_max(max_norm, norm);
        max_abs_component = nan_max(max_abs_component, twist.max_abs());
        sum_sq += norm * norm;
    }

    ResidualSummary {
        num_samples: twists.len(),
        max_norm,
        rms_norm: (sum_sq / twists.len() as f64).sqrt(),
        max_abs_component,
        stacked_norm: sum_sq.sqrt(),
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

impl Residual {
    /// Summarize the residual into scalar convergence indicators.
    pub fn summary(&self) -> ResidualSummary {
        summarize(self.twists())
    }
}
