//! Log-normal metric scoring.
//!
//! Maps a raw metric value onto `[0, 1]` using a log-normal distribution
//! pinned by two control points: the value scoring 0.9 (`p10`) and the value
//! scoring 0.5 (`median`).

/// `erfc⁻¹(1/5)`, the standardized distance of the p10 control point.
const INVERSE_ERFC_ONE_FIFTH: f64 = 0.9061938024368232;

/// Abramowitz–Stegun 7.1.26 rational approximation of the error function.
/// Maximum absolute error 1.5e-7, well inside scoring precision.
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    let y = t * (a1 + t * (a2 + t * (a3 + t * (a4 + t * a5))));
    sign * (1.0 - y * (-x * x).exp())
}

/// Control points of a log-normal scoring curve, in metric units.
#[derive(Debug, Clone, Copy)]
pub struct ScoringCurve {
    /// Value at which the score is 0.9.
    pub p10: f64,
    /// Value at which the score is 0.5.
    pub median: f64,
}

impl ScoringCurve {
    /// Score a raw value on this curve, clamped so the control points hold
    /// exactly: at or under `p10` scores at least 0.9, at or under `median`
    /// at least 0.5.
    pub fn score(&self, value: f64) -> f64 {
        if value <= 0.0 {
            return 1.0;
        }
        let x_log_ratio = (value / self.median).max(f64::MIN_POSITIVE).ln();
        let p10_log_ratio = -(self.p10 / self.median).max(f64::MIN_POSITIVE).ln();
        let standardized = x_log_ratio * INVERSE_ERFC_ONE_FIFTH / p10_log_ratio;
        let complementary_percentile = (1.0 - erf(standardized)) / 2.0;

        if value <= self.p10 {
            complementary_percentile.clamp(0.9, 1.0)
        } else if value <= self.median {
            complementary_percentile.clamp(0.5, 0.9)
        } else {
            complementary_percentile.clamp(0.0, 0.5)
        }
    }
}
