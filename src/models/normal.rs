//! Standard normal CDF via the Abramowitz & Stegun 7.1.26 rational
//! approximation to erf. Max absolute error ~1.5e-7, branch-free apart
//! from the sign, no allocations.

const P: f64 = 0.3275911;
const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;

/// erf(x) approximation. Saturates to +/-1 for large |x|.
#[inline]
pub fn erf(x: f64) -> f64 {
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    // Horner form of a1*t + a2*t^2 + ... + a5*t^5
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;

    sign * (1.0 - poly * (-x * x).exp())
}

/// Phi(x) = 0.5 * (1 + erf(x / sqrt(2)))
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x * std::f64::consts::FRAC_1_SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{ContinuousCDF, Normal};

    #[test]
    fn test_cdf_at_zero_is_half() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-9, "Phi(0)={}", norm_cdf(0.0));
    }

    #[test]
    fn test_symmetry() {
        let mut x = -8.0;
        while x <= 8.0 {
            let lhs = norm_cdf(-x);
            let rhs = 1.0 - norm_cdf(x);
            assert!((lhs - rhs).abs() < 1e-6, "Phi(-{x})={lhs} vs 1-Phi({x})={rhs}");
            x += 0.05;
        }
    }

    #[test]
    fn test_matches_reference_normal() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = -6.0;
        while x <= 6.0 {
            let err = (norm_cdf(x) - normal.cdf(x)).abs();
            assert!(err < 2e-7, "x={x} approx={} exact={} err={err}", norm_cdf(x), normal.cdf(x));
            x += 0.01;
        }
    }

    #[test]
    fn test_saturates_in_tails() {
        assert_eq!(norm_cdf(40.0), 1.0);
        assert_eq!(norm_cdf(-40.0), 0.0);
        let p = norm_cdf(9.0);
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn test_erf_is_odd() {
        for &x in &[0.1, 0.5, 1.0, 2.5, 4.0] {
            assert_eq!(erf(-x), -erf(x));
        }
    }
}
