// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Statistical Helpers
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Normal-distribution approximations used by the power detector.

/// Error function (Abramowitz & Stegun 7.1.26, |ε| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    (0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))).clamp(0.0, 1.0)
}

/// Inverse standard normal CDF (Acklam's rational approximation).
///
/// Returns ±∞ outside (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    let p_low = 0.02425;
    let p_high = 1.0 - p_low;

    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= p_high {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Approximate power of a two-sample proportion test with unpooled variance.
///
/// `n_ctrl` / `n_trt` are effective (post-dropout) arm sizes. Returns `None`
/// when the inputs cannot describe a valid design.
pub fn two_proportion_power(
    p_ctrl: f64,
    effect: f64,
    n_ctrl: f64,
    n_trt: f64,
    alpha: f64,
    two_sided: bool,
) -> Option<f64> {
    let p_trt = p_ctrl + effect;
    let in_unit = |p: f64| p > 0.0 && p < 1.0;
    if !in_unit(p_ctrl) || !in_unit(p_trt) || !in_unit(alpha) {
        return None;
    }
    if n_ctrl <= 0.0 || n_trt <= 0.0 {
        return Some(0.0);
    }

    let var = p_ctrl * (1.0 - p_ctrl) / n_ctrl + p_trt * (1.0 - p_trt) / n_trt;
    if var <= 0.0 || !var.is_finite() {
        return None;
    }
    let tail = if two_sided { alpha / 2.0 } else { alpha };
    let z_crit = normal_quantile(1.0 - tail);
    let z = effect.abs() / var.sqrt() - z_crit;
    Some(normal_cdf(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdf_symmetry() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.5) + normal_cdf(-1.5) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_quantile_known_values() {
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
        assert!((normal_quantile(0.95) - 1.644854).abs() < 1e-5);
        assert!(normal_quantile(0.0).is_infinite());
    }

    #[test]
    fn test_quantile_inverts_cdf() {
        for p in [0.01, 0.1, 0.5, 0.8, 0.99] {
            assert!((normal_cdf(normal_quantile(p)) - p).abs() < 1e-6);
        }
    }

    #[test]
    fn test_power_small_trial() {
        // 90 effective per arm, 30% vs 40%: se ≈ 0.0707, z ≈ 1.414 - 1.96
        let power = two_proportion_power(0.30, 0.10, 90.0, 90.0, 0.05, true).unwrap();
        assert!((power - 0.2926).abs() < 0.005, "power = {power}");
    }

    #[test]
    fn test_power_large_trial() {
        let power = two_proportion_power(0.30, 0.10, 475.0, 475.0, 0.05, true).unwrap();
        assert!(power > 0.85, "power = {power}");
    }

    #[test]
    fn test_power_one_sided_higher() {
        let two = two_proportion_power(0.30, 0.10, 150.0, 150.0, 0.05, true).unwrap();
        let one = two_proportion_power(0.30, 0.10, 150.0, 150.0, 0.05, false).unwrap();
        assert!(one > two);
    }

    #[test]
    fn test_power_invalid_rates() {
        assert!(two_proportion_power(0.95, 0.10, 100.0, 100.0, 0.05, true).is_none());
        assert!(two_proportion_power(0.0, 0.10, 100.0, 100.0, 0.05, true).is_none());
    }
}
