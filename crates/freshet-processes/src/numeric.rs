//! Numerical helpers shared by rate routines.

use freshet_core::constants::REAL_SMALL;
use statrs::function::gamma::gamma_lr;

/// `max(x, 0)`.
#[inline]
pub fn thresh_positive(x: f64) -> f64 {
    x.max(0.0)
}

/// Smoothed maximum of `a` and `b`. With `smooth == 0` this is `max`.
#[inline]
pub fn thresh_max(a: f64, b: f64, smooth: f64) -> f64 {
    if smooth == 0.0 {
        a.max(b)
    } else {
        0.5 * (a + b + ((a - b) * (a - b) + smooth * smooth).sqrt())
    }
}

/// Smoothed minimum of `a` and `b`. With `smooth == 0` this is `min`.
#[inline]
pub fn thresh_min(a: f64, b: f64, smooth: f64) -> f64 {
    if smooth == 0.0 {
        a.min(b)
    } else {
        0.5 * (a + b - ((a - b) * (a - b) + smooth * smooth).sqrt())
    }
}

/// CDF of a gamma distribution with `shape` and `rate` at `t`.
///
/// Zero for `t <= 0` and for non-positive or non-finite parameters.
#[inline]
pub fn gamma_cdf(t: f64, shape: f64, rate: f64) -> f64 {
    let x = rate * t;
    if !(x > 0.0 && shape > 0.0) || !shape.is_finite() || x.is_nan() {
        return 0.0;
    }
    if x.is_infinite() {
        return 1.0;
    }
    gamma_lr(shape, x).clamp(0.0, 1.0)
}

/// Lower branch `W₋₁(x)` of the Lambert W function on `[-1/e, 0)`.
///
/// Returns -1 at or below the branch point and `-inf` at `x >= 0`.
pub fn lambert_w_m1(x: f64) -> f64 {
    let branch = -(-1.0f64).exp();
    if x <= branch {
        return -1.0;
    }
    if x >= 0.0 {
        return f64::NEG_INFINITY;
    }
    let mut w = if x < -0.25 {
        let p = -(2.0 * (1.0 + std::f64::consts::E * x)).sqrt();
        -1.0 + p - p * p / 3.0 + 11.0 / 72.0 * p * p * p
    } else {
        let l1 = (-x).ln();
        let l2 = (-l1).ln();
        l1 - l2 + l2 / l1
    };
    for _ in 0..30 {
        let ew = w.exp();
        let f = w * ew - x;
        let wp1 = w + 1.0;
        if wp1.abs() < REAL_SMALL {
            break;
        }
        let step = f / (ew * wp1 - (w + 2.0) * f / (2.0 * wp1));
        w -= step;
        if step.abs() <= 1e-14 * (1.0 + w.abs()) {
            break;
        }
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gamma_cdf_of_shape_one_is_exponential() {
        for t in [0.1, 0.5, 1.0, 3.0, 10.0] {
            assert_relative_eq!(gamma_cdf(t, 1.0, 2.0), 1.0 - (-2.0 * t).exp(), epsilon = 1e-12);
        }
    }

    #[test]
    fn gamma_cdf_is_monotone_and_bounded() {
        let mut last = 0.0;
        for i in 0..200 {
            let v = gamma_cdf(i as f64 * 0.1, 3.5, 0.8);
            assert!(v >= last - 1e-15);
            assert!((0.0..=1.0).contains(&v));
            last = v;
        }
        assert!(last > 0.999);
        assert_eq!(gamma_cdf(0.0, 2.0, 1.0), 0.0);
        assert_eq!(gamma_cdf(-1.0, 2.0, 1.0), 0.0);
        assert_eq!(gamma_cdf(1.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn lambert_lower_branch_inverts_w_exp_w() {
        for x in [-0.36, -0.3, -0.2, -0.1, -0.01, -1e-4] {
            let w = lambert_w_m1(x);
            assert!(w <= -1.0);
            assert_relative_eq!(w * w.exp(), x, epsilon = 1e-12);
        }
        assert_eq!(lambert_w_m1(-1.0), -1.0);
    }

    #[test]
    fn smoothed_thresholds_reduce_to_min_max() {
        assert_eq!(thresh_max(1.0, 2.0, 0.0), 2.0);
        assert_eq!(thresh_min(1.0, 2.0, 0.0), 1.0);
        assert!(thresh_max(1.0, 1.0, 0.1) > 1.0);
        assert_eq!(thresh_positive(-3.0), 0.0);
    }
}
