//! Division-safe and NaN-safe primitives for money-scale scoring math.
//!
//! Every function here returns a finite number. Displayed state must never
//! carry NaN or an infinity, so degenerate inputs collapse to `0.0`.

/// Default tolerance for comparing scores and weight sums.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Replace NaN and infinities with `0.0`.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `numerator / denominator`, or `0.0` when the denominator is zero or the
/// quotient is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// Arithmetic mean, `0.0` for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().copied().map(finite_or_zero).sum();
    safe_ratio(sum, values.len() as f64)
}

/// Clamp into `[0, 1]`. Non-finite input maps to `0.0`.
pub fn clamp_unit(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Absolute-difference comparison.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol
}
