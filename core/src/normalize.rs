//! Numeric utilities shared by every scoring path.
//!
//! RULE: every composite score passes through `clamp_unit` before it
//! leaves this crate, so no rounding or extrapolation escapes [0, 1].

/// Min-max normalise `value` against the observed range.
///
/// Returns 0.0 when `min == max` (every observation identical) instead of
/// dividing by zero. The result is not clamped; callers clamp at the
/// composite boundary.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    (value - min) / (max - min)
}

/// Hard-bound `value` to `[lo, hi]`. NaN resolves to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

/// Shorthand for `clamp(value, 0.0, 1.0)`.
pub fn clamp_unit(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Round to 4 decimal places, the precision of every persisted score.
pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}
