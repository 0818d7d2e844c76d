//! Numeric conversion helpers centralizing the lossy casts used in reporting.

use num_traits::cast::cast;

/// Convert a count to f64, allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Share of `part` in `whole`, or 0.0 when `whole` is zero.
#[must_use]
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    count_to_f64(part) / count_to_f64(whole)
}

/// Mean of a slice, or 0.0 when empty.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / count_to_f64(values.len())
}

/// Express a probability as a percentage rounded to whole points.
#[must_use]
pub fn percent_points(probability: f64) -> i64 {
    if !probability.is_finite() {
        return 0;
    }
    cast::<f64, i64>((probability * 100.0).round()).unwrap_or(0)
}
