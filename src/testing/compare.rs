//! Tolerance-aware comparison of expected and live values

use thiserror::Error;

use super::value::Value;

/// Errors raised while comparing two values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComparisonError {
    #[error("invalid tolerance {0}: must be a finite, non-negative number")]
    InvalidTolerance(f64),
}

/// Compare an expected value against a live one.
///
/// Policy, first match wins:
/// 1. both numbers: `|a - b| <= tolerance`, regardless of original numeric width
/// 2. both 2D vectors: each axis within `tolerance`
/// 3. otherwise exact equality (`null == null`, one-sided null is unequal)
pub fn compare(expected: &Value, actual: &Value, tolerance: f64) -> Result<bool, ComparisonError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ComparisonError::InvalidTolerance(tolerance));
    }

    if let (Some(a), Some(b)) = (expected.as_f64(), actual.as_f64()) {
        return Ok(within(a, b, tolerance));
    }

    if let (Some(a), Some(b)) = (expected.as_vec2(), actual.as_vec2()) {
        return Ok(within(a.x as f64, b.x as f64, tolerance)
            && within(a.y as f64, b.y as f64, tolerance));
    }

    Ok(expected == actual)
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
