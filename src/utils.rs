//! Numeric helpers shared by the angle engine and the formatter.

use crate::{Error, Result};

/// Round to one decimal place
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round an angle to whole degrees (half away from zero) and convert to i32
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn round_to_degree(value: f64) -> Result<i32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
        Ok(rounded as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Angle {value} cannot be rounded to whole degrees"
        )))
    }
}

/// Arithmetic mean, 0 for an empty iterator
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        sum / n
    }
}
