//! Normalization of scalar-or-list parameters.
//!
//! Several generator options may be given either once for every window or
//! once per window. [`broadcast`] is the single place where that choice is
//! turned into one value per window, before any per-window logic runs.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// A parameter supplied either as one shared value or as one value per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

/// Expands `param` into exactly `len` values.
///
/// A single value is repeated. A list must already have `len` entries.
///
/// # Errors
/// Returns [`ForecastError::InvalidInput`] if a list has the wrong length.
pub fn broadcast<T: Clone>(param: &OneOrMany<T>, len: usize, what: &str) -> ForecastResult<Vec<T>> {
    match param {
        OneOrMany::One(value) => Ok(vec![value.clone(); len]),
        OneOrMany::Many(values) if values.len() == len => Ok(values.clone()),
        OneOrMany::Many(values) => Err(ForecastError::invalid(format!(
            "{what} has {} entries, expected {len}",
            values.len()
        ))),
    }
}

/// Removes zero offsets, failing if nothing is left.
///
/// # Errors
/// Returns [`ForecastError::InvalidInput`] when every offset is zero or the list is empty.
pub fn non_zero_offsets(offsets: &[i64], what: &str) -> ForecastResult<Vec<i64>> {
    let kept: Vec<i64> = offsets.iter().copied().filter(|o| *o != 0).collect();
    if kept.is_empty() {
        return Err(ForecastError::invalid(format!("{what} value must be non-zero")));
    }
    Ok(kept)
}
