//! Walk-forward train/test split for multi-step forecasting.
//!
//! The test period is the last `n_steps` business days that have every
//! target defined. Training stops `n_steps` business days before the test
//! period starts: a training row's targets reach up to `n_steps` days into
//! the future, so anything closer would see test-period closes.

use chrono::NaiveDate;
use tracing::info;

use stock_forecast_core::{nth_previous_working_date, ForecastError, ForecastResult};
use stock_forecast_features::{FeatureMatrix, TargetMatrix};

/// Dense train and test matrices produced by [`split_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardSplit {
    pub x_train: FeatureMatrix,
    pub y_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_test: FeatureMatrix,
    /// Last date allowed in the training set.
    pub train_end: NaiveDate,
    /// First date of the test window.
    pub test_start: NaiveDate,
    /// Last date of the test window.
    pub test_end: NaiveDate,
}

impl WalkForwardSplit {
    /// Returns true if the training set ends strictly before the test window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x_train
            .latest_date()
            .map_or(false, |last| last < self.test_start)
    }
}

/// Splits aligned `x` and `y` into a training set and the most recent
/// `n_steps`-day test window.
///
/// Rows with any missing target are dropped from both sides. Both outputs
/// are sorted by (date, symbol) and keep the full column set.
///
/// # Errors
/// - [`ForecastError::InvalidInput`] for `n_steps == 0` or misaligned input;
/// - [`ForecastError::InsufficientData`] if no row has complete targets or
///   either side of the split is empty.
pub fn split_data(
    x: &FeatureMatrix,
    y: &TargetMatrix,
    n_steps: usize,
) -> ForecastResult<WalkForwardSplit> {
    if n_steps == 0 {
        return Err(ForecastError::invalid("n_steps must be positive"));
    }
    x.ensure_aligned(y)?;

    let complete = y.complete_rows();
    let test_end = complete
        .iter()
        .map(|&i| y.keys()[i].date)
        .max()
        .ok_or_else(|| ForecastError::insufficient("no row has every target defined"))?;

    let horizon = i64::try_from(n_steps)
        .map_err(|_| ForecastError::invalid("n_steps is too large"))?;
    let test_start = nth_previous_working_date(horizon - 1, test_end);
    let train_end = nth_previous_working_date(2 * horizon, test_end);

    let x = x.take(&complete);
    let y = y.take(&complete).to_dense()?;

    let x_train = x.filter_keys(|k| k.date <= train_end).sorted_by_key();
    let y_train = y.filter_keys(|k| k.date <= train_end).sorted_by_key();
    let x_test = x.between(test_start, test_end).sorted_by_key();
    let y_test = y.between(test_start, test_end).sorted_by_key();

    if x_train.is_empty() {
        return Err(ForecastError::insufficient(format!(
            "no training rows on or before {train_end}"
        )));
    }
    if x_test.is_empty() {
        return Err(ForecastError::insufficient(format!(
            "no test rows between {test_start} and {test_end}"
        )));
    }

    info!(
        train_rows = x_train.n_rows(),
        test_rows = x_test.n_rows(),
        train_end = %train_end,
        test_start = %test_start,
        test_end = %test_end,
        "Split data"
    );

    Ok(WalkForwardSplit {
        x_train,
        y_train,
        x_test,
        y_test,
        train_end,
        test_start,
        test_end,
    })
}
