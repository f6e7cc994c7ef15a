//! Supervised-learning matrices from a feature table.
//!
//! `X` only carries information available at the end of each row's date:
//! lag and lag-window columns, calendar encodings and the close itself.
//! `y` holds the next `n_steps` closes of the same stock. Targets are built
//! over the whole table before the lookback restriction so that rows near the
//! start of the window still see their future closes.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};

use stock_forecast_core::{nth_previous_working_date, DataQualityWarning, ForecastError, ForecastResult};

use crate::encoding::{label_encode, one_hot};
use crate::engineering::CLOSE;
use crate::group_ops::make_shift_in_groups;
use crate::matrix::{FeatureMatrix, TargetMatrix};
use crate::table::{date_lit, date_values, FeatureTable, FrameResultExt, DATE, SYMBOL};

/// Raw columns that never feed the model directly.
pub const EXCLUDED_COLUMNS: [&str; 6] = ["adj_close", "volume", "high", "low", "open", "area"];

/// Marks columns that read future values.
const LEAD_MARKER: &str = "_lead_";

/// Aligned model inputs and targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedData {
    pub x: FeatureMatrix,
    /// `close_lead_1 ..= close_lead_{n_steps}`, missing where the future is unknown.
    pub y: TargetMatrix,
    /// First date included in `x`.
    pub start_date: NaiveDate,
    pub warnings: Vec<DataQualityWarning>,
}

/// Names of the target columns for a horizon.
#[must_use]
pub fn target_columns(n_steps: usize) -> Vec<String> {
    (1..=n_steps).map(|i| format!("{CLOSE}_lead_{i}")).collect()
}

/// True on rows where no feature column is null.
fn complete_row(table: &FeatureTable) -> Expr {
    table
        .column_names()
        .iter()
        .map(|c| col(c.as_str()).is_not_null())
        .reduce(|all, next| all.and(next))
        .unwrap_or_else(|| lit(true))
}

/// First date on which every stock in the table has a row with no nulls.
///
/// # Errors
/// Propagates polars errors.
pub fn first_all_valid_date(table: &FeatureTable) -> ForecastResult<Option<NaiveDate>> {
    let n_symbols = i64::try_from(table.symbols()?.len())
        .map_err(|_| ForecastError::invalid("too many symbols"))?;

    let complete_dates = table
        .lazy()
        .filter(complete_row(table))
        .group_by([col(DATE)])
        .agg([col(SYMBOL).n_unique().cast(DataType::Int64).alias("complete_symbols")])
        .filter(col("complete_symbols").eq(lit(n_symbols)))
        .select([col(DATE)])
        .sort_by_exprs([col(DATE)], SortMultipleOptions::default())
        .collect()
        .into_forecast()?;

    Ok(date_values(&complete_dates, DATE)?.into_iter().flatten().next())
}

/// Stocks lacking a complete row on `date`, sorted.
///
/// # Errors
/// Propagates polars errors.
pub fn symbols_missing_on(table: &FeatureTable, date: NaiveDate) -> ForecastResult<Vec<String>> {
    let present = FeatureTable::from_lazy(
        table
            .lazy()
            .filter(col(DATE).eq(date_lit(date)).and(complete_row(table))),
    )?
    .symbols()?;

    Ok(table
        .symbols()?
        .into_iter()
        .filter(|s| !present.contains(s))
        .collect())
}

/// Drops columns that read future values; they must never reach `X`.
fn without_lead_columns(table: &FeatureTable) -> ForecastResult<FeatureTable> {
    let (leads, kept): (Vec<String>, Vec<String>) = table
        .column_names()
        .into_iter()
        .partition(|c| c.contains(LEAD_MARKER));
    if leads.is_empty() {
        return Ok(table.clone());
    }
    warn!(columns = ?leads, "Dropping look-ahead columns from the model inputs");
    table.select(&kept)
}

/// Builds `X` and `y` for `n_steps`-ahead forecasting.
///
/// The first usable date is the all-valid date (see [`first_all_valid_date`]).
/// With `days_back_to_consider`, the start is that many business days before
/// the latest date, unless this predates the all-valid date: then the
/// all-valid date is used and a [`DataQualityWarning::LookbackClamped`] is
/// returned.
///
/// Columns of `X`: one-hot encodings of `categorical_features` (first level
/// dropped), label encodings of `label_features`, then every remaining
/// numeric column in table order except [`EXCLUDED_COLUMNS`]. Columns whose
/// name contains `_lead_` are dropped with a warning. Rows of `X` with any
/// missing value are dropped and `y` is aligned to what remains.
///
/// # Errors
/// - [`ForecastError::InvalidInput`] for `n_steps == 0`, an empty table, or a
///   text column not listed as categorical or label feature;
/// - [`ForecastError::MissingColumn`] for an absent close or requested feature;
/// - [`ForecastError::InsufficientData`] if no date is all-valid or no row survives.
pub fn process_data(
    table: &FeatureTable,
    n_steps: usize,
    categorical_features: &[String],
    label_features: &[String],
    days_back_to_consider: Option<usize>,
) -> ForecastResult<SupervisedData> {
    if n_steps == 0 {
        return Err(ForecastError::invalid("n_steps must be positive"));
    }
    if table.is_empty() {
        return Err(ForecastError::invalid("feature table is empty"));
    }
    table.require_numeric(CLOSE)?;
    let table = without_lead_columns(table)?;

    let mut warnings = Vec::new();
    let first_valid = first_all_valid_date(&table)?.ok_or_else(|| {
        ForecastError::insufficient("no date on which every stock has complete features")
    })?;
    let latest = table
        .dates()?
        .last()
        .copied()
        .ok_or_else(|| ForecastError::invalid("feature table is empty"))?;

    let start_date = match days_back_to_consider {
        Some(days) => {
            let days = i64::try_from(days)
                .map_err(|_| ForecastError::invalid("days_back_to_consider is too large"))?;
            let candidate = nth_previous_working_date(days, latest);
            if candidate < first_valid {
                let missing = symbols_missing_on(&table, candidate)?;
                warn!(
                    candidate = %candidate,
                    first_valid = %first_valid,
                    missing = ?missing,
                    "Lookback starts before every stock has data, using the first valid date"
                );
                warnings.push(DataQualityWarning::LookbackClamped {
                    requested: candidate,
                    used: first_valid,
                });
                first_valid
            } else {
                candidate
            }
        }
        None => first_valid,
    };
    info!(start = %start_date, latest = %latest, "Earliest date");

    let feature_columns = table.column_names();
    let target_names = target_columns(n_steps);
    let offsets: Vec<i64> = (1..=n_steps)
        .map(|i| i64::try_from(i).map(|i| -i))
        .collect::<Result<_, _>>()
        .map_err(|_| ForecastError::invalid("n_steps is too large"))?;
    // Leads come from the full table so rows near the start see their future.
    let leads = make_shift_in_groups(&table, &[SYMBOL], CLOSE, &offsets, None)?;
    let window = table.left_join(&leads)?.filter_from(start_date)?;

    let (columns, values) = encode_columns(
        &window,
        &feature_columns,
        categorical_features,
        label_features,
    )?;
    let targets: Vec<Vec<Option<f64>>> = target_names
        .iter()
        .map(|c| window.numeric(c))
        .collect::<ForecastResult<_>>()?;

    let mut x_keys = Vec::new();
    let mut x_rows = Vec::new();
    let mut y_rows = Vec::new();
    for (i, key) in window.keys()?.into_iter().enumerate() {
        let row: Option<Vec<f64>> = values.iter().map(|col| col[i]).collect();
        if let Some(row) = row {
            x_keys.push(key);
            x_rows.push(row);
            y_rows.push(targets.iter().map(|col| col[i]).collect());
        }
    }
    if x_rows.is_empty() {
        return Err(ForecastError::insufficient(format!(
            "no complete feature rows on or after {start_date}"
        )));
    }
    let y = TargetMatrix::new(x_keys.clone(), target_names, y_rows)?;
    let x = FeatureMatrix::new(x_keys, columns, x_rows)?;

    info!(rows = x.n_rows(), features = x.n_cols(), targets = y.n_cols(), "Built supervised matrices");

    Ok(SupervisedData {
        x,
        y,
        start_date,
        warnings,
    })
}

type EncodedColumns = (Vec<String>, Vec<Vec<Option<f64>>>);

fn encode_columns(
    table: &FeatureTable,
    feature_columns: &[String],
    categorical_features: &[String],
    label_features: &[String],
) -> ForecastResult<EncodedColumns> {
    let mut names = Vec::new();
    let mut values = Vec::new();

    for feature in categorical_features {
        let data = table.column(feature)?;
        for (name, column) in one_hot(feature, &data) {
            names.push(name);
            values.push(column);
        }
    }
    for feature in label_features {
        let data = table.column(feature)?;
        names.push(feature.clone());
        values.push(label_encode(&data));
    }

    for name in feature_columns {
        let encoded = categorical_features.contains(name) || label_features.contains(name);
        if encoded || EXCLUDED_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        if table.is_text(name) {
            return Err(ForecastError::invalid(format!(
                "text column {name} must be listed as a categorical or label feature"
            )));
        }
        names.push(name.clone());
        values.push(table.numeric(name)?);
    }

    Ok((names, values))
}
