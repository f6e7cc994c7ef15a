//! Grouped lag, lead and rolling-window generators.
//!
//! Every generator is a polars window expression partitioned by the grouping
//! keys (usually `symbol`), so values never cross groups. Rows are put in date
//! order before the expressions run and restored to table order afterwards;
//! a "position" is the row's rank inside its group, not a calendar distance.
//!
//! # Look-ahead
//!
//! A lag column at position `i` only reads positions `< i`. A positive rolling
//! window shifts the series by one before aggregating, so the value at
//! position `i` never includes position `i` itself.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use stock_forecast_core::{broadcast, non_zero_offsets, ForecastError, ForecastResult, OneOrMany};

use crate::table::{FeatureTable, DATE, ROW_INDEX, SYMBOL};

/// Aggregation applied to the values inside a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    Mean,
    Sum,
    Median,
    /// Sample standard deviation (n - 1 denominator).
    Std,
    /// Sample variance (n - 1 denominator).
    Var,
    Min,
    Max,
}

impl Aggregator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Median => "median",
            Self::Std => "std",
            Self::Var => "var",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    fn rolling(self, expr: Expr, options: RollingOptionsFixedWindow) -> Expr {
        match self {
            Self::Mean => expr.rolling_mean(options),
            Self::Sum => expr.rolling_sum(options),
            Self::Median => expr.rolling_median(options),
            Self::Std => expr.rolling_std(options),
            Self::Var => expr.rolling_var(options),
            Self::Min => expr.rolling_min(options),
            Self::Max => expr.rolling_max(options),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregator {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "median" => Ok(Self::Median),
            "std" => Ok(Self::Std),
            "var" => Ok(Self::Var),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(ForecastError::invalid(format!("unknown aggregator: {other}"))),
        }
    }
}

/// Window sizes and per-window options for [`make_moving_window_in_groups`].
///
/// Options may be a single value for every window or one value per entry of
/// `windows` (including any zero entries, which are dropped together with
/// their options).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingWindow {
    /// Positive sizes look back, negative sizes look ahead.
    pub windows: Vec<i64>,
    pub center: OneOrMany<bool>,
    /// Minimum non-null observations required in a window.
    pub min_periods: OneOrMany<usize>,
    pub aggregator: OneOrMany<Aggregator>,
}

impl MovingWindow {
    /// Mean over each window, not centred, emitting as soon as one value is present.
    #[must_use]
    pub fn new(windows: Vec<i64>) -> Self {
        Self {
            windows,
            center: OneOrMany::One(false),
            min_periods: OneOrMany::One(1),
            aggregator: OneOrMany::One(Aggregator::Mean),
        }
    }

    #[must_use]
    pub fn with_center(mut self, center: impl Into<OneOrMany<bool>>) -> Self {
        self.center = center.into();
        self
    }

    #[must_use]
    pub fn with_min_periods(mut self, min_periods: impl Into<OneOrMany<usize>>) -> Self {
        self.min_periods = min_periods.into();
        self
    }

    #[must_use]
    pub fn with_aggregator(mut self, aggregator: impl Into<OneOrMany<Aggregator>>) -> Self {
        self.aggregator = aggregator.into();
        self
    }

    /// One fully specified window per non-zero size.
    fn resolve(&self) -> ForecastResult<Vec<WindowSpec>> {
        let n = self.windows.len();
        let center = broadcast(&self.center, n, "center")?;
        let min_periods = broadcast(&self.min_periods, n, "min_periods")?;
        let aggregator = broadcast(&self.aggregator, n, "aggregator")?;

        let specs: Vec<WindowSpec> = self
            .windows
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0)
            .map(|(i, &size)| WindowSpec {
                size,
                center: center[i],
                min_periods: min_periods[i],
                aggregator: aggregator[i],
            })
            .collect();

        if specs.is_empty() {
            return Err(ForecastError::invalid("window value must be non-zero"));
        }
        for spec in &specs {
            let width = spec.width();
            if spec.min_periods > width {
                return Err(ForecastError::invalid(format!(
                    "min_periods {} exceeds window {width}",
                    spec.min_periods
                )));
            }
        }
        Ok(specs)
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowSpec {
    size: i64,
    center: bool,
    min_periods: usize,
    aggregator: Aggregator,
}

impl WindowSpec {
    fn width(&self) -> usize {
        usize::try_from(self.size.unsigned_abs()).unwrap_or(usize::MAX)
    }

    fn column_name(&self, name: &str) -> String {
        let direction = if self.size > 0 { "lag" } else { "lead" };
        format!("{name}_{direction}_{}_{}", self.aggregator, self.size.unsigned_abs())
    }

    fn expr(&self, column: &str) -> Expr {
        let options = RollingOptionsFixedWindow {
            window_size: self.width(),
            min_periods: self.min_periods.max(1),
            center: self.center,
            ..Default::default()
        };
        let series = col(column).cast(DataType::Float64);
        if self.size > 0 {
            self.aggregator.rolling(series.shift(lit(1)), options)
        } else {
            self.aggregator.rolling(series, options).shift(lit(self.size))
        }
    }
}

/// Evaluates `columns` per group of `group_keys` and returns them keyed like
/// `table`, in `table`'s row order.
///
/// `"date"` and `"symbol"` address the row key; any other name addresses a
/// table column. Inside a group, rows are sorted by date with ties kept in
/// table order.
fn evaluate_in_groups(
    table: &FeatureTable,
    group_keys: &[&str],
    columns: Vec<(String, Expr)>,
) -> ForecastResult<FeatureTable> {
    if group_keys.is_empty() {
        return Err(ForecastError::invalid("at least one grouping key is required"));
    }
    if let Some(key) = group_keys.iter().find(|k| !table.has_column(k)) {
        return Err(ForecastError::missing_column(*key));
    }

    let partition: Vec<Expr> = group_keys.iter().map(|k| col(*k)).collect();
    let mut selected = vec![col(DATE), col(SYMBOL)];
    let mut derived = Vec::with_capacity(columns.len());
    for (name, expr) in columns {
        selected.push(col(name.as_str()));
        derived.push(expr.over(partition.as_slice()).alias(name.as_str()));
    }

    FeatureTable::from_lazy(
        table
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .sort_by_exprs(
                [col(DATE)],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .with_columns(derived)
            .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
            .select(selected),
    )
}

/// Per-group lag and lead columns of `column`.
///
/// Offset `k > 0` produces `{name}_lag_{k}`, offset `-k` produces
/// `{name}_lead_{k}`. Zero offsets are ignored. The output has the input's
/// row keys in the input's row order.
///
/// # Errors
/// [`ForecastError::InvalidInput`] if no non-zero offset remains,
/// [`ForecastError::MissingColumn`] if `column` or a grouping key is absent.
pub fn make_shift_in_groups(
    table: &FeatureTable,
    group_keys: &[&str],
    column: &str,
    offsets: &[i64],
    name: Option<&str>,
) -> ForecastResult<FeatureTable> {
    let offsets = non_zero_offsets(offsets, "shift")?;
    table.require_numeric(column)?;
    let name = name.unwrap_or(column);

    let columns = offsets
        .into_iter()
        .map(|offset| {
            let direction = if offset < 0 { "lead" } else { "lag" };
            (
                format!("{name}_{direction}_{}", offset.unsigned_abs()),
                col(column).cast(DataType::Float64).shift(lit(offset)),
            )
        })
        .collect();
    evaluate_in_groups(table, group_keys, columns)
}

/// Per-group rolling aggregates of `column`.
///
/// A positive window `w` yields `{name}_lag_{agg}_{w}` over the `w` rows
/// before the current one. A negative window `-w` yields
/// `{name}_lead_{agg}_{w}` over the `w` rows after it.
///
/// # Errors
/// [`ForecastError::InvalidInput`] if no non-zero window remains or an option
/// list has the wrong length, [`ForecastError::MissingColumn`] if `column` or
/// a grouping key is absent.
pub fn make_moving_window_in_groups(
    table: &FeatureTable,
    group_keys: &[&str],
    column: &str,
    params: &MovingWindow,
    name: Option<&str>,
) -> ForecastResult<FeatureTable> {
    let specs = params.resolve()?;
    table.require_numeric(column)?;
    let name = name.unwrap_or(column);

    let columns = specs
        .iter()
        .map(|spec| (spec.column_name(name), spec.expr(column)))
        .collect();
    evaluate_in_groups(table, group_keys, columns)
}
