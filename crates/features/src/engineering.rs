//! Feature table assembly from a cleaned panel.

use polars::prelude::*;
use tracing::{debug, warn};

use stock_forecast_core::{ForecastError, ForecastResult, Panel};

use crate::group_ops::{make_moving_window_in_groups, make_shift_in_groups, MovingWindow};
use crate::table::{FeatureTable, DATE, SYMBOL};

/// Column holding the close price.
pub const CLOSE: &str = "close";

/// Derived categorical features that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedFeature {
    /// Monday = 0 through Friday = 4.
    DayOfWeek,
    Month,
    Year,
    /// ISO 8601 week number.
    WeekOfYear,
    DayOfMonth,
    Quarter,
    /// Copy of the stock's area as a categorical.
    AreaCat,
}

impl DerivedFeature {
    pub const ALL: [Self; 7] = [
        Self::DayOfWeek,
        Self::Month,
        Self::Year,
        Self::WeekOfYear,
        Self::DayOfMonth,
        Self::Quarter,
        Self::AreaCat,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DayOfWeek => "day_of_week",
            Self::Month => "month",
            Self::Year => "year",
            Self::WeekOfYear => "week_of_year",
            Self::DayOfMonth => "day_of_month",
            Self::Quarter => "quarter",
            Self::AreaCat => "area_cat",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Expression computing the feature from the key and panel columns.
    fn expr(self) -> Expr {
        let date = || col(DATE).dt();
        match self {
            // polars counts Monday as 1.
            Self::DayOfWeek => date().weekday().cast(DataType::Int32) - lit(1),
            Self::Month => date().month().cast(DataType::Int32),
            Self::Year => date().year().cast(DataType::Int32),
            Self::WeekOfYear => date().week().cast(DataType::Int32),
            Self::DayOfMonth => date().day().cast(DataType::Int32),
            Self::Quarter => date().quarter().cast(DataType::Int32),
            Self::AreaCat => col("area"),
        }
    }
}

/// Rejects negative lag offsets or window sizes; those would read future closes.
fn reject_look_ahead(values: &[i64], what: &str) -> ForecastResult<()> {
    match values.iter().find(|v| **v < 0) {
        Some(v) => Err(ForecastError::invalid(format!(
            "{what} {v} reads future closes; feature {what}s must be non-negative"
        ))),
        None => Ok(()),
    }
}

/// Builds the feature table for a cleaned panel.
///
/// The result keeps every panel row and column and adds:
/// - each derived feature named in `categorical_features` or `label_features`
///   (unknown names are logged and skipped);
/// - `close_lag_{k}` for every offset in `shift_list`;
/// - `close_lag_mean_{w}` for every window in `window_list`.
///
/// An empty shift or window list skips that generator.
///
/// # Errors
/// [`ForecastError::InvalidInput`] for a negative shift or window, and
/// generator errors such as a list containing only zeros.
pub fn engineer_features(
    panel: &Panel,
    categorical_features: &[String],
    shift_list: &[i64],
    window_list: &[i64],
    label_features: &[String],
) -> ForecastResult<FeatureTable> {
    reject_look_ahead(shift_list, "shift")?;
    reject_look_ahead(window_list, "window")?;

    let mut table = FeatureTable::from_panel(panel)?;

    let mut derived: Vec<&str> = Vec::new();
    for name in categorical_features.iter().chain(label_features) {
        if table.has_column(name) || derived.contains(&name.as_str()) {
            continue;
        }
        if DerivedFeature::from_name(name).is_some() {
            derived.push(name);
        } else {
            warn!(feature = %name, "Unknown derived feature, ignoring");
        }
    }
    if !derived.is_empty() {
        let exprs: Vec<Expr> = derived
            .iter()
            .filter_map(|name| DerivedFeature::from_name(name).map(|f| f.expr().alias(*name)))
            .collect();
        table = FeatureTable::from_lazy(table.lazy().with_columns(exprs))?;
    }

    if !shift_list.is_empty() {
        let lags = make_shift_in_groups(&table, &[SYMBOL], CLOSE, shift_list, None)?;
        table = table.left_join(&lags)?;
    }

    if !window_list.is_empty() {
        let windows = make_moving_window_in_groups(
            &table,
            &[SYMBOL],
            CLOSE,
            &MovingWindow::new(window_list.to_vec()),
            None,
        )?;
        table = table.left_join(&windows)?;
    }

    debug!(
        rows = table.len(),
        columns = table.column_names().len(),
        "Engineered features"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnData;
    use chrono::NaiveDate;
    use stock_forecast_core::DailyBar;

    fn panel() -> Panel {
        // Mon 2024-12-30 .. Thu 2025-01-02 for two stocks.
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let mut bars = Vec::new();
        for (i, day) in start.iter_days().take(4).enumerate() {
            for (symbol, area) in [("A", "Tech"), ("B", "Bank")] {
                #[allow(clippy::cast_precision_loss)]
                let close = (i + 1) as f64 * if symbol == "A" { 1.0 } else { 10.0 };
                bars.push(DailyBar {
                    date: day,
                    symbol: symbol.to_string(),
                    area: area.to_string(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 10,
                });
            }
        }
        Panel::new(bars)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn calendar_features_follow_the_date() {
        let table = engineer_features(
            &panel(),
            &names(&["day_of_week", "quarter", "week_of_year"]),
            &[],
            &[],
            &names(&["year"]),
        )
        .unwrap();

        assert_eq!(
            table.numeric("day_of_week").unwrap()[..4],
            [Some(0.0), Some(0.0), Some(1.0), Some(1.0)]
        );
        assert_eq!(table.numeric("year").unwrap()[0], Some(2024.0));
        assert_eq!(table.numeric("year").unwrap()[7], Some(2025.0));
        assert_eq!(table.numeric("quarter").unwrap()[0], Some(4.0));
        // ISO week 1 of 2025 starts on Monday 2024-12-30.
        assert_eq!(table.numeric("week_of_year").unwrap()[0], Some(1.0));
    }

    #[test]
    fn area_cat_copies_the_area() {
        let table = engineer_features(&panel(), &names(&["area_cat"]), &[], &[], &[]).unwrap();
        let ColumnData::Categorical(areas) = table.column("area_cat").unwrap() else {
            panic!("area_cat should be text");
        };
        assert_eq!(areas[0].as_deref(), Some("Tech"));
        assert_eq!(areas[1].as_deref(), Some("Bank"));
    }

    #[test]
    fn lags_and_windows_are_joined_per_stock() {
        let table = engineer_features(&panel(), &[], &[1], &[2], &[]).unwrap();

        let lag = table.numeric("close_lag_1").unwrap();
        let mean = table.numeric("close_lag_mean_2").unwrap();
        // Rows alternate A, B.
        assert_eq!(lag[..4], [None, None, Some(1.0), Some(10.0)]);
        assert_eq!(mean[6], Some(2.5));
        assert_eq!(mean[7], Some(25.0));
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn unknown_features_are_ignored() {
        let table = engineer_features(&panel(), &names(&["moon_phase"]), &[], &[], &[]).unwrap();
        assert!(!table.has_column("moon_phase"));
    }

    #[test]
    fn zero_only_shift_list_is_rejected() {
        let err = engineer_features(&panel(), &[], &[0], &[], &[]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn negative_shift_or_window_is_rejected() {
        let err = engineer_features(&panel(), &[], &[1, -1], &[], &[]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));

        let err = engineer_features(&panel(), &[], &[], &[3, -2], &[]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn derived_feature_requested_twice_is_added_once() {
        let table = engineer_features(
            &panel(),
            &names(&["month"]),
            &[],
            &[],
            &names(&["month"]),
        )
        .unwrap();
        let months = table
            .column_names()
            .into_iter()
            .filter(|c| c == "month")
            .count();
        assert_eq!(months, 1);
    }
}
