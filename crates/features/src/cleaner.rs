//! Reindexing of a raw panel onto a complete business-day grid.

use polars::prelude::*;
use tracing::{debug, info, warn};

use stock_forecast_core::{business_days_between, DataQualityWarning, ForecastError, ForecastResult, Panel};

use crate::table::{date_series, FeatureTable, FrameResultExt, DATE, ROW_INDEX, SYMBOL};

/// A cleaned panel and the data-quality findings made while cleaning it.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPanel {
    pub panel: Panel,
    pub warnings: Vec<DataQualityWarning>,
}

/// Puts every stock on every business day between the panel's first and last date.
///
/// Gaps are filled with the stock's previous bar, and days before a stock's
/// first bar with its first bar. The back-fill keeps pooled training
/// possible when stocks start trading on different dates; it is a known
/// imputation shortcut rather than a statistically sound one.
///
/// Weekend bars are discarded. When a (date, symbol) pair appears more than
/// once the last bar wins and a [`DataQualityWarning::DuplicateBar`] is
/// reported for every extra occurrence. The result is sorted by
/// (date, symbol) and has unique keys.
///
/// # Errors
/// Returns [`ForecastError::InvalidInput`] if the panel holds no business-day bars.
pub fn clean_data(panel: &Panel) -> ForecastResult<CleanedPanel> {
    let raw = FeatureTable::from_panel(panel)?;
    // polars weekdays run Monday = 1 to Sunday = 7.
    let weekdays =
        FeatureTable::from_lazy(raw.lazy().filter(col(DATE).dt().weekday().lt_eq(lit(5))))?;
    let weekend_bars = raw.len() - weekdays.len();
    if weekend_bars > 0 {
        debug!(weekend_bars, "Discarded bars dated on weekends");
    }

    let mut warnings = Vec::new();
    for (key, occurrences) in weekdays.duplicate_keys()? {
        warn!(symbol = %key.symbol, date = %key.date, occurrences, "Duplicate bar, keeping the last one");
        for _ in 1..occurrences {
            warnings.push(DataQualityWarning::DuplicateBar {
                date: key.date,
                symbol: key.symbol.clone(),
            });
        }
    }

    let value_columns = weekdays.column_names();
    let mut columns = vec![col(DATE), col(SYMBOL)];
    columns.extend(value_columns.iter().map(|c| col(c.as_str())));
    let observed = FeatureTable::from_lazy(
        weekdays
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .filter(col(ROW_INDEX).eq(col(ROW_INDEX).max().over([col(DATE), col(SYMBOL)])))
            .select(columns.clone()),
    )?;

    let dates = observed.dates()?;
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return Err(ForecastError::invalid("panel has no business-day bars"));
    };
    let symbols = observed.symbols()?;
    let days = business_days_between(first, last);

    let calendar = DataFrame::new(vec![date_series(DATE, &days)?]).into_forecast()?;
    let stocks = DataFrame::new(vec![Series::new(SYMBOL.into(), symbols.clone())]).into_forecast()?;
    let no_keys: [Expr; 0] = [];
    let grid = calendar.lazy().join(
        stocks.lazy(),
        no_keys.clone(),
        no_keys,
        JoinArgs::new(JoinType::Cross),
    );

    let keys = [col(DATE), col(SYMBOL)];
    let fill: Vec<Expr> = value_columns
        .iter()
        .map(|c| {
            col(c.as_str())
                .fill_null_with_strategy(FillNullStrategy::Forward(None))
                .fill_null_with_strategy(FillNullStrategy::Backward(None))
                .over([col(SYMBOL)])
        })
        .collect();
    let cleaned = FeatureTable::from_lazy(
        grid.join(
            observed.lazy(),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(SYMBOL), col(DATE)], SortMultipleOptions::default())
        .with_columns(fill)
        .sort_by_exprs([col(DATE), col(SYMBOL)], SortMultipleOptions::default())
        .select(columns),
    )?;

    let filled = cleaned.len() - observed.len();
    info!(
        symbols = symbols.len(),
        business_days = days.len(),
        filled,
        start = %first,
        end = %last,
        "Cleaned panel"
    );

    Ok(CleanedPanel {
        panel: cleaned.to_panel()?,
        warnings,
    })
}
