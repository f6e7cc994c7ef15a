//! Keyed feature table backed by a polars `DataFrame`.
//!
//! Every table has a `date` column (polars `Date`) and a `symbol` column
//! (`String`); together they identify a row. All other columns are features:
//! numeric columns of any numeric dtype, or `String` columns holding text
//! categoricals. Missing values are nulls.

use chrono::{Duration, NaiveDate};
use polars::prelude::*;

use stock_forecast_core::{DailyBar, ForecastError, ForecastResult, Panel, RowKey};

/// Key column holding the trading date.
pub const DATE: &str = "date";
/// Key column holding the stock identifier.
pub const SYMBOL: &str = "symbol";
/// Scratch column used to restore the original row order.
pub(crate) const ROW_INDEX: &str = "__row";

/// Maps polars errors onto the forecasting taxonomy.
pub(crate) trait FrameResultExt<T> {
    fn into_forecast(self) -> ForecastResult<T>;
}

impl<T> FrameResultExt<T> for PolarsResult<T> {
    fn into_forecast(self) -> ForecastResult<T> {
        self.map_err(|err| match err {
            PolarsError::ColumnNotFound(name) => ForecastError::missing_column(name.to_string()),
            other => ForecastError::invalid(other.to_string()),
        })
    }
}

fn epoch() -> NaiveDate {
    // 1970-01-01
    NaiveDate::default()
}

/// Physical value of a polars `Date`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    // chrono's whole date range fits in i32 days.
    (date - epoch()).num_days() as i32
}

fn from_days(days: i32) -> ForecastResult<NaiveDate> {
    epoch()
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| ForecastError::invalid(format!("date out of range: {days} days")))
}

/// Literal usable in comparisons against the `date` column.
pub(crate) fn date_lit(date: NaiveDate) -> Expr {
    lit(days_since_epoch(date)).cast(DataType::Date)
}

pub(crate) fn date_series(name: &str, dates: &[NaiveDate]) -> ForecastResult<Series> {
    let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    Series::new(name.into(), days)
        .cast(&DataType::Date)
        .into_forecast()
}

/// Reads a `Date` column of `frame`.
pub(crate) fn date_values(frame: &DataFrame, name: &str) -> ForecastResult<Vec<Option<NaiveDate>>> {
    let days = frame
        .column(name)
        .into_forecast()?
        .cast(&DataType::Int32)
        .into_forecast()?;
    days.i32()
        .into_forecast()?
        .into_iter()
        .map(|d| d.map(from_days).transpose())
        .collect()
}

/// Values of a single column, pulled out of the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

/// Rows keyed by (date, symbol) with named feature columns.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    frame: DataFrame,
}

impl FeatureTable {
    /// Wraps a frame after checking its key columns.
    ///
    /// # Errors
    /// [`ForecastError::MissingColumn`] if `date` or `symbol` is absent,
    /// [`ForecastError::InvalidInput`] if either has the wrong dtype.
    pub fn from_frame(frame: DataFrame) -> ForecastResult<Self> {
        let date = frame.column(DATE).into_forecast()?;
        if date.dtype() != &DataType::Date {
            return Err(ForecastError::invalid(format!(
                "{DATE} column has dtype {}, expected date",
                date.dtype()
            )));
        }
        let symbol = frame.column(SYMBOL).into_forecast()?;
        if symbol.dtype() != &DataType::String {
            return Err(ForecastError::invalid(format!(
                "{SYMBOL} column has dtype {}, expected string",
                symbol.dtype()
            )));
        }
        Ok(Self { frame })
    }

    pub(crate) fn from_lazy(frame: LazyFrame) -> ForecastResult<Self> {
        Self::from_frame(frame.collect().into_forecast()?)
    }

    /// Converts a panel into a table with `area`, `open`, `high`, `low`,
    /// `close` and `volume` columns, in panel order.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if the frame cannot be built.
    pub fn from_panel(panel: &Panel) -> ForecastResult<Self> {
        let bars = panel.bars();
        let prices = |name: &str, f: fn(&DailyBar) -> f64| {
            Series::new(name.into(), bars.iter().map(f).collect::<Vec<f64>>())
        };
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();

        let frame = DataFrame::new(vec![
            date_series(DATE, &dates)?,
            Series::new(
                SYMBOL.into(),
                bars.iter().map(|b| b.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                "area".into(),
                bars.iter().map(|b| b.area.as_str()).collect::<Vec<_>>(),
            ),
            prices("open", |b| b.open),
            prices("high", |b| b.high),
            prices("low", |b| b.low),
            prices("close", |b| b.close),
            Series::new(
                "volume".into(),
                bars.iter().map(|b| b.volume).collect::<Vec<i64>>(),
            ),
        ])
        .into_forecast()?;
        Ok(Self { frame })
    }

    /// Converts back into daily bars, in table order.
    ///
    /// # Errors
    /// [`ForecastError::MissingColumn`] if a bar field is absent,
    /// [`ForecastError::InvalidInput`] if any bar field is null.
    pub fn to_panel(&self) -> ForecastResult<Panel> {
        let keys = self.keys()?;
        let area = self.text("area")?;
        let open = self.numeric("open")?;
        let high = self.numeric("high")?;
        let low = self.numeric("low")?;
        let close = self.numeric("close")?;
        let volume = self
            .frame
            .column("volume")
            .into_forecast()?
            .cast(&DataType::Int64)
            .into_forecast()?;
        let volume = volume.i64().into_forecast()?;

        let bars = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let missing = || {
                    ForecastError::invalid(format!(
                        "bar ({}, {}) has missing fields",
                        key.date, key.symbol
                    ))
                };
                Ok(DailyBar {
                    date: key.date,
                    symbol: key.symbol.clone(),
                    area: area[i].clone().ok_or_else(missing)?,
                    open: open[i].ok_or_else(missing)?,
                    high: high[i].ok_or_else(missing)?,
                    low: low[i].ok_or_else(missing)?,
                    close: close[i].ok_or_else(missing)?,
                    volume: volume.get(i).ok_or_else(missing)?,
                })
            })
            .collect::<ForecastResult<Vec<_>>>()?;
        Ok(Panel::new(bars))
    }

    #[must_use]
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row keys in table order.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if a key is null.
    pub fn keys(&self) -> ForecastResult<Vec<RowKey>> {
        let dates = self.key_dates()?;
        let symbols = self.frame.column(SYMBOL).into_forecast()?;
        let symbols = symbols.str().into_forecast()?;

        dates
            .into_iter()
            .zip(symbols)
            .map(|(date, symbol)| match (date, symbol) {
                (Some(date), Some(symbol)) => Ok(RowKey::new(date, symbol)),
                _ => Err(ForecastError::invalid("row key has a null date or symbol")),
            })
            .collect()
    }

    fn key_dates(&self) -> ForecastResult<Vec<Option<NaiveDate>>> {
        date_values(&self.frame, DATE)
    }

    /// Feature column names in frame order, key columns excluded.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(ToString::to_string)
            .filter(|name| name != DATE && name != SYMBOL)
            .collect()
    }

    /// True for feature and key columns alike.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    #[must_use]
    pub fn is_text(&self, name: &str) -> bool {
        self.frame
            .column(name)
            .is_ok_and(|c| c.dtype() == &DataType::String)
    }

    /// Checks that `name` exists and is numeric.
    ///
    /// # Errors
    /// [`ForecastError::MissingColumn`] if absent, [`ForecastError::InvalidInput`]
    /// if not numeric.
    pub fn require_numeric(&self, name: &str) -> ForecastResult<()> {
        let column = self.frame.column(name).into_forecast()?;
        if column.dtype().is_numeric() {
            Ok(())
        } else {
            Err(ForecastError::invalid(format!("column {name} is not numeric")))
        }
    }

    /// Numeric values of `name` as `f64`.
    ///
    /// # Errors
    /// Same as [`FeatureTable::require_numeric`].
    pub fn numeric(&self, name: &str) -> ForecastResult<Vec<Option<f64>>> {
        self.require_numeric(name)?;
        let values = self
            .frame
            .column(name)
            .into_forecast()?
            .cast(&DataType::Float64)
            .into_forecast()?;
        Ok(values.f64().into_forecast()?.into_iter().collect())
    }

    fn text(&self, name: &str) -> ForecastResult<Vec<Option<String>>> {
        let column = self.frame.column(name).into_forecast()?;
        Ok(column
            .str()
            .into_forecast()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Values of a feature column: text columns as categorical, everything
    /// else as numeric.
    ///
    /// # Errors
    /// [`ForecastError::MissingColumn`] if absent.
    pub fn column(&self, name: &str) -> ForecastResult<ColumnData> {
        if self.is_text(name) {
            self.text(name).map(ColumnData::Categorical)
        } else {
            self.numeric(name).map(ColumnData::Numeric)
        }
    }

    /// Distinct dates, ascending.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if the date column is malformed.
    pub fn dates(&self) -> ForecastResult<Vec<NaiveDate>> {
        let mut dates: Vec<NaiveDate> = self.key_dates()?.into_iter().flatten().collect();
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }

    /// Distinct symbols, ascending.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if the symbol column is malformed.
    pub fn symbols(&self) -> ForecastResult<Vec<String>> {
        let mut symbols: Vec<String> = self.text(SYMBOL)?.into_iter().flatten().collect();
        symbols.sort_unstable();
        symbols.dedup();
        Ok(symbols)
    }

    /// Rows dated on or after `start`, in table order.
    ///
    /// # Errors
    /// Propagates polars errors.
    pub fn filter_from(&self, start: NaiveDate) -> ForecastResult<Self> {
        Self::from_lazy(self.lazy().filter(col(DATE).gt_eq(date_lit(start))))
    }

    /// Keeps the key columns plus `columns`, in that order.
    ///
    /// # Errors
    /// [`ForecastError::MissingColumn`] for an unknown column.
    pub fn select(&self, columns: &[String]) -> ForecastResult<Self> {
        let mut exprs = vec![col(DATE), col(SYMBOL)];
        exprs.extend(columns.iter().map(|c| col(c.as_str())));
        Self::from_lazy(self.lazy().select(exprs))
    }

    /// Keys that occur more than once, with their counts, sorted by key.
    ///
    /// # Errors
    /// Propagates polars errors.
    pub fn duplicate_keys(&self) -> ForecastResult<Vec<(RowKey, usize)>> {
        let counts = self
            .lazy()
            .group_by([col(DATE), col(SYMBOL)])
            .agg([len().cast(DataType::Int64).alias("occurrences")])
            .filter(col("occurrences").gt(lit(1_i64)))
            .sort_by_exprs([col(DATE), col(SYMBOL)], SortMultipleOptions::default())
            .collect()
            .into_forecast()?;
        let occurrences: Vec<Option<i64>> = counts
            .column("occurrences")
            .into_forecast()?
            .i64()
            .into_forecast()?
            .into_iter()
            .collect();
        let keys = Self::from_frame(counts)?.keys()?;

        Ok(keys
            .into_iter()
            .zip(occurrences)
            .map(|(key, n)| (key, n.and_then(|n| usize::try_from(n).ok()).unwrap_or(0)))
            .collect())
    }

    /// Joins `other`'s feature columns onto this table by (date, symbol).
    ///
    /// Every row of `self` is kept in its original order; rows without a match
    /// get nulls.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if `other` repeats a key or a
    /// column name already exists here.
    pub fn left_join(&self, other: &FeatureTable) -> ForecastResult<FeatureTable> {
        let existing = self.column_names();
        let added = other.column_names();
        if let Some(name) = added.iter().find(|name| existing.contains(name)) {
            return Err(ForecastError::invalid(format!(
                "column {name} exists on both sides of the join"
            )));
        }
        if let Some((key, _)) = other.duplicate_keys()?.first() {
            return Err(ForecastError::invalid(format!(
                "join table repeats key ({}, {})",
                key.date, key.symbol
            )));
        }

        let mut columns = vec![col(DATE), col(SYMBOL)];
        columns.extend(existing.iter().chain(&added).map(|c| col(c.as_str())));
        let keys = [col(DATE), col(SYMBOL)];
        Self::from_lazy(
            self.lazy()
                .with_row_index(ROW_INDEX, None)
                .join(
                    other.lazy(),
                    keys.clone(),
                    keys,
                    JoinArgs::new(JoinType::Left),
                )
                .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
                .select(columns),
        )
    }
}

/// Builds a table from keys and columns.
#[cfg(test)]
pub(crate) fn table_from_columns(
    keys: &[RowKey],
    columns: Vec<(&str, ColumnData)>,
) -> FeatureTable {
    let dates: Vec<NaiveDate> = keys.iter().map(|k| k.date).collect();
    let mut series = vec![
        date_series(DATE, &dates).unwrap(),
        Series::new(
            SYMBOL.into(),
            keys.iter().map(|k| k.symbol.as_str()).collect::<Vec<_>>(),
        ),
    ];
    for (name, data) in columns {
        series.push(match data {
            ColumnData::Numeric(v) => Series::new(name.into(), v),
            ColumnData::Categorical(v) => Series::new(name.into(), v),
        });
    }
    FeatureTable::from_frame(DataFrame::new(series).unwrap()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(day: u32, symbol: &str) -> RowKey {
        RowKey::new(NaiveDate::from_ymd_opt(2024, 5, day).unwrap(), symbol)
    }

    fn table() -> FeatureTable {
        table_from_columns(
            &[key(20, "A"), key(20, "B"), key(21, "A")],
            vec![(
                "close",
                ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]),
            )],
        )
    }

    #[test]
    fn keys_round_trip_through_the_frame() {
        let t = table();
        assert_eq!(t.keys().unwrap(), vec![key(20, "A"), key(20, "B"), key(21, "A")]);
        assert_eq!(t.column_names(), vec!["close".to_string()]);
    }

    #[test]
    fn numeric_reports_missing_column() {
        let err = table().numeric("volume").unwrap_err();
        assert!(matches!(err, ForecastError::MissingColumn { .. }));
    }

    #[test]
    fn text_column_is_not_numeric() {
        let t = table_from_columns(
            &[key(20, "A")],
            vec![("area", ColumnData::Categorical(vec![Some("Tech".into())]))],
        );
        assert!(t.is_text("area"));
        assert!(matches!(
            t.numeric("area").unwrap_err(),
            ForecastError::InvalidInput(_)
        ));
    }

    #[test]
    fn left_join_keeps_every_left_row() {
        let right = table_from_columns(
            &[key(21, "A"), key(20, "A")],
            vec![("lag", ColumnData::Numeric(vec![Some(30.0), Some(10.0)]))],
        );

        let joined = table().left_join(&right).unwrap();

        assert_eq!(joined.keys().unwrap(), table().keys().unwrap());
        assert_eq!(
            joined.numeric("lag").unwrap(),
            vec![Some(10.0), None, Some(30.0)]
        );
    }

    #[test]
    fn left_join_rejects_overlapping_columns_and_repeated_keys() {
        assert!(table().left_join(&table()).is_err());

        let repeated = table_from_columns(
            &[key(20, "A"), key(20, "A")],
            vec![("lag", ColumnData::Numeric(vec![Some(1.0), Some(2.0)]))],
        );
        assert!(table().left_join(&repeated).is_err());
        assert_eq!(repeated.duplicate_keys().unwrap(), vec![(key(20, "A"), 2)]);
    }

    #[test]
    fn filter_and_distinct_values() {
        let t = table().filter_from(NaiveDate::from_ymd_opt(2024, 5, 21).unwrap()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.symbols().unwrap(), vec!["A".to_string()]);
        assert_eq!(table().dates().unwrap().len(), 2);
    }

    #[test]
    fn panel_round_trip() {
        let bar = DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            symbol: "A".into(),
            area: "Tech".into(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100,
        };
        let panel = Panel::new(vec![bar]);
        let table = FeatureTable::from_panel(&panel).unwrap();
        assert_eq!(table.to_panel().unwrap(), panel);
    }
}
