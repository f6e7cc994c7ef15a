//! Domain types: daily bars, panels, row keys and forecast rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifies one row of any table in the pipeline.
///
/// Ordering is by date first, then symbol, which is the canonical sort order
/// of every table and matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub date: NaiveDate,
    pub symbol: String,
}

impl RowKey {
    #[must_use]
    pub fn new(date: NaiveDate, symbol: impl Into<String>) -> Self {
        Self {
            date,
            symbol: symbol.into(),
        }
    }
}

/// One trading day of one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading date (no time component).
    pub date: NaiveDate,
    /// Stock identifier, e.g. "AAPL".
    pub symbol: String,
    /// Sector or market area the stock belongs to.
    pub area: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl DailyBar {
    #[must_use]
    pub fn key(&self) -> RowKey {
        RowKey::new(self.date, self.symbol.clone())
    }
}

/// An ordered collection of daily bars across many stocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    bars: Vec<DailyBar>,
}

impl Panel {
    #[must_use]
    pub fn new(bars: Vec<DailyBar>) -> Self {
        Self { bars }
    }

    #[must_use]
    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    #[must_use]
    pub fn into_bars(self) -> Vec<DailyBar> {
        self.bars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Distinct symbols in ascending order.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.bars
            .iter()
            .map(|b| b.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest trading date, or `None` for an empty panel.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.bars.iter().map(|b| b.date).min()?;
        let max = self.bars.iter().map(|b| b.date).max()?;
        Some((min, max))
    }

    /// Sorts bars by (date, symbol).
    pub fn sort(&mut self) {
        self.bars
            .sort_by(|a, b| (a.date, &a.symbol).cmp(&(b.date, &b.symbol)));
    }
}

impl FromIterator<DailyBar> for Panel {
    fn from_iter<I: IntoIterator<Item = DailyBar>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A single forecast value for one stock on one future business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub symbol: String,
    /// Predicted close, never negative.
    pub close: f64,
}

/// Whether one model is shared by all stocks or each stock gets its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemApproach {
    /// One model fit on the data of every stock.
    #[default]
    Pooled,
    /// One independent model per stock.
    PerEntity,
}

impl ProblemApproach {
    /// Maps the `single_problem_approach` flag onto the enum.
    #[must_use]
    pub fn from_single_problem(single_problem_approach: bool) -> Self {
        if single_problem_approach {
            Self::PerEntity
        } else {
            Self::Pooled
        }
    }

    #[must_use]
    pub fn is_single_problem(self) -> bool {
        matches!(self, Self::PerEntity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, symbol: &str, close: f64) -> DailyBar {
        DailyBar {
            date,
            symbol: symbol.to_string(),
            area: "Tech".to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn row_keys_order_by_date_then_symbol() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 21).unwrap();
        let mut keys = vec![
            RowKey::new(d2, "AAPL"),
            RowKey::new(d1, "MSFT"),
            RowKey::new(d1, "AAPL"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![RowKey::new(d1, "AAPL"), RowKey::new(d1, "MSFT"), RowKey::new(d2, "AAPL")]
        );
    }

    #[test]
    fn panel_reports_symbols_and_range() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 24).unwrap();
        let mut panel: Panel = vec![bar(d2, "MSFT", 2.0), bar(d1, "AAPL", 1.0)]
            .into_iter()
            .collect();

        assert_eq!(panel.symbols(), vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(panel.date_range(), Some((d1, d2)));

        panel.sort();
        assert_eq!(panel.bars()[0].symbol, "AAPL");
    }

    #[test]
    fn problem_approach_maps_flag() {
        assert_eq!(ProblemApproach::from_single_problem(true), ProblemApproach::PerEntity);
        assert_eq!(ProblemApproach::from_single_problem(false), ProblemApproach::Pooled);
        assert!(ProblemApproach::PerEntity.is_single_problem());
    }
}
