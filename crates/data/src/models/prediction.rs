//! Prediction data model.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stock_forecast_core::ForecastRow;

/// One forecast close for one stock on one future business day.
///
/// Keyed by (`date`, `name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Forecast date
    pub date: NaiveDate,
    /// Stock symbol
    pub name: String,
    /// Predicted close
    pub close: f64,
}

impl PredictionRecord {
    /// Converts forecast rows into records.
    ///
    /// # Errors
    /// Returns an error if `rows` is empty.
    pub fn from_forecast(rows: &[ForecastRow]) -> Result<Vec<Self>> {
        if rows.is_empty() {
            bail!("cannot build prediction records from an empty forecast");
        }
        Ok(rows.iter().map(Self::from).collect())
    }

    /// Upsert key.
    #[must_use]
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, &self.name)
    }
}

impl From<&ForecastRow> for PredictionRecord {
    fn from(row: &ForecastRow) -> Self {
        Self {
            date: row.date,
            name: row.symbol.clone(),
            close: row.close,
        }
    }
}
