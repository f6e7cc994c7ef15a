//! File layout of the output directory.
//!
//! ```text
//! <root>/prediction_<date>.csv
//! <root>/prediction_<date>.parquet   (optional)
//! <root>/generation_<date>.json
//! <root>/test_history_log.csv
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

use stock_forecast_core::ForecastRow;

use crate::csv_storage::CsvStorage;
use crate::models::{GenerationRecord, PredictionRecord, TestRunRecord};
use crate::parquet_storage::ParquetStorage;

pub const TEST_HISTORY_LOG: &str = "test_history_log.csv";

/// Paths written by one real run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFiles {
    pub predictions: PathBuf,
    pub generation: PathBuf,
    pub parquet: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn prediction_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("prediction_{date}.csv"))
    }

    #[must_use]
    pub fn generation_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("generation_{date}.json"))
    }

    #[must_use]
    pub fn test_history_path(&self) -> PathBuf {
        self.root.join(TEST_HISTORY_LOG)
    }

    fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create output dir: {}", self.root.display()))
    }

    /// Writes the forecast and its generation record, named after the
    /// generation's prediction date.
    ///
    /// # Errors
    /// Returns an error if the forecast is empty or any file cannot be written.
    pub fn write_generation(
        &self,
        generation: &GenerationRecord,
        forecast: &[ForecastRow],
        with_parquet: bool,
    ) -> Result<GenerationFiles> {
        self.ensure_root()?;
        let date = generation.prediction_date;
        let records = PredictionRecord::from_forecast(forecast)?;

        let predictions = self.prediction_path(date);
        CsvStorage::write_predictions(&predictions, &records)?;

        let generation_path = self.generation_path(date);
        std::fs::write(&generation_path, serde_json::to_string_pretty(generation)?)
            .with_context(|| format!("Failed to write {}", generation_path.display()))?;

        let parquet = if with_parquet {
            let path = self.root.join(format!("prediction_{date}.parquet"));
            ParquetStorage::write_forecast(&path, forecast)?;
            Some(path)
        } else {
            None
        };

        info!(dir = %self.root.display(), %date, rows = records.len(), "Wrote generation files");
        Ok(GenerationFiles {
            predictions,
            generation: generation_path,
            parquet,
        })
    }

    /// Reads back what [`OutputDir::write_generation`] wrote for `date`.
    ///
    /// # Errors
    /// Returns an error if either file is missing or malformed.
    pub fn read_generation(
        &self,
        date: NaiveDate,
    ) -> Result<(GenerationRecord, Vec<PredictionRecord>)> {
        let path = self.generation_path(date);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let generation = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let predictions = CsvStorage::read_predictions(&self.prediction_path(date))?;
        Ok((generation, predictions))
    }

    /// Appends to the test history log and returns the new version.
    ///
    /// # Errors
    /// Returns an error if the log cannot be read or written.
    pub fn log_test_run(&self, record: &TestRunRecord) -> Result<usize> {
        self.ensure_root()?;
        CsvStorage::append_test_run(&self.test_history_path(), record)
    }
}
