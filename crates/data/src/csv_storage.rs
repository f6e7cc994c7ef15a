use anyhow::{Context, Result};
use csv::{Reader, Writer};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use stock_forecast_core::{DailyBar, Panel};

use crate::models::test_run::TestRunRow;
use crate::models::{PredictionRecord, TestRunRecord};

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a daily-bar panel.
    ///
    /// Format: date,symbol,area,open,high,low,close,volume
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row does not parse
    pub fn read_panel(path: &Path) -> Result<Panel> {
        let mut reader = Reader::from_path(path)
            .with_context(|| format!("Failed to open panel CSV: {}", path.display()))?;
        let bars = reader
            .deserialize::<DailyBar>()
            .enumerate()
            .map(|(i, row)| row.with_context(|| format!("Bad panel row {}", i + 1)))
            .collect::<Result<Vec<_>>>()?;

        let panel = Panel::new(bars);
        info!(
            path = %path.display(),
            bars = panel.len(),
            stocks = panel.symbols().len(),
            "Loaded panel"
        );
        Ok(panel)
    }

    /// Writes a panel in the format [`CsvStorage::read_panel`] reads.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_panel(path: &Path, panel: &Panel) -> Result<()> {
        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        for bar in panel.bars() {
            writer.serialize(bar)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes forecast rows sorted by (date, name).
    ///
    /// Format: date,name,close
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_predictions(path: &Path, records: &[PredictionRecord]) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| a.key().cmp(&b.key()));
        for record in &sorted {
            writer.serialize(record)?;
        }

        writer.flush()?;
        debug!(path = %path.display(), rows = sorted.len(), "Wrote predictions");
        Ok(())
    }

    /// Reads forecast rows written by [`CsvStorage::write_predictions`].
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row does not parse
    pub fn read_predictions(path: &Path) -> Result<Vec<PredictionRecord>> {
        let mut reader = Reader::from_path(path)
            .with_context(|| format!("Failed to open predictions CSV: {}", path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .context("Bad prediction row")
    }

    /// Reads the test history log. A missing file is an empty log.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be parsed
    pub fn read_test_history(path: &Path) -> Result<Vec<TestRunRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = Reader::from_path(path)
            .with_context(|| format!("Failed to open test log: {}", path.display()))?;
        reader
            .deserialize::<TestRunRow>()
            .map(|row| TestRunRecord::try_from(row.context("Bad test log row")?))
            .collect()
    }

    /// Appends `record` to the test history log and returns its version,
    /// which is the previous number of rows plus one.
    ///
    /// # Errors
    /// Returns error if the log cannot be read or rewritten
    pub fn append_test_run(path: &Path, record: &TestRunRecord) -> Result<usize> {
        let mut history = Self::read_test_history(path)?;
        let mut record = record.clone();
        record.version = history.len() + 1;
        history.push(record);

        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        for entry in &history {
            writer.serialize(TestRunRow::try_from(entry)?)?;
        }
        writer.flush()?;

        info!(path = %path.display(), version = history.len(), "Appended test run");
        Ok(history.len())
    }
}
