use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use stock_forecast_core::ForecastRow;

pub struct ParquetStorage;

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    i32::try_from((date - epoch).num_days()).unwrap_or(i32::MAX)
}

impl ParquetStorage {
    /// Writes forecast rows to a Parquet file with columns
    /// `date` (Date32), `symbol` (Utf8) and `close` (Float64).
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or if writing to the Parquet file fails.
    pub fn write_forecast(path: &Path, rows: &[ForecastRow]) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("date", DataType::Date32, false),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("close", DataType::Float64, false),
        ]));

        let dates = Date32Array::from(
            rows.iter()
                .map(|r| days_since_epoch(r.date))
                .collect::<Vec<_>>(),
        );
        let symbols = StringArray::from(rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>());
        let closes = Float64Array::from(rows.iter().map(|r| r.close).collect::<Vec<_>>());

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(dates) as ArrayRef,
                Arc::new(symbols) as ArrayRef,
                Arc::new(closes) as ArrayRef,
            ],
        )?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create Parquet file: {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }
}
