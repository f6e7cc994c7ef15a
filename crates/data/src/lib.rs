//! Data loading and persistence for the stock forecasting pipeline.
//!
//! This crate provides:
//! - CSV loading of the daily-bar panel and the stock setup list
//! - Explicit persistence models for generations, predictions and test runs
//! - CSV, JSON and Parquet writers for the output directory
//! - A file-backed publisher with upsert semantics

pub mod csv_storage;
pub mod models;
pub mod output_dir;
pub mod parquet_storage;
pub mod publisher;

// Re-export commonly used types
pub use csv_storage::CsvStorage;
pub use output_dir::{GenerationFiles, OutputDir, TEST_HISTORY_LOG};
pub use parquet_storage::ParquetStorage;
pub use publisher::{ForecastPublisher, ForecastStore, JsonFilePublisher, PublishSummary};

// Re-export models
pub use models::{GenerationRecord, PredictionRecord, StockEntry, StockSetup, TestRunRecord};
