//! Publish command: push written generation files to the forecast store.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;

use stock_forecast_core::AppConfig;
use stock_forecast_data::{ForecastPublisher, JsonFilePublisher, OutputDir};

/// Arguments for the publish command.
#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Prediction date of the generation to publish (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    /// Store file
    #[arg(long, env = "FORECAST_STORE", default_value = "output/forecast_store.json")]
    pub store: PathBuf,

    /// Output directory holding the generation files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Runs the publish command.
///
/// # Errors
/// Returns an error if the date does not parse, the generation files are
/// missing, or the store cannot be updated.
pub fn run_publish(config: &AppConfig, args: PublishArgs) -> Result<()> {
    let date = NaiveDate::parse_from_str(&args.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}", args.date))?;
    let dir = OutputDir::new(args.output_dir.unwrap_or_else(|| config.data.output_dir.clone()));
    let (generation, predictions) = dir.read_generation(date)?;

    let mut publisher = JsonFilePublisher::new(args.store);
    let summary = publisher.publish(&generation, &predictions)?;

    println!(
        "Published {} to {}: {} inserted, {} updated",
        generation.name,
        publisher.name(),
        summary.inserted,
        summary.updated
    );
    Ok(())
}
