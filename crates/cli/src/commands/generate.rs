//! Generate command: the real forecast.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use stock_forecast_core::AppConfig;
use stock_forecast_data::{GenerationRecord, OutputDir};
use stock_forecast_model::{execute_real_run, RunSettings};

use super::{load_panel, RunOverrides};

/// Arguments for the generate command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,
}

/// Runs the generate command and prints the prediction date.
///
/// # Errors
/// Returns an error if loading, any pipeline stage, or writing fails.
pub fn run_generate(mut config: AppConfig, args: GenerateArgs) -> Result<()> {
    args.overrides.apply(&mut config);

    let panel = load_panel(&config)?;
    let settings = RunSettings::from(&config);
    let outcome = execute_real_run(&panel, &settings)?;
    for warning in &outcome.warnings {
        warn!(%warning, "Data quality");
    }

    let generation = GenerationRecord::from_run(outcome.prediction_date, &settings);
    let files = OutputDir::new(&config.data.output_dir).write_generation(
        &generation,
        &outcome.forecast,
        config.data.write_parquet,
    )?;
    info!(
        predictions = %files.predictions.display(),
        generation = %files.generation.display(),
        "Generated forecast"
    );

    println!("{}", outcome.prediction_date);
    Ok(())
}
