//! Test-run command.
//!
//! Scores the configured model on the most recent window with known
//! outcomes, optionally searches hyperparameters, and appends the result to
//! the test history log.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use stock_forecast_core::AppConfig;
use stock_forecast_data::{OutputDir, TestRunRecord};
use stock_forecast_model::{execute_test_run, RunSettings};

use super::{load_panel, RunOverrides};

/// Arguments for the test-run command.
#[derive(Args, Debug, Clone)]
pub struct TestRunArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,

    /// Hyperparameter search trials (0 skips the search)
    #[arg(long)]
    pub trials: Option<i64>,

    /// Average pooled and per-stock predictions
    #[arg(long)]
    pub combined: bool,

    /// Do not append to the test history log
    #[arg(long)]
    pub no_log: bool,
}

/// Runs the test-run command.
///
/// # Errors
/// Returns an error if loading, any pipeline stage, or logging fails.
pub fn run_test_run(mut config: AppConfig, args: TestRunArgs) -> Result<()> {
    args.overrides.apply(&mut config);
    if let Some(trials) = args.trials {
        config.run.n_optimize_trials = trials;
    }
    if args.combined {
        config.run.combined = true;
    }

    let panel = load_panel(&config)?;
    let settings = RunSettings::from(&config);
    let outcome = execute_test_run(&panel, &settings)?;

    for warning in &outcome.warnings {
        warn!(%warning, "Data quality");
    }
    info!(
        rmsle = outcome.rmsle,
        default_rmsle = outcome.default_rmsle,
        used_search = outcome.used_search,
        prediction_date = %outcome.prediction_date,
        "Test run scored"
    );

    if !args.no_log {
        let record = TestRunRecord::from_run(chrono::Utc::now().date_naive(), &settings, &outcome);
        let version = OutputDir::new(&config.data.output_dir).log_test_run(&record)?;
        info!(version, "Logged test run");
    }

    println!("RMSLE: {:.6}", outcome.rmsle);
    for row in &outcome.forecast {
        println!("{}  {:<10} {:>12.4}", row.date, row.symbol, row.close);
    }
    Ok(())
}
