//! CLI commands for the forecasting pipeline.

pub mod check_setup;
pub mod generate;
pub mod publish;
pub mod test_run;

pub use check_setup::{run_check_setup, CheckSetupArgs};
pub use generate::{run_generate, GenerateArgs};
pub use publish::{run_publish, PublishArgs};
pub use test_run::{run_test_run, TestRunArgs};

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use stock_forecast_core::{AppConfig, Panel};
use stock_forecast_data::{CsvStorage, StockSetup};

/// Flags that override the loaded config for one run.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Panel CSV (date,symbol,area,open,high,low,close,volume)
    #[arg(long)]
    pub panel: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Generation name
    #[arg(long)]
    pub name: Option<String>,

    /// Forecast horizon in business days
    #[arg(long)]
    pub n_steps: Option<usize>,

    /// Lookback in business days
    #[arg(long)]
    pub days_back: Option<usize>,

    /// Fit one model per stock instead of one pooled model
    #[arg(long)]
    pub single_problem: bool,

    /// Also export the forecast as Parquet
    #[arg(long)]
    pub parquet: bool,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(panel) = &self.panel {
            config.data.panel_path.clone_from(panel);
        }
        if let Some(dir) = &self.output_dir {
            config.data.output_dir.clone_from(dir);
        }
        if let Some(name) = &self.name {
            config.run.name.clone_from(name);
        }
        if let Some(n) = self.n_steps {
            config.run.n_steps = n;
        }
        if let Some(days) = self.days_back {
            config.run.days_back_to_consider = Some(days);
        }
        if self.single_problem {
            config.run.single_problem_approach = true;
        }
        if self.parquet {
            config.data.write_parquet = true;
        }
    }
}

/// Loads the panel. When the stock setup file exists, only listed stocks
/// are kept.
pub fn load_panel(config: &AppConfig) -> Result<Panel> {
    let panel = CsvStorage::read_panel(&config.data.panel_path)?;
    if !config.data.stock_setup_path.exists() {
        return Ok(panel);
    }

    let (setup, _warnings) = StockSetup::load(&config.data.stock_setup_path)?.deduplicated();
    let listed: std::collections::BTreeSet<&str> = setup.stock_ids().collect();
    let before = panel.len();
    let panel: Panel = panel
        .into_bars()
        .into_iter()
        .filter(|bar| listed.contains(bar.symbol.as_str()))
        .collect();
    if panel.len() < before {
        tracing::info!(
            dropped = before - panel.len(),
            "Dropped bars for stocks missing from the setup list"
        );
    }
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = AppConfig::default();
        RunOverrides {
            n_steps: Some(5),
            single_problem: true,
            ..RunOverrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.run.n_steps, 5);
        assert!(config.run.single_problem_approach);
        assert_eq!(config.run.days_back_to_consider, Some(756));
        assert_eq!(config.run.name, "default");
    }
}
