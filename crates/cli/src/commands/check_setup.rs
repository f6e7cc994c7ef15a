//! Check-setup command.
//!
//! Reports duplicate stocks in the setup list and, optionally, stocks with
//! no bars in the panel.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use stock_forecast_core::AppConfig;
use stock_forecast_data::{CsvStorage, StockSetup};

/// Arguments for the check-setup command.
#[derive(Args, Debug, Clone)]
pub struct CheckSetupArgs {
    /// Setup file (defaults to the configured path)
    #[arg(long)]
    pub setup: Option<PathBuf>,

    /// Also check that every listed stock appears in the panel
    #[arg(long)]
    pub with_panel: bool,

    /// Exit with an error when any problem is found
    #[arg(long)]
    pub strict: bool,
}

/// Runs the check-setup command.
///
/// # Errors
/// Returns an error if files cannot be read, or in strict mode if a problem
/// is found.
pub fn run_check_setup(config: &AppConfig, args: &CheckSetupArgs) -> Result<()> {
    let path = args
        .setup
        .clone()
        .unwrap_or_else(|| config.data.stock_setup_path.clone());
    let setup = StockSetup::load(&path)?;
    let (deduplicated, warnings) = setup.deduplicated();

    println!(
        "{} areas, {} stocks ({} listed)",
        deduplicated.areas.len(),
        deduplicated.stock_ids().count(),
        setup.stock_ids().count()
    );
    for warning in &warnings {
        println!("  {warning}");
    }

    let mut missing = Vec::new();
    if args.with_panel {
        let panel = CsvStorage::read_panel(&config.data.panel_path)?;
        let present = panel.symbols();
        missing = deduplicated
            .stock_ids()
            .filter(|id| !present.iter().any(|s| s == id))
            .map(str::to_string)
            .collect();
        for id in &missing {
            println!("  stock {id} has no bars in the panel");
        }
    }

    if args.strict && (!warnings.is_empty() || !missing.is_empty()) {
        bail!(
            "stock setup has {} duplicate(s) and {} stock(s) without data",
            warnings.len(),
            missing.len()
        );
    }
    Ok(())
}
