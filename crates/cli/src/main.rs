use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{CheckSetupArgs, GenerateArgs, PublishArgs, TestRunArgs};

#[derive(Parser)]
#[command(name = "stock-forecast")]
#[command(about = "Multi-step stock close forecasting with gradient-boosted trees", long_about = None)]
struct Cli {
    /// Config file path (defaults to config/Config.toml plus FORECAST_* env vars)
    #[arg(short, long, global = true, env = "STOCK_FORECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Config profile merged over the base file (config/Config.<profile>.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the model on the most recent known window and log the result
    TestRun(TestRunArgs),
    /// Forecast past the end of the panel and write generation files
    Generate(GenerateArgs),
    /// Publish a written generation to the forecast store
    Publish(PublishArgs),
    /// Validate the stock setup list
    CheckSetup(CheckSetupArgs),
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<stock_forecast_core::AppConfig> {
    match (&cli.config, &cli.profile) {
        (Some(path), _) => stock_forecast_core::ConfigLoader::load_from(path),
        (None, Some(profile)) => stock_forecast_core::ConfigLoader::load_with_profile(profile),
        (None, None) => stock_forecast_core::ConfigLoader::load(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::TestRun(args) => commands::run_test_run(config, args)?,
        Commands::Generate(args) => commands::run_generate(config, args)?,
        Commands::Publish(args) => commands::run_publish(&config, args)?,
        Commands::CheckSetup(args) => commands::run_check_setup(&config, &args)?,
    }

    Ok(())
}
