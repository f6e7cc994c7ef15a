use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::hyper_params::HyperParams;
use crate::types::ProblemApproach;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub run: RunConfig,
    pub hyper_params: HyperParams,
}

/// Where inputs are read from and outputs are written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV with columns `date,symbol,area,open,high,low,close,volume`.
    pub panel_path: PathBuf,
    /// JSON map of area to the stocks tracked in it.
    pub stock_setup_path: PathBuf,
    /// Directory for prediction/generation files and the test history log.
    pub output_dir: PathBuf,
    /// Also export forecast rows as Parquet.
    pub write_parquet: bool,
}

/// Parameters of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Generation name stored with every record.
    pub name: String,
    /// Forecast horizon in business days.
    pub n_steps: usize,
    /// Lookback window in business days; `None` uses all valid history.
    pub days_back_to_consider: Option<usize>,
    pub categorical_features: Vec<String>,
    pub label_features: Vec<String>,
    pub shift_list: Vec<i64>,
    pub window_list: Vec<i64>,
    pub single_problem_approach: bool,
    /// Average the pooled and per-entity forecasts.
    pub combined: bool,
    /// Hyperparameter search trials; zero or negative skips the search.
    pub n_optimize_trials: i64,
    pub search_seed: u64,
}

impl RunConfig {
    #[must_use]
    pub fn approach(&self) -> ProblemApproach {
        ProblemApproach::from_single_problem(self.single_problem_approach)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            panel_path: PathBuf::from("data/daily_bars.csv"),
            stock_setup_path: PathBuf::from("config/stock_setup.json"),
            output_dir: PathBuf::from("output"),
            write_parquet: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            n_steps: 15,
            days_back_to_consider: Some(3 * 252),
            categorical_features: vec!["day_of_week".to_string(), "area_cat".to_string()],
            label_features: vec!["year".to_string()],
            shift_list: vec![1, 2, 3],
            window_list: vec![5, 10, 15],
            single_problem_approach: false,
            combined: false,
            n_optimize_trials: 0,
            search_seed: 42,
        }
    }
}
