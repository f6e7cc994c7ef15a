//! Test history log model.
//!
//! Each test run appends one row to `test_history_log.csv`. List and map
//! fields are stored as JSON strings so the log stays one flat CSV table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stock_forecast_model::{RunSettings, TestRunOutcome};

/// One scored test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunRecord {
    /// 1-based position in the log
    pub version: usize,
    pub created_date: NaiveDate,
    pub prediction_date: NaiveDate,
    pub rmsle: f64,
    /// Winning hyperparameters
    pub hyper_params: BTreeMap<String, f64>,
    pub categorical_features: Vec<String>,
    pub label_features: Vec<String>,
    pub n_steps: usize,
    pub shift_list: Vec<i64>,
    pub window_list: Vec<i64>,
    pub phase: u32,
    pub days_back_to_consider: Option<usize>,
    pub single_problem_approach: bool,
}

impl TestRunRecord {
    /// Creates a record for a finished test run. `version` is assigned when
    /// the record is appended to the log.
    #[must_use]
    pub fn from_run(created_date: NaiveDate, settings: &RunSettings, outcome: &TestRunOutcome) -> Self {
        Self {
            version: 0,
            created_date,
            prediction_date: outcome.prediction_date,
            rmsle: outcome.rmsle,
            hyper_params: outcome.hyper_params.to_map(),
            categorical_features: settings.categorical_features.clone(),
            label_features: settings.label_features.clone(),
            n_steps: settings.n_steps,
            shift_list: settings.shift_list.clone(),
            window_list: settings.window_list.clone(),
            phase: 1,
            days_back_to_consider: settings.days_back_to_consider,
            single_problem_approach: settings.approach.is_single_problem(),
        }
    }
}

/// Flat CSV shape of [`TestRunRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestRunRow {
    version: usize,
    created_date: NaiveDate,
    prediction_date: NaiveDate,
    rmsle: f64,
    hyper_params: String,
    categorical_features: String,
    label_features: String,
    n_steps: usize,
    shift_list: String,
    window_list: String,
    phase: u32,
    days_back_to_consider: Option<usize>,
    single_problem_approach: bool,
}

impl TryFrom<&TestRunRecord> for TestRunRow {
    type Error = anyhow::Error;

    fn try_from(r: &TestRunRecord) -> Result<Self> {
        Ok(Self {
            version: r.version,
            created_date: r.created_date,
            prediction_date: r.prediction_date,
            rmsle: r.rmsle,
            hyper_params: serde_json::to_string(&r.hyper_params)?,
            categorical_features: serde_json::to_string(&r.categorical_features)?,
            label_features: serde_json::to_string(&r.label_features)?,
            n_steps: r.n_steps,
            shift_list: serde_json::to_string(&r.shift_list)?,
            window_list: serde_json::to_string(&r.window_list)?,
            phase: r.phase,
            days_back_to_consider: r.days_back_to_consider,
            single_problem_approach: r.single_problem_approach,
        })
    }
}

impl TryFrom<TestRunRow> for TestRunRecord {
    type Error = anyhow::Error;

    fn try_from(r: TestRunRow) -> Result<Self> {
        let version = r.version;
        let json = |field: &str, raw: &str| -> Result<serde_json::Value> {
            serde_json::from_str(raw)
                .with_context(|| format!("Invalid {field} in test log version {version}"))
        };
        Ok(Self {
            version,
            created_date: r.created_date,
            prediction_date: r.prediction_date,
            rmsle: r.rmsle,
            hyper_params: serde_json::from_value(json("hyper_params", &r.hyper_params)?)?,
            categorical_features: serde_json::from_value(json(
                "categorical_features",
                &r.categorical_features,
            )?)?,
            label_features: serde_json::from_value(json("label_features", &r.label_features)?)?,
            n_steps: r.n_steps,
            shift_list: serde_json::from_value(json("shift_list", &r.shift_list)?)?,
            window_list: serde_json::from_value(json("window_list", &r.window_list)?)?,
            phase: r.phase,
            days_back_to_consider: r.days_back_to_consider,
            single_problem_approach: r.single_problem_approach,
        })
    }
}
