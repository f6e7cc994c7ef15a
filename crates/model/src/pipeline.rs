//! End-to-end runs from a raw panel to forecast rows.
//!
//! A test run scores the model on the most recent `n_steps` days that already
//! have known outcomes. A real run trains on everything with known outcomes
//! and forecasts past the end of the panel.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use stock_forecast_core::{
    AppConfig, DataQualityWarning, ForecastError, ForecastResult, ForecastRow, HyperParams, Panel,
    ProblemApproach,
};
use stock_forecast_features::{
    clean_data, engineer_features, process_data, FeatureMatrix, SupervisedData,
};

use crate::metrics::root_mean_squared_log_error;
use crate::output::{convert_last_prediction_to_output, prediction_date};
use crate::search::{optimize_with_hyperparameter_search, SearchOutcome};
use crate::solve::solve;
use crate::split::{split_data, WalkForwardSplit};

/// Everything one run needs besides the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub name: String,
    pub n_steps: usize,
    pub days_back_to_consider: Option<usize>,
    pub categorical_features: Vec<String>,
    pub label_features: Vec<String>,
    pub shift_list: Vec<i64>,
    pub window_list: Vec<i64>,
    pub hyper_params: HyperParams,
    pub approach: ProblemApproach,
    /// Average pooled and per-stock predictions. Test runs only.
    pub combined: bool,
    /// Zero or negative skips the search.
    pub n_optimize_trials: i64,
    pub search_seed: u64,
}

impl From<&AppConfig> for RunSettings {
    fn from(config: &AppConfig) -> Self {
        let run = &config.run;
        Self {
            name: run.name.clone(),
            n_steps: run.n_steps,
            days_back_to_consider: run.days_back_to_consider,
            categorical_features: run.categorical_features.clone(),
            label_features: run.label_features.clone(),
            shift_list: run.shift_list.clone(),
            window_list: run.window_list.clone(),
            hyper_params: config.hyper_params.clone(),
            approach: run.approach(),
            combined: run.combined,
            n_optimize_trials: run.n_optimize_trials,
            search_seed: run.search_seed,
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Result of [`execute_test_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct TestRunOutcome {
    /// Score of the winning hyperparameters.
    pub rmsle: f64,
    /// Score of the configured hyperparameters.
    pub default_rmsle: f64,
    pub forecast: Vec<ForecastRow>,
    /// Winning hyperparameters.
    pub hyper_params: HyperParams,
    pub search: Option<SearchOutcome>,
    /// True if the searched hyperparameters beat the configured ones.
    pub used_search: bool,
    pub prediction_date: NaiveDate,
    pub warnings: Vec<DataQualityWarning>,
}

/// Result of [`execute_real_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RealRunOutcome {
    pub forecast: Vec<ForecastRow>,
    pub prediction_date: NaiveDate,
    pub warnings: Vec<DataQualityWarning>,
}

/// Clean, engineer and build the supervised matrices.
///
/// # Errors
/// Propagates errors from every stage.
pub fn prepare(panel: &Panel, settings: &RunSettings) -> ForecastResult<SupervisedData> {
    let cleaned = clean_data(panel)?;
    let table = engineer_features(
        &cleaned.panel,
        &settings.categorical_features,
        &settings.shift_list,
        &settings.window_list,
        &settings.label_features,
    )?;
    let mut data = process_data(
        &table,
        settings.n_steps,
        &settings.categorical_features,
        &settings.label_features,
        settings.days_back_to_consider,
    )?;

    let mut warnings = cleaned.warnings;
    warnings.append(&mut data.warnings);
    data.warnings = warnings;
    Ok(data)
}

fn predict_test_window(
    hyper_params: &HyperParams,
    split: &WalkForwardSplit,
    approach: ProblemApproach,
    combined: bool,
) -> ForecastResult<FeatureMatrix> {
    let run = |approach| solve(hyper_params, &split.x_train, &split.y_train, &split.x_test, approach);
    if combined {
        let pooled = run(ProblemApproach::Pooled)?;
        let per_entity = run(ProblemApproach::PerEntity)?;
        pooled.average(&per_entity)
    } else {
        run(approach)
    }
}

fn finish(prediction: &FeatureMatrix) -> ForecastResult<(Vec<ForecastRow>, NaiveDate)> {
    let forecast = convert_last_prediction_to_output(prediction)?;
    let date = prediction_date(&forecast)
        .ok_or_else(|| ForecastError::insufficient("forecast has no rows"))?;
    Ok((forecast, date))
}

/// Scores the configured hyperparameters on the walk-forward test window,
/// optionally searches for better ones, and forecasts from the last test
/// date with whichever scored lower.
///
/// # Errors
/// Propagates errors from every stage. A negative prediction reaching the
/// metric surfaces as [`ForecastError::Domain`].
pub fn execute_test_run(panel: &Panel, settings: &RunSettings) -> ForecastResult<TestRunOutcome> {
    let data = prepare(panel, settings)?;
    let split = split_data(&data.x, &data.y, settings.n_steps)?;

    let default_prediction = predict_test_window(
        &settings.hyper_params,
        &split,
        settings.approach,
        settings.combined,
    )?;
    let default_rmsle = root_mean_squared_log_error(&split.y_test, &default_prediction)?;
    info!(rmsle = default_rmsle, combined = settings.combined, "Scored configured hyperparameters");

    let search = optimize_with_hyperparameter_search(
        &split,
        settings.approach,
        settings.n_optimize_trials,
        settings.search_seed,
    )?;

    let (rmsle, hyper_params, prediction, used_search) = match &search {
        Some(outcome) if outcome.best_score < default_rmsle => {
            info!(
                searched = outcome.best_score,
                configured = default_rmsle,
                "Searched hyperparameters win"
            );
            let prediction = solve(
                &outcome.best_params,
                &split.x_train,
                &split.y_train,
                &split.x_test,
                settings.approach,
            )?;
            (outcome.best_score, outcome.best_params.clone(), prediction, true)
        }
        _ => (
            default_rmsle,
            settings.hyper_params.clone(),
            default_prediction,
            false,
        ),
    };

    let (forecast, prediction_date) = finish(&prediction)?;
    info!(rmsle, %prediction_date, rows = forecast.len(), "Test run finished");

    Ok(TestRunOutcome {
        rmsle,
        default_rmsle,
        forecast,
        hyper_params,
        search,
        used_search,
        prediction_date,
        warnings: data.warnings,
    })
}

/// Trains on every row with complete targets and forecasts the `n_steps`
/// business days after the latest date in the panel.
///
/// # Errors
/// Propagates errors from every stage;
/// [`ForecastError::InsufficientData`] if no row has complete targets.
pub fn execute_real_run(panel: &Panel, settings: &RunSettings) -> ForecastResult<RealRunOutcome> {
    let data = prepare(panel, settings)?;

    let complete = data.y.complete_rows();
    if complete.is_empty() {
        return Err(ForecastError::insufficient("no row has every target defined"));
    }
    let x_train = data.x.take(&complete);
    let y_train = data.y.take(&complete).to_dense()?;

    let prediction = solve(
        &settings.hyper_params,
        &x_train,
        &y_train,
        &data.x,
        settings.approach,
    )?;
    let (forecast, prediction_date) = finish(&prediction)?;
    info!(%prediction_date, rows = forecast.len(), "Real run finished");

    Ok(RealRunOutcome {
        forecast,
        prediction_date,
        warnings: data.warnings,
    })
}
