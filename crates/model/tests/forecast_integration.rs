use chrono::NaiveDate;
use stock_forecast_core::{
    business_days_between, nth_previous_working_date, DailyBar, ForecastError, HyperParams, Panel,
    ProblemApproach,
};
use stock_forecast_features::FeatureMatrix;
use stock_forecast_model::{
    execute_real_run, execute_test_run, prepare, root_mean_squared_log_error, solve, split_data,
    RunSettings, SearchOutcome,
};

// =============================================================================
// Fixtures
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| (*s).to_string()).collect()
}

/// Two stocks over every business day of 2024-01-01 ..= 2024-04-30.
fn panel() -> Panel {
    let mut bars = Vec::new();
    for (i, day) in business_days_between(date(2024, 1, 1), date(2024, 4, 30))
        .into_iter()
        .enumerate()
    {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64;
        for (symbol, area, close) in [
            ("AAA", "Tech", 50.0 + 0.5 * t + (t / 3.0).sin()),
            ("BBB", "Bank", 100.0 - 0.2 * t + (t / 5.0).cos()),
        ] {
            bars.push(DailyBar {
                date: day,
                symbol: symbol.to_string(),
                area: area.to_string(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000,
            });
        }
    }
    Panel::new(bars)
}

fn settings() -> RunSettings {
    RunSettings {
        name: "integration".to_string(),
        n_steps: 3,
        days_back_to_consider: None,
        categorical_features: strings(&["day_of_week", "area_cat"]),
        label_features: strings(&["year"]),
        shift_list: vec![1, 2],
        window_list: vec![3],
        hyper_params: HyperParams::default().with_n_estimators(20).with_max_depth(3),
        approach: ProblemApproach::Pooled,
        combined: false,
        n_optimize_trials: 0,
        search_seed: 7,
    }
}

// =============================================================================
// Per-entity solving
// =============================================================================

#[test]
fn per_entity_predictions_cover_each_stock_and_do_not_leak() {
    let data = prepare(&panel(), &settings()).unwrap();
    let split = split_data(&data.x, &data.y, 3).unwrap();
    let params = HyperParams::default().with_n_estimators(15);

    let baseline = solve(
        &params,
        &split.x_train,
        &split.y_train,
        &split.x_test,
        ProblemApproach::PerEntity,
    )
    .unwrap();
    let expected_rows =
        split.x_test.for_symbol("AAA").n_rows() + split.x_test.for_symbol("BBB").n_rows();
    assert_eq!(baseline.n_rows(), expected_rows);

    // Scramble every BBB feature value in both training and query data.
    let scramble = |m: &FeatureMatrix| {
        let rows = m
            .keys()
            .iter()
            .zip(m.rows())
            .map(|(k, r)| {
                if k.symbol == "BBB" {
                    r.iter().map(|v| v * -3.0 + 7.0).collect()
                } else {
                    r.clone()
                }
            })
            .collect();
        FeatureMatrix::new(m.keys().to_vec(), m.columns().to_vec(), rows).unwrap()
    };
    let perturbed = solve(
        &params,
        &scramble(&split.x_train),
        &split.y_train,
        &scramble(&split.x_test),
        ProblemApproach::PerEntity,
    )
    .unwrap();

    assert_eq!(
        baseline.for_symbol("AAA"),
        perturbed.for_symbol("AAA"),
        "AAA predictions depend on BBB features"
    );
}

#[test]
fn solve_output_is_sorted_and_non_negative() {
    let data = prepare(&panel(), &settings()).unwrap();
    let split = split_data(&data.x, &data.y, 3).unwrap();
    for approach in [ProblemApproach::Pooled, ProblemApproach::PerEntity] {
        let pred = solve(
            &HyperParams::default().with_n_estimators(10),
            &split.x_train,
            &split.y_train,
            &split.x_test,
            approach,
        )
        .unwrap();
        assert_eq!(pred.keys(), split.y_test.keys());
        assert!(pred.rows().iter().flatten().all(|v| *v >= 0.0));
    }
}

// =============================================================================
// Metric
// =============================================================================

#[test]
fn rmsle_of_identical_matrices_is_zero_and_negative_values_fail() {
    let data = prepare(&panel(), &settings()).unwrap();
    let split = split_data(&data.x, &data.y, 3).unwrap();

    assert_eq!(
        root_mean_squared_log_error(&split.y_test, &split.y_test).unwrap(),
        0.0
    );

    let negative = FeatureMatrix::new(
        split.y_test.keys().to_vec(),
        split.y_test.columns().to_vec(),
        split.y_test.rows().iter().map(|r| r.iter().map(|v| -v).collect()).collect(),
    )
    .unwrap();
    assert!(matches!(
        root_mean_squared_log_error(&split.y_test, &negative),
        Err(ForecastError::Domain(_))
    ));
}

// =============================================================================
// Split
// =============================================================================

#[test]
fn split_leaves_an_n_step_gap() {
    let data = prepare(&panel(), &settings()).unwrap();
    for n_steps in [1, 3] {
        let split = split_data(&data.x, &data.y, n_steps).unwrap();
        let last_train = split.x_train.latest_date().unwrap();
        let first_test = split.x_test.keys()[0].date;

        assert_eq!(split.x_test.dates().len(), n_steps);
        assert_eq!(
            business_days_between(last_train, first_test).len() - 2,
            n_steps
        );
        assert!(split.x_train.keys().iter().all(|k| k.date < first_test));
    }
}

// =============================================================================
// End-to-end runs
// =============================================================================

#[test]
fn test_run_forecasts_the_days_after_the_test_window() {
    let panel = panel();
    let outcome = execute_test_run(&panel, &settings()).unwrap();

    // Targets for the last three panel days are unknown.
    let last_complete = nth_previous_working_date(3, date(2024, 4, 30));
    assert_eq!(outcome.prediction_date, last_complete);
    assert_eq!(outcome.forecast.len(), 2 * 3);
    assert_eq!(
        outcome.forecast[0].date,
        nth_previous_working_date(-1, last_complete)
    );
    assert!(outcome.rmsle >= 0.0);
    assert_eq!(outcome.rmsle, outcome.default_rmsle);
    assert!(!outcome.used_search);
    assert!(outcome.search.is_none());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn combined_mode_scores_the_averaged_forecast() {
    let combined = RunSettings {
        combined: true,
        ..settings()
    };
    let outcome = execute_test_run(&panel(), &combined).unwrap();
    assert_eq!(outcome.forecast.len(), 6);
    assert!(outcome.forecast.iter().all(|r| r.close >= 0.0));
}

#[test]
fn search_never_returns_a_worse_score_than_the_defaults() {
    let searched = RunSettings {
        n_optimize_trials: 2,
        ..settings()
    };
    let outcome = execute_test_run(&panel(), &searched).unwrap();
    let search: &SearchOutcome = outcome.search.as_ref().unwrap();

    assert_eq!(search.trials.len(), 2);
    assert!(outcome.rmsle <= outcome.default_rmsle);
    assert_eq!(outcome.used_search, search.best_score < outcome.default_rmsle);

    let json = serde_json::to_string(search).unwrap();
    assert!(json.contains("best_score"));
}

#[test]
fn real_run_forecasts_past_the_end_of_the_panel() {
    let outcome = execute_real_run(&panel(), &settings()).unwrap();

    assert_eq!(outcome.prediction_date, date(2024, 4, 30));
    let dates: Vec<NaiveDate> = outcome.forecast.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 5, 1),
            date(2024, 5, 1),
            date(2024, 5, 2),
            date(2024, 5, 2),
            date(2024, 5, 3),
            date(2024, 5, 3),
        ]
    );
    assert_eq!(outcome.forecast[0].symbol, "AAA");
    assert_eq!(outcome.forecast[1].symbol, "BBB");
}

#[test]
fn lookback_clamp_is_reported() {
    let clamped = RunSettings {
        days_back_to_consider: Some(10_000),
        ..settings()
    };
    let outcome = execute_real_run(&panel(), &clamped).unwrap();
    assert_eq!(outcome.warnings.len(), 1);
}
