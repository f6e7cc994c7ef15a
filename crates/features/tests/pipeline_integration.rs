use chrono::NaiveDate;
use stock_forecast_core::{business_days_between, DailyBar, ForecastError, Panel};
use stock_forecast_features::{clean_data, engineer_features, process_data, FeatureTable};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn bar(date: NaiveDate, symbol: &str, close: f64) -> DailyBar {
    DailyBar {
        date,
        symbol: symbol.to_string(),
        area: if symbol == "AAA" { "Tech" } else { "Bank" }.to_string(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 500,
    }
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| (*s).to_string()).collect()
}

/// Eight business days (Mon 2024-05-06 .. Wed 2024-05-15) for two stocks,
/// with Wednesday 2024-05-08 missing for both.
fn panel_with_wednesday_gap() -> Panel {
    let days = business_days_between(date(2024, 5, 6), date(2024, 5, 15));
    assert_eq!(days.len(), 8);
    let mut bars = Vec::new();
    for (i, day) in days.into_iter().enumerate() {
        if day == date(2024, 5, 8) {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let step = i as f64;
        bars.push(bar(day, "AAA", 10.0 + step));
        bars.push(bar(day, "BBB", 20.0 + 2.0 * step));
    }
    Panel::new(bars)
}

#[test]
fn missing_wednesday_is_filled_from_tuesday() {
    let cleaned = clean_data(&panel_with_wednesday_gap()).unwrap().panel;

    assert_eq!(cleaned.len(), 16);
    for symbol in ["AAA", "BBB"] {
        let tuesday = cleaned
            .bars()
            .iter()
            .find(|b| b.symbol == symbol && b.date == date(2024, 5, 7))
            .unwrap();
        let wednesday = cleaned
            .bars()
            .iter()
            .find(|b| b.symbol == symbol && b.date == date(2024, 5, 8))
            .unwrap();
        assert_eq!(wednesday.close, tuesday.close);
        assert_eq!(wednesday.volume, tuesday.volume);
        assert_eq!(wednesday.area, tuesday.area);
    }
}

#[test]
fn cleaned_panel_is_a_fixed_point() {
    let once = clean_data(&panel_with_wednesday_gap()).unwrap().panel;
    let twice = clean_data(&once).unwrap().panel;
    assert_eq!(once, twice);
}

fn features_for(panel: &Panel) -> FeatureTable {
    let cleaned = clean_data(panel).unwrap().panel;
    engineer_features(
        &cleaned,
        &strings(&["day_of_week", "area_cat"]),
        &[1, 2],
        &[3],
        &strings(&["year"]),
    )
    .unwrap()
}

#[test]
fn features_on_a_date_ignore_that_dates_close() {
    let panel = panel_with_wednesday_gap();
    let baseline = features_for(&panel);

    let target = date(2024, 5, 13);
    let perturbed_panel: Panel = panel
        .bars()
        .iter()
        .cloned()
        .map(|mut b| {
            if b.date == target && b.symbol == "AAA" {
                b.close = 9_999.0;
            }
            b
        })
        .collect();
    let perturbed = features_for(&perturbed_panel);

    let row = baseline
        .keys()
        .unwrap()
        .iter()
        .position(|k| k.date == target && k.symbol == "AAA")
        .unwrap();
    for column in ["close_lag_1", "close_lag_2", "close_lag_mean_3"] {
        assert_eq!(
            baseline.numeric(column).unwrap()[row],
            perturbed.numeric(column).unwrap()[row],
            "{column} used the current close"
        );
    }
}

#[test]
fn end_to_end_matrices_are_aligned_and_leak_free() {
    let table = features_for(&panel_with_wednesday_gap());
    let data = process_data(
        &table,
        2,
        &strings(&["day_of_week", "area_cat"]),
        &strings(&["year"]),
        None,
    )
    .unwrap();

    data.x.ensure_aligned(&data.y).unwrap();
    // Lag 2 and the 3-day window are defined from the third business day.
    assert_eq!(data.start_date, date(2024, 5, 8));
    assert_eq!(data.x.n_rows(), 12);
    assert!(data.warnings.is_empty());
}

#[test]
fn look_ahead_offsets_cannot_reach_the_model_inputs() {
    let cleaned = clean_data(&panel_with_wednesday_gap()).unwrap().panel;
    let err = engineer_features(&cleaned, &[], &[1, -1], &[3, -2], &[]).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));

    let table = engineer_features(&cleaned, &[], &[1], &[3], &[]).unwrap();
    let data = process_data(&table, 2, &[], &[], None).unwrap();
    assert!(data.x.columns().iter().all(|c| !c.contains("lead")));
    assert!(data.y.columns().iter().all(|c| c.contains("lead")));
}
