//! Conversion of a wide forecast matrix into long forecast rows.

use chrono::NaiveDate;

use stock_forecast_core::{nth_previous_working_date, ForecastError, ForecastResult, ForecastRow};
use stock_forecast_features::FeatureMatrix;

/// Turns the latest date's predictions into one row per (future date, stock).
///
/// Column `j` (1-based) holds the forecast for the `j`-th business day after
/// the latest date. Rows come back sorted by (date, symbol).
///
/// # Errors
/// Returns [`ForecastError::InvalidInput`] if the matrix has no rows or
/// columns.
pub fn convert_last_prediction_to_output(
    prediction: &FeatureMatrix,
) -> ForecastResult<Vec<ForecastRow>> {
    let latest = prediction
        .latest_date()
        .ok_or_else(|| ForecastError::invalid("prediction matrix is empty"))?;
    if prediction.n_cols() == 0 {
        return Err(ForecastError::invalid("prediction matrix has no columns"));
    }

    let last = prediction.filter_keys(|k| k.date == latest);
    let horizon: Vec<NaiveDate> = (1..=prediction.n_cols())
        .map(|j| {
            let j = i64::try_from(j).unwrap_or(i64::MAX);
            nth_previous_working_date(-j, latest)
        })
        .collect();

    let mut rows: Vec<ForecastRow> = last
        .keys()
        .iter()
        .zip(last.rows())
        .flat_map(|(key, values)| {
            horizon.iter().zip(values).map(|(date, close)| ForecastRow {
                date: *date,
                symbol: key.symbol.clone(),
                close: *close,
            })
        })
        .collect();
    rows.sort_by(|a, b| (a.date, &a.symbol).cmp(&(b.date, &b.symbol)));
    Ok(rows)
}

/// The business day a forecast was made on: the day before its first
/// forecast date. `None` for an empty forecast.
#[must_use]
pub fn prediction_date(rows: &[ForecastRow]) -> Option<NaiveDate> {
    rows.iter()
        .map(|r| r.date)
        .min()
        .map(|first| nth_previous_working_date(1, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_forecast_core::RowKey;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn prediction() -> FeatureMatrix {
        // Thursday 2024-05-02 is the latest date.
        FeatureMatrix::new(
            vec![
                RowKey::new(date(2024, 5, 1), "A"),
                RowKey::new(date(2024, 5, 2), "B"),
                RowKey::new(date(2024, 5, 2), "A"),
            ],
            vec!["close_lead_1".into(), "close_lead_2".into()],
            vec![vec![0.0, 0.0], vec![20.0, 21.0], vec![10.0, 11.0]],
        )
        .unwrap()
    }

    #[test]
    fn lead_columns_map_to_following_business_days() {
        let rows = convert_last_prediction_to_output(&prediction()).unwrap();

        let expected = [
            (date(2024, 5, 3), "A", 10.0),
            (date(2024, 5, 3), "B", 20.0),
            (date(2024, 5, 6), "A", 11.0),
            (date(2024, 5, 6), "B", 21.0),
        ];
        assert_eq!(rows.len(), expected.len());
        for (row, (d, s, c)) in rows.iter().zip(expected) {
            assert_eq!((row.date, row.symbol.as_str(), row.close), (d, s, c));
        }
    }

    #[test]
    fn prediction_date_is_the_business_day_before_the_first_forecast() {
        let rows = convert_last_prediction_to_output(&prediction()).unwrap();
        assert_eq!(prediction_date(&rows), Some(date(2024, 5, 2)));
        assert_eq!(prediction_date(&[]), None);
    }

    #[test]
    fn empty_prediction_is_invalid() {
        let empty = prediction().take(&[]);
        assert!(convert_last_prediction_to_output(&empty).is_err());
    }
}
