//! Forecast scoring.

use stock_forecast_core::{ForecastError, ForecastResult};
use stock_forecast_features::FeatureMatrix;

/// Root mean squared log error over every cell of two aligned matrices.
///
/// `sqrt(mean((ln(1 + pred) - ln(1 + true))^2))`
///
/// # Errors
/// - [`ForecastError::InvalidInput`] if the matrices differ in keys or
///   columns, or are empty;
/// - [`ForecastError::Domain`] if any value is negative.
pub fn root_mean_squared_log_error(
    y_true: &FeatureMatrix,
    y_pred: &FeatureMatrix,
) -> ForecastResult<f64> {
    y_true.ensure_aligned(y_pred)?;
    if y_true.columns() != y_pred.columns() {
        return Err(ForecastError::invalid(
            "true and predicted matrices have different columns",
        ));
    }
    if y_true.is_empty() || y_true.n_cols() == 0 {
        return Err(ForecastError::invalid("cannot score an empty matrix"));
    }

    let mut sum = 0.0;
    let mut count = 0_usize;
    for (t_row, p_row) in y_true.rows().iter().zip(y_pred.rows()) {
        for (&t, &p) in t_row.iter().zip(p_row) {
            if t < 0.0 || p < 0.0 {
                return Err(ForecastError::Domain(format!(
                    "log error is undefined for negative values (true {t}, predicted {p})"
                )));
            }
            let diff = p.ln_1p() - t.ln_1p();
            sum += diff * diff;
            count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    Ok((sum / count as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stock_forecast_core::RowKey;

    fn matrix(values: &[[f64; 2]]) -> FeatureMatrix {
        let day = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let keys = (0..values.len())
            .map(|i| RowKey::new(day, format!("S{i}")))
            .collect();
        FeatureMatrix::new(
            keys,
            vec!["close_lead_1".into(), "close_lead_2".into()],
            values.iter().map(|r| r.to_vec()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn identical_matrices_score_zero() {
        let m = matrix(&[[10.0, 11.0], [0.0, 3.5]]);
        assert_eq!(root_mean_squared_log_error(&m, &m).unwrap(), 0.0);
    }

    #[test]
    fn known_value() {
        let t = matrix(&[[0.0, 0.0]]);
        let p = matrix(&[[std::f64::consts::E - 1.0, 0.0]]);
        // One cell off by exactly 1 in log space: sqrt(1 / 2).
        let score = root_mean_squared_log_error(&t, &p).unwrap();
        assert!((score - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn negative_values_are_a_domain_error() {
        let good = matrix(&[[1.0, 1.0]]);
        let bad = matrix(&[[1.0, -0.01]]);
        assert!(matches!(
            root_mean_squared_log_error(&good, &bad),
            Err(ForecastError::Domain(_))
        ));
        assert!(matches!(
            root_mean_squared_log_error(&bad, &good),
            Err(ForecastError::Domain(_))
        ));
    }

    #[test]
    fn misaligned_or_empty_input_is_invalid() {
        let a = matrix(&[[1.0, 1.0]]);
        let b = matrix(&[[1.0, 1.0], [2.0, 2.0]]);
        assert!(matches!(
            root_mean_squared_log_error(&a, &b),
            Err(ForecastError::InvalidInput(_))
        ));
        let empty = a.take(&[]);
        assert!(matches!(
            root_mean_squared_log_error(&empty, &empty),
            Err(ForecastError::InvalidInput(_))
        ));
    }
}
