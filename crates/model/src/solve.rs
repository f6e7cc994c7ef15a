//! Fit-and-predict for the pooled and per-stock problem formulations.

use rayon::prelude::*;
use tracing::{debug, info};

use stock_forecast_core::{ForecastError, ForecastResult, HyperParams, ProblemApproach};
use stock_forecast_features::FeatureMatrix;

use crate::chain::ChainedRegressor;

/// Fits a fresh chain on `(x, y)` and predicts `x_query`.
///
/// [`ProblemApproach::Pooled`] fits one chain on every stock.
/// [`ProblemApproach::PerEntity`] fits one independent chain per stock in
/// `x_query`, in parallel, using only that stock's training rows.
///
/// The result is sorted by (date, symbol) and clipped at zero.
///
/// # Errors
/// - [`ForecastError::InvalidInput`] for misaligned training data or
///   mismatched columns;
/// - [`ForecastError::InsufficientData`] if a query stock has no training rows.
pub fn solve(
    hyper_params: &HyperParams,
    x: &FeatureMatrix,
    y: &FeatureMatrix,
    x_query: &FeatureMatrix,
    approach: ProblemApproach,
) -> ForecastResult<FeatureMatrix> {
    x.ensure_aligned(y)?;

    let prediction = match approach {
        ProblemApproach::Pooled => {
            debug!(rows = x.n_rows(), "Fitting pooled model");
            ChainedRegressor::new(hyper_params.clone())
                .fit(x, y)?
                .predict(x_query)?
        }
        ProblemApproach::PerEntity => {
            let symbols = x_query.symbols();
            info!(stocks = symbols.len(), "Fitting one model per stock");
            let parts = symbols
                .par_iter()
                .map(|symbol| solve_one(hyper_params, x, y, x_query, symbol))
                .collect::<ForecastResult<Vec<_>>>()?;
            FeatureMatrix::concat(y.columns().to_vec(), parts)?
        }
    };

    Ok(prediction.sorted_by_key().clip_min(0.0))
}

fn solve_one(
    hyper_params: &HyperParams,
    x: &FeatureMatrix,
    y: &FeatureMatrix,
    x_query: &FeatureMatrix,
    symbol: &str,
) -> ForecastResult<FeatureMatrix> {
    let x_train = x.for_symbol(symbol);
    if x_train.is_empty() {
        return Err(ForecastError::insufficient(format!(
            "no training rows for {symbol}"
        )));
    }
    let y_train = y.for_symbol(symbol);
    debug!(symbol, rows = x_train.n_rows(), "Fitting stock model");
    ChainedRegressor::new(hyper_params.clone())
        .fit(&x_train, &y_train)?
        .predict(&x_query.for_symbol(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use stock_forecast_core::RowKey;

    fn build(symbols: &[&str], days: usize, offset: usize) -> (FeatureMatrix, FeatureMatrix) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut keys = Vec::new();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for d in offset..offset + days {
            for (s, symbol) in symbols.iter().enumerate() {
                keys.push(RowKey::new(start + Duration::days(d as i64), *symbol));
                #[allow(clippy::cast_precision_loss)]
                let v = (d + 10 * s) as f64;
                xs.push(vec![v]);
                ys.push(vec![v + 1.0]);
            }
        }
        (
            FeatureMatrix::new(keys.clone(), vec!["close".into()], xs).unwrap(),
            FeatureMatrix::new(keys, vec!["close_lead_1".into()], ys).unwrap(),
        )
    }

    fn params() -> HyperParams {
        HyperParams::default().with_n_estimators(10)
    }

    #[test]
    fn pooled_output_is_sorted_and_covers_query() {
        let (x, y) = build(&["B", "A"], 20, 0);
        let (q, _) = build(&["B", "A"], 3, 20);
        let pred = solve(&params(), &x, &y, &q, ProblemApproach::Pooled).unwrap();

        assert_eq!(pred.n_rows(), q.n_rows());
        assert_eq!(pred, pred.sorted_by_key());
        assert_eq!(pred.columns(), y.columns());
    }

    #[test]
    fn predictions_are_clipped_at_zero() {
        let (x, mut y) = build(&["A"], 10, 0);
        y = FeatureMatrix::new(
            y.keys().to_vec(),
            y.columns().to_vec(),
            vec![vec![-5.0]; 10],
        )
        .unwrap();
        let pred = solve(&params(), &x, &y, &x, ProblemApproach::Pooled).unwrap();
        assert!(pred.rows().iter().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn per_entity_requires_training_rows_for_every_query_stock() {
        let (x, y) = build(&["A"], 10, 0);
        let (q, _) = build(&["A", "Z"], 2, 10);
        assert!(matches!(
            solve(&params(), &x, &y, &q, ProblemApproach::PerEntity),
            Err(ForecastError::InsufficientData(_))
        ));
    }
}
