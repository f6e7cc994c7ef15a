//! Chained multi-output regression.
//!
//! Target `j` is regressed on the features plus targets `0..j`. Training
//! feeds the true earlier targets; prediction feeds the chain's own earlier
//! predictions, so each horizon step can lean on the steps before it.

use tracing::debug;

use stock_forecast_core::{ForecastError, ForecastResult, HyperParams};
use stock_forecast_features::FeatureMatrix;

use crate::gbm::{FittedBooster, GradientBoostingRegressor};

/// An untrained chain. Consumed by [`ChainedRegressor::fit`].
#[derive(Debug, Clone)]
pub struct ChainedRegressor {
    params: HyperParams,
}

/// A chain fitted to one `(X, y)` pair.
#[derive(Debug, Clone)]
pub struct FittedChain {
    feature_columns: Vec<String>,
    target_columns: Vec<String>,
    steps: Vec<FittedBooster>,
}

impl ChainedRegressor {
    #[must_use]
    pub fn new(params: HyperParams) -> Self {
        Self { params }
    }

    /// Fits one booster per target column.
    ///
    /// Step `j` is seeded with `seed + j` so steps sample independently.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if `x` and `y` are not
    /// row-aligned, `y` has no columns, or a booster rejects its input.
    pub fn fit(self, x: &FeatureMatrix, y: &FeatureMatrix) -> ForecastResult<FittedChain> {
        x.ensure_aligned(y)?;
        if y.n_cols() == 0 {
            return Err(ForecastError::invalid("target matrix has no columns"));
        }

        let mut inputs: Vec<Vec<f64>> = x.rows().to_vec();
        let mut steps = Vec::with_capacity(y.n_cols());

        for j in 0..y.n_cols() {
            let target = y.column_values(j);
            let params = self.params.clone().with_seed(self.params.seed.wrapping_add(j as u64));
            let booster = GradientBoostingRegressor::new(params).fit(&inputs, &target)?;
            for (row, value) in inputs.iter_mut().zip(&target) {
                row.push(*value);
            }
            steps.push(booster);
        }

        debug!(
            rows = x.n_rows(),
            steps = steps.len(),
            "Fitted chained regressor"
        );

        Ok(FittedChain {
            feature_columns: x.columns().to_vec(),
            target_columns: y.columns().to_vec(),
            steps,
        })
    }
}

impl FittedChain {
    #[must_use]
    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    /// Predicts every target for every row of `x`.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if `x` has different columns
    /// than the training features.
    pub fn predict(&self, x: &FeatureMatrix) -> ForecastResult<FeatureMatrix> {
        if x.columns() != self.feature_columns.as_slice() {
            return Err(ForecastError::invalid(format!(
                "query has {} feature columns, model was fitted on {}",
                x.n_cols(),
                self.feature_columns.len()
            )));
        }

        let mut inputs: Vec<Vec<f64>> = x.rows().to_vec();
        let mut out = vec![Vec::with_capacity(self.steps.len()); x.n_rows()];

        for step in &self.steps {
            let predicted = step.predict(&inputs)?;
            for ((row, out_row), value) in inputs.iter_mut().zip(&mut out).zip(predicted) {
                row.push(value);
                out_row.push(value);
            }
        }

        FeatureMatrix::new(x.keys().to_vec(), self.target_columns.clone(), out)
    }
}
