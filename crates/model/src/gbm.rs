//! Gradient-boosted regression trees with squared-error loss.
//!
//! Every round fits a [`RegressionTree`] to the gradient (`prediction - y`)
//! and unit hessian of the current ensemble. Rows and columns are subsampled
//! per tree from a seeded ChaCha RNG, so a fit is fully reproducible.

use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stock_forecast_core::{ForecastError, ForecastResult, HyperParams};

use crate::tree::{BinnedFeatures, RegressionTree, TreeParams};

/// Untrained booster holding its hyperparameters.
#[derive(Debug, Clone)]
pub struct GradientBoostingRegressor {
    params: HyperParams,
}

/// A trained ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedBooster {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    #[must_use]
    pub fn new(params: HyperParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    fn validate(&self) -> ForecastResult<()> {
        let p = &self.params;
        let in_unit = |v: f64| v > 0.0 && v <= 1.0;
        if !(p.learning_rate > 0.0) {
            return Err(ForecastError::invalid("learning_rate must be positive"));
        }
        if !in_unit(p.subsample) || !in_unit(p.colsample_bytree) {
            return Err(ForecastError::invalid(
                "subsample and colsample_bytree must lie in (0, 1]",
            ));
        }
        if p.gamma < 0.0 || p.reg_alpha < 0.0 || p.reg_lambda < 0.0 || p.min_child_weight < 0.0 {
            return Err(ForecastError::invalid("regularization terms must be non-negative"));
        }
        Ok(())
    }

    /// Fits the ensemble to row-major `x` and targets `y`.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] for empty or ragged input,
    /// non-finite values, or out-of-range hyperparameters.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> ForecastResult<FittedBooster> {
        self.validate()?;
        if x.is_empty() {
            return Err(ForecastError::invalid("cannot fit on zero rows"));
        }
        if x.len() != y.len() {
            return Err(ForecastError::invalid(format!(
                "{} feature rows for {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if x.iter().any(|r| r.len() != n_features) {
            return Err(ForecastError::invalid("feature rows differ in length"));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(ForecastError::invalid("features and targets must be finite"));
        }

        let p = &self.params;
        let tree_params = TreeParams {
            max_depth: p.max_depth,
            gamma: p.gamma,
            reg_alpha: p.reg_alpha,
            reg_lambda: p.reg_lambda,
            min_child_weight: p.min_child_weight,
            learning_rate: p.learning_rate,
        };

        #[allow(clippy::cast_precision_loss)]
        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let binned = BinnedFeatures::new(x);
        let n_rows = x.len();
        let rows_per_tree = sample_size(n_rows, p.subsample);
        let features_per_tree = sample_size(n_features, p.colsample_bytree);

        let mut rng = ChaCha8Rng::seed_from_u64(p.seed);
        let mut prediction = vec![base_score; n_rows];
        let hess = vec![1.0; n_rows];
        let mut trees = Vec::with_capacity(p.n_estimators);

        for _ in 0..p.n_estimators {
            let grad: Vec<f64> = prediction.iter().zip(y).map(|(p, t)| p - t).collect();

            let mut rows = if rows_per_tree < n_rows {
                sample(&mut rng, n_rows, rows_per_tree).into_vec()
            } else {
                (0..n_rows).collect()
            };
            rows.sort_unstable();
            let mut features = if features_per_tree < n_features {
                sample(&mut rng, n_features, features_per_tree).into_vec()
            } else {
                (0..n_features).collect()
            };
            features.sort_unstable();

            let tree = RegressionTree::fit(&binned, &grad, &hess, rows, &features, &tree_params);
            for (pred, row) in prediction.iter_mut().zip(x) {
                *pred += tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(
            rows = n_rows,
            features = n_features,
            trees = trees.len(),
            "Fitted gradient boosting ensemble"
        );

        Ok(FittedBooster {
            base_score,
            n_features,
            trees,
        })
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn sample_size(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round() as usize).clamp(1, n.max(1))
}

impl FittedBooster {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    /// Predicts every row.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if a row has the wrong width.
    pub fn predict(&self, x: &[Vec<f64>]) -> ForecastResult<Vec<f64>> {
        if let Some(bad) = x.iter().find(|r| r.len() != self.n_features) {
            return Err(ForecastError::invalid(format!(
                "expected {} features, got {}",
                self.n_features,
                bad.len()
            )));
        }
        Ok(x.iter().map(|r| self.predict_row(r)).collect())
    }
}
