use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gradient-boosting knobs for one model instance.
///
/// Missing fields fall back to [`HyperParams::default`] when deserialized, so a
/// config file may override only the knobs it cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of feature columns sampled per tree.
    pub colsample_bytree: f64,
    /// Minimum loss reduction required to split a node.
    pub gamma: f64,
    /// L1 regularization on leaf weights.
    pub reg_alpha: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
    /// Seed for row and column sampling.
    pub seed: u64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            gamma: 0.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

impl HyperParams {
    #[must_use]
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Knob name to value, for run metadata records.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        #[allow(clippy::cast_precision_loss)]
        let entries = [
            ("n_estimators", self.n_estimators as f64),
            ("max_depth", self.max_depth as f64),
            ("learning_rate", self.learning_rate),
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
            ("gamma", self.gamma),
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
            ("min_child_weight", self.min_child_weight),
            ("seed", self.seed as f64),
        ];
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_boosting_conventions() {
        let params = HyperParams::default();
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.max_depth, 6);
        assert!((params.learning_rate - 0.3).abs() < f64::EPSILON);
        assert!((params.reg_lambda - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let params: HyperParams =
            serde_json::from_str(r#"{"n_estimators": 250, "gamma": 0.5}"#).unwrap();
        assert_eq!(params.n_estimators, 250);
        assert!((params.gamma - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.max_depth, 6);
    }

    #[test]
    fn map_lists_every_knob() {
        let map = HyperParams::default().with_max_depth(4).to_map();
        assert_eq!(map.len(), 10);
        assert_eq!(map["max_depth"], 4.0);
        assert_eq!(map["n_estimators"], 100.0);
    }
}
