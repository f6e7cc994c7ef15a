//! Random hyperparameter search scored on the walk-forward test window.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stock_forecast_core::{ForecastResult, HyperParams, ProblemApproach};

use crate::metrics::root_mean_squared_log_error;
use crate::solve::solve;
use crate::split::WalkForwardSplit;

/// Inclusive bounds of the search space.
///
/// Integer knobs step in fixed increments; float knobs marked `log` are
/// sampled uniformly in log space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Tree counts: `n_estimators.0 + k * n_estimators_step`, up to `n_estimators.1`.
    pub n_estimators: (usize, usize),
    pub n_estimators_step: usize,
    pub max_depth: (usize, usize),
    /// log
    pub learning_rate: (f64, f64),
    pub subsample: (f64, f64),
    pub colsample_bytree: (f64, f64),
    /// log
    pub gamma: (f64, f64),
    /// log
    pub reg_alpha: (f64, f64),
    /// log
    pub reg_lambda: (f64, f64),
    /// log
    pub min_child_weight: (f64, f64),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: (100, 1200),
            n_estimators_step: 50,
            max_depth: (3, 15),
            learning_rate: (0.01, 0.3),
            subsample: (0.5, 1.0),
            colsample_bytree: (0.5, 1.0),
            gamma: (0.01, 10.0),
            reg_alpha: (1e-8, 100.0),
            reg_lambda: (1e-8, 100.0),
            min_child_weight: (1.0, 100.0),
        }
    }
}

fn log_uniform(rng: &mut ChaCha8Rng, (low, high): (f64, f64)) -> f64 {
    rng.gen_range(low.ln()..=high.ln()).exp()
}

impl SearchSpace {
    /// Draws one candidate. `seed` is copied into the result.
    pub fn sample(&self, rng: &mut ChaCha8Rng, seed: u64) -> HyperParams {
        let steps = (self.n_estimators.1.saturating_sub(self.n_estimators.0))
            / self.n_estimators_step.max(1);
        HyperParams {
            n_estimators: self.n_estimators.0 + rng.gen_range(0..=steps) * self.n_estimators_step,
            max_depth: rng.gen_range(self.max_depth.0..=self.max_depth.1),
            learning_rate: log_uniform(rng, self.learning_rate),
            subsample: rng.gen_range(self.subsample.0..=self.subsample.1),
            colsample_bytree: rng.gen_range(self.colsample_bytree.0..=self.colsample_bytree.1),
            gamma: log_uniform(rng, self.gamma),
            reg_alpha: log_uniform(rng, self.reg_alpha),
            reg_lambda: log_uniform(rng, self.reg_lambda),
            min_child_weight: log_uniform(rng, self.min_child_weight),
            seed,
        }
    }
}

/// Score of one evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub number: usize,
    pub params: HyperParams,
    pub score: f64,
}

/// Best candidate plus the full trial history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best_score: f64,
    pub best_params: HyperParams,
    pub trials: Vec<TrialResult>,
}

/// Searches [`SearchSpace::default`] for the lowest test-window RMSLE.
///
/// Returns `Ok(None)` without fitting anything when `n_trials <= 0`; callers
/// then keep their default hyperparameters. Candidates are drawn in order
/// from one RNG seeded with `seed`, then evaluated in parallel. Ties go to
/// the earlier trial.
///
/// # Errors
/// Propagates the first error raised by [`solve`] or the metric.
pub fn optimize_with_hyperparameter_search(
    split: &WalkForwardSplit,
    approach: ProblemApproach,
    n_trials: i64,
    seed: u64,
) -> ForecastResult<Option<SearchOutcome>> {
    search_in_space(split, approach, n_trials, seed, &SearchSpace::default())
}

/// [`optimize_with_hyperparameter_search`] over a custom space.
///
/// # Errors
/// Propagates the first error raised by [`solve`] or the metric.
pub fn search_in_space(
    split: &WalkForwardSplit,
    approach: ProblemApproach,
    n_trials: i64,
    seed: u64,
    space: &SearchSpace,
) -> ForecastResult<Option<SearchOutcome>> {
    let Ok(n_trials) = usize::try_from(n_trials) else {
        return Ok(None);
    };
    if n_trials == 0 {
        return Ok(None);
    }

    info!(trials = n_trials, ?approach, "Starting hyperparameter search");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let candidates: Vec<HyperParams> = (0..n_trials).map(|_| space.sample(&mut rng, seed)).collect();

    let trials = candidates
        .into_par_iter()
        .enumerate()
        .map(|(number, params)| {
            let pred = solve(&params, &split.x_train, &split.y_train, &split.x_test, approach)?;
            let score = root_mean_squared_log_error(&split.y_test, &pred)?;
            debug!(trial = number, score, "Trial finished");
            Ok(TrialResult {
                number,
                params,
                score,
            })
        })
        .collect::<ForecastResult<Vec<_>>>()?;

    let Some(best) = best_trial(&trials) else {
        warn!(trials = trials.len(), "No trial produced a finite score");
        return Ok(None);
    };

    info!(best_score = best.score, trial = best.number, "Hyperparameter search finished");
    Ok(Some(SearchOutcome {
        best_score: best.score,
        best_params: best.params.clone(),
        trials,
    }))
}

/// Lowest finite score, earliest trial on ties.
fn best_trial(trials: &[TrialResult]) -> Option<&TrialResult> {
    trials
        .iter()
        .filter(|t| t.score.is_finite())
        .min_by(|a, b| a.score.total_cmp(&b.score).then(a.number.cmp(&b.number)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stock_forecast_core::{business_days_between, RowKey};
    use stock_forecast_features::{FeatureMatrix, TargetMatrix};

    use crate::split::split_data;

    fn small_space() -> SearchSpace {
        SearchSpace {
            n_estimators: (5, 20),
            n_estimators_step: 5,
            max_depth: (1, 3),
            ..SearchSpace::default()
        }
    }

    fn split() -> WalkForwardSplit {
        let days = business_days_between(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        );
        let mut keys = Vec::new();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (i, day) in days.iter().enumerate() {
            keys.push(RowKey::new(*day, "A"));
            #[allow(clippy::cast_precision_loss)]
            let v = 10.0 + i as f64;
            xs.push(vec![v]);
            ys.push(vec![Some(v + 1.0), Some(v + 2.0)]);
        }
        let x = FeatureMatrix::new(keys.clone(), vec!["close".into()], xs).unwrap();
        let y = TargetMatrix::new(
            keys,
            vec!["close_lead_1".into(), "close_lead_2".into()],
            ys,
        )
        .unwrap();
        split_data(&x, &y, 2).unwrap()
    }

    #[test]
    fn samples_stay_inside_the_space() {
        let space = SearchSpace::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let p = space.sample(&mut rng, 9);
            assert!((100..=1200).contains(&p.n_estimators));
            assert_eq!((p.n_estimators - 100) % 50, 0);
            assert!((3..=15).contains(&p.max_depth));
            assert!((0.01 - 1e-12..=0.3 + 1e-12).contains(&p.learning_rate));
            assert!((0.5..=1.0).contains(&p.subsample));
            assert!((1.0 - 1e-9..=100.0 + 1e-9).contains(&p.min_child_weight));
            assert_eq!(p.seed, 9);
        }
    }

    #[test]
    fn non_positive_trial_counts_skip_the_search() {
        let split = split();
        assert_eq!(
            optimize_with_hyperparameter_search(&split, ProblemApproach::Pooled, 0, 1).unwrap(),
            None
        );
        assert_eq!(
            optimize_with_hyperparameter_search(&split, ProblemApproach::Pooled, -3, 1).unwrap(),
            None
        );
    }

    #[test]
    fn best_trial_has_lowest_score_and_runs_are_reproducible() {
        let split = split();
        let a = search_in_space(&split, ProblemApproach::Pooled, 4, 7, &small_space())
            .unwrap()
            .unwrap();
        let b = search_in_space(&split, ProblemApproach::Pooled, 4, 7, &small_space())
            .unwrap()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.trials.len(), 4);
        assert!(a.trials.iter().all(|t| t.score >= a.best_score));
        assert!(a.best_score >= 0.0);
    }

    #[test]
    fn non_finite_scores_never_win() {
        let trial = |number, score| TrialResult {
            number,
            params: HyperParams::default(),
            score,
        };
        let trials = vec![trial(0, 0.4), trial(1, f64::NAN), trial(2, 0.4), trial(3, f64::INFINITY)];
        assert_eq!(best_trial(&trials).map(|t| t.number), Some(0));

        let degenerate = vec![trial(0, f64::NAN)];
        assert!(best_trial(&degenerate).is_none());
    }
}
