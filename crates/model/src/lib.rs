//! Gradient-boosted multi-step close forecasting.
//!
//! [`split_data`] carves a leak-free walk-forward test window out of the
//! supervised matrices, [`solve`] fits chained boosters (pooled or per stock)
//! and [`execute_test_run`] / [`execute_real_run`] tie the whole pipeline
//! together.

pub mod chain;
pub mod gbm;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod solve;
pub mod split;
pub mod tree;

pub use chain::{ChainedRegressor, FittedChain};
pub use gbm::{FittedBooster, GradientBoostingRegressor};
pub use metrics::root_mean_squared_log_error;
pub use output::{convert_last_prediction_to_output, prediction_date};
pub use pipeline::{
    execute_real_run, execute_test_run, prepare, RealRunOutcome, RunSettings, TestRunOutcome,
};
pub use search::{
    optimize_with_hyperparameter_search, search_in_space, SearchOutcome, SearchSpace, TrialResult,
};
pub use solve::solve;
pub use split::{split_data, WalkForwardSplit};
pub use tree::{BinnedFeatures, RegressionTree, TreeParams, MAX_BINS};
