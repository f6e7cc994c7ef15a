//! Feature engineering for daily stock panels.
//!
//! Tables are polars frames keyed by (date, symbol). The pipeline runs leaf first:
//! [`clean_data`] puts every stock on a shared business-day grid,
//! [`engineer_features`] adds calendar categoricals plus grouped lags and
//! rolling means, and [`process_data`] turns the result into aligned model
//! inputs and multi-step targets.

pub mod cleaner;
pub mod encoding;
pub mod engineering;
pub mod group_ops;
pub mod matrix;
pub mod standardize;
pub mod supervised;
pub mod table;

pub use cleaner::{clean_data, CleanedPanel};
pub use encoding::{label_encode, one_hot};
pub use engineering::{engineer_features, DerivedFeature, CLOSE};
pub use group_ops::{make_moving_window_in_groups, make_shift_in_groups, Aggregator, MovingWindow};
pub use matrix::{FeatureMatrix, KeyedMatrix, TargetMatrix};
pub use standardize::{standardize_in_groups, Scale, ScaleLookup};
pub use supervised::{
    first_all_valid_date, process_data, symbols_missing_on, target_columns, SupervisedData,
    EXCLUDED_COLUMNS,
};
pub use table::{ColumnData, FeatureTable, DATE, SYMBOL};
