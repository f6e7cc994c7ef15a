pub mod calendar;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod hyper_params;
pub mod params;
pub mod types;

pub use calendar::{
    business_days_between, is_business_day, most_recent_working_date, nth_previous_working_date,
};
pub use config::{AppConfig, DataConfig, RunConfig};
pub use config_loader::ConfigLoader;
pub use error::{DataQualityWarning, ForecastError, ForecastResult};
pub use hyper_params::HyperParams;
pub use params::{broadcast, non_zero_offsets, OneOrMany};
pub use types::{DailyBar, ForecastRow, Panel, ProblemApproach, RowKey};
