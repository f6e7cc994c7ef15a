//! Persistence models for the forecasting pipeline.
//!
//! Every persisted entity has an explicit serde struct with a fixed field
//! list. Dates serialize as ISO `YYYY-MM-DD`.

pub mod generation;
pub mod prediction;
pub mod stock_setup;
pub mod test_run;

pub use generation::GenerationRecord;
pub use prediction::PredictionRecord;
pub use stock_setup::{StockEntry, StockSetup};
pub use test_run::TestRunRecord;
