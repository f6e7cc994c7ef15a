//! Generation data model.
//!
//! One generation is one real run: the settings it used and the date the
//! forecast was made on. Keyed by (`prediction_date`, `name`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stock_forecast_model::RunSettings;

/// Metadata stored once per published forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Business day the forecast was made on
    pub prediction_date: NaiveDate,
    /// Run name, e.g. "default_multi_approach"
    pub name: String,
    /// When the record was created
    pub created_timestamp: DateTime<Utc>,
    pub categorical_features: Vec<String>,
    pub label_features: Vec<String>,
    pub shift_list: Vec<i64>,
    /// Moving-window sizes
    pub window_list: Vec<i64>,
    /// `None` when all valid history was used
    pub days_back_to_consider: Option<usize>,
    pub n_steps: usize,
    pub hyper_params: BTreeMap<String, f64>,
}

impl GenerationRecord {
    /// Creates a record from the settings of a finished run.
    #[must_use]
    pub fn from_run(prediction_date: NaiveDate, settings: &RunSettings) -> Self {
        Self {
            prediction_date,
            name: settings.name.clone(),
            created_timestamp: Utc::now(),
            categorical_features: settings.categorical_features.clone(),
            label_features: settings.label_features.clone(),
            shift_list: settings.shift_list.clone(),
            window_list: settings.window_list.clone(),
            days_back_to_consider: settings.days_back_to_consider,
            n_steps: settings.n_steps,
            hyper_params: settings.hyper_params.to_map(),
        }
    }

    /// Builder method to pin the creation time.
    #[must_use]
    pub fn with_created_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_timestamp = timestamp;
        self
    }

    /// Upsert key.
    #[must_use]
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.prediction_date, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_run_copies_settings() {
        let settings = RunSettings::default();
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let record = GenerationRecord::from_run(date, &settings);

        assert_eq!(record.key(), (date, "default"));
        assert_eq!(record.n_steps, 15);
        assert_eq!(record.window_list, vec![5, 10, 15]);
        assert_eq!(record.hyper_params["max_depth"], 6.0);
    }

    #[test]
    fn json_uses_explicit_field_names() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let record = GenerationRecord::from_run(date, &RunSettings::default());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["prediction_date"], "2024-05-02");
        assert_eq!(json["days_back_to_consider"], 756);
        let back: GenerationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
