//! Publishing finished forecasts to a store.
//!
//! Publishing is an idempotent upsert: generations are keyed by
//! (`prediction_date`, `name`) and predictions by (`date`, `name`), so
//! re-publishing the same run overwrites instead of duplicating.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{GenerationRecord, PredictionRecord};

/// Counts from one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub inserted: usize,
    pub updated: usize,
}

pub trait ForecastPublisher: Send + Sync {
    /// Stores one generation and its predictions.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written. Nothing is
    /// partially applied on error.
    fn publish(
        &mut self,
        generation: &GenerationRecord,
        predictions: &[PredictionRecord],
    ) -> Result<PublishSummary>;

    fn name(&self) -> &str;
}

/// Contents of a [`JsonFilePublisher`] store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastStore {
    pub generations: Vec<GenerationRecord>,
    pub predictions: Vec<PredictionRecord>,
}

impl ForecastStore {
    fn upsert_generation(&mut self, record: &GenerationRecord, summary: &mut PublishSummary) {
        match self.generations.iter_mut().find(|g| g.key() == record.key()) {
            Some(existing) => {
                *existing = record.clone();
                summary.updated += 1;
            }
            None => {
                self.generations.push(record.clone());
                summary.inserted += 1;
            }
        }
    }

    fn upsert_prediction(&mut self, record: &PredictionRecord, summary: &mut PublishSummary) {
        match self.predictions.iter_mut().find(|p| p.key() == record.key()) {
            Some(existing) => {
                *existing = record.clone();
                summary.updated += 1;
            }
            None => {
                self.predictions.push(record.clone());
                summary.inserted += 1;
            }
        }
    }
}

/// Publisher backed by one JSON file. The file is rewritten atomically
/// through a temporary sibling.
pub struct JsonFilePublisher {
    path: PathBuf,
}

impl JsonFilePublisher {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the store. A missing file is an empty store.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(&self) -> Result<ForecastStore> {
        if !self.path.exists() {
            return Ok(ForecastStore::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse store: {}", self.path.display()))
    }

    fn save(&self, store: &ForecastStore) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(store)?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write store: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store: {}", self.path.display()))
    }
}

impl ForecastPublisher for JsonFilePublisher {
    fn publish(
        &mut self,
        generation: &GenerationRecord,
        predictions: &[PredictionRecord],
    ) -> Result<PublishSummary> {
        let mut store = self.load()?;
        let mut summary = PublishSummary::default();

        store.upsert_generation(generation, &mut summary);
        for prediction in predictions {
            store.upsert_prediction(prediction, &mut summary);
        }
        store
            .predictions
            .sort_by(|a, b| a.key().cmp(&b.key()));

        self.save(&store)?;
        info!(
            store = %self.path.display(),
            generation = %generation.name,
            prediction_date = %generation.prediction_date,
            inserted = summary.inserted,
            updated = summary.updated,
            "Published forecast"
        );
        Ok(summary)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
