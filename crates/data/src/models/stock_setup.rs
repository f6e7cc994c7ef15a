//! Stock setup list: which companies are tracked, grouped by area.
//!
//! File format: a JSON object mapping area name to
//! `[{"company_name": ..., "stock_id": ...}]`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use stock_forecast_core::DataQualityWarning;

/// One tracked company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub company_name: String,
    /// Ticker symbol
    pub stock_id: String,
}

/// Area name to the companies tracked in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockSetup {
    pub areas: BTreeMap<String, Vec<StockEntry>>,
}

impl StockSetup {
    /// Reads a setup file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stock setup: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse stock setup: {}", path.display()))
    }

    /// Every stock id, areas in alphabetical order, duplicates included.
    pub fn stock_ids(&self) -> impl Iterator<Item = &str> {
        self.areas
            .values()
            .flatten()
            .map(|entry| entry.stock_id.as_str())
    }

    /// Stock ids that appear more than once, with their counts.
    #[must_use]
    pub fn duplicates(&self) -> Vec<DataQualityWarning> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for id in self.stock_ids() {
            *counts.entry(id).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(symbol, occurrences)| DataQualityWarning::DuplicateSymbol {
                symbol: symbol.to_string(),
                occurrences,
            })
            .collect()
    }

    /// Drops repeated stock ids, keeping the first occurrence, and reports
    /// each one as a warning.
    #[must_use]
    pub fn deduplicated(&self) -> (Self, Vec<DataQualityWarning>) {
        let warnings = self.duplicates();
        for warning in &warnings {
            warn!(%warning, "Duplicate stock in setup list");
        }

        let mut seen = std::collections::BTreeSet::new();
        let areas = self
            .areas
            .iter()
            .map(|(area, entries)| {
                let kept = entries
                    .iter()
                    .filter(|e| seen.insert(e.stock_id.clone()))
                    .cloned()
                    .collect();
                (area.clone(), kept)
            })
            .collect();
        (Self { areas }, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> StockSetup {
        serde_json::from_str(
            r#"{
                "Tech": [
                    {"company_name": "Alpha", "stock_id": "AAA"},
                    {"company_name": "Beta", "stock_id": "BBB"}
                ],
                "Bank": [
                    {"company_name": "Alpha again", "stock_id": "AAA"},
                    {"company_name": "Gamma", "stock_id": "CCC"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn duplicates_are_counted() {
        assert_eq!(
            setup().duplicates(),
            vec![DataQualityWarning::DuplicateSymbol {
                symbol: "AAA".to_string(),
                occurrences: 2
            }]
        );
    }

    #[test]
    fn deduplicated_keeps_first_occurrence() {
        let (clean, warnings) = setup().deduplicated();
        assert_eq!(warnings.len(), 1);
        assert!(clean.duplicates().is_empty());
        // Areas iterate alphabetically, so "Bank" comes first.
        assert!(clean.areas["Bank"].iter().any(|e| e.stock_id == "AAA"));
        assert!(clean.areas["Tech"].iter().all(|e| e.stock_id != "AAA"));
        assert_eq!(clean.stock_ids().count(), 3);
    }

    #[test]
    fn clean_setup_has_no_warnings() {
        let (clean, _) = setup().deduplicated();
        let (again, warnings) = clean.deduplicated();
        assert!(warnings.is_empty());
        assert_eq!(again, clean);
    }
}
