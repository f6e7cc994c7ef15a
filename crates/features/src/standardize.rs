//! Per-stock standardization with an explicit scale lookup.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stock_forecast_core::ForecastResult;

use crate::table::{FeatureTable, FrameResultExt, SYMBOL};

/// Mean and standard deviation used to scale one column of one stock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub mean: f64,
    /// Population standard deviation; 1.0 when the column is constant.
    pub std: f64,
}

impl Scale {
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    #[must_use]
    pub fn invert(&self, scaled: f64) -> f64 {
        scaled * self.std + self.mean
    }

}

/// Scales per (symbol, column), returned alongside standardized data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleLookup {
    scales: BTreeMap<String, BTreeMap<String, Scale>>,
}

impl ScaleLookup {
    #[must_use]
    pub fn get(&self, symbol: &str, column: &str) -> Option<&Scale> {
        self.scales.get(symbol)?.get(column)
    }

    /// Maps a standardized value back to original units.
    #[must_use]
    pub fn invert(&self, symbol: &str, column: &str, scaled: f64) -> Option<f64> {
        self.get(symbol, column).map(|s| s.invert(scaled))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.scales.keys().map(String::as_str)
    }
}

/// Standardizes `columns` to zero mean and unit variance within each stock.
///
/// Nulls are ignored when fitting and stay null. The input is not modified.
///
/// # Errors
/// [`stock_forecast_core::ForecastError::MissingColumn`] or `InvalidInput` if a
/// column is absent or not numeric.
pub fn standardize_in_groups(
    table: &FeatureTable,
    columns: &[&str],
) -> ForecastResult<(FeatureTable, ScaleLookup)> {
    let mut lookup = ScaleLookup::default();
    if columns.is_empty() {
        return Ok((table.clone(), lookup));
    }

    let mut scaled = Vec::with_capacity(columns.len());
    let mut fitted = Vec::with_capacity(columns.len() * 2);
    for &column in columns {
        table.require_numeric(column)?;
        let value = col(column).cast(DataType::Float64);
        let mean = value.clone().mean();
        let spread = value.clone().std(0);
        let std = when(spread.clone().gt(lit(0.0)))
            .then(spread)
            .otherwise(lit(1.0));

        scaled.push(
            ((value - mean.clone()) / std.clone())
                .over([col(SYMBOL)])
                .alias(column),
        );
        fitted.push(mean.alias(format!("{column}:mean")));
        fitted.push(std.alias(format!("{column}:std")));
    }

    let stats = table
        .lazy()
        .group_by([col(SYMBOL)])
        .agg(fitted)
        .collect()
        .into_forecast()?;
    let symbols = stats.column(SYMBOL).into_forecast()?.str().into_forecast()?;
    for &column in columns {
        let means = stats
            .column(&format!("{column}:mean"))
            .into_forecast()?
            .f64()
            .into_forecast()?;
        let stds = stats
            .column(&format!("{column}:std"))
            .into_forecast()?
            .f64()
            .into_forecast()?;
        for (i, symbol) in symbols.into_iter().enumerate() {
            // All-null groups have no scale.
            if let (Some(symbol), Some(mean), Some(std)) = (symbol, means.get(i), stds.get(i)) {
                lookup
                    .scales
                    .entry(symbol.to_string())
                    .or_default()
                    .insert(column.to_string(), Scale { mean, std });
            }
        }
    }

    let table = FeatureTable::from_lazy(table.lazy().with_columns(scaled))?;
    Ok((table, lookup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{table_from_columns, ColumnData};
    use chrono::NaiveDate;
    use stock_forecast_core::RowKey;

    fn table() -> FeatureTable {
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        table_from_columns(
            &[
                RowKey::new(d(20), "A"),
                RowKey::new(d(20), "B"),
                RowKey::new(d(21), "A"),
                RowKey::new(d(21), "B"),
            ],
            vec![(
                "close",
                ColumnData::Numeric(vec![Some(10.0), Some(5.0), Some(20.0), Some(5.0)]),
            )],
        )
    }

    fn close_enough(got: &[Option<f64>], expected: &[f64]) -> bool {
        got.len() == expected.len()
            && got
                .iter()
                .zip(expected)
                .all(|(g, e)| g.is_some_and(|g| (g - e).abs() < 1e-9))
    }

    #[test]
    fn each_stock_gets_its_own_scale() {
        let (scaled, lookup) = standardize_in_groups(&table(), &["close"]).unwrap();

        assert!(close_enough(
            &scaled.numeric("close").unwrap(),
            &[-1.0, 0.0, 1.0, 0.0]
        ));
        let a = lookup.get("A", "close").unwrap();
        assert!((a.mean - 15.0).abs() < 1e-9 && (a.std - 5.0).abs() < 1e-9);
        assert!((a.apply(20.0) - 1.0).abs() < 1e-9);
        // Constant series keeps unit scale.
        assert_eq!(lookup.get("B", "close"), Some(&Scale { mean: 5.0, std: 1.0 }));
        assert_eq!(lookup.symbols().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn invert_restores_original_units() {
        let original = table();
        let (scaled, lookup) = standardize_in_groups(&original, &["close"]).unwrap();

        for (i, key) in scaled.keys().unwrap().iter().enumerate() {
            let v = scaled.numeric("close").unwrap()[i].unwrap();
            let restored = lookup.invert(&key.symbol, "close", v).unwrap();
            assert!((restored - original.numeric("close").unwrap()[i].unwrap()).abs() < 1e-12);
        }
    }

    #[test]
    fn input_is_untouched_and_missing_columns_fail() {
        let original = table();
        let _ = standardize_in_groups(&original, &["close"]).unwrap();
        assert_eq!(original.numeric("close").unwrap()[0], Some(10.0));
        assert!(standardize_in_groups(&original, &["volume"]).is_err());
    }
}
