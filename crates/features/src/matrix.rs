//! Row-keyed dense matrices used as model inputs and targets.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use stock_forecast_core::{ForecastError, ForecastResult, RowKey};

/// A matrix whose rows are identified by (date, symbol) keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedMatrix<T> {
    keys: Vec<RowKey>,
    columns: Vec<String>,
    rows: Vec<Vec<T>>,
}

/// Model inputs: no missing values.
pub type FeatureMatrix = KeyedMatrix<f64>;

/// Forecast targets: leads are missing near the end of each series.
pub type TargetMatrix = KeyedMatrix<Option<f64>>;

impl<T: Clone> KeyedMatrix<T> {
    /// Builds a matrix, checking that every row has one value per column.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] on any shape mismatch.
    pub fn new(keys: Vec<RowKey>, columns: Vec<String>, rows: Vec<Vec<T>>) -> ForecastResult<Self> {
        if keys.len() != rows.len() {
            return Err(ForecastError::invalid(format!(
                "{} keys for {} rows",
                keys.len(),
                rows.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(ForecastError::invalid(format!(
                "row {bad} has {} values, expected {}",
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self {
            keys,
            columns,
            rows,
        })
    }

    #[must_use]
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            keys: Vec::new(),
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<T>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, i: usize) -> &[T] {
        &self.rows[i]
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of column `j`, top to bottom.
    #[must_use]
    pub fn column_values(&self, j: usize) -> Vec<T> {
        self.rows.iter().map(|r| r[j].clone()).collect()
    }

    /// New matrix with the given rows, in the given order.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Keeps rows whose key satisfies `predicate`, preserving order.
    #[must_use]
    pub fn filter_keys(&self, predicate: impl Fn(&RowKey) -> bool) -> Self {
        let indices: Vec<usize> = (0..self.n_rows())
            .filter(|&i| predicate(&self.keys[i]))
            .collect();
        self.take(&indices)
    }

    /// Rows belonging to one symbol.
    #[must_use]
    pub fn for_symbol(&self, symbol: &str) -> Self {
        self.filter_keys(|k| k.symbol == symbol)
    }

    /// Rows dated within `[start, end]`.
    #[must_use]
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter_keys(|k| k.date >= start && k.date <= end)
    }

    /// Copy sorted by (date, symbol).
    #[must_use]
    pub fn sorted_by_key(&self) -> Self {
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by(|&a, &b| self.keys[a].cmp(&self.keys[b]));
        self.take(&order)
    }

    /// Distinct dates, ascending.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.keys
            .iter()
            .map(|k| k.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.keys.iter().map(|k| k.date).max()
    }

    /// Distinct symbols, ascending.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|k| k.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Stacks matrices with identical columns.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if column lists differ.
    pub fn concat(columns: Vec<String>, parts: Vec<Self>) -> ForecastResult<Self> {
        let mut out = Self::empty(columns);
        for part in parts {
            if part.columns != out.columns {
                return Err(ForecastError::invalid(
                    "cannot concatenate matrices with different columns",
                ));
            }
            out.keys.extend(part.keys);
            out.rows.extend(part.rows);
        }
        Ok(out)
    }

    /// Fails unless `other` has exactly the same row keys in the same order.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] on the first mismatch.
    pub fn ensure_aligned<U>(&self, other: &KeyedMatrix<U>) -> ForecastResult<()> {
        if self.keys != other.keys {
            return Err(ForecastError::invalid(format!(
                "matrices are not row-aligned ({} vs {} rows)",
                self.n_rows(),
                other.keys.len()
            )));
        }
        Ok(())
    }
}

impl FeatureMatrix {
    /// Clamps every value to at least `min`.
    #[must_use]
    pub fn clip_min(mut self, min: f64) -> Self {
        for row in &mut self.rows {
            for v in row.iter_mut() {
                *v = v.max(min);
            }
        }
        self
    }

    /// Cell-wise mean of two aligned matrices.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if keys or columns differ.
    pub fn average(&self, other: &Self) -> ForecastResult<Self> {
        self.ensure_aligned(other)?;
        if self.columns != other.columns {
            return Err(ForecastError::invalid("cannot average matrices with different columns"));
        }
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect())
            .collect();
        Ok(Self {
            keys: self.keys.clone(),
            columns: self.columns.clone(),
            rows,
        })
    }
}

impl TargetMatrix {
    /// True when every target in row `i` is defined.
    #[must_use]
    pub fn is_complete(&self, i: usize) -> bool {
        self.rows[i].iter().all(Option::is_some)
    }

    /// Indices of rows with every target defined.
    #[must_use]
    pub fn complete_rows(&self) -> Vec<usize> {
        (0..self.n_rows()).filter(|&i| self.is_complete(i)).collect()
    }

    /// Converts to a dense matrix.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidInput`] if any target is missing.
    pub fn to_dense(&self) -> ForecastResult<FeatureMatrix> {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter().copied().collect::<Option<Vec<f64>>>().ok_or_else(|| {
                    let k = &self.keys[i];
                    ForecastError::invalid(format!(
                        "missing target for ({}, {})",
                        k.date, k.symbol
                    ))
                })
            })
            .collect::<ForecastResult<Vec<_>>>()?;
        FeatureMatrix::new(self.keys.clone(), self.columns.clone(), rows)
    }
}

impl From<FeatureMatrix> for TargetMatrix {
    fn from(m: FeatureMatrix) -> Self {
        Self {
            keys: m.keys,
            columns: m.columns,
            rows: m
                .rows
                .into_iter()
                .map(|r| r.into_iter().map(Some).collect())
                .collect(),
        }
    }
}
