//! Categorical encoders.
//!
//! Levels are sorted before encoding: numeric columns in numeric order,
//! text columns lexically. Null inputs stay null in every output column.

use std::collections::BTreeSet;

use crate::table::ColumnData;

/// Distinct sorted levels and each row's level index.
struct Factorized {
    names: Vec<String>,
    codes: Vec<Option<usize>>,
}

#[allow(clippy::cast_possible_truncation)]
fn level_name(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn factorize(data: &ColumnData) -> Factorized {
    match data {
        ColumnData::Numeric(values) => {
            let mut levels: Vec<f64> = values.iter().flatten().copied().collect();
            levels.sort_by(f64::total_cmp);
            levels.dedup_by(|a, b| a.total_cmp(b).is_eq());
            let codes = values
                .iter()
                .map(|v| v.and_then(|v| levels.binary_search_by(|l| l.total_cmp(&v)).ok()))
                .collect();
            Factorized {
                names: levels.into_iter().map(level_name).collect(),
                codes,
            }
        }
        ColumnData::Categorical(values) => {
            let levels: Vec<&str> = values
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let codes = values
                .iter()
                .map(|v| v.as_deref().and_then(|v| levels.binary_search(&v).ok()))
                .collect();
            Factorized {
                names: levels.into_iter().map(str::to_string).collect(),
                codes,
            }
        }
    }
}

/// Indicator columns `{name}_{level}` for every level except the first.
#[must_use]
pub fn one_hot(name: &str, data: &ColumnData) -> Vec<(String, Vec<Option<f64>>)> {
    let factorized = factorize(data);
    factorized
        .names
        .iter()
        .enumerate()
        .skip(1)
        .map(|(level, level_name)| {
            let values = factorized
                .codes
                .iter()
                .map(|code| code.map(|c| if c == level { 1.0 } else { 0.0 }))
                .collect();
            (format!("{name}_{level_name}"), values)
        })
        .collect()
}

/// Replaces each value with the index of its level.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn label_encode(data: &ColumnData) -> Vec<Option<f64>> {
    factorize(data)
        .codes
        .into_iter()
        .map(|code| code.map(|c| c as f64))
        .collect()
}
