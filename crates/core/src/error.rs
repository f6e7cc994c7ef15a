//! Error and warning types shared across the forecasting pipeline.
//!
//! Hard failures stop the current run and surface as [`ForecastError`].
//! Data-quality problems that the pipeline can work around are reported as
//! [`DataQualityWarning`] values next to the successful result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Caller-supplied parameters or tables are malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A column required by the operation is absent from the table.
    #[error("missing required column: {column}")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// A value lies outside the domain of a mathematical operation.
    #[error("domain error: {0}")]
    Domain(String),

    /// The data is well-formed but too short or sparse for the request.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// An external collaborator (file system, storage) failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ForecastError {
    /// Shorthand for [`ForecastError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for [`ForecastError::MissingColumn`].
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Shorthand for [`ForecastError::InsufficientData`].
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }
}

/// Result alias used by the pipeline crates.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Non-fatal data-quality findings. The run continues with an adjusted parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQualityWarning {
    /// The requested lookback start predates the first date on which every
    /// entity has complete data; the later date was used instead.
    LookbackClamped {
        /// Start date derived from the requested lookback.
        requested: NaiveDate,
        /// Start date actually used.
        used: NaiveDate,
    },
    /// A stock identifier appears more than once in the stock list.
    DuplicateSymbol {
        /// The repeated identifier.
        symbol: String,
        /// How many times it appeared.
        occurrences: usize,
    },
    /// More than one bar was supplied for the same (date, symbol); the last one was kept.
    DuplicateBar {
        /// Trading date of the duplicate.
        date: NaiveDate,
        /// Stock identifier of the duplicate.
        symbol: String,
    },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LookbackClamped { requested, used } => write!(
                f,
                "lookback start {requested} predates complete data for all stocks, using {used}"
            ),
            Self::DuplicateSymbol {
                symbol,
                occurrences,
            } => write!(f, "stock {symbol} listed {occurrences} times"),
            Self::DuplicateBar { date, symbol } => {
                write!(f, "duplicate bar for {symbol} on {date}, keeping the last one")
            }
        }
    }
}
