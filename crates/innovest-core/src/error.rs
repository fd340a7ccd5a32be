use std::path::PathBuf;

use thiserror::Error;

use crate::engine::ScenarioName;

/// Rejection of an input record before estimation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("unknown {field} value: {value:?}")]
    Unknown { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum CoefficientError {
    #[error("coefficient table `{table}` has no entry for {key}")]
    Incomplete { table: &'static str, key: String },

    #[error("coefficient table `{table}` has out-of-range value {value} for {key}")]
    OutOfRange {
        table: &'static str,
        key: String,
        value: f64,
    },

    #[error("reading coefficient file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing coefficient tables: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural contract violations in a calculation result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("{0} scenario not found")]
    MissingScenario(ScenarioName),
}
