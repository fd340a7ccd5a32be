use std::path::PathBuf;

use thiserror::Error;

/// A per-file import failure. These are collected into the import report and
/// never abort a batch.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("parsing JSON in {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{name}: expected a JSON array of objects")]
    NotAnArray { name: String },

    #[error("{name}: no contents to parse")]
    MissingContents { name: String },
}
