use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid dataset {symbol}: {reason}")]
    Invalid { symbol: String, reason: String },

    #[error("Duplicate company symbol: {0}")]
    DuplicateSymbol(String),

    #[error("Unknown company symbol: {0}")]
    UnknownSymbol(String),

    #[error("No company datasets available")]
    Empty,
}

pub type DatasetResult<T> = Result<T, DatasetError>;
