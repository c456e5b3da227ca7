//! Error types for the command line front end.

use accrete_core::PatchError;
use accrete_data::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can end an `accrete` invocation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Patch(#[from] PatchError),

    #[error("{0}")]
    Dataset(#[from] DatasetError),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid --step value: must be at least 1")]
    ZeroStep,

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
