//! Errors raised by the accumulation and patching engine.

use accrete_data::{DatasetError, LayoutError};
use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Absent instances and degenerate alignments are not errors; they are
/// handled as no-ops and never reach this type.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Inconsistent input: mismatched channel counts or label arrays.
    #[error("malformed input: {0}")]
    Malformed(#[from] LayoutError),

    /// The dataset collaborator failed to load or save.
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PatchError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, PatchError::Malformed(_))
    }

    pub fn is_collaborator(&self) -> bool {
        matches!(self, PatchError::Dataset(_))
    }
}
