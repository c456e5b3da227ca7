//! Error types for point cloud layout and dataset access.

use std::path::PathBuf;
use thiserror::Error;

/// Structural problems with in-memory point data.
///
/// These are contract violations by whoever assembled the data, not I/O failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("point clouds need at least 3 channels (x, y, z), got {0}")]
    TooFewChannels(usize),

    #[error("flat buffer of {len} values is not a multiple of {channels} channels")]
    RaggedBuffer { len: usize, channels: usize },

    #[error("channel mismatch: expected {expected}, found {found}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("segment labels ({segments}) do not match point count ({points})")]
    SegmentLengthMismatch { points: usize, segments: usize },

    #[error("pose matrix contains non-finite values")]
    NonFinitePose,

    #[error("pose matrix is not an invertible rigid transform")]
    DegeneratePose,
}

/// Failures raised by a dataset collaborator while loading or saving frames.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PLY parsing error in {path}: {message}")]
    Ply { path: PathBuf, message: String },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("scene not found: {0}")]
    SceneNotFound(String),

    #[error("frame not found: {scene}/{frame}")]
    FrameNotFound { scene: String, frame: String },

    #[error("malformed frame data: {0}")]
    Layout(#[from] LayoutError),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }
}
