//! Error types for the KOI disposition service

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, KoiError>;

/// Why an input could not be read as a tabular dataset.
///
/// Inspected by kind at the boundary layer to pick a user-facing message;
/// never matched on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadableKind {
    /// A workbook reader rejected the bytes as structurally invalid
    CorruptBinary,
    /// No supported character encoding could decode the bytes
    UndecodableBytes,
    /// The content is not tabular in any supported format
    NotTabular,
}

impl std::fmt::Display for UnreadableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreadableKind::CorruptBinary => write!(f, "corrupt binary"),
            UnreadableKind::UndecodableBytes => write!(f, "undecodable bytes"),
            UnreadableKind::NotTabular => write!(f, "not tabular"),
        }
    }
}

/// Main error type for the KOI pipeline
#[derive(Error, Debug)]
pub enum KoiError {
    #[error("unreadable input ({kind}): {detail}")]
    UnreadableFormat {
        kind: UnreadableKind,
        detail: String,
    },

    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("prediction failed: {0}")]
    PredictionFailure(String),

    #[error("data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl KoiError {
    /// Shorthand for an [`KoiError::UnreadableFormat`] with a formatted detail
    pub fn unreadable(kind: UnreadableKind, detail: impl Into<String>) -> Self {
        KoiError::UnreadableFormat {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<polars::error::PolarsError> for KoiError {
    fn from(err: polars::error::PolarsError) -> Self {
        KoiError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for KoiError {
    fn from(err: serde_json::Error) -> Self {
        KoiError::SerializationError(err.to_string())
    }
}
