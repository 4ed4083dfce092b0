//! Error types for the record model

use thiserror::Error;

/// Result type alias for record operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised while building records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record must be a JSON object, got {actual}")]
    NotAnObject { actual: String },
}
