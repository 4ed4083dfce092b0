//! Error types for the pipe engine
//!
//! Errors are layered the way they surface:
//! - [`ConfigurationError`]: a pipe's configuration is missing a required field
//!   or holds a value of the wrong type. Fatal before any item is processed.
//! - [`ResolutionError`]: a reference descriptor points nowhere (strict
//!   resolution only).
//! - [`TransformationError`]: a parser failed for one item.
//! - [`ProcessorError`]: what callers see, tagged with the pipe and item.

use crate::pipe::PipeKind;
use feedpipe_config::ConfigError;
use feedpipe_types::Record;
use thiserror::Error;

/// Main processor error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Invalid pipe configuration, raised before any item is processed
    #[error("configuration error in pipe '{pipe}': {source}")]
    Configuration {
        pipe: String,
        #[source]
        source: ConfigurationError,
    },

    /// A reference could not be resolved for one item
    #[error("resolution error in {kind} pipe '{pipe}' for item {key}: {source}")]
    Resolution {
        pipe: String,
        kind: PipeKind,
        key: String,
        #[source]
        source: ResolutionError,
    },

    /// A parser failed for one item
    #[error("transformation error in {kind} pipe '{pipe}' for item {key}: {source}")]
    Transformation {
        pipe: String,
        kind: PipeKind,
        key: String,
        record: Box<Record>,
        #[source]
        source: TransformationError,
    },

    /// No pipe is registered under this name
    #[error("unknown pipe: {name}")]
    UnknownPipe { name: String },

    /// A pipeline could not be assembled
    #[error("invalid pipeline: {reason}")]
    InvalidPipeline { reason: String },

    /// Logging could not be initialized
    #[error("telemetry error: {reason}")]
    Telemetry { reason: String },

    /// Runtime configuration errors
    #[error("runtime configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic error for unexpected conditions
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ProcessorError {
    /// Name of the pipe the error belongs to, if any
    pub fn pipe(&self) -> Option<&str> {
        match self {
            Self::Configuration { pipe, .. }
            | Self::Resolution { pipe, .. }
            | Self::Transformation { pipe, .. } => Some(pipe),
            _ => None,
        }
    }

    /// The record that failed, for per-item errors
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Transformation { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Whether this error was raised before any item was processed
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Pipe configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A field the pipe declares mandatory is absent
    #[error("missing required field '{field}'")]
    MissingRequiredField { field: String },

    /// A field holds a value that cannot be coerced to the expected type
    #[error("invalid type for field '{field}': expected {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// A field holds a value of the right type but an unusable value
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A raw configuration was built from something other than an object
    #[error("configuration must be an object, got {actual}")]
    NotAnObject { actual: String },
}

/// Reference resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// The reference for `field` resolved to nothing and has no fallback
    #[error("field '{field}' references {reference}, which does not resolve")]
    Unresolved { field: String, reference: String },
}

/// Per-item parser errors
#[derive(Error, Debug)]
pub enum TransformationError {
    /// A date expression matched no keyword, offset or format
    #[error("unrecognized date expression '{expression}'")]
    UnrecognizedDate { expression: String },

    /// A resolved field holds an unusable value for this item
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Item-level configuration could not be coerced
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failure raised by a caller-supplied parser
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Result type alias for configuration handling
pub type ConfigurationResult<T> = std::result::Result<T, ConfigurationError>;

/// Result type alias for parsers
pub type TransformationResult<T> = std::result::Result<T, TransformationError>;

impl From<serde_json::Error> for ProcessorError {
    fn from(err: serde_json::Error) -> Self {
        ProcessorError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ProcessorError {
    fn from(err: anyhow::Error) -> Self {
        ProcessorError::Unexpected(err.to_string())
    }
}
