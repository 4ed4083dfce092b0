//! Static pipe descriptors: name and execution options

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Role a pipe plays in a particular run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeKind {
    /// Originates records (a per-item pipe run without input)
    Source,
    /// Transforms one record at a time
    Operator,
    /// Owns state across the whole stream
    Aggregator,
}

impl fmt::Display for PipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipeKind::Source => "source",
            PipeKind::Operator => "operator",
            PipeKind::Aggregator => "aggregator",
        };
        f.write_str(name)
    }
}

/// How often a per-item pipe fires when run without input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Invoke the parser once
    Once,
    /// Invoke the parser for as long as the consumer pulls
    Forever,
}

/// What a per-item failure does to the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report the error and end the stream
    #[default]
    FailFast,
    /// Log and count the failure, drop the item and continue
    BestEffort,
}

/// Execution options declared by a pipe kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeOptions {
    /// Splice parser results into the output instead of assigning them
    /// into the input record
    pub emit: bool,

    /// Field that receives the parser result when `emit` is off (and bare
    /// scalar results when it is on)
    pub assign: &'static str,

    /// Behavior when run without input
    pub source_mode: SourceMode,

    /// Per-item failure handling (aggregators always fail fast)
    pub error_policy: ErrorPolicy,

    /// Configuration fields that must be present
    pub required: &'static [&'static str],
}

impl PipeOptions {
    pub const fn new() -> Self {
        Self {
            emit: false,
            assign: "content",
            source_mode: SourceMode::Once,
            error_policy: ErrorPolicy::FailFast,
            required: &[],
        }
    }

    pub const fn emit(mut self, emit: bool) -> Self {
        self.emit = emit;
        self
    }

    pub const fn assign(mut self, field: &'static str) -> Self {
        self.assign = field;
        self
    }

    pub const fn source_mode(mut self, mode: SourceMode) -> Self {
        self.source_mode = mode;
        self
    }

    pub const fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub const fn required(mut self, fields: &'static [&'static str]) -> Self {
        self.required = fields;
        self
    }
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Name and options of a pipe kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeDescriptor {
    pub name: Cow<'static, str>,
    pub options: PipeOptions,
}

impl PipeDescriptor {
    pub const fn new(name: &'static str, options: PipeOptions) -> Self {
        Self {
            name: Cow::Borrowed(name),
            options,
        }
    }

    /// Descriptor with a runtime name, for caller-defined parsers
    pub fn named(name: impl Into<String>, options: PipeOptions) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            options,
        }
    }
}
