//! Parser traits implemented by transformations
//!
//! A transformation supplies only its core logic; the engine in
//! [`super::engine`] handles configuration, skipping, emission and both
//! execution forms around it.
//! - [`ItemParser`]: a pure function of one record and its resolved
//!   configuration. Runs as an operator, or as a source when given no input.
//! - [`StreamParser`]: opens a [`StreamState`] that folds over the whole
//!   stream and may emit on every step or only at the end.

use super::descriptor::PipeDescriptor;
use crate::conf::{RawConfiguration, ResolvedConfiguration};
use crate::context::Context;
use crate::error::{ConfigurationResult, TransformationResult};
use feedpipe_types::Record;
use serde_json::Value;
use std::sync::Arc;

/// Result of one [`ItemParser::parse`] call
#[derive(Debug, Clone, PartialEq)]
pub enum ParserOutput {
    /// A bare value
    Value(Value),
    /// One whole record
    Record(Record),
    /// Several records, emitted in order
    Records(Vec<Record>),
}

impl From<Value> for ParserOutput {
    fn from(value: Value) -> Self {
        ParserOutput::Value(value)
    }
}

impl From<Record> for ParserOutput {
    fn from(record: Record) -> Self {
        ParserOutput::Record(record)
    }
}

impl From<Vec<Record>> for ParserOutput {
    fn from(records: Vec<Record>) -> Self {
        ParserOutput::Records(records)
    }
}

/// Per-item transformation logic
pub trait ItemParser: Send + Sync {
    /// Name and execution options
    fn descriptor(&self) -> &PipeDescriptor;

    /// Defaults merged beneath the caller's configuration.
    ///
    /// May depend on the context (for example on the run clock).
    fn defaults(&self, _ctx: &Context) -> RawConfiguration {
        RawConfiguration::new()
    }

    /// Transform one item
    ///
    /// # Arguments
    /// * `item` - The current record (an empty record when run as a source)
    /// * `conf` - Configuration resolved against `item`
    /// * `ctx` - The run context
    fn parse(
        &self,
        item: &Record,
        conf: &ResolvedConfiguration,
        ctx: &Context,
    ) -> TransformationResult<ParserOutput>;
}

/// Whole-stream transformation logic
pub trait StreamParser: Send + Sync {
    /// Name and execution options
    fn descriptor(&self) -> &PipeDescriptor;

    /// Defaults merged beneath the caller's configuration
    fn defaults(&self, _ctx: &Context) -> RawConfiguration {
        RawConfiguration::new()
    }

    /// Validate item-independent configuration and create the fold state.
    ///
    /// `conf` is resolved once against an empty record. Errors here are fatal
    /// before any item is consumed.
    fn open(
        &self,
        conf: &ResolvedConfiguration,
        ctx: &Context,
    ) -> ConfigurationResult<Box<dyn StreamState>>;
}

/// Mutable state of one stream parser run
pub trait StreamState: Send {
    /// Consume one item, returning anything ready to emit now
    ///
    /// # Arguments
    /// * `item` - The current record
    /// * `conf` - Configuration resolved against `item`
    fn step(
        &mut self,
        item: &Record,
        conf: &ResolvedConfiguration,
    ) -> TransformationResult<Vec<Record>>;

    /// Called once after the last item; returns what is left to emit
    fn flush(&mut self) -> TransformationResult<Vec<Record>> {
        Ok(Vec::new())
    }
}

type ParseFn =
    dyn Fn(&Record, &ResolvedConfiguration, &Context) -> TransformationResult<ParserOutput>
        + Send
        + Sync;

/// [`ItemParser`] backed by a closure
#[derive(Clone)]
pub struct FnParser {
    descriptor: PipeDescriptor,
    parse: Arc<ParseFn>,
}

impl FnParser {
    pub fn new<F>(descriptor: PipeDescriptor, parse: F) -> Self
    where
        F: Fn(&Record, &ResolvedConfiguration, &Context) -> TransformationResult<ParserOutput>
            + Send
            + Sync
            + 'static,
    {
        Self {
            descriptor,
            parse: Arc::new(parse),
        }
    }
}

impl std::fmt::Debug for FnParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnParser")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl ItemParser for FnParser {
    fn descriptor(&self) -> &PipeDescriptor {
        &self.descriptor
    }

    fn parse(
        &self,
        item: &Record,
        conf: &ResolvedConfiguration,
        ctx: &Context,
    ) -> TransformationResult<ParserOutput> {
        (self.parse)(item, conf, ctx)
    }
}
