//! One pipe run, shared by both execution forms
//!
//! [`PipeRun`] owns everything that happens between "an item arrived" and
//! "these records leave": configuration resolution, the skip condition, the
//! parser call, the emit/assign policy, error policy and statistics. The
//! synchronous iterator and the async driver only decide where items come
//! from and when to stop pulling, so both forms produce identical output.

use super::descriptor::{ErrorPolicy, PipeKind, SourceMode};
use super::parser::{ItemParser, ParserOutput, StreamState};
use super::{Parser, Pipe};
use crate::conf::{RawConfiguration, ResolvedConfiguration, Resolver};
use crate::context::Context;
use crate::error::{ConfigurationError, ProcessorError, Result, TransformationError};
use feedpipe_types::Record;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, error, info, trace, warn};

/// Fields tried, in order, when naming an item in logs and errors
const KEY_FIELDS: [&str; 5] = ["guid", "id", "y:id", "link", "title"];

/// Longest rendering used for records without a key field
const MAX_KEY_LEN: usize = 64;

/// Counters for one pipe run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipeStats {
    /// Items pulled from upstream
    pub items_in: u64,

    /// Records emitted downstream
    pub items_out: u64,

    /// Items passed through by the skip condition
    pub skipped: u64,

    /// Items that failed resolution or parsing
    pub failed: u64,
}

impl PipeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_items_in(&mut self) {
        self.items_in += 1;
    }

    pub fn add_items_out(&mut self, count: usize) {
        self.items_out += count as u64;
    }

    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn inc_failed(&mut self) {
        self.failed += 1;
    }
}

enum RunMode<'a> {
    Item(&'a dyn ItemParser),
    Stream(Box<dyn StreamState>),
    /// Stream pipe whose skip condition held at start
    Bypass,
    Closed,
}

enum Step {
    Emitted(Vec<Record>),
    Skipped(Record),
}

pub(crate) struct PipeRun<'a> {
    pipe: &'a Pipe,
    ctx: Cow<'a, Context>,
    raw: RawConfiguration,
    resolver: Resolver,
    kind: PipeKind,
    mode: RunMode<'a>,
    stats: PipeStats,
}

impl<'a> PipeRun<'a> {
    /// Validate configuration and prepare a run.
    ///
    /// Stream parsers are opened here, so every configuration error surfaces
    /// before the first item is pulled.
    pub(crate) fn start(pipe: &'a Pipe, ctx: Cow<'a, Context>, has_input: bool) -> Result<Self> {
        let defaults = pipe.parser().defaults(&ctx);
        let raw = pipe.conf().merged_over(&defaults);

        for field in pipe.descriptor().options.required {
            if !raw.contains(field) {
                return Err(ProcessorError::Configuration {
                    pipe: pipe.name().to_string(),
                    source: ConfigurationError::MissingRequiredField {
                        field: field.to_string(),
                    },
                });
            }
        }

        let resolver = Resolver::for_context(&ctx);
        let kind = pipe.kind(has_input);

        let mode = match pipe.parser() {
            Parser::Item(parser) => RunMode::Item(parser.as_ref()),
            Parser::Stream(parser) => {
                let empty = Record::new();
                if pipe.pass_if().map_or(false, |cond| cond.evaluate(&empty, &ctx)) {
                    debug!(pipe = %pipe.name(), "skip condition holds, passing stream through");
                    RunMode::Bypass
                } else {
                    let conf = resolver.resolve(&raw, &empty, &ctx).map_err(|source| {
                        ProcessorError::Resolution {
                            pipe: pipe.name().to_string(),
                            kind,
                            key: "<configuration>".to_string(),
                            source,
                        }
                    })?;
                    let state = parser.open(&conf, &ctx).map_err(|source| {
                        ProcessorError::Configuration {
                            pipe: pipe.name().to_string(),
                            source,
                        }
                    })?;
                    RunMode::Stream(state)
                }
            }
        };

        info!(
            pipe = %pipe.name(),
            kind = %kind,
            run_id = %ctx.run_id(),
            "pipe run started"
        );

        Ok(Self {
            pipe,
            ctx,
            raw,
            resolver,
            kind,
            mode,
            stats: PipeStats::new(),
        })
    }

    pub(crate) fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn kind(&self) -> PipeKind {
        self.kind
    }

    pub(crate) fn stats(&self) -> PipeStats {
        self.stats
    }

    /// Process one upstream item.
    ///
    /// Under the best-effort policy a failing item yields no records instead
    /// of an error.
    pub(crate) fn feed(&mut self, item: Record) -> Result<Vec<Record>> {
        self.stats.inc_items_in();
        let outcome = self.process(item);
        self.settle(outcome)
    }

    /// Signal end of input; returns whatever a stream parser still holds
    pub(crate) fn finish(&mut self) -> Result<Vec<Record>> {
        let flushed = match &mut self.mode {
            RunMode::Stream(state) => state.flush(),
            _ => Ok(Vec::new()),
        };
        self.mode = RunMode::Closed;

        match flushed {
            Ok(records) => {
                self.stats.add_items_out(records.len());
                info!(
                    pipe = %self.pipe.name(),
                    kind = %self.kind,
                    items_in = self.stats.items_in,
                    items_out = self.stats.items_out,
                    skipped = self.stats.skipped,
                    failed = self.stats.failed,
                    "pipe run finished"
                );
                Ok(records)
            }
            Err(source) => {
                self.stats.inc_failed();
                let err = item_failure(self.pipe, self.kind, Record::new(), source);
                error!(pipe = %self.pipe.name(), error = %err, "pipe failed to flush");
                Err(err)
            }
        }
    }

    /// Stop without flushing, releasing any stream state
    pub(crate) fn close(&mut self) {
        if !matches!(self.mode, RunMode::Closed) {
            self.mode = RunMode::Closed;
            debug!(
                pipe = %self.pipe.name(),
                items_in = self.stats.items_in,
                "pipe run closed before end of input"
            );
        }
    }

    fn error_policy(&self) -> ErrorPolicy {
        match self.kind {
            PipeKind::Aggregator => ErrorPolicy::FailFast,
            _ => self.pipe.error_policy(),
        }
    }

    fn process(&mut self, item: Record) -> Result<Step> {
        match self.mode {
            RunMode::Bypass => return Ok(Step::Skipped(item)),
            RunMode::Closed => return Ok(Step::Emitted(Vec::new())),
            _ => {}
        }

        let conf = match self.resolver.resolve(&self.raw, &item, &self.ctx) {
            Ok(conf) => conf,
            Err(source) => {
                return Err(ProcessorError::Resolution {
                    pipe: self.pipe.name().to_string(),
                    kind: self.kind,
                    key: record_key(&item),
                    source,
                })
            }
        };
        self.trace_item(&item, &conf);

        let pipe = self.pipe;
        let kind = self.kind;
        match &mut self.mode {
            RunMode::Item(parser) => {
                let parser: &dyn ItemParser = *parser;
                if pipe.pass_if().map_or(false, |cond| cond.evaluate(&item, &self.ctx)) {
                    return Ok(Step::Skipped(item));
                }
                match parser.parse(&item, &conf, &self.ctx) {
                    Ok(output) => Ok(Step::Emitted(emit_output(pipe, &item, output))),
                    Err(source) => Err(item_failure(pipe, kind, item, source)),
                }
            }
            RunMode::Stream(state) => match state.step(&item, &conf) {
                Ok(records) => Ok(Step::Emitted(records)),
                Err(source) => Err(item_failure(pipe, kind, item, source)),
            },
            RunMode::Bypass => Ok(Step::Skipped(item)),
            RunMode::Closed => Ok(Step::Emitted(Vec::new())),
        }
    }

    fn settle(&mut self, outcome: Result<Step>) -> Result<Vec<Record>> {
        match outcome {
            Ok(Step::Emitted(records)) => {
                self.stats.add_items_out(records.len());
                Ok(records)
            }
            Ok(Step::Skipped(item)) => {
                self.stats.inc_skipped();
                self.stats.add_items_out(1);
                Ok(vec![item])
            }
            Err(err) => {
                self.stats.inc_failed();
                if self.error_policy() == ErrorPolicy::BestEffort {
                    warn!(
                        pipe = %self.pipe.name(),
                        kind = %self.kind,
                        error = %err,
                        "dropping item after failure"
                    );
                    Ok(Vec::new())
                } else {
                    error!(
                        pipe = %self.pipe.name(),
                        kind = %self.kind,
                        error = %err,
                        "pipe run failed"
                    );
                    self.mode = RunMode::Closed;
                    Err(err)
                }
            }
        }
    }

    fn trace_item(&self, item: &Record, conf: &ResolvedConfiguration) {
        if self.ctx.is_verbose() {
            debug!(
                pipe = %self.pipe.name(),
                key = %record_key(item),
                conf = ?conf,
                "processing item"
            );
        } else {
            trace!(pipe = %self.pipe.name(), key = %record_key(item), "processing item");
        }
    }
}

/// Apply the pipe's emit/assign policy to a parser result
pub(crate) fn emit_output(pipe: &Pipe, item: &Record, output: ParserOutput) -> Vec<Record> {
    if pipe.emits() {
        return match output {
            ParserOutput::Records(records) => records,
            ParserOutput::Record(record) => vec![record],
            ParserOutput::Value(Value::Object(map)) => vec![Record::from(map)],
            ParserOutput::Value(value) => vec![Record::new().with_path(pipe.assign(), value)],
        };
    }

    let value = match output {
        ParserOutput::Value(value) => value,
        ParserOutput::Record(record) => record.into_value(),
        ParserOutput::Records(records) => {
            Value::Array(records.into_iter().map(Record::into_value).collect())
        }
    };
    vec![item.with_path(pipe.assign(), value)]
}

/// Synthetic upstream for a pipe run without input
pub(crate) fn source_items(pipe: &Pipe) -> Box<dyn Iterator<Item = Record> + Send> {
    match pipe.parser() {
        Parser::Item(parser) => match parser.descriptor().options.source_mode {
            SourceMode::Once => Box::new(std::iter::once(Record::new())),
            SourceMode::Forever => Box::new(std::iter::repeat_with(Record::new)),
        },
        Parser::Stream(_) => Box::new(std::iter::empty()),
    }
}

fn item_failure(
    pipe: &Pipe,
    kind: PipeKind,
    item: Record,
    source: TransformationError,
) -> ProcessorError {
    ProcessorError::Transformation {
        pipe: pipe.name().to_string(),
        kind,
        key: record_key(&item),
        record: Box::new(item),
        source,
    }
}

/// Short identifier for a record in logs and errors
pub fn record_key(record: &Record) -> String {
    for field in KEY_FIELDS {
        match record.get_path(field) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }

    let rendered = record.to_string();
    if rendered.chars().count() <= MAX_KEY_LEN {
        rendered
    } else {
        let mut short: String = rendered.chars().take(MAX_KEY_LEN).collect();
        short.push_str("...");
        short
    }
}
