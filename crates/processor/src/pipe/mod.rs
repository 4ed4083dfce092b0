//! Dual-mode pipe execution
//!
//! A [`Pipe`] wraps one transformation's core logic (an [`ItemParser`] or a
//! [`StreamParser`]) together with its raw configuration, and exposes it in
//! two equivalent forms:
//!
//! ```text
//!   sync:   Iterator<Record> ──► Pipe::run ──► PipeIter (lazy Iterator<Result<Record>>)
//!   async:  Stream<Record>   ──► Pipe::run_async ──► Future<Vec<Record>>
//! ```
//!
//! For the same input, configuration and context both forms produce the same
//! records in the same order. The per-item work lives in a single engine so
//! the two cannot drift apart.
//!
//! A pipe's role is fixed per run: a per-item parser with input is an
//! operator, without input a source; a stream parser is always an
//! aggregator.

pub mod async_exec;
pub mod descriptor;
pub mod engine;
pub mod parser;
pub mod skip;
pub mod sync_iter;

pub use async_exec::{AsyncOutcome, CancelHandle};
pub use descriptor::{ErrorPolicy, PipeDescriptor, PipeKind, PipeOptions, SourceMode};
pub use engine::{record_key, PipeStats};
pub use parser::{FnParser, ItemParser, ParserOutput, StreamParser, StreamState};
pub use skip::PassIf;
pub use sync_iter::{PipeIter, RecordResults};

use crate::conf::RawConfiguration;
use crate::context::{Context, Inputs};
use crate::error::{ProcessorError, Result};
use engine::PipeRun;
use feedpipe_types::Record;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Core logic of a pipe
#[derive(Clone)]
pub enum Parser {
    Item(Arc<dyn ItemParser>),
    Stream(Arc<dyn StreamParser>),
}

impl Parser {
    pub fn descriptor(&self) -> &PipeDescriptor {
        match self {
            Parser::Item(parser) => parser.descriptor(),
            Parser::Stream(parser) => parser.descriptor(),
        }
    }

    pub fn defaults(&self, ctx: &Context) -> RawConfiguration {
        match self {
            Parser::Item(parser) => parser.defaults(ctx),
            Parser::Stream(parser) => parser.defaults(ctx),
        }
    }
}

/// A configured transformation, runnable synchronously or asynchronously
#[derive(Clone)]
pub struct Pipe {
    parser: Parser,
    conf: RawConfiguration,
    pass_if: Option<PassIf>,
    emit: bool,
    assign: String,
    error_policy: ErrorPolicy,
}

impl Pipe {
    /// Wrap per-item logic
    pub fn item<P: ItemParser + 'static>(parser: P) -> Self {
        Self::from_parser(Parser::Item(Arc::new(parser)))
    }

    /// Wrap whole-stream logic
    pub fn stream<P: StreamParser + 'static>(parser: P) -> Self {
        Self::from_parser(Parser::Stream(Arc::new(parser)))
    }

    pub fn from_parser(parser: Parser) -> Self {
        let options = parser.descriptor().options.clone();
        Self {
            parser,
            conf: RawConfiguration::new(),
            pass_if: None,
            emit: options.emit,
            assign: options.assign.to_string(),
            error_policy: options.error_policy,
        }
    }

    pub fn with_conf(mut self, conf: RawConfiguration) -> Self {
        self.conf = conf;
        self
    }

    /// Parse and set configuration from its JSON form
    pub fn with_json_conf(self, conf: Value) -> Result<Self> {
        let raw = RawConfiguration::from_json(conf).map_err(|source| {
            ProcessorError::Configuration {
                pipe: self.name().to_string(),
                source,
            }
        })?;
        Ok(self.with_conf(raw))
    }

    pub fn with_pass_if(mut self, pass_if: PassIf) -> Self {
        self.pass_if = Some(pass_if);
        self
    }

    pub fn with_emit(mut self, emit: bool) -> Self {
        self.emit = emit;
        self
    }

    pub fn with_assign(mut self, field: impl Into<String>) -> Self {
        self.assign = field.into();
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.parser.descriptor().name
    }

    pub fn descriptor(&self) -> &PipeDescriptor {
        self.parser.descriptor()
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn conf(&self) -> &RawConfiguration {
        &self.conf
    }

    pub fn pass_if(&self) -> Option<&PassIf> {
        self.pass_if.as_ref()
    }

    pub fn emits(&self) -> bool {
        self.emit
    }

    pub fn assign(&self) -> &str {
        &self.assign
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Role this pipe plays when run with or without input
    pub fn kind(&self, has_input: bool) -> PipeKind {
        match (&self.parser, has_input) {
            (Parser::Stream(_), _) => PipeKind::Aggregator,
            (Parser::Item(_), true) => PipeKind::Operator,
            (Parser::Item(_), false) => PipeKind::Source,
        }
    }

    /// Whether a source run of this pipe never ends on its own
    pub fn is_unbounded_source(&self) -> bool {
        matches!(self.parser, Parser::Item(_))
            && self.descriptor().options.source_mode == SourceMode::Forever
    }

    /// Run over `input`, returning a lazy iterator.
    ///
    /// Configuration errors are returned here, before any item is pulled.
    pub fn run<'a, I>(&'a self, input: I, ctx: &'a Context) -> Result<PipeIter<'a>>
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: Send + 'a,
    {
        let input = input.into_iter().map(Ok::<Record, ProcessorError>);
        self.run_results(Box::new(input), ctx)
    }

    /// Run over a fallible upstream; an upstream error ends the run
    pub fn run_results<'a>(
        &'a self,
        input: RecordResults<'a>,
        ctx: &'a Context,
    ) -> Result<PipeIter<'a>> {
        let run = PipeRun::start(self, Cow::Borrowed(ctx), true)?;
        Ok(PipeIter::new(run, input))
    }

    /// Run without input, as a source
    pub fn run_source<'a>(&'a self, ctx: &'a Context) -> Result<PipeIter<'a>> {
        let run = PipeRun::start(self, Cow::Borrowed(ctx), false)?;
        Ok(PipeIter::new(run, self.source_upstream()))
    }

    fn source_upstream(&self) -> RecordResults<'static> {
        Box::new(engine::source_items(self).map(Ok::<Record, ProcessorError>))
    }

    /// Run with per-invocation named inputs layered over the context's
    pub fn invoke<'a>(
        &'a self,
        input: Option<RecordResults<'a>>,
        ctx: &Context,
        extra: &Inputs,
    ) -> Result<PipeIter<'a>> {
        let scoped = Cow::Owned(ctx.scoped(extra));
        match input {
            Some(input) => Ok(PipeIter::new(PipeRun::start(self, scoped, true)?, input)),
            None => {
                let run = PipeRun::start(self, scoped, false)?;
                Ok(PipeIter::new(run, self.source_upstream()))
            }
        }
    }

    /// Run over an async stream, resolving to every record produced
    pub async fn run_async<'a, S>(&'a self, input: S, ctx: &'a Context) -> Result<Vec<Record>>
    where
        S: Stream<Item = Record> + Send + 'a,
    {
        let input = input.map(Ok::<Record, ProcessorError>).boxed();
        let outcome = self
            .execute_async(Some(input), ctx, &CancelHandle::new())
            .await?;
        Ok(outcome.records)
    }

    /// Run as a source, resolving to every record produced.
    ///
    /// An unbounded source only resolves once cancelled; use
    /// [`Pipe::execute_async`] with a [`CancelHandle`] for those.
    pub async fn run_source_async(&self, ctx: &Context) -> Result<Vec<Record>> {
        let outcome = self.execute_async(None, ctx, &CancelHandle::new()).await?;
        Ok(outcome.records)
    }

    /// Async run with full control: optional fallible upstream and a
    /// cancellation handle
    pub async fn execute_async<'a>(
        &'a self,
        input: Option<BoxStream<'a, Result<Record>>>,
        ctx: &'a Context,
        cancel: &CancelHandle,
    ) -> Result<AsyncOutcome> {
        let has_input = input.is_some();
        let run = PipeRun::start(self, Cow::Borrowed(ctx), has_input)?;
        let upstream = match input {
            Some(input) => input,
            None => {
                if self.is_unbounded_source() {
                    warn!(
                        pipe = %self.name(),
                        "unbounded source run asynchronously, resolves only on cancel"
                    );
                }
                stream::iter(self.source_upstream()).boxed()
            }
        };
        async_exec::drive(run, upstream, cancel).await
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("name", &self.name())
            .field("conf", &self.conf)
            .field("pass_if", &self.pass_if)
            .field("emit", &self.emit)
            .field("assign", &self.assign)
            .field("error_policy", &self.error_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformationError;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn upper() -> Pipe {
        Pipe::item(FnParser::new(
            PipeDescriptor::named("upper", PipeOptions::new().assign("title")),
            |item, _, _| match item.get("title") {
                Some(Value::String(s)) => Ok(ParserOutput::Value(json!(s.to_uppercase()))),
                _ => Err(TransformationError::InvalidValue {
                    field: "title".to_string(),
                    reason: "not a string".to_string(),
                }),
            },
        ))
    }

    fn items() -> Vec<Record> {
        vec![
            record(json!({"title": "a"})),
            record(json!({"title": 1})),
            record(json!({"title": "c"})),
        ]
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let ctx = Context::new();
        let pipe = upper();
        let out: Vec<_> = pipe.run(items(), &ctx).unwrap().collect();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().get("title"), Some(&json!("A")));
        let err = out[1].as_ref().unwrap_err();
        assert_eq!(err.record(), Some(&record(json!({"title": 1}))));
    }

    #[test]
    fn test_best_effort_drops_failing_items() {
        let ctx = Context::new();
        let pipe = upper().with_error_policy(ErrorPolicy::BestEffort);
        let mut iter = pipe.run(items(), &ctx).unwrap();
        let out: Vec<Record> = iter.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].get("title"), Some(&json!("C")));
        assert_eq!(iter.stats().failed, 1);
    }

    #[test]
    fn test_pass_if_passes_item_through() {
        let ctx = Context::new();
        let pipe =
            upper().with_pass_if(PassIf::predicate(|r, _| r.get("title") == Some(&json!(1))));
        let out: Vec<Record> = pipe.run(items(), &ctx).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(out[1], record(json!({"title": 1})));
        assert_eq!(out[2].get("title"), Some(&json!("C")));
    }

    #[test]
    fn test_sync_run_is_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let input = std::iter::repeat_with(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            record(json!({"title": "x"}))
        });

        let ctx = Context::new();
        let pipe = upper();
        let mut iter = pipe.run(input, &ctx).unwrap();
        assert_eq!(pulled.load(Ordering::Relaxed), 0);

        let first: Vec<_> = iter.by_ref().take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(pulled.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_invoke_layers_extra_inputs() {
        let ctx = Context::new().with_input("suffix", json!("-base"));
        let pipe = Pipe::item(FnParser::new(
            PipeDescriptor::named("suffix", PipeOptions::new().assign("out")),
            |_, conf, _| {
                let suffix = conf.get("suffix").cloned().unwrap_or(Value::Null);
                Ok(ParserOutput::Value(suffix))
            },
        ))
        .with_conf(RawConfiguration::new().terminal("suffix", "suffix"));

        let mut extra = Inputs::new();
        extra.insert("suffix".to_string(), json!("-extra"));

        let out: Vec<Record> = pipe
            .invoke(None, &ctx, &extra)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![record(json!({"out": "-extra"}))]);
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let ctx = Context::new();
        let pipe = upper().with_error_policy(ErrorPolicy::BestEffort);

        let sync: Vec<Record> = pipe.run(items(), &ctx).unwrap().collect::<Result<_>>().unwrap();
        let async_out = pipe.run_async(stream::iter(items()), &ctx).await.unwrap();
        assert_eq!(sync, async_out);
    }

    #[tokio::test]
    async fn test_async_reports_first_error() {
        let ctx = Context::new();
        let err = upper().run_async(stream::iter(items()), &ctx).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Transformation { .. }));
    }
}
