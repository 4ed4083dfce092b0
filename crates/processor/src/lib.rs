//! Dataflow pipe runtime for feedpipe
//!
//! This crate runs record transformations ("pipes") over streams of
//! [`Record`]s. Each pipe is written once, as core per-item or whole-stream
//! logic, and exposed in two equivalent execution forms: a lazy synchronous
//! iterator and an async future over the collected output.
//!
//! - [`conf`]: raw configuration descriptors and per-item resolution
//! - [`context`]: run-wide flags, named inputs and the run clock
//! - [`pipe`]: the dual-mode execution wrapper
//! - [`modules`]: the transformation library (`uniq`, `tail`,
//!   `datebuilder`, `rssitembuilder`)
//! - [`pipeline`]: linear chains of pipes

pub mod conf;
pub mod context;
pub mod error;
pub mod modules;
pub mod pipe;
pub mod pipeline;
pub mod telemetry;
pub mod window;

pub use conf::{ConfValue, RawConfiguration, ResolutionMode, ResolvedConfiguration, Resolver};
pub use context::{Context, Inputs};
pub use error::{
    ConfigurationError, ProcessorError, ResolutionError, Result as ProcessorResult,
    TransformationError,
};
pub use feedpipe_types::Record;
pub use pipe::{
    AsyncOutcome, CancelHandle, ErrorPolicy, ItemParser, ParserOutput, PassIf, Pipe, PipeIter,
    PipeKind, PipeStats, StreamParser, StreamState,
};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use window::TrailingWindow;
