//! Linear pipelines
//!
//! Chains configured pipes so the output of each stage feeds the next, in
//! either execution form:
//! - [`Pipeline::run`] / [`Pipeline::run_source`]: nested lazy iterators,
//!   nothing runs until the consumer pulls
//! - [`Pipeline::execute_async`]: stages run in order as futures sharing one
//!   [`CancelHandle`](crate::pipe::CancelHandle)
//!
//! # Example
//!
//! ```rust,no_run
//! use feedpipe_processor::pipeline::PipelineBuilder;
//! use feedpipe_processor::Context;
//! use feedpipe_types::json;
//!
//! # async fn example() -> feedpipe_processor::ProcessorResult<()> {
//! let pipeline = PipelineBuilder::new()
//!     .with_name("dated-items")
//!     .with_stage("datebuilder", json!({"date": {"subkey": "when"}}))
//!     .with_stage("tail", json!({"count": 5}))
//!     .build()?;
//!
//! let ctx = Context::new();
//! let _items = pipeline.run_async(futures::stream::iter(Vec::new()), &ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;

pub use builder::{Pipeline, PipelineBuilder, PipelineConfig, PipelineOutcome};
