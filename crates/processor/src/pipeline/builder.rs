//! Pipeline builder for fluent API configuration
//!
//! A pipeline is a linear chain of pipes: the output of each stage is the
//! input of the next. The first stage may run as a source.

use crate::context::Context;
use crate::error::{ProcessorError, Result};
use crate::modules;
use crate::pipe::{CancelHandle, Pipe, PipeStats, RecordResults};
use feedpipe_types::Record;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Descriptive settings of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name for identification
    pub name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-pipeline".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProcessorError::InvalidPipeline {
                reason: "pipeline name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for linear pipelines
///
/// # Example
///
/// ```rust
/// use feedpipe_processor::pipeline::PipelineBuilder;
/// use feedpipe_processor::Context;
/// use feedpipe_types::json;
///
/// # fn example() -> feedpipe_processor::ProcessorResult<()> {
/// let pipeline = PipelineBuilder::new()
///     .with_name("latest-items")
///     .with_stage("rssitembuilder", json!({"title": "heading", "guid": "id"}))
///     .with_stage("uniq", json!({"field": "y:id"}))
///     .with_stage("tail", json!({"count": 10}))
///     .build()?;
///
/// let ctx = Context::new();
/// let items = pipeline.list(Vec::new(), &ctx)?;
/// assert!(items.is_empty());
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    stages: Vec<Pipe>,
    error: Option<ProcessorError>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            stages: Vec::new(),
            error: None,
        }
    }

    /// Set the pipeline name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Append an already configured pipe
    pub fn with_pipe(mut self, pipe: Pipe) -> Self {
        self.stages.push(pipe);
        self
    }

    /// Append a registered pipe by name, configured from JSON.
    ///
    /// Lookup and configuration errors are reported by [`build`](Self::build).
    pub fn with_stage(mut self, name: &str, conf: Value) -> Self {
        if self.error.is_none() {
            match modules::build(name, conf) {
                Ok(pipe) => self.stages.push(pipe),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    ///
    /// Returns the first stage error, or an error if the configuration is
    /// invalid or no stage was added.
    pub fn build(self) -> Result<Pipeline> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.config.validate()?;
        if self.stages.is_empty() {
            return Err(ProcessorError::InvalidPipeline {
                reason: format!("pipeline '{}' has no stages", self.config.name),
            });
        }

        debug!(pipeline = %self.config.name, stages = self.stages.len(), "pipeline built");
        Ok(Pipeline {
            config: Arc::new(self.config),
            stages: self.stages,
        })
    }
}

/// Result of an async pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Records leaving the last stage
    pub records: Vec<Record>,

    /// Counters per stage that ran, in stage order
    pub stages: Vec<PipeStats>,

    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

/// A configured linear pipeline
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    stages: Vec<Pipe>,
}

impl Pipeline {
    /// Get the pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the pipeline name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn stages(&self) -> &[Pipe] {
        &self.stages
    }

    /// Chain every stage over `input`, lazily.
    ///
    /// Every stage validates its configuration here, before anything is
    /// pulled.
    pub fn run<'a, I>(&'a self, input: I, ctx: &'a Context) -> Result<RecordResults<'a>>
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: Send + 'a,
    {
        let upstream: RecordResults<'a> =
            Box::new(input.into_iter().map(Ok::<Record, ProcessorError>));
        self.chain(upstream, &self.stages, ctx)
    }

    /// Run the first stage as a source and chain the rest, lazily
    pub fn run_source<'a>(&'a self, ctx: &'a Context) -> Result<RecordResults<'a>> {
        let (first, rest) = self.split_first()?;
        let upstream = first.run_source(ctx)?.boxed();
        self.chain(upstream, rest, ctx)
    }

    /// Run over `input` and collect the output
    pub fn list<'a, I>(&'a self, input: I, ctx: &'a Context) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: Send + 'a,
    {
        self.run(input, ctx)?.collect()
    }

    /// Async run over `input`, resolving to the output of the last stage
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

    /// Async run with full control.
    ///
    /// Stages run one after another, each over the collected output of the
    /// previous one, all observing the same cancellation handle. Without
    /// input the first stage runs as a source.
    pub async fn execute_async<'a>(
        &'a self,
        input: Option<BoxStream<'a, Result<Record>>>,
        ctx: &'a Context,
        cancel: &CancelHandle,
    ) -> Result<PipelineOutcome> {
        let mut first_input = input;
        let mut stats = Vec::with_capacity(self.stages.len());
        let mut records = Vec::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let upstream = if index == 0 {
                first_input.take()
            } else {
                Some(
                    stream::iter(std::mem::take(&mut records))
                        .map(Ok::<Record, ProcessorError>)
                        .boxed(),
                )
            };

            let outcome = stage.execute_async(upstream, ctx, cancel).await?;
            stats.push(outcome.stats);
            records = outcome.records;

            if outcome.cancelled {
                info!(pipeline = %self.name(), stage = %stage.name(), "pipeline cancelled");
                return Ok(PipelineOutcome {
                    records,
                    stages: stats,
                    cancelled: true,
                });
            }
        }

        Ok(PipelineOutcome {
            records,
            stages: stats,
            cancelled: false,
        })
    }

    fn split_first(&self) -> Result<(&Pipe, &[Pipe])> {
        self.stages
            .split_first()
            .ok_or_else(|| ProcessorError::InvalidPipeline {
                reason: format!("pipeline '{}' has no stages", self.name()),
            })
    }

    fn chain<'a>(
        &'a self,
        mut upstream: RecordResults<'a>,
        stages: &'a [Pipe],
        ctx: &'a Context,
    ) -> Result<RecordResults<'a>> {
        for stage in stages {
            upstream = stage.run_results(upstream, ctx)?.boxed();
        }
        Ok(upstream)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stages", &self.stages.iter().map(Pipe::name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn xs(n: i64) -> Vec<Record> {
        (0..n)
            .map(|x| Record::from_value(json!({"x": x, "parity": x % 2})).unwrap())
            .collect()
    }

    #[test]
    fn test_builder_default_name() {
        let pipeline = PipelineBuilder::new()
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap();
        assert_eq!(pipeline.name(), "unnamed-pipeline");
        assert_eq!(pipeline.stages().len(), 1);
    }

    #[test]
    fn test_builder_name_and_stage_order() {
        let pipeline = PipelineBuilder::new()
            .with_name("test")
            .with_stage("uniq", json!({"field": "id"}))
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap();

        assert_eq!(pipeline.name(), "test");
        assert_eq!(pipeline.config().name, "test");
        let names: Vec<&str> = pipeline.stages().iter().map(Pipe::name).collect();
        assert_eq!(names, vec!["uniq", "tail"]);

        let err = PipelineBuilder::new()
            .with_name("  ")
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidPipeline { .. }));
    }

    #[test]
    fn test_builder_rejects_empty_and_unknown() {
        let err = PipelineBuilder::new().build().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidPipeline { .. }));

        let err = PipelineBuilder::new()
            .with_stage("nope", json!({}))
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProcessorError::UnknownPipe { .. }));

        let err = PipelineBuilder::new()
            .with_name("  ")
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidPipeline { .. }));
    }

    #[test]
    fn test_stages_chain_in_order() {
        let pipeline = PipelineBuilder::new()
            .with_stage("uniq", json!({"field": "parity"}))
            .with_stage("tail", json!({"count": 1}))
            .build()
            .unwrap();

        let ctx = Context::new();
        let out = pipeline.list(xs(6), &ctx).unwrap();
        assert_eq!(out, vec![xs(2)[1].clone()]);
    }

    #[test]
    fn test_configuration_error_surfaces_before_pulling() {
        let pipeline = PipelineBuilder::new()
            .with_stage("uniq", json!({"field": "parity"}))
            .with_stage("tail", json!({"count": -3}))
            .build()
            .unwrap();

        let ctx = Context::new();
        let err = pipeline.run(xs(3), &ctx).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_async_pipeline_matches_sync() {
        let pipeline = PipelineBuilder::new()
            .with_stage("datebuilder", json!({"date": "tomorrow"}))
            .with_stage("uniq", json!({"field": "parity"}))
            .build()
            .unwrap();

        let ctx = Context::new();
        let sync = pipeline.list(xs(5), &ctx).unwrap();
        let async_out = pipeline.run_async(stream::iter(xs(5)), &ctx).await.unwrap();
        assert_eq!(sync, async_out);
        assert_eq!(sync.len(), 2);
    }
}
