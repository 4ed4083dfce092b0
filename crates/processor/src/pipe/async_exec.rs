//! Asynchronous execution form: a future resolving to the collected output

use super::engine::{PipeRun, PipeStats};
use crate::error::Result;
use feedpipe_types::Record;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cooperative cancellation flag shared between a run and its caller.
///
/// Checked at every item boundary; a cancelled run stops pulling, skips any
/// pending aggregator flush and resolves with what it produced so far.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Result of an async pipe run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsyncOutcome {
    /// Records produced, in order
    pub records: Vec<Record>,

    /// Counters for the run
    pub stats: PipeStats,

    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

/// Drive a run to completion (or cancellation) over an async upstream.
///
/// Yields to the scheduler every `yield_every` items so long or unbounded
/// runs do not starve other tasks on the same executor.
pub(crate) async fn drive(
    mut run: PipeRun<'_>,
    mut upstream: BoxStream<'_, Result<Record>>,
    cancel: &CancelHandle,
) -> Result<AsyncOutcome> {
    let yield_every = run.ctx().yield_every();
    let mut records = Vec::new();
    let mut processed = 0usize;
    let mut cancelled = false;

    loop {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let item = match upstream.next().await {
            Some(Ok(item)) => item,
            Some(Err(err)) => {
                run.close();
                return Err(err);
            }
            None => break,
        };

        // Cancellation may land while the upstream is suspended
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        records.extend(run.feed(item)?);
        processed += 1;
        if processed % yield_every == 0 {
            tokio::task::yield_now().await;
        }
    }

    if cancelled {
        run.close();
        info!(
            kind = %run.kind(),
            produced = records.len(),
            "pipe run cancelled"
        );
    } else {
        records.extend(run.finish()?);
        debug!(kind = %run.kind(), produced = records.len(), "async pipe run complete");
    }

    Ok(AsyncOutcome {
        records,
        stats: run.stats(),
        cancelled,
    })
}
