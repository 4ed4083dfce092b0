//! Synchronous execution form: a lazy, pull-driven iterator

use super::descriptor::PipeKind;
use super::engine::{PipeRun, PipeStats};
use crate::error::Result;
use feedpipe_types::Record;
use std::collections::VecDeque;
use tracing::debug;

/// Boxed fallible record iterator, the upstream of every sync stage
pub type RecordResults<'a> = Box<dyn Iterator<Item = Result<Record>> + Send + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Pulling,
    Draining,
    Done,
}

/// Lazy output of one pipe run.
///
/// Nothing is pulled from upstream until the first call to `next`, and each
/// call pulls only as many upstream items as it takes to produce one record.
/// Aggregators emit what they hold once upstream is exhausted.
///
/// The first error ends the iteration: it is yielded once, and `None`
/// follows. Dropping the iterator early releases the run without flushing.
pub struct PipeIter<'a> {
    run: PipeRun<'a>,
    upstream: RecordResults<'a>,
    pending: VecDeque<Record>,
    state: IterState,
}

impl<'a> PipeIter<'a> {
    pub(crate) fn new(run: PipeRun<'a>, upstream: RecordResults<'a>) -> Self {
        Self {
            run,
            upstream,
            pending: VecDeque::new(),
            state: IterState::Pulling,
        }
    }

    /// Role of the pipe in this run
    pub fn kind(&self) -> PipeKind {
        self.run.kind()
    }

    /// Counters so far
    pub fn stats(&self) -> PipeStats {
        self.run.stats()
    }

    /// Box into a fallible upstream for the next stage
    pub fn boxed(self) -> RecordResults<'a> {
        Box::new(self)
    }

    fn halt(&mut self) {
        self.state = IterState::Done;
        self.pending.clear();
        self.run.close();
    }
}

impl Iterator for PipeIter<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }

            match self.state {
                IterState::Pulling => {}
                IterState::Draining | IterState::Done => {
                    self.state = IterState::Done;
                    return None;
                }
            }

            match self.upstream.next() {
                Some(Ok(item)) => match self.run.feed(item) {
                    Ok(records) => self.pending.extend(records),
                    Err(err) => {
                        self.halt();
                        return Some(Err(err));
                    }
                },
                Some(Err(err)) => {
                    self.halt();
                    return Some(Err(err));
                }
                None => {
                    self.state = IterState::Draining;
                    match self.run.finish() {
                        Ok(records) => self.pending.extend(records),
                        Err(err) => {
                            self.halt();
                            return Some(Err(err));
                        }
                    }
                }
            }
        }
    }
}

impl std::iter::FusedIterator for PipeIter<'_> {}

impl Drop for PipeIter<'_> {
    fn drop(&mut self) {
        if self.state == IterState::Pulling {
            debug!(kind = %self.run.kind(), "consumer stopped pulling");
            self.run.close();
        }
    }
}
