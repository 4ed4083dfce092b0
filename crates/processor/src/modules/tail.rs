//! Trailing window truncation

use crate::conf::ResolvedConfiguration;
use crate::context::Context;
use crate::error::{ConfigurationError, ConfigurationResult, TransformationResult};
use crate::pipe::{PipeDescriptor, PipeOptions, StreamParser, StreamState};
use crate::window::TrailingWindow;
use feedpipe_types::Record;
use std::mem;

static DESCRIPTOR: PipeDescriptor =
    PipeDescriptor::new("tail", PipeOptions::new().required(&["count"]));

/// Emits the last `count` records of the stream, in input order, once the
/// stream is exhausted.
///
/// At most `count` records are held at any time. `count` of 0 yields nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tail;

impl StreamParser for Tail {
    fn descriptor(&self) -> &PipeDescriptor {
        &DESCRIPTOR
    }

    fn open(
        &self,
        conf: &ResolvedConfiguration,
        _ctx: &Context,
    ) -> ConfigurationResult<Box<dyn StreamState>> {
        let count = conf.non_negative_int("count")?;
        let capacity = usize::try_from(count).map_err(|_| ConfigurationError::InvalidValue {
            field: "count".to_string(),
            reason: format!("{} exceeds the addressable window size", count),
        })?;

        Ok(Box::new(TailState {
            window: TrailingWindow::new(capacity),
        }))
    }
}

struct TailState {
    window: TrailingWindow<Record>,
}

impl StreamState for TailState {
    fn step(
        &mut self,
        item: &Record,
        _conf: &ResolvedConfiguration,
    ) -> TransformationResult<Vec<Record>> {
        if self.window.capacity() > 0 {
            self.window.push(item.clone());
        }
        Ok(Vec::new())
    }

    fn flush(&mut self) -> TransformationResult<Vec<Record>> {
        let window = mem::replace(&mut self.window, TrailingWindow::new(0));
        Ok(window.into_vec())
    }
}
