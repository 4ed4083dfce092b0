//! Transformation library
//!
//! - [`Uniq`](uniq::Uniq): uniqueness filter (aggregator)
//! - [`Tail`](tail::Tail): trailing window truncation (aggregator)
//! - [`DateBuilder`](datebuilder::DateBuilder): relative and fixed-format
//!   dates (operator, or unbounded source)
//! - [`RssItemBuilder`](rssitembuilder::RssItemBuilder): structural remapping
//!   into RSS items (operator, or single-item source)
//!
//! Pipes are looked up by name through [`pipe`] and [`build`].

pub mod datebuilder;
pub mod rssitembuilder;
pub mod tail;
pub mod uniq;

pub use datebuilder::DateBuilder;
pub use rssitembuilder::RssItemBuilder;
pub use tail::Tail;
pub use uniq::Uniq;

use crate::error::{ProcessorError, Result};
use crate::pipe::Pipe;
use serde_json::Value;

/// Names of every registered pipe
pub const PIPE_NAMES: [&str; 4] = ["datebuilder", "rssitembuilder", "tail", "uniq"];

/// Unconfigured pipe registered under `name`
pub fn pipe(name: &str) -> Result<Pipe> {
    match name {
        "datebuilder" => Ok(Pipe::item(DateBuilder)),
        "rssitembuilder" => Ok(Pipe::item(RssItemBuilder)),
        "tail" => Ok(Pipe::stream(Tail)),
        "uniq" => Ok(Pipe::stream(Uniq)),
        other => Err(ProcessorError::UnknownPipe {
            name: other.to_string(),
        }),
    }
}

/// Pipe registered under `name`, configured from JSON
pub fn build(name: &str, conf: Value) -> Result<Pipe> {
    pipe(name)?.with_json_conf(conf)
}
