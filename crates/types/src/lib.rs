//! Core types for feedpipe
//!
//! This crate provides the record model every pipe consumes and produces:
//! a nested key/value container addressed by dotted paths, plus the value
//! helpers (canonical keys, truthiness) the pipes build on.

pub mod errors;
pub mod record;
pub mod value;

pub use errors::{RecordError, Result};
pub use record::Record;
pub use value::{is_truthy, ValueKey};

/// Re-exported so downstream crates build records without naming serde_json.
pub use serde_json::{json, Map, Value};
