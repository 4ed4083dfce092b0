//! Records and the dotted-path accessor
//!
//! A [`Record`] is one structured item flowing through a pipe: a mapping from
//! string keys to JSON values, where values may themselves be nested objects.
//! Fields are addressed with dot-separated paths such as
//! `"media:thumbnail.url"`.
//!
//! Pipes never mutate a record they received; they build new ones (or clone
//! and extend), since the same record may be shared by other consumers.

use crate::errors::{RecordError, Result};
use crate::value::{type_name, ValueKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '.';

/// One structured item of a stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(RecordError::NotAnObject {
                actual: type_name(&other).to_string(),
            }),
        }
    }

    /// Build a nested record from flat dotted assignments.
    ///
    /// Later assignments win; assignments sharing a prefix land in the same
    /// nested object (`a.b` and `a.c` produce `{"a": {"b": .., "c": ..}}`).
    pub fn from_assignments<I, K>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut record = Self::new();
        for (path, value) in assignments {
            record.set_path(path.as_ref(), value);
        }
        record
    }

    /// Resolve a dotted path, returning `None` when any segment is missing
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolve a dotted path, falling back to `default` when absent
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get_path(path).cloned().unwrap_or(default)
    }

    /// Two-tier lookup: a string names a path into this record; when that
    /// path is absent (or the value is not a string) the value itself is used
    /// as a literal.
    pub fn get_or_literal(&self, value: &Value) -> Value {
        match value {
            Value::String(path) => self.get_or(path, value.clone()),
            other => other.clone(),
        }
    }

    /// Whether a dotted path resolves to a value
    pub fn contains_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    /// Canonical key of the value at `path`.
    ///
    /// A missing field and an explicit `null` share the absent key.
    pub fn key_at(&self, path: &str) -> ValueKey {
        match self.get_path(path) {
            None | Some(Value::Null) => ValueKey::absent(),
            Some(value) => ValueKey::from(value),
        }
    }

    /// Assign a value at a dotted path, creating intermediate objects.
    ///
    /// A non-object value met along the path is replaced by an object.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => return,
        };

        let mut current = &mut self.0;
        for segment in segments {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot.as_object_mut() {
                Some(map) => map,
                None => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    /// Copy of this record with `value` assigned at `path`
    pub fn with_path(&self, path: &str, value: Value) -> Self {
        let mut record = self.clone();
        record.set_path(path, value);
        record
    }

    /// Top-level field lookup (no path splitting)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a top-level field (no path splitting)
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Iterate top-level fields
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Top-level keys
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("<unprintable record>"),
        }
    }
}
