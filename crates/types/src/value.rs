//! Value helpers shared by the pipes
//!
//! Records hold plain `serde_json::Value`s. JSON values are not `Hash`, so the
//! uniqueness filter compares them through [`ValueKey`], a canonical rendering
//! that is stable across repeated extraction of the same value.

use serde_json::{Number, Value};
use std::fmt;

/// Canonical, hashable identity of an optional value.
///
/// Two values produce equal keys exactly when they are equal JSON values,
/// with integral floats folded onto integers (`1` and `1.0` are the same key).
/// A missing value has its own key, distinct from an explicit `null`;
/// [`Record::key_at`](crate::Record::key_at) folds the two together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKey(Option<String>);

impl ValueKey {
    /// Key for a value that may be absent
    pub fn of(value: Option<&Value>) -> Self {
        Self(value.map(canonical))
    }

    /// Key for an absent value
    pub fn absent() -> Self {
        Self(None)
    }

    /// Whether this key stands for an absent value
    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(rendered) => f.write_str(rendered),
            None => f.write_str("<absent>"),
        }
    }
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        Self::of(Some(value))
    }
}

fn canonical(value: &Value) -> String {
    match value {
        Value::Number(n) => canonical_number(n),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}

fn canonical_number(n: &Number) -> String {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return (f as i64).to_string();
        }
    }
    n.to_string()
}

/// Truthiness of a configuration or record value.
///
/// `null`, `false`, zero, and empty strings, arrays or objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Short JSON type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
