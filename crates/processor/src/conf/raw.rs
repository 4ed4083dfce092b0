//! Raw (pre-resolution) pipe configuration

use crate::error::{ConfigurationError, ConfigurationResult};
use feedpipe_types::value::type_name;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// One configuration entry before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ConfValue {
    /// Passed through unchanged
    Literal(Value),

    /// Path into the current record, falling back to the path string itself
    Path(String),

    /// Path into the current record without a literal fallback
    Subkey(String),

    /// Named context input, with an optional default
    Term { name: String, default: Option<Value> },

    /// Nested configuration resolved field by field
    Nested(RawConfiguration),
}

impl ConfValue {
    /// Parse a JSON configuration value into a descriptor
    pub fn from_json(field: &str, value: Value) -> ConfigurationResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Ok(ConfValue::Literal(other)),
        };

        if map.contains_key("value") {
            return literal_descriptor(field, map);
        }
        if let Some(path) = single_string(field, &map, "subkey")? {
            return Ok(ConfValue::Subkey(path));
        }
        if let Some(path) = single_string(field, &map, "path")? {
            return Ok(ConfValue::Path(path));
        }
        if let Some(name) = single_string(field, &map, "terminal")? {
            return Ok(ConfValue::Term {
                name,
                default: map.get("default").cloned(),
            });
        }

        Ok(ConfValue::Nested(RawConfiguration::from_map(map)?))
    }

    /// Whether this entry depends on the current record or context
    pub fn is_reference(&self) -> bool {
        match self {
            ConfValue::Literal(_) => false,
            ConfValue::Nested(nested) => nested.has_references(),
            _ => true,
        }
    }

    /// Short description used in logs and resolution errors
    pub fn describe(&self) -> String {
        match self {
            ConfValue::Literal(value) => format!("literal {}", value),
            ConfValue::Path(path) => format!("path '{}'", path),
            ConfValue::Subkey(path) => format!("subkey '{}'", path),
            ConfValue::Term { name, .. } => format!("terminal '{}'", name),
            ConfValue::Nested(nested) => format!("nested configuration ({} fields)", nested.len()),
        }
    }
}

impl From<Value> for ConfValue {
    fn from(value: Value) -> Self {
        ConfValue::Literal(value)
    }
}

fn single_string(
    field: &str,
    map: &Map<String, Value>,
    tag: &'static str,
) -> ConfigurationResult<Option<String>> {
    match map.get(tag) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigurationError::InvalidType {
            field: format!("{}.{}", field, tag),
            expected: "string",
            actual: type_name(other).to_string(),
        }),
    }
}

fn literal_descriptor(field: &str, mut map: Map<String, Value>) -> ConfigurationResult<ConfValue> {
    let value = map.remove("value").unwrap_or(Value::Null);
    let value = match map.get("type").and_then(Value::as_str) {
        Some(ty) => coerce_literal(field, value, ty)?,
        None => value,
    };
    Ok(ConfValue::Literal(value))
}

/// Coerce a typed literal (`{"type": "number", "value": "3"}`)
fn coerce_literal(field: &str, value: Value, ty: &str) -> ConfigurationResult<Value> {
    let invalid = |expected: &'static str, value: &Value| ConfigurationError::InvalidType {
        field: field.to_string(),
        expected,
        actual: format!("{} {}", type_name(value), value),
    };

    match ty {
        "text" | "string" => as_text(&value).ok_or_else(|| invalid("text", &value)),
        "int" | "integer" => as_integer(&value).ok_or_else(|| invalid("integer", &value)),
        "number" | "float" => as_number(&value).ok_or_else(|| invalid("number", &value)),
        "bool" | "boolean" => as_bool(&value).ok_or_else(|| invalid("boolean", &value)),
        // Untyped or descriptive types ("url", "location", ...) pass through
        _ => Ok(value),
    }
}

fn as_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(i) => Some(Value::from(i)),
                Err(_) => trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
            }
        }
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(n) => Some(Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        _ => None,
    }
}

/// A pipe's configuration before resolution.
///
/// Supplied once when a pipe is instantiated and invariant afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfiguration {
    entries: BTreeMap<String, ConfValue>,
}

impl RawConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of configuration entries
    pub fn from_json(value: Value) -> ConfigurationResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Ok(Self::new()),
            other => Err(ConfigurationError::NotAnObject {
                actual: type_name(&other).to_string(),
            }),
        }
    }

    fn from_map(map: Map<String, Value>) -> ConfigurationResult<Self> {
        let mut entries = BTreeMap::new();
        for (field, value) in map {
            let parsed = ConfValue::from_json(&field, value)?;
            entries.insert(field, parsed);
        }
        Ok(Self { entries })
    }

    /// Add or replace an entry
    pub fn insert(&mut self, field: impl Into<String>, value: ConfValue) -> Option<ConfValue> {
        self.entries.insert(field.into(), value)
    }

    /// Builder: literal entry
    pub fn literal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, ConfValue::Literal(value.into()));
        self
    }

    /// Builder: record path with literal fallback
    pub fn path(mut self, field: impl Into<String>, path: impl Into<String>) -> Self {
        self.insert(field, ConfValue::Path(path.into()));
        self
    }

    /// Builder: record path without fallback
    pub fn subkey(mut self, field: impl Into<String>, path: impl Into<String>) -> Self {
        self.insert(field, ConfValue::Subkey(path.into()));
        self
    }

    /// Builder: context input
    pub fn terminal(mut self, field: impl Into<String>, name: impl Into<String>) -> Self {
        self.insert(
            field,
            ConfValue::Term {
                name: name.into(),
                default: None,
            },
        );
        self
    }

    /// Merge this configuration over `defaults`: entries present here win
    pub fn merged_over(&self, defaults: &RawConfiguration) -> RawConfiguration {
        let mut merged = defaults.entries.clone();
        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        RawConfiguration { entries: merged }
    }

    pub fn get(&self, field: &str) -> Option<&ConfValue> {
        self.entries.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Whether any entry depends on the current record or context
    pub fn has_references(&self) -> bool {
        self.entries.values().any(ConfValue::is_reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Value> for RawConfiguration {
    type Error = ConfigurationError;

    fn try_from(value: Value) -> ConfigurationResult<Self> {
        Self::from_json(value)
    }
}

impl<K: Into<String>> FromIterator<(K, ConfValue)> for RawConfiguration {
    fn from_iter<I: IntoIterator<Item = (K, ConfValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_are_literals() {
        let conf = RawConfiguration::from_json(json!({"count": 2, "field": "title"})).unwrap();
        assert_eq!(conf.get("count"), Some(&ConfValue::Literal(json!(2))));
        assert_eq!(conf.get("field"), Some(&ConfValue::Literal(json!("title"))));
        assert!(!conf.has_references());
    }

    #[test]
    fn test_reference_descriptors() {
        let conf = RawConfiguration::from_json(json!({
            "a": {"subkey": "x.y"},
            "b": {"path": "z"},
            "c": {"terminal": "feed", "default": "none"},
            "d": {"value": "lit"}
        }))
        .unwrap();

        assert_eq!(conf.get("a"), Some(&ConfValue::Subkey("x.y".to_string())));
        assert_eq!(conf.get("b"), Some(&ConfValue::Path("z".to_string())));
        assert_eq!(
            conf.get("c"),
            Some(&ConfValue::Term {
                name: "feed".to_string(),
                default: Some(json!("none"))
            })
        );
        assert_eq!(conf.get("d"), Some(&ConfValue::Literal(json!("lit"))));
        assert!(conf.has_references());
    }

    #[test]
    fn test_typed_literals_are_coerced() {
        let conf = RawConfiguration::from_json(json!({
            "n": {"type": "number", "value": "3"},
            "f": {"type": "number", "value": "2.5"},
            "t": {"type": "text", "value": 7},
            "b": {"type": "bool", "value": "yes"},
            "u": {"type": "url", "value": "http://x"}
        }))
        .unwrap();

        assert_eq!(conf.get("n"), Some(&ConfValue::Literal(json!(3))));
        assert_eq!(conf.get("f"), Some(&ConfValue::Literal(json!(2.5))));
        assert_eq!(conf.get("t"), Some(&ConfValue::Literal(json!("7"))));
        assert_eq!(conf.get("b"), Some(&ConfValue::Literal(json!(true))));
        assert_eq!(conf.get("u"), Some(&ConfValue::Literal(json!("http://x"))));
    }

    #[test]
    fn test_bad_typed_literal() {
        let err = RawConfiguration::from_json(json!({"count": {"type": "int", "value": "two"}}))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidType { ref field, .. } if field == "count"
        ));
    }

    #[test]
    fn test_nested_configuration() {
        let conf = RawConfiguration::from_json(json!({
            "rule": {"field": {"subkey": "title"}, "dir": "asc"}
        }))
        .unwrap();

        match conf.get("rule") {
            Some(ConfValue::Nested(nested)) => {
                assert_eq!(nested.get("dir"), Some(&ConfValue::Literal(json!("asc"))));
                assert!(nested.has_references());
            }
            other => panic!("expected nested configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_configuration() {
        let err = RawConfiguration::from_json(json!([1])).unwrap_err();
        assert_eq!(err, ConfigurationError::NotAnObject { actual: "array".to_string() });
        assert!(RawConfiguration::from_json(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_merged_over_defaults() {
        let defaults = RawConfiguration::new()
            .literal("pubDate", "2024-01-01T00:00:00Z")
            .literal("title", "default");
        let conf = RawConfiguration::new().literal("title", "mine");

        let merged = conf.merged_over(&defaults);
        assert_eq!(merged.get("title"), Some(&ConfValue::Literal(json!("mine"))));
        assert!(merged.contains("pubDate"));
        assert_eq!(merged.len(), 2);
    }
}
