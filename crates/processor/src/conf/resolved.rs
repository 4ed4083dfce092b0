//! Resolved (per-item) pipe configuration

use crate::error::{ConfigurationError, ConfigurationResult};
use feedpipe_types::value::type_name;
use feedpipe_types::Record;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Concrete configuration for one item, every reference substituted.
///
/// Produced fresh for each record (or once for item-independent settings)
/// and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfiguration(BTreeMap<String, Value>);

impl ResolvedConfiguration {
    pub(crate) fn from_entries(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }

    /// Value of a field (dotted paths descend into nested configuration)
    pub fn get(&self, field: &str) -> Option<&Value> {
        let mut segments = field.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Value of a mandatory field; `null` counts as missing
    pub fn require(&self, field: &str) -> ConfigurationResult<&Value> {
        match self.get(field) {
            Some(Value::Null) | None => Err(ConfigurationError::MissingRequiredField {
                field: field.to_string(),
            }),
            Some(value) => Ok(value),
        }
    }

    /// String value of a field, if present
    pub fn str(&self, field: &str) -> ConfigurationResult<Option<&str>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ConfigurationError::InvalidType {
                field: field.to_string(),
                expected: "string",
                actual: type_name(other).to_string(),
            }),
        }
    }

    /// String value of a mandatory field
    pub fn require_str(&self, field: &str) -> ConfigurationResult<&str> {
        self.str(field)?
            .ok_or_else(|| ConfigurationError::MissingRequiredField {
                field: field.to_string(),
            })
    }

    /// Mandatory non-negative integer.
    ///
    /// Accepts integers, non-negative floats (truncated) and integer strings.
    pub fn non_negative_int(&self, field: &str) -> ConfigurationResult<u64> {
        let value = self.require(field)?;
        let negative = || ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be non-negative, got {}", value),
        };
        let invalid = || ConfigurationError::InvalidType {
            field: field.to_string(),
            expected: "non-negative integer",
            actual: format!("{} {}", type_name(value), value),
        };

        match value {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(u)
                } else if n.as_i64().is_some() {
                    Err(negative())
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() && f >= 0.0 => Ok(f.trunc() as u64),
                        Some(f) if f.is_finite() => Err(negative()),
                        _ => Err(invalid()),
                    }
                }
            }
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) if i >= 0 => Ok(i as u64),
                Ok(_) => Err(negative()),
                Err(_) => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    /// Truthiness of an optional field
    pub fn flag(&self, field: &str) -> bool {
        self.get(field).map(feedpipe_types::is_truthy).unwrap_or(false)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The resolved configuration as a record
    pub fn to_record(&self) -> Record {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
