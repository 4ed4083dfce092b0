//! Per-item configuration resolution

use super::raw::{ConfValue, RawConfiguration};
use super::resolved::ResolvedConfiguration;
use crate::context::Context;
use crate::error::ResolutionError;
use feedpipe_types::Record;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// What happens when a `subkey` or `terminal` reference resolves to nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Substitute `null`
    #[default]
    Lenient,
    /// Raise [`ResolutionError::Unresolved`]
    Strict,
}

/// Substitutes reference descriptors against a record and the run context.
///
/// Resolution is a pure function of (configuration, record, context): the
/// same inputs always produce equal outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    mode: ResolutionMode,
}

impl Resolver {
    pub fn new(mode: ResolutionMode) -> Self {
        Self { mode }
    }

    /// Resolver using the context's resolution mode
    pub fn for_context(ctx: &Context) -> Self {
        if ctx.strict_resolution() {
            Self::new(ResolutionMode::Strict)
        } else {
            Self::new(ResolutionMode::Lenient)
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve every entry of `raw` against `record` and `ctx`
    pub fn resolve(
        &self,
        raw: &RawConfiguration,
        record: &Record,
        ctx: &Context,
    ) -> Result<ResolvedConfiguration, ResolutionError> {
        let mut entries = BTreeMap::new();
        for (field, value) in raw.iter() {
            let resolved = self.resolve_value(field, value, record, ctx)?;
            entries.insert(field.clone(), resolved);
        }
        Ok(ResolvedConfiguration::from_entries(entries))
    }

    fn resolve_value(
        &self,
        field: &str,
        value: &ConfValue,
        record: &Record,
        ctx: &Context,
    ) -> Result<Value, ResolutionError> {
        match value {
            ConfValue::Literal(literal) => Ok(literal.clone()),
            ConfValue::Path(path) => Ok(record.get_or(path, Value::String(path.clone()))),
            ConfValue::Subkey(path) => match record.get_path(path) {
                Some(found) => Ok(found.clone()),
                None => self.unresolved(field, value),
            },
            ConfValue::Term { name, default } => match (ctx.input(name), default) {
                (Some(found), _) => Ok(found.clone()),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => self.unresolved(field, value),
            },
            ConfValue::Nested(nested) => {
                let mut map = Map::new();
                for (key, inner) in nested.iter() {
                    let path = format!("{}.{}", field, key);
                    map.insert(key.clone(), self.resolve_value(&path, inner, record, ctx)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn unresolved(&self, field: &str, value: &ConfValue) -> Result<Value, ResolutionError> {
        match self.mode {
            ResolutionMode::Lenient => Ok(Value::Null),
            ResolutionMode::Strict => Err(ResolutionError::Unresolved {
                field: field.to_string(),
                reference: value.describe(),
            }),
        }
    }
}

/// Resolve with the context's mode
pub fn resolve(
    raw: &RawConfiguration,
    record: &Record,
    ctx: &Context,
) -> Result<ResolvedConfiguration, ResolutionError> {
    Resolver::for_context(ctx).resolve(raw, record, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        Record::from_value(json!({"id": "a1", "when": "3 days", "meta": {"n": 4}})).unwrap()
    }

    fn raw() -> RawConfiguration {
        RawConfiguration::from_json(json!({
            "guid": {"path": "id"},
            "title": {"path": "heading"},
            "date": {"subkey": "when"},
            "size": {"subkey": "meta.n"},
            "feed": {"terminal": "feed"},
            "limit": {"terminal": "limit", "default": 10},
            "static": 5
        }))
        .unwrap()
    }

    #[test]
    fn test_resolution_rules() {
        let ctx = Context::new().with_input("feed", json!("http://example.com"));
        let resolved = resolve(&raw(), &record(), &ctx).unwrap();

        assert_eq!(resolved.get("guid"), Some(&json!("a1")));
        // absent path falls back to the literal string
        assert_eq!(resolved.get("title"), Some(&json!("heading")));
        assert_eq!(resolved.get("date"), Some(&json!("3 days")));
        assert_eq!(resolved.get("size"), Some(&json!(4)));
        assert_eq!(resolved.get("feed"), Some(&json!("http://example.com")));
        assert_eq!(resolved.get("limit"), Some(&json!(10)));
        assert_eq!(resolved.get("static"), Some(&json!(5)));
    }

    #[test]
    fn test_lenient_missing_references_are_null() {
        let ctx = Context::new();
        let raw = RawConfiguration::new()
            .subkey("a", "nope")
            .terminal("b", "nope");

        let resolved = resolve(&raw, &record(), &ctx).unwrap();
        assert_eq!(resolved.get("a"), Some(&Value::Null));
        assert_eq!(resolved.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_strict_missing_reference_errors() {
        let ctx = Context::new().with_strict_resolution(true);
        let raw = RawConfiguration::new().subkey("a", "nope");

        let err = resolve(&raw, &record(), &ctx).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Unresolved {
                field: "a".to_string(),
                reference: "subkey 'nope'".to_string()
            }
        );
    }

    #[test]
    fn test_strict_keeps_path_fallback() {
        let ctx = Context::new().with_strict_resolution(true);
        let raw = RawConfiguration::new().path("title", "heading");
        let resolved = resolve(&raw, &record(), &ctx).unwrap();
        assert_eq!(resolved.get("title"), Some(&json!("heading")));
    }

    #[test]
    fn test_nested_resolution() {
        let ctx = Context::new().with_strict_resolution(true);
        let raw = RawConfiguration::from_json(json!({
            "rule": {"key": {"subkey": "id"}, "missing": {"subkey": "zzz"}}
        }))
        .unwrap();

        let err = resolve(&raw, &record(), &ctx).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Unresolved { ref field, .. } if field == "rule.missing"
        ));

        let lenient = resolve(&raw, &record(), &Context::new()).unwrap();
        assert_eq!(lenient.get("rule.key"), Some(&json!("a1")));
    }

    #[test]
    fn test_resolution_is_referentially_transparent() {
        let ctx = Context::new().with_input("feed", json!("x"));
        let first = resolve(&raw(), &record(), &ctx).unwrap();
        let second = resolve(&raw(), &record(), &ctx).unwrap();
        assert_eq!(first, second);
    }
}
