//! Skip conditions

use crate::context::Context;
use feedpipe_types::{is_truthy, Record};
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Record, &Context) -> bool + Send + Sync;

/// When true for an item, the item passes through the pipe unchanged.
///
/// Per-item pipes evaluate the condition for every record. Stream pipes
/// evaluate it once, against an empty record, before consuming input: a true
/// condition turns the whole run into a passthrough.
#[derive(Clone)]
pub enum PassIf {
    /// Every item passes through
    Always,
    /// The named field of the record is truthy, or else the named context
    /// input is
    Field(String),
    /// A caller-supplied predicate
    Predicate(Arc<Predicate>),
}

impl PassIf {
    pub fn field(name: impl Into<String>) -> Self {
        PassIf::Field(name.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Record, &Context) -> bool + Send + Sync + 'static,
    {
        PassIf::Predicate(Arc::new(f))
    }

    pub fn evaluate(&self, record: &Record, ctx: &Context) -> bool {
        match self {
            PassIf::Always => true,
            PassIf::Field(name) => record
                .get_path(name)
                .or_else(|| ctx.input(name))
                .map(is_truthy)
                .unwrap_or(false),
            PassIf::Predicate(f) => f(record, ctx),
        }
    }
}

impl fmt::Debug for PassIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassIf::Always => f.write_str("Always"),
            PassIf::Field(name) => f.debug_tuple("Field").field(name).finish(),
            PassIf::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_checks_record_then_inputs() {
        let ctx = Context::new().with_input("skip", json!(true));
        let flagged = Record::from_value(json!({"draft": 1})).unwrap();
        let plain = Record::from_value(json!({"draft": 0})).unwrap();

        assert!(PassIf::field("draft").evaluate(&flagged, &ctx));
        assert!(!PassIf::field("draft").evaluate(&plain, &ctx));
        assert!(PassIf::field("skip").evaluate(&plain, &ctx));
        assert!(!PassIf::field("absent").evaluate(&plain, &ctx));
    }

    #[test]
    fn test_predicate_and_always() {
        let ctx = Context::new();
        let record = Record::from_value(json!({"n": 5})).unwrap();
        let big = PassIf::predicate(|r, _| r.get("n").and_then(|v| v.as_i64()) > Some(3));

        assert!(big.evaluate(&record, &ctx));
        assert!(PassIf::Always.evaluate(&Record::new(), &ctx));
        assert_eq!(format!("{:?}", big), "Predicate(..)");
    }
}
