//! Uniqueness filter

use crate::conf::ResolvedConfiguration;
use crate::context::Context;
use crate::error::{ConfigurationResult, TransformationResult};
use crate::pipe::{PipeDescriptor, PipeOptions, StreamParser, StreamState};
use feedpipe_types::{Record, ValueKey};
use std::collections::HashSet;
use tracing::trace;

static DESCRIPTOR: PipeDescriptor =
    PipeDescriptor::new("uniq", PipeOptions::new().required(&["field"]));

/// Forwards a record the first time its value at `field` is seen and drops
/// every later record with an equal value.
///
/// Values compare by canonical form, so `1` and `1.0` are equal and object
/// key order does not matter. Records lacking the field or holding `null`
/// there share one "absent" value: the first passes, the rest are dropped.
///
/// # Examples
///
/// ```
/// use feedpipe_processor::modules;
/// use feedpipe_processor::Context;
/// use feedpipe_types::{json, Record};
///
/// let pipe = modules::build("uniq", json!({"field": "mod"})).unwrap();
/// let input = (0..6).map(|x| Record::from_value(json!({"x": x, "mod": x % 2})).unwrap());
///
/// let ctx = Context::new();
/// let out: Vec<Record> = pipe.run(input, &ctx).unwrap().map(Result::unwrap).collect();
/// assert_eq!(out.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniq;

impl StreamParser for Uniq {
    fn descriptor(&self) -> &PipeDescriptor {
        &DESCRIPTOR
    }

    fn open(
        &self,
        conf: &ResolvedConfiguration,
        _ctx: &Context,
    ) -> ConfigurationResult<Box<dyn StreamState>> {
        let field = conf.require_str("field")?.to_string();
        Ok(Box::new(UniqState {
            field,
            seen: HashSet::new(),
        }))
    }
}

struct UniqState {
    field: String,
    seen: HashSet<ValueKey>,
}

impl StreamState for UniqState {
    fn step(
        &mut self,
        item: &Record,
        _conf: &ResolvedConfiguration,
    ) -> TransformationResult<Vec<Record>> {
        let key = item.key_at(&self.field);
        if self.seen.insert(key) {
            Ok(vec![item.clone()])
        } else {
            trace!(field = %self.field, "dropping duplicate");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::pipe::{PassIf, Pipe};
    use crate::conf::RawConfiguration;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from_value(v).unwrap())
            .collect()
    }

    fn uniq(field: &str) -> Pipe {
        Pipe::stream(Uniq).with_conf(RawConfiguration::new().literal("field", field))
    }

    fn run(pipe: &Pipe, input: Vec<Record>) -> Vec<Record> {
        let ctx = Context::new();
        let out: Result<Vec<Record>> = pipe.run(input, &ctx).unwrap().collect();
        out.unwrap()
    }

    #[test]
    fn test_forwards_first_occurrence() {
        let input = records(vec![
            json!({"title": "a", "n": 1}),
            json!({"title": "b", "n": 2}),
            json!({"title": "a", "n": 3}),
            json!({"title": "c", "n": 4}),
        ]);
        let out = run(&uniq("title"), input);
        let ns: Vec<_> = out.iter().map(|r| r.get("n").cloned().unwrap()).collect();
        assert_eq!(ns, vec![json!(1), json!(2), json!(4)]);
    }

    #[test]
    fn test_numeric_equality_and_nested_paths() {
        let input = records(vec![
            json!({"m": {"v": 1}}),
            json!({"m": {"v": 1.0}}),
            json!({"m": {"v": "1"}}),
        ]);
        assert_eq!(run(&uniq("m.v"), input).len(), 2);
    }

    #[test]
    fn test_absent_values_share_one_key() {
        let input = records(vec![json!({"a": 1}), json!({"b": 2}), json!({"k": 3})]);
        let out = run(&uniq("k"), input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("a"), Some(&json!(1)));
        assert_eq!(out[1].get("k"), Some(&json!(3)));
    }

    #[test]
    fn test_null_and_absent_are_duplicates() {
        let input = records(vec![json!({"a": 1}), json!({"k": null}), json!({"k": 0})]);
        let out = run(&uniq("k"), input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("a"), Some(&json!(1)));
        assert_eq!(out[1].get("k"), Some(&json!(0)));
    }

    #[test]
    fn test_missing_field_is_configuration_error() {
        let ctx = Context::new();
        let err = Pipe::stream(Uniq).run(Vec::new(), &ctx).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_global_bypass() {
        let input = records(vec![json!({"t": 1}), json!({"t": 1})]);
        let pipe = uniq("t").with_pass_if(PassIf::Always);
        assert_eq!(run(&pipe, input.clone()), input);
    }
}
