//! Run context
//!
//! A [`Context`] is created once per pipeline run by the orchestrator and
//! borrowed by every pipe invocation. It carries the ambient flags, the named
//! inputs `terminal` references resolve against, and the run clock: "now" is
//! captured once so every item of a run (and both execution forms) see the
//! same instant.

use chrono::{DateTime, Utc};
use feedpipe_config::RuntimeConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Named inputs supplied by the orchestrator
pub type Inputs = BTreeMap<String, Value>;

/// Read-only, run-wide execution state
#[derive(Debug, Clone)]
pub struct Context {
    run_id: Uuid,
    now: DateTime<Utc>,
    test: bool,
    verbose: bool,
    inputs: Inputs,
    strict_resolution: bool,
    yield_every: usize,
}

impl Context {
    /// Create a context for a new run, pinning the clock to the current time
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            now: Utc::now(),
            test: false,
            verbose: false,
            inputs: Inputs::new(),
            strict_resolution: false,
            yield_every: 1,
        }
    }

    /// Create a context seeded from runtime configuration
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new()
            .with_test(config.context.test)
            .with_verbose(config.context.verbose)
            .with_inputs(config.context.inputs.clone())
            .with_strict_resolution(config.execution.strict_resolution)
            .with_yield_every(config.execution.yield_every)
    }

    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Add one named input
    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    /// Add several named inputs, replacing existing ones with the same name
    pub fn with_inputs<I, K>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.inputs
            .extend(inputs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Pin the run clock to a specific instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_strict_resolution(mut self, strict: bool) -> Self {
        self.strict_resolution = strict;
        self
    }

    /// Items processed by the async form between scheduler yields (min 1)
    pub fn with_yield_every(mut self, items: usize) -> Self {
        self.yield_every = items.max(1);
        self
    }

    /// Derived context with per-invocation named inputs layered on top
    pub fn scoped(&self, extra: &Inputs) -> Self {
        let mut scoped = self.clone();
        scoped
            .inputs
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        scoped
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The run clock
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_test(&self) -> bool {
        self.test
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn strict_resolution(&self) -> bool {
        self.strict_resolution
    }

    pub fn yield_every(&self) -> usize {
        self.yield_every
    }

    /// Look up a named input
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_context_defaults() {
        let ctx = Context::new();
        assert!(!ctx.is_test());
        assert!(!ctx.is_verbose());
        assert!(!ctx.strict_resolution());
        assert_eq!(ctx.yield_every(), 1);
        assert!(ctx.inputs().is_empty());
    }

    #[test]
    fn test_clock_is_pinned() {
        let ctx = Context::new();
        let first = ctx.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(ctx.now(), first);
        assert_eq!(ctx.clone().now(), first);
    }

    #[test]
    fn test_with_now() {
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let ctx = Context::new().with_now(instant);
        assert_eq!(ctx.now(), instant);
    }

    #[test]
    fn test_scoped_inputs_overlay() {
        let ctx = Context::new()
            .with_input("feed", json!("a"))
            .with_input("limit", json!(3));

        let mut extra = Inputs::new();
        extra.insert("feed".to_string(), json!("b"));

        let scoped = ctx.scoped(&extra);
        assert_eq!(scoped.input("feed"), Some(&json!("b")));
        assert_eq!(scoped.input("limit"), Some(&json!(3)));
        assert_eq!(ctx.input("feed"), Some(&json!("a")));
        assert_eq!(scoped.run_id(), ctx.run_id());
    }

    #[test]
    fn test_from_runtime_config() {
        let mut config = RuntimeConfig::default();
        config.context.verbose = true;
        config.context.inputs.insert("x".to_string(), json!(1));
        config.execution.yield_every = 16;

        let ctx = Context::from_config(&config);
        assert!(ctx.is_verbose());
        assert_eq!(ctx.input("x"), Some(&json!(1)));
        assert_eq!(ctx.yield_every(), 16);
    }

    #[test]
    fn test_yield_every_never_zero() {
        assert_eq!(Context::new().with_yield_every(0).yield_every(), 1);
    }
}
