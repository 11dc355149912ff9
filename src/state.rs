//! State represents the query state passed to patterns.
//!
//! When querying a pattern, we pass a State containing the timespan
//! we're interested in, along with any control values supplied by the
//! host (such as `cps`).

use crate::timespan::TimeSpan;
use crate::value::Value;
use std::collections::HashMap;

/// The query state passed to patterns.
#[derive(Debug, Clone)]
pub struct State {
    /// The timespan being queried.
    pub span: TimeSpan,
    /// Control values that can modify pattern behavior.
    pub controls: HashMap<String, Value>,
}

impl State {
    /// Create a new State with the given timespan.
    pub fn new(span: TimeSpan) -> Self {
        State {
            span,
            controls: HashMap::new(),
        }
    }

    /// Create a new State with controls.
    pub fn with_controls(span: TimeSpan, controls: HashMap<String, Value>) -> Self {
        State { span, controls }
    }

    /// Returns a new State with a different span.
    pub fn set_span(&self, span: TimeSpan) -> Self {
        State {
            span,
            controls: self.controls.clone(),
        }
    }

    /// Apply a function to the span.
    pub fn with_span<F>(&self, f: F) -> Self
    where
        F: FnOnce(TimeSpan) -> TimeSpan,
    {
        self.set_span(f(self.span))
    }

    /// Returns a new State with added controls.
    pub fn set_controls(&self, controls: HashMap<String, Value>) -> Self {
        let mut new_controls = self.controls.clone();
        new_controls.extend(controls);
        State {
            span: self.span,
            controls: new_controls,
        }
    }

    /// Add a single control value.
    pub fn add_control(&self, key: &str, value: Value) -> Self {
        let mut new_controls = self.controls.clone();
        new_controls.insert(key.to_string(), value);
        State {
            span: self.span,
            controls: new_controls,
        }
    }

    /// Get a control value.
    pub fn get_control(&self, key: &str) -> Option<&Value> {
        self.controls.get(key)
    }

    /// The host's cycles-per-second, defaulting to 1.
    pub fn cps(&self) -> f64 {
        self.get_control("cps")
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
    }
}

impl From<TimeSpan> for State {
    fn from(span: TimeSpan) -> Self {
        State::new(span)
    }
}
