//! Process-wide injection points.
//!
//! The engine itself is stateless; three items are configured once at
//! startup and read everywhere: the step-tracking flag, the optional
//! mini-notation parser used by [`reify`], and the control-name registry.
//! Mutating any of them mid-run is undefined behaviour (documented, not
//! enforced).

use crate::pattern::{pure, silence, Pattern};
use crate::value::{ControlMap, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use thiserror::Error;

/// Error produced by an injected mini-notation parser.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("unknown name: {0}")]
    UnknownName(String),
}

/// The injected parser's shape: text in, control pattern out.
pub type ParserFn = dyn Fn(&str) -> Result<Pattern<Value>, ParseError> + Send + Sync;

/// Host-supplied clock handed to `on_trigger` callbacks. The engine never
/// reads a system clock; all three fields come from the host scheduler.
#[derive(Debug, Clone, Copy)]
pub struct TriggerTime {
    /// The host's current time, in seconds.
    pub current_time: f64,
    /// Cycles per second at the moment of triggering.
    pub cps: f64,
    /// The time the event is scheduled to sound, in seconds.
    pub target_time: f64,
}

/// A trigger callback carried in event contexts.
pub type TriggerFn = dyn Fn(&TriggerTime) + Send + Sync;

static COMPUTE_STEPS: AtomicBool = AtomicBool::new(true);

/// Whether combinators track stepwise lengths. On by default.
pub fn compute_steps() -> bool {
    COMPUTE_STEPS.load(Ordering::Relaxed)
}

/// Turn step tracking on or off. Call once at startup.
pub fn set_compute_steps(on: bool) {
    COMPUTE_STEPS.store(on, Ordering::Relaxed);
}

static PARSER: OnceLock<Arc<ParserFn>> = OnceLock::new();

/// Install the mini-notation parser. May only be done once; later calls
/// are ignored.
pub fn set_parser(parser: Arc<ParserFn>) {
    let _ = PARSER.set(parser);
}

/// Coerce a string into a pattern. With a parser installed the string is
/// parsed (parse failures log and collapse to silence); without one the
/// string becomes a one-event-per-cycle constant.
pub fn reify(s: &str) -> Pattern<Value> {
    match PARSER.get() {
        Some(parser) => match parser(s) {
            Ok(pat) => pat,
            Err(err) => {
                tracing::warn!(input = s, error = %err, "parse failed, yielding silence");
                silence()
            }
        },
        None => pure(Value::from(s)),
    }
}

fn control_aliases() -> &'static RwLock<HashMap<String, String>> {
    static ALIASES: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();
    ALIASES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a control under one or more aliases. Every alias resolves to
/// the canonical name when building control records.
pub fn register_control(aliases: &[&str], canonical: &str) {
    let mut table = control_aliases().write().expect("control registry poisoned");
    for alias in aliases {
        table.insert((*alias).to_string(), canonical.to_string());
    }
    table.insert(canonical.to_string(), canonical.to_string());
}

/// Resolve a control alias to its canonical name.
pub fn canonical_control(name: &str) -> String {
    control_aliases()
        .read()
        .expect("control registry poisoned")
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Build the tagged record for one control value. A record argument with
/// a `value` field contributes that field under the control's name and
/// keeps its other fields as extra properties.
pub fn control_value(name: &str, value: Value) -> Value {
    let canonical = canonical_control(name);
    match value {
        Value::Map(map) => {
            let mut out = ControlMap::new();
            for (k, v) in &map.0 {
                if k == "value" {
                    out.insert(&canonical, v.clone());
                } else {
                    out.insert(k, v.clone());
                }
            }
            Value::Map(out)
        }
        other => Value::Map(ControlMap::single(&canonical, other)),
    }
}

/// Lift a pattern of plain values into a pattern of one-field control
/// records under the given (possibly aliased) name.
pub fn ctrl(name: &str, pat: Pattern<Value>) -> Pattern<Value> {
    let name = name.to_string();
    pat.fmap(move |v| control_value(&name, v))
}
