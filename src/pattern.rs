//! Pattern is the core abstraction for representing time-varying values.
//!
//! A `Pattern<T>` is essentially a function from `State` to `Vec<Hap<T>>`,
//! together with an optional stepwise length (`steps`): how many discrete
//! events the pattern presents per cycle. Patterns are immutable values;
//! every combinator returns a new pattern and never mutates its inputs.

use crate::fraction::Fraction;
use crate::hap::{Context, Hap};
use crate::runtime::compute_steps;
use crate::state::State;
use crate::timespan::TimeSpan;
use crate::value::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// The query function type: takes a State and returns a list of Haps.
pub type QueryFn<T> = dyn Fn(&State) -> Vec<Hap<T>> + Send + Sync;

/// A Pattern represents a function from time to events.
pub struct Pattern<T> {
    /// The query function that produces events for a given time span.
    query: Arc<QueryFn<T>>,
    /// Number of steps per cycle (for stepwise operations). `None` when
    /// undefined, e.g. for continuous signals.
    steps: Option<Fraction>,
}

impl<T> Clone for Pattern<T> {
    fn clone(&self) -> Self {
        Pattern {
            query: Arc::clone(&self.query),
            steps: self.steps,
        }
    }
}

/// Gate a step count on the process-wide tracking flag.
pub(crate) fn steps_if(n: Fraction) -> Option<Fraction> {
    if compute_steps() {
        Some(n)
    } else {
        None
    }
}

/// Combine step counts across arms: lcm where both are defined, the
/// defined side otherwise.
pub(crate) fn steps_lcm(a: Option<Fraction>, b: Option<Fraction>) -> Option<Fraction> {
    if !compute_steps() {
        return None;
    }
    match (a, b) {
        (Some(a), Some(b)) => Some(a.lcm(&b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Create a new pattern from a query function.
    pub fn new<F>(query: F) -> Self
    where
        F: Fn(&State) -> Vec<Hap<T>> + Send + Sync + 'static,
    {
        Pattern {
            query: Arc::new(query),
            steps: None,
        }
    }

    /// Create a new pattern with steps information.
    pub fn with_steps<F>(query: F, steps: Fraction) -> Self
    where
        F: Fn(&State) -> Vec<Hap<T>> + Send + Sync + 'static,
    {
        Pattern {
            query: Arc::new(query),
            steps: steps_if(steps),
        }
    }

    /// Query the pattern for events in the given state.
    pub fn query(&self, state: &State) -> Vec<Hap<T>> {
        (self.query)(state)
    }

    /// Query the pattern for events in the given time arc.
    ///
    /// This is the public sampling surface: a panicking user callback
    /// inside the pattern is contained here -- logged, with an empty
    /// result for this query only.
    pub fn query_arc(&self, begin: Fraction, end: Fraction) -> Vec<Hap<T>> {
        self.query_arc_with(begin, end, HashMap::new())
    }

    /// Like `query_arc`, with host controls (such as `cps`) attached.
    pub fn query_arc_with(
        &self,
        begin: Fraction,
        end: Fraction,
        controls: HashMap<String, Value>,
    ) -> Vec<Hap<T>> {
        let state = State::with_controls(TimeSpan::new(begin, end), controls);
        match catch_unwind(AssertUnwindSafe(|| self.query(&state))) {
            Ok(haps) => haps,
            Err(_) => {
                tracing::error!(
                    begin = %begin,
                    end = %end,
                    "query panicked inside a pattern callback; returning no events"
                );
                Vec::new()
            }
        }
    }

    /// Get the steps value if set.
    pub fn steps(&self) -> Option<Fraction> {
        self.steps
    }

    /// Set the steps value.
    pub fn set_steps(mut self, steps: Option<Fraction>) -> Self {
        self.steps = if compute_steps() { steps } else { None };
        self
    }

    // ============================================
    // Functor operations
    // ============================================

    /// Apply a function to the value of each hap.
    pub fn with_value<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + Clone + 'static,
    {
        let query = self.query;
        let steps = self.steps;
        Pattern {
            query: Arc::new(move |state| {
                query(state)
                    .into_iter()
                    .map(|hap| hap.with_value(|v| f(v)))
                    .collect()
            }),
            steps,
        }
    }

    /// Alias for with_value (Haskell-style fmap).
    pub fn fmap<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + Clone + 'static,
    {
        self.with_value(f)
    }

    /// Apply a function to the query state.
    pub fn with_state<F>(self, f: F) -> Self
    where
        F: Fn(&State) -> State + Send + Sync + 'static,
    {
        let query = self.query;
        Pattern {
            query: Arc::new(move |state| query(&f(state))),
            steps: self.steps,
        }
    }

    // ============================================
    // Query span transformations
    // ============================================

    /// Apply a function to the query timespan before querying.
    pub fn with_query_span<F>(self, f: F) -> Self
    where
        F: Fn(TimeSpan) -> TimeSpan + Send + Sync + Clone + 'static,
    {
        let query = self.query;
        Pattern {
            query: Arc::new(move |state| query(&state.with_span(|span| f(span)))),
            steps: self.steps,
        }
    }

    /// Apply a function to both begin and end of the query timespan.
    pub fn with_query_time<F>(self, f: F) -> Self
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + Clone + 'static,
    {
        self.with_query_span(move |span| span.with_time(&f))
    }

    // ============================================
    // Hap transformations
    // ============================================

    /// Apply a function to all haps returned by queries.
    pub fn with_haps<F>(self, f: F) -> Self
    where
        F: Fn(Vec<Hap<T>>, &State) -> Vec<Hap<T>> + Send + Sync + 'static,
    {
        let query = self.query;
        let steps = self.steps;
        Pattern {
            query: Arc::new(move |state| f(query(state), state)),
            steps,
        }
    }

    /// Apply a function to each hap.
    pub fn with_hap<F>(self, f: F) -> Self
    where
        F: Fn(Hap<T>) -> Hap<T> + Send + Sync + Clone + 'static,
    {
        let query = self.query;
        let steps = self.steps;
        Pattern {
            query: Arc::new(move |state| query(state).into_iter().map(|h| f(h)).collect()),
            steps,
        }
    }

    /// Apply a function to the timespan of each hap.
    pub fn with_hap_span<F>(self, f: F) -> Self
    where
        F: Fn(TimeSpan) -> TimeSpan + Send + Sync + Clone + 'static,
    {
        self.with_hap(move |hap| hap.with_span(|s| f(s)))
    }

    /// Apply a function to both begin and end of hap timespans.
    pub fn with_hap_time<F>(self, f: F) -> Self
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + Clone + 'static,
    {
        self.with_hap_span(move |span| span.with_time(&f))
    }

    // ============================================
    // Filtering
    // ============================================

    /// Filter haps based on a predicate.
    pub fn filter_haps<F>(self, pred: F) -> Self
    where
        F: Fn(&Hap<T>) -> bool + Send + Sync + 'static,
    {
        let query = self.query;
        Pattern {
            query: Arc::new(move |state| query(state).into_iter().filter(|h| pred(h)).collect()),
            steps: self.steps,
        }
    }

    /// Filter haps based on their values.
    pub fn filter_values<F>(self, pred: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + Clone + 'static,
    {
        self.filter_haps(move |hap| pred(&hap.value))
    }

    /// Keep only haps that have an onset.
    pub fn onsets_only(self) -> Self {
        self.filter_haps(|hap| hap.has_onset())
    }

    /// Keep only discrete haps (those with a whole timespan).
    pub fn discrete_only(self) -> Self {
        self.filter_haps(|hap| hap.whole.is_some())
    }

    // ============================================
    // Split queries
    // ============================================

    /// Split queries at cycle boundaries.
    pub fn split_queries(self) -> Self {
        let query = self.query;
        Pattern {
            query: Arc::new(move |state| {
                state
                    .span
                    .span_cycles()
                    .into_iter()
                    .flat_map(|subspan| query(&state.set_span(subspan)))
                    .collect()
            }),
            steps: self.steps,
        }
    }

    // ============================================
    // Context operations
    // ============================================

    /// Set the context of all haps.
    pub fn set_context(self, context: Context) -> Self {
        self.with_hap(move |hap| hap.set_context(context.clone()))
    }

    /// Strip context from all haps.
    pub fn strip_context(self) -> Self {
        self.set_context(Context::new())
    }

    /// Add a metadata key-value pair to all haps.
    pub fn with_meta(self, key: String, value: String) -> Self {
        self.with_hap(move |mut hap| {
            hap.context.meta.insert(key.clone(), value.clone());
            hap
        })
    }

    /// Add a tag to all haps.
    pub fn with_tag(self, tag: &str) -> Self {
        let tag = tag.to_string();
        self.with_hap(move |mut hap| {
            if !hap.context.tags.contains(&tag) {
                hap.context.tags.push(tag.clone());
            }
            hap
        })
    }

    /// Set the display colour of all haps.
    pub fn with_color(self, color: &str) -> Self {
        let color = color.to_string();
        self.with_hap(move |mut hap| {
            hap.context.color = Some(color.clone());
            hap
        })
    }

    /// Add a source location to all haps.
    pub fn with_location(self, location: crate::hap::Location) -> Self {
        self.with_hap(move |mut hap| {
            hap.context.locations.push(location.clone());
            hap
        })
    }

    /// Append a trigger callback to all haps. Earlier callbacks fire
    /// before later ones.
    pub fn on_trigger(self, f: Arc<crate::runtime::TriggerFn>) -> Self {
        self.with_hap(move |mut hap| {
            hap.context.on_trigger.push(f.clone());
            hap
        })
    }

    // ============================================
    // Utility methods
    // ============================================

    /// Query the first cycle and return the haps.
    pub fn first_cycle(&self) -> Vec<Hap<T>> {
        self.query_arc(Fraction::from_integer(0), Fraction::from_integer(1))
    }

    /// Get the values from the first cycle.
    pub fn first_cycle_values(&self) -> Vec<T> {
        self.first_cycle().into_iter().map(|h| h.value).collect()
    }
}

// ============================================
// Pattern constructors
// ============================================

/// Create a pattern that produces no events (silence). One step per
/// cycle: the stepwise neutral of concatenation.
pub fn silence<T: Clone + Send + Sync + 'static>() -> Pattern<T> {
    gap(1)
}

/// The zero-step empty pattern. Distinct from `silence`: `nothing` takes
/// no room in stepwise concatenation.
pub fn nothing<T: Clone + Send + Sync + 'static>() -> Pattern<T> {
    gap(0)
}

/// Create a pattern that produces no events but occupies `steps` steps.
pub fn gap<T: Clone + Send + Sync + 'static>(steps: i64) -> Pattern<T> {
    Pattern {
        query: Arc::new(|_| Vec::new()),
        steps: steps_if(Fraction::from_integer(steps)),
    }
}

/// Create a pattern with a single value that repeats once per cycle.
pub fn pure<T: Clone + Send + Sync + 'static>(value: T) -> Pattern<T> {
    Pattern::with_steps(
        move |state| {
            state
                .span
                .span_cycles()
                .into_iter()
                .map(|subspan| {
                    let whole = subspan.begin.whole_cycle();
                    Hap::new(
                        Some(TimeSpan::new(whole.0, whole.1)),
                        subspan,
                        value.clone(),
                    )
                })
                .collect()
        },
        Fraction::from_integer(1),
    )
}

/// Lift a time function into a continuous pattern. Each query produces a
/// single whole-less hap whose value samples `f` at the query's begin.
pub fn signal<T, F>(f: F) -> Pattern<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Fraction) -> T + Send + Sync + 'static,
{
    Pattern::new(move |state| vec![Hap::new(None, state.span, f(state.span.begin))])
}

/// A continuous pattern with a constant value.
pub fn steady<T: Clone + Send + Sync + 'static>(value: T) -> Pattern<T> {
    signal(move |_| value.clone())
}

// ============================================
// Concatenators
// ============================================

/// Stack multiple patterns (play them simultaneously). Arm order is
/// preserved in query results.
pub fn stack<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    if patterns.is_empty() {
        return silence();
    }
    let steps = patterns
        .iter()
        .fold(None, |acc, p| steps_lcm(acc, p.steps()));
    let patterns = Arc::new(patterns);
    Pattern::new(move |state| {
        patterns
            .iter()
            .flat_map(|pat| pat.query(state))
            .collect()
    })
    .set_steps(steps)
}

/// Concatenate patterns, one per cycle.
pub fn slowcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    if patterns.is_empty() {
        return silence();
    }
    if patterns.len() == 1 {
        return patterns.into_iter().next().unwrap();
    }

    let len = patterns.len() as i64;
    let steps = patterns
        .iter()
        .fold(None, |acc, p| steps_lcm(acc, p.steps()));
    let patterns = Arc::new(patterns);

    Pattern::new(move |state| {
        let span = state.span;
        let cyc = span.begin.sam().to_integer();
        let pat = &patterns[cyc.rem_euclid(len) as usize];

        // Subtract an offset so the inner pattern walks through its own
        // cycles one at a time instead of skipping.
        let offset = Fraction::from_integer(cyc - cyc.div_euclid(len));

        pat.clone()
            .with_hap_time(move |t| t + offset)
            .query(&state.with_span(|s| s.with_time(|t| t - offset)))
    })
    .split_queries()
    .set_steps(steps)
}

/// Like slowcat, but without cycle offsetting: pattern `k mod n` is
/// queried at its natural position, so nested cats skip cycles.
pub fn slowcat_prime<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    if patterns.is_empty() {
        return silence();
    }
    let len = patterns.len() as i64;
    let patterns = Arc::new(patterns);

    Pattern::new(move |state| {
        let pat_n = state.span.begin.sam().to_integer().rem_euclid(len) as usize;
        patterns[pat_n].query(state)
    })
    .split_queries()
}

/// Concatenate patterns, all in one cycle.
pub fn fastcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    if patterns.is_empty() {
        return silence();
    }
    let len = patterns.len() as i64;
    slowcat(patterns)
        .fast(Fraction::from_integer(len))
        .set_steps(steps_if(Fraction::from_integer(len)))
}

/// Alias for fastcat.
pub fn sequence<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    fastcat(patterns)
}

/// Alias for slowcat.
pub fn cat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    slowcat(patterns)
}

/// Weighted concatenation: each pattern plays for its weight's share of
/// the cycle.
pub fn timecat<T: Clone + Send + Sync + 'static>(
    weighted: Vec<(Fraction, Pattern<T>)>,
) -> Pattern<T> {
    if weighted.is_empty() {
        return silence();
    }

    let total: Fraction = weighted
        .iter()
        .map(|(w, _)| *w)
        .fold(Fraction::zero(), |a, b| a + b);
    if total.is_zero() {
        return nothing();
    }

    let mut arms: Vec<Pattern<T>> = Vec::new();
    let mut pos = Fraction::zero();

    for (weight, pat) in weighted {
        if weight.is_zero() {
            continue;
        }
        let begin = pos / total;
        let end = (pos + weight) / total;
        arms.push(pat.compress(begin, end));
        pos = pos + weight;
    }

    stack(arms).set_steps(steps_if(total))
}

/// Play each section for its number of cycles, then loop the whole.
pub fn arrange<T: Clone + Send + Sync + 'static>(
    sections: Vec<(i64, Pattern<T>)>,
) -> Pattern<T> {
    if sections.is_empty() {
        return silence();
    }
    let total: i64 = sections.iter().map(|(cycles, _)| *cycles).sum();
    if total == 0 {
        return silence();
    }
    let weighted = sections
        .into_iter()
        .map(|(cycles, pat)| {
            let c = Fraction::from_integer(cycles);
            (c, pat.fast(c))
        })
        .collect();
    timecat(weighted).slow(Fraction::from_integer(total))
}

/// Lay out patterns on an absolute cycle timeline `[begin, end)` and loop
/// the whole arrangement.
pub fn seq_p_loop<T: Clone + Send + Sync + 'static>(
    parts: Vec<(Fraction, Fraction, Pattern<T>)>,
) -> Pattern<T> {
    let total = parts
        .iter()
        .map(|(_, e, _)| *e)
        .fold(Fraction::zero(), Fraction::max)
        .ceil();
    if total.is_zero() {
        return silence();
    }
    let parts = Arc::new(parts);

    Pattern::new(move |state| {
        let cyc = state.span.begin.sam();
        let base = (cyc / total).floor() * total;
        let local = cyc - base;
        parts
            .iter()
            .filter(|(b, e, _)| *b <= local && local < *e)
            .flat_map(|(b, _, p)| p.clone().late(base + *b).query(state))
            .collect()
    })
    .split_queries()
}

// ============================================
// Applicative operations
// ============================================

/// The generic applicative: pair up function and value haps whose parts
/// intersect, computing the combined whole with `whole_fn`.
pub fn app_whole<F, A, B, W>(
    whole_fn: W,
    pat_func: Pattern<F>,
    pat_val: Pattern<A>,
) -> Pattern<B>
where
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    W: Fn(Option<TimeSpan>, Option<TimeSpan>) -> Option<TimeSpan> + Send + Sync + 'static,
{
    let pat_func = Arc::new(pat_func);
    let pat_val = Arc::new(pat_val);

    Pattern::new(move |state| {
        let hap_funcs = pat_func.query(state);
        let hap_vals = pat_val.query(state);

        hap_funcs
            .into_iter()
            .flat_map(|hap_func| {
                hap_vals
                    .iter()
                    .filter_map(|hap_val| {
                        let part = hap_func.part.intersection(&hap_val.part)?;
                        let whole = whole_fn(hap_func.whole, hap_val.whole);
                        let value = (hap_func.value.clone())(hap_val.value.clone());
                        let context = hap_func.combine_context(hap_val);
                        Some(Hap::with_context(whole, part, value, context))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    })
}

/// Apply a pattern of functions to a pattern of values; events exist only
/// where both sides do, and wholes intersect.
pub fn app_both<F, A, B>(pat_func: Pattern<F>, pat_val: Pattern<A>) -> Pattern<B>
where
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let steps = steps_lcm(pat_func.steps(), pat_val.steps());
    app_whole(
        |a, b| match (a, b) {
            (Some(a), Some(b)) => a.intersection(&b),
            _ => None,
        },
        pat_func,
        pat_val,
    )
    .set_steps(steps)
}

/// Apply with structure from the left (function) pattern. For each
/// function hap, the value pattern is queried over the function hap's
/// whole (or part, if continuous).
pub fn app_left<F, A, B>(pat_func: Pattern<F>, pat_val: Pattern<A>) -> Pattern<B>
where
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let steps = pat_func.steps();
    let pat_func = Arc::new(pat_func);
    let pat_val = Arc::new(pat_val);

    Pattern::new(move |state| {
        let mut result = Vec::new();

        for hap_func in pat_func.query(state) {
            let hap_vals = pat_val.query(&state.set_span(hap_func.whole_or_part()));

            for hap_val in hap_vals {
                if let Some(new_part) = hap_func.part.intersection(&hap_val.part) {
                    let value = (hap_func.value.clone())(hap_val.value.clone());
                    let context = hap_func.combine_context(&hap_val);
                    result.push(Hap::with_context(hap_func.whole, new_part, value, context));
                }
            }
        }
        result
    })
    .set_steps(steps)
}

/// Apply with structure from the right (value) pattern.
pub fn app_right<F, A, B>(pat_func: Pattern<F>, pat_val: Pattern<A>) -> Pattern<B>
where
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let steps = pat_val.steps();
    let pat_func = Arc::new(pat_func);
    let pat_val = Arc::new(pat_val);

    Pattern::new(move |state| {
        let mut result = Vec::new();

        for hap_val in pat_val.query(state) {
            let hap_funcs = pat_func.query(&state.set_span(hap_val.whole_or_part()));

            for hap_func in hap_funcs {
                if let Some(new_part) = hap_func.part.intersection(&hap_val.part) {
                    let value = (hap_func.value.clone())(hap_val.value.clone());
                    let context = hap_func.combine_context(&hap_val);
                    result.push(Hap::with_context(hap_val.whole, new_part, value, context));
                }
            }
        }
        result
    })
    .set_steps(steps)
}

// ============================================
// Joins
// ============================================

/// The six ways a pattern-of-patterns collapses into a pattern. The
/// composer matrix and argument lifting dispatch through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Inner structure dominates; the outer pattern only selects.
    Inner,
    /// Outer structure dominates.
    Outer,
    /// Each inner pattern is compressed into its outer event.
    Squeeze,
    /// Inner cycles re-align to the outer onset's cycle position.
    Reset,
    /// Inner patterns restart from time zero at each outer onset.
    Restart,
    /// Inner patterns are extended to match the outer step count.
    Poly,
}

impl<T: Clone + Send + Sync + 'static> Pattern<Pattern<T>> {
    /// Flatten a pattern of patterns, using intersection for wholes.
    pub fn join(self) -> Pattern<T> {
        let outer = Arc::new(self);

        Pattern::new(move |state| {
            let outer_haps = outer.query(state);
            outer_haps
                .into_iter()
                .flat_map(|outer_hap| {
                    let inner_haps = outer_hap.value.query(&state.set_span(outer_hap.part));
                    inner_haps.into_iter().filter_map(move |inner_hap| {
                        let whole = match (&outer_hap.whole, &inner_hap.whole) {
                            (Some(a), Some(b)) => Some(a.intersection(b)?),
                            _ => None,
                        };
                        let part = outer_hap.part.intersection(&inner_hap.part)?;
                        let context = outer_hap.combine_context(&inner_hap);
                        Some(Hap::with_context(whole, part, inner_hap.value.clone(), context))
                    })
                })
                .collect()
        })
    }

    /// Flatten a pattern of patterns, taking wholes from the outer
    /// pattern.
    pub fn outer_join(self) -> Pattern<T> {
        let steps = self.steps();
        let outer = Arc::new(self);

        Pattern::new(move |state| {
            let outer_haps = outer.query(state);
            outer_haps
                .into_iter()
                .flat_map(|outer_hap| {
                    let inner_haps = outer_hap.value.query(&state.set_span(outer_hap.part));
                    inner_haps.into_iter().filter_map(move |inner_hap| {
                        let part = outer_hap.part.intersection(&inner_hap.part)?;
                        let context = outer_hap.combine_context(&inner_hap);
                        Some(Hap::with_context(
                            outer_hap.whole,
                            part,
                            inner_hap.value.clone(),
                            context,
                        ))
                    })
                })
                .collect()
        })
        .set_steps(steps)
    }

    /// Flatten a pattern of patterns, taking wholes from the inner
    /// patterns.
    pub fn inner_join(self) -> Pattern<T> {
        let steps = self.steps();
        let outer = Arc::new(self);

        Pattern::new(move |state| {
            let outer_haps = outer.query(state);
            outer_haps
                .into_iter()
                .flat_map(|outer_hap| {
                    let inner_haps = outer_hap.value.query(&state.set_span(outer_hap.part));
                    inner_haps.into_iter().filter_map(move |inner_hap| {
                        let part = outer_hap.part.intersection(&inner_hap.part)?;
                        let context = outer_hap.combine_context(&inner_hap);
                        Some(Hap::with_context(
                            inner_hap.whole,
                            part,
                            inner_hap.value.clone(),
                            context,
                        ))
                    })
                })
                .collect()
        })
        .set_steps(steps)
    }

    /// Squeeze inner patterns to fit their outer events: one cycle of the
    /// inner pattern is mapped onto each outer event's whole.
    pub fn squeeze_join(self) -> Pattern<T> {
        let steps = self.steps();
        let outer = Arc::new(self.discrete_only());

        Pattern::new(move |state| {
            let outer_haps = outer.query(state);
            outer_haps
                .into_iter()
                .flat_map(|outer_hap| {
                    let focused = outer_hap
                        .value
                        .clone()
                        .focus_span(outer_hap.whole_or_part());

                    let inner_haps = focused.query(&state.set_span(outer_hap.part));
                    inner_haps.into_iter().filter_map(move |inner_hap| {
                        let whole = match (&inner_hap.whole, &outer_hap.whole) {
                            (Some(iw), Some(ow)) => Some(iw.intersection(ow)?),
                            _ => None,
                        };
                        let part = inner_hap.part.intersection(&outer_hap.part)?;
                        let context = outer_hap.combine_context(&inner_hap);
                        Some(Hap::with_context(whole, part, inner_hap.value.clone(), context))
                    })
                })
                .collect()
        })
        .set_steps(steps)
    }

    /// Re-align each inner pattern so its cycle start coincides with the
    /// outer onset.
    pub fn reset_join(self) -> Pattern<T> {
        self.trigger_join(false)
    }

    /// Restart each inner pattern from its time zero at each outer onset.
    pub fn restart_join(self) -> Pattern<T> {
        self.trigger_join(true)
    }

    fn trigger_join(self, restart: bool) -> Pattern<T> {
        let steps = self.steps();
        let outer = Arc::new(self.discrete_only());

        Pattern::new(move |state| {
            let outer_haps = outer.query(state);
            outer_haps
                .into_iter()
                .flat_map(|outer_hap| {
                    let begin = outer_hap.whole_or_part().begin;
                    let shift = if restart { begin } else { begin.cycle_pos() };
                    let inner = outer_hap.value.clone().late(shift);

                    let inner_haps = inner.query(&state.set_span(outer_hap.part));
                    inner_haps.into_iter().filter_map(move |inner_hap| {
                        let whole = match (&inner_hap.whole, &outer_hap.whole) {
                            (Some(iw), Some(ow)) => Some(iw.intersection(ow)?),
                            _ => None,
                        };
                        let part = inner_hap.part.intersection(&outer_hap.part)?;
                        let context = outer_hap.combine_context(&inner_hap);
                        Some(Hap::with_context(whole, part, inner_hap.value.clone(), context))
                    })
                })
                .collect()
        })
        .set_steps(steps)
    }

    /// Extend each inner pattern to the outer step count, then join with
    /// outer structure.
    pub fn poly_join(self) -> Pattern<T> {
        let outer_steps = self.steps();
        match outer_steps {
            Some(os) => self
                .fmap(move |p: Pattern<T>| match p.steps() {
                    Some(is) if !is.is_zero() => p.extend(os / is),
                    _ => p,
                })
                .outer_join()
                .set_steps(Some(os)),
            None => self.outer_join(),
        }
    }

    /// Dispatch to one of the six joins.
    pub fn join_via(self, kind: JoinKind) -> Pattern<T> {
        match kind {
            JoinKind::Inner => self.inner_join(),
            JoinKind::Outer => self.outer_join(),
            JoinKind::Squeeze => self.squeeze_join(),
            JoinKind::Reset => self.reset_join(),
            JoinKind::Restart => self.restart_join(),
            JoinKind::Poly => self.poly_join(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Bind: apply a function that returns a pattern to each value.
    pub fn bind<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Pattern<U> + Send + Sync + Clone + 'static,
    {
        self.fmap(f).join()
    }

    /// Outer bind: like bind but preserves structure from outer.
    pub fn outer_bind<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Pattern<U> + Send + Sync + Clone + 'static,
    {
        self.fmap(f).outer_join()
    }

    /// Inner bind: like bind but preserves structure from inner.
    pub fn inner_bind<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Pattern<U> + Send + Sync + Clone + 'static,
    {
        self.fmap(f).inner_join()
    }

    /// Squeeze bind: like bind but squeezes inner to outer events.
    pub fn squeeze_bind<U, F>(self, f: F) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Pattern<U> + Send + Sync + Clone + 'static,
    {
        self.fmap(f).squeeze_join()
    }

    /// Lift a pattern-valued argument: each value of `arg` selects a
    /// transformed copy of this pattern, collapsed with `join`. The
    /// subject's step count is preserved.
    pub fn apply_with<A, F>(self, arg: Pattern<A>, join: JoinKind, f: F) -> Pattern<T>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, Pattern<T>) -> Pattern<T> + Send + Sync + Clone + 'static,
    {
        let steps = self.steps();
        let subject = self;
        arg.fmap(move |a| f(a, subject.clone()))
            .join_via(join)
            .set_steps(steps)
    }
}

// ============================================
// Euclidean rhythm patterns
// ============================================

/// Generate a Euclidean rhythm pattern: `pulses` evenly distributed over
/// `steps`.
pub fn euclid<T: Clone + Send + Sync + 'static>(pulses: i64, steps: i64, value: T) -> Pattern<T> {
    let pattern = bjorklund(pulses.max(0) as usize, steps.max(0) as usize);
    let patterns: Vec<Pattern<T>> = pattern
        .into_iter()
        .map(|b| {
            if b {
                pure(value.clone())
            } else {
                silence()
            }
        })
        .collect();
    fastcat(patterns)
}

/// Generate a Euclidean rhythm pattern with rotation.
pub fn euclid_rot<T: Clone + Send + Sync + 'static>(
    pulses: i64,
    steps: i64,
    rotation: i64,
    value: T,
) -> Pattern<T> {
    euclid(pulses, steps, value).late(Fraction::new(rotation, steps))
}

/// Bjorklund's algorithm for Euclidean rhythms.
fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    if steps == 0 {
        return vec![];
    }
    if pulses >= steps {
        return vec![true; steps];
    }
    if pulses == 0 {
        return vec![false; steps];
    }

    let mut pattern: Vec<Vec<bool>> = Vec::new();
    let mut remainder: Vec<Vec<bool>> = Vec::new();

    for _ in 0..pulses {
        pattern.push(vec![true]);
    }
    for _ in 0..(steps - pulses) {
        remainder.push(vec![false]);
    }

    while remainder.len() > 1 {
        let min_len = pattern.len().min(remainder.len());
        let mut new_pattern = Vec::new();

        for i in 0..min_len {
            let mut combined = pattern[i].clone();
            combined.extend(remainder[i].clone());
            new_pattern.push(combined);
        }

        let new_remainder = if pattern.len() > remainder.len() {
            pattern[min_len..].to_vec()
        } else {
            remainder[min_len..].to_vec()
        };

        pattern = new_pattern;
        remainder = new_remainder;
    }

    for r in remainder {
        pattern.push(r);
    }

    pattern.into_iter().flatten().collect()
}

// ============================================
// Additional utility patterns
// ============================================

/// Create a pattern of integers from 0 to n-1.
pub fn run(n: i64) -> Pattern<i64> {
    let patterns: Vec<Pattern<i64>> = (0..n).map(pure).collect();
    fastcat(patterns)
}

/// Create a pattern of integers from start to end (exclusive).
pub fn iota(start: i64, end: i64) -> Pattern<i64> {
    let patterns: Vec<Pattern<i64>> = (start..end).map(pure).collect();
    fastcat(patterns)
}

/// Continuous pattern of the current query time.
pub fn time() -> Pattern<Fraction> {
    signal(|t| t)
}
