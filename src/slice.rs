//! Sample slicing operators.
//!
//! These operate on control records carrying `begin`/`end` fields
//! (positions in the underlying sample, 0..1). Slicing composes: taking
//! a slice of an already-sliced value narrows the existing window.

use crate::fraction::Fraction;
use crate::pattern::{fastcat, pure, silence, Pattern};
use crate::value::{ControlMap, Value};

/// Narrow a record's `begin`/`end` window to the `[b, e]` sub-range of
/// its current window. Missing fields default to the full sample.
fn merge_window(v: &ControlMap, b: f64, e: f64) -> ControlMap {
    let old_begin = v.get_f64("begin").unwrap_or(0.0);
    let old_end = v.get_f64("end").unwrap_or(1.0);
    let width = old_end - old_begin;
    let mut out = v.clone();
    out.insert("begin", Value::Float(old_begin + b * width));
    out.insert("end", Value::Float(old_begin + e * width));
    out
}

/// How to cut a sample: into `n` equal slices, or at explicit boundary
/// positions in `[0, 1]`.
#[derive(Debug, Clone)]
pub enum Slices {
    Count(i64),
    Bounds(Vec<f64>),
}

impl Slices {
    fn count(&self) -> i64 {
        match self {
            Slices::Count(n) => *n,
            Slices::Bounds(b) => (b.len() as i64 - 1).max(0),
        }
    }

    fn window(&self, i: i64) -> Option<(f64, f64)> {
        match self {
            Slices::Count(n) => {
                if *n <= 0 {
                    return None;
                }
                let i = i.rem_euclid(*n);
                Some((i as f64 / *n as f64, (i + 1) as f64 / *n as f64))
            }
            Slices::Bounds(bounds) => {
                let n = bounds.len() as i64 - 1;
                if n <= 0 {
                    return None;
                }
                let i = i.rem_euclid(n) as usize;
                Some((bounds[i], bounds[i + 1]))
            }
        }
    }
}

impl Pattern<ControlMap> {
    /// Replace each event with `n` sub-events in sequence, each playing a
    /// successive `1/n` of the event's sample window.
    pub fn chop(self, n: i64) -> Self {
        if n <= 0 {
            return silence();
        }
        self.squeeze_bind(move |v| {
            let arms: Vec<Pattern<ControlMap>> = (0..n)
                .map(|i| {
                    pure(merge_window(
                        &v,
                        i as f64 / n as f64,
                        (i + 1) as f64 / n as f64,
                    ))
                })
                .collect();
            fastcat(arms)
        })
    }

    /// Cycle through `n` progressive sample positions: each repetition of
    /// the pattern plays the next `1/n` of the sample.
    pub fn striate(self, n: i64) -> Self {
        if n <= 0 {
            return silence();
        }
        let arms: Vec<Pattern<ControlMap>> = (0..n)
            .map(|i| {
                let b = i as f64 / n as f64;
                let e = (i + 1) as f64 / n as f64;
                self.clone().fmap(move |v| merge_window(&v, b, e))
            })
            .collect();
        fastcat(arms)
    }

    /// Select sample slices by index. Structure comes from the index
    /// pattern; each event's record gets the slice window plus a
    /// `_slices` count for downstream use.
    pub fn slice(self, slices: Slices, index: Pattern<i64>) -> Self {
        let count = slices.count();
        if count <= 0 {
            return silence();
        }
        let pat = self;
        index.outer_bind(move |i| {
            let window = slices.window(i);
            let pat = pat.clone();
            match window {
                Some((b, e)) => pat.fmap(move |v| {
                    let mut out = v.clone();
                    out.insert("begin", Value::Float(b));
                    out.insert("end", Value::Float(e));
                    out.insert("_slices", Value::Integer(count));
                    out
                }),
                None => silence(),
            }
        })
    }

    /// Like `slice`, but re-speeds each slice so it lasts exactly as long
    /// as its event. Reads `cps` from the query controls and plays in
    /// cycle units.
    pub fn splice(self, slices: Slices, index: Pattern<i64>) -> Self {
        let count = slices.count();
        if count <= 0 {
            return silence();
        }
        self.slice(slices, index).with_haps(move |haps, state| {
            let cps = state.cps();
            haps.into_iter()
                .map(|hap| {
                    let duration = hap.whole_or_part().duration().to_f64();
                    if duration == 0.0 {
                        return hap;
                    }
                    hap.with_value(|mut v| {
                        let old_speed = v.get_f64("speed").unwrap_or(1.0);
                        v.insert(
                            "speed",
                            Value::Float(cps / count as f64 / duration * old_speed),
                        );
                        v.insert("unit", Value::from("c"));
                        v
                    })
                })
                .collect()
        })
    }

    /// Make each event's sample window fit the event's duration exactly.
    pub fn fit(self) -> Self {
        self.with_haps(|haps, state| {
            let cps = state.cps();
            haps.into_iter()
                .map(|hap| {
                    let duration = hap.whole_or_part().duration().to_f64();
                    if duration == 0.0 {
                        return hap;
                    }
                    hap.with_value(|mut v| {
                        let begin = v.get_f64("begin").unwrap_or(0.0);
                        let end = v.get_f64("end").unwrap_or(1.0);
                        v.insert("speed", Value::Float(cps * (end - begin) / duration));
                        v.insert("unit", Value::from("c"));
                        v
                    })
                })
                .collect()
        })
    }

    /// Slow the pattern by `k` and play samples at `cps/k` in cycle
    /// units, so a `k`-cycle loop fits exactly.
    pub fn loop_at(self, k: Fraction) -> Self {
        if k.is_zero() {
            return silence();
        }
        self.slow(k).with_haps(move |haps, state| {
            let speed = state.cps() / k.to_f64();
            haps.into_iter()
                .map(|hap| {
                    hap.with_value(|mut v| {
                        v.insert("speed", Value::Float(speed));
                        v.insert("unit", Value::from("c"));
                        v
                    })
                })
                .collect()
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Zoom on slice `i mod n` of the *pattern* (not the sample) for each
    /// event of the index pattern.
    pub fn bite(self, n: i64, index: Pattern<i64>) -> Self {
        if n <= 0 {
            return silence();
        }
        let pat = self;
        index.squeeze_bind(move |i| {
            let i = i.rem_euclid(n);
            pat.clone()
                .zoom_arc(Fraction::new(i, n), Fraction::new(i + 1, n))
        })
    }
}

/// Arpeggio orderings over chord values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpMode {
    Up,
    Down,
    UpDown,
    DownUp,
}

impl ArpMode {
    /// Parse a mode name; unknown names play upward.
    pub fn from_name(name: &str) -> ArpMode {
        match name {
            "down" => ArpMode::Down,
            "updown" => ArpMode::UpDown,
            "downup" => ArpMode::DownUp,
            _ => ArpMode::Up,
        }
    }

    fn order(self, len: usize) -> Vec<usize> {
        match self {
            ArpMode::Up => (0..len).collect(),
            ArpMode::Down => (0..len).rev().collect(),
            ArpMode::UpDown => {
                let mut order: Vec<usize> = (0..len).collect();
                if len > 2 {
                    order.extend((1..len - 1).rev());
                }
                order
            }
            ArpMode::DownUp => {
                let mut order: Vec<usize> = (0..len).rev().collect();
                if len > 2 {
                    order.extend(1..len - 1);
                }
                order
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<Vec<T>> {
    /// Unfold chord values into sequences of notes, squeezed into each
    /// chord event.
    pub fn arp(self, mode: ArpMode) -> Pattern<T> {
        self.squeeze_bind(move |notes| {
            if notes.is_empty() {
                return silence();
            }
            let arms: Vec<Pattern<T>> = mode
                .order(notes.len())
                .into_iter()
                .map(|i| pure(notes[i].clone()))
                .collect();
            fastcat(arms)
        })
    }
}
