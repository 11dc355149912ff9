//! The stepwise sublanguage.
//!
//! A pattern may carry `steps`: how many discrete steps it presents per
//! cycle. The operations here place, pad, slice and re-time patterns by
//! that count. Stepwise operations on a pattern without steps return
//! `nothing` -- a valid signal that the operation is inapplicable, so it
//! is not logged. `nothing` (zero steps) and `silence` (one step) stay
//! distinct throughout: only the former disappears from concatenation.

use crate::fraction::{lcm, Fraction};
use crate::pattern::{gap, nothing, silence, slowcat, stack, steps_if, timecat, Pattern};
use crate::timespan::TimeSpan;
use std::sync::Arc;

/// Concatenate patterns proportionally to their step counts. Patterns
/// without steps count as one step. The result presents the summed steps.
pub fn stepcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    let weighted = patterns
        .into_iter()
        .map(|p| (p.steps().unwrap_or_else(Fraction::one), p))
        .collect();
    timecat(weighted)
}

/// `stepcat` with explicit weights; re-exported spelling of the weighted
/// concatenator for stepwise call sites.
pub fn stepcat_weighted<T: Clone + Send + Sync + 'static>(
    weighted: Vec<(Fraction, Pattern<T>)>,
) -> Pattern<T> {
    timecat(weighted)
}

/// Align patterns to the least common multiple of their step counts, so
/// their steps line up, and stack them.
pub fn polymeter<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    let defined: Vec<Fraction> = patterns
        .iter()
        .filter_map(|p| p.steps())
        .filter(|s| !s.is_zero())
        .collect();
    let target = match lcm(&defined) {
        Some(l) => l,
        None => return nothing(),
    };
    let arms: Vec<Pattern<T>> = patterns.into_iter().map(|p| p.pace(target)).collect();
    stack(arms).set_steps(steps_if(target))
}

/// Interleave patterns step by step over one cycle: slot `j` plays arm
/// `j mod n` at step `j / n`, after pacing every arm to the common step
/// count.
pub fn zip<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    let n = patterns.len();
    if n == 0 {
        return silence();
    }
    let mut steps = Vec::with_capacity(n);
    for p in &patterns {
        match p.steps() {
            Some(s) if !s.is_zero() => steps.push(s),
            _ => return nothing(),
        }
    }
    let common = match lcm(&steps) {
        Some(l) if l.is_integer() => l,
        _ => return nothing(),
    };
    let paced: Vec<Pattern<T>> = patterns.into_iter().map(|p| p.pace(common)).collect();

    let slots = common.to_integer() * n as i64;
    let arms: Vec<(Fraction, Pattern<T>)> = (0..slots)
        .map(|j| {
            let arm = &paced[(j as usize) % n];
            let k = Fraction::from_integer(j / n as i64);
            let slice = arm
                .clone()
                .zoom_arc(k / common, (k + Fraction::one()) / common);
            (Fraction::one(), slice)
        })
        .collect();
    timecat(arms).set_steps(steps_if(Fraction::from_integer(slots)))
}

/// Insert the pivot pattern into the list at progressively earlier
/// positions, one arrangement per cycle.
pub fn tour<T: Clone + Send + Sync + 'static>(
    pivot: Pattern<T>,
    others: Vec<Pattern<T>>,
) -> Pattern<T> {
    let m = others.len();
    let rounds: Vec<Pattern<T>> = (0..=m)
        .map(|k| {
            let pos = m - k;
            let mut arms: Vec<Pattern<T>> = Vec::with_capacity(m + 1);
            arms.extend(others[..pos].iter().cloned());
            arms.push(pivot.clone());
            arms.extend(others[pos..].iter().cloned());
            stepcat(arms)
        })
        .collect();
    slowcat(rounds)
}

/// Like `stepcat`, but each slot holds a list of patterns that alternate
/// cycle by cycle.
pub fn stepalt<T: Clone + Send + Sync + 'static>(groups: Vec<Vec<Pattern<T>>>) -> Pattern<T> {
    let groups: Vec<Vec<Pattern<T>>> =
        groups.into_iter().filter(|g| !g.is_empty()).collect();
    if groups.is_empty() {
        return nothing();
    }
    // Cycle layouts repeat with period lcm of the group lengths; report
    // the first layout's step total.
    let first_total = groups
        .iter()
        .map(|g| g[0].steps().unwrap_or_else(Fraction::one))
        .fold(Fraction::zero(), |a, b| a + b);
    let groups = Arc::new(groups);

    Pattern::new(move |state| {
        let cycle = state.span.begin.sam().to_integer();
        let arms: Vec<Pattern<T>> = groups
            .iter()
            .map(|g| g[cycle.rem_euclid(g.len() as i64) as usize].clone())
            .collect();
        stepcat(arms).query(state)
    })
    .split_queries()
    .set_steps(steps_if(first_total))
}

/// Pad every arm to the longest step count with trailing gaps, so all
/// arms start together.
pub fn stack_left<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    stack_aligned(patterns, Alignment::Left)
}

/// Pad every arm with leading gaps, so all arms end together.
pub fn stack_right<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    stack_aligned(patterns, Alignment::Right)
}

/// Pad every arm on both sides, centring it.
pub fn stack_centre<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    stack_aligned(patterns, Alignment::Centre)
}

/// Pick the alignment per cycle from a pattern of names (`"left"`,
/// `"right"`, `"centre"`; anything else paces the arms to a common
/// length).
pub fn stack_by<T: Clone + Send + Sync + 'static>(
    by: Pattern<String>,
    patterns: Vec<Pattern<T>>,
) -> Pattern<T> {
    let left = stack_aligned(patterns.clone(), Alignment::Left);
    let right = stack_aligned(patterns.clone(), Alignment::Right);
    let centre = stack_aligned(patterns.clone(), Alignment::Centre);
    let expand = stack_aligned(patterns, Alignment::Expand);
    by.fmap(move |name| match name.as_str() {
        "left" => left.clone(),
        "right" => right.clone(),
        "centre" | "center" => centre.clone(),
        _ => expand.clone(),
    })
    .inner_join()
}

#[derive(Clone, Copy)]
enum Alignment {
    Left,
    Right,
    Centre,
    Expand,
}

fn stack_aligned<T: Clone + Send + Sync + 'static>(
    patterns: Vec<Pattern<T>>,
    align: Alignment,
) -> Pattern<T> {
    let longest = patterns
        .iter()
        .filter_map(|p| p.steps())
        .fold(Fraction::zero(), Fraction::max);
    if longest.is_zero() {
        return nothing();
    }
    let arms: Vec<Pattern<T>> = patterns
        .into_iter()
        .map(|p| {
            let s = match p.steps() {
                Some(s) => s,
                None => return p,
            };
            let missing = longest - s;
            if missing.is_zero() {
                return p;
            }
            let pad = |w: Fraction| gap::<T>(0).set_steps(steps_if(w));
            match align {
                Alignment::Left => stepcat_weighted(vec![(s, p), (missing, pad(missing))]),
                Alignment::Right => stepcat_weighted(vec![(missing, pad(missing)), (s, p)]),
                Alignment::Centre => {
                    let half = missing / Fraction::from_integer(2);
                    stepcat_weighted(vec![(half, pad(half)), (s, p), (half, pad(half))])
                }
                Alignment::Expand => p.pace(longest),
            }
        })
        .collect();
    stack(arms).set_steps(steps_if(longest))
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Re-time the pattern so it presents `target` steps per cycle.
    pub fn pace(self, target: Fraction) -> Self {
        let steps = match self.steps() {
            Some(s) if !s.is_zero() => s,
            _ => return nothing(),
        };
        if target.is_zero() {
            return nothing();
        }
        self.fast(target / steps).set_steps(Some(target))
    }

    /// Multiply the step count without changing the events.
    pub fn expand(self, factor: Fraction) -> Self {
        let steps = self.steps().map(|s| s * factor);
        self.set_steps(steps)
    }

    /// Divide the step count without changing the events.
    pub fn contract(self, factor: Fraction) -> Self {
        if factor.is_zero() {
            return nothing();
        }
        let steps = self.steps().map(|s| s / factor);
        self.set_steps(steps)
    }

    /// Repeat the pattern `factor` times per cycle, growing the step
    /// count to match.
    pub fn extend(self, factor: Fraction) -> Self {
        self.fast(factor).expand(factor)
    }

    /// Like `extend`, but each repetition advances through source cycles
    /// instead of replaying the same one.
    pub fn replicate(self, factor: i64) -> Self {
        let f = Fraction::from_integer(factor);
        self.repeat_cycles(factor).fast(f).expand(f)
    }

    /// Keep the first `i` steps (the last `|i|` when negative), stretched
    /// over the cycle. Zero takes nothing; `|i| >= steps` takes the whole
    /// pattern.
    pub fn take_steps(self, i: i64) -> Self {
        let steps = match self.steps() {
            Some(s) if !s.is_zero() => s,
            _ => return nothing(),
        };
        if i == 0 {
            return nothing();
        }
        let want = Fraction::from_integer(i.abs());
        if want >= steps {
            return self;
        }
        if i > 0 {
            self.zoom_arc(Fraction::zero(), want / steps)
        } else {
            self.zoom_arc(Fraction::one() - want / steps, Fraction::one())
        }
    }

    /// Discard the first `i` steps (the last `|i|` when negative). Zero
    /// discards nothing; `|i| >= steps` leaves nothing.
    pub fn drop_steps(self, i: i64) -> Self {
        let steps = match self.steps() {
            Some(s) if !s.is_zero() => s,
            _ => return nothing(),
        };
        if i == 0 {
            return self;
        }
        let cut = Fraction::from_integer(i.abs());
        if cut >= steps {
            return nothing();
        }
        if i > 0 {
            self.zoom_arc(cut / steps, Fraction::one())
        } else {
            self.zoom_arc(Fraction::zero(), (steps - cut) / steps)
        }
    }

    /// Progressively remove `n` steps from the start (the end when
    /// negative) until the pattern is exhausted, concatenating the
    /// stages.
    pub fn shrink(self, n: i64) -> Self {
        stepcat(self.shrink_stages(n))
    }

    /// The reverse accumulation of `shrink`: grow from the shortest
    /// stage back to the whole pattern.
    pub fn grow(self, n: i64) -> Self {
        let mut stages = self.shrink_stages(n);
        stages.reverse();
        stepcat(stages)
    }

    fn shrink_stages(self, n: i64) -> Vec<Self> {
        let steps = match self.steps() {
            Some(s) if !s.is_zero() => s,
            _ => return vec![nothing()],
        };
        if n == 0 {
            return vec![self];
        }
        let m = n.abs();
        let mut stages = Vec::new();
        let mut dropped: i64 = 0;
        while Fraction::from_integer(dropped) < steps {
            let cut = if n > 0 { dropped } else { -dropped };
            stages.push(self.clone().drop_steps(cut));
            dropped += m;
        }
        stages
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<Pattern<T>> {
    /// Collapse a pattern of patterns along step boundaries: the outer
    /// cycle is sliced at every outer part edge, and each slice stacks
    /// the inner patterns active there, zoomed to the portion of their
    /// whole the slice covers.
    pub fn step_join(self) -> Pattern<T> {
        let steps = self.steps();
        let outer = Arc::new(self);

        Pattern::new(move |state| {
            let cycle_begin = state.span.begin.sam();
            let cycle = TimeSpan::new(cycle_begin, cycle_begin + Fraction::one());
            let outer_haps = outer.query(&state.set_span(cycle));

            let mut edges = vec![cycle.begin, cycle.end];
            for hap in &outer_haps {
                edges.push(hap.part.begin);
                edges.push(hap.part.end);
            }
            edges.sort();
            edges.dedup();

            let mut arms: Vec<(Fraction, Pattern<T>)> = Vec::new();
            for pair in edges.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if b <= a {
                    continue;
                }
                let slices: Vec<Pattern<T>> = outer_haps
                    .iter()
                    .filter(|h| h.part.begin < b && h.part.end > a)
                    .map(|h| {
                        let whole = h.whole_or_part();
                        let d = whole.duration();
                        if d.is_zero() {
                            return nothing();
                        }
                        let rel_a = ((a - whole.begin) / d).max(Fraction::zero());
                        let rel_b = ((b - whole.begin) / d).min(Fraction::one());
                        h.value.clone().zoom_arc(rel_a, rel_b)
                    })
                    .collect();
                let content = if slices.is_empty() {
                    silence()
                } else {
                    stack(slices)
                };
                arms.push((b - a, content));
            }

            timecat(arms).query(state)
        })
        .split_queries()
        .set_steps(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hap::sort_haps_by_part;
    use crate::pattern::{fastcat, pure};

    fn values_in_order<T: Clone + Send + Sync + 'static>(pat: &Pattern<T>) -> Vec<T> {
        sort_haps_by_part(pat.first_cycle())
            .into_iter()
            .map(|h| h.value)
            .collect()
    }

    fn cycle_values<T: Clone + Send + Sync + 'static>(pat: &Pattern<T>, c: i64) -> Vec<T> {
        sort_haps_by_part(pat.query_arc(
            Fraction::from_integer(c),
            Fraction::from_integer(c + 1),
        ))
        .into_iter()
        .map(|h| h.value)
        .collect()
    }

    #[test]
    fn test_stepcat_uses_step_weights() {
        let pat = stepcat(vec![fastcat(vec![pure("a"), pure("b")]), pure("c")]);
        let haps = sort_haps_by_part(pat.first_cycle());
        assert_eq!(haps.len(), 3);
        assert_eq!(haps[0].part, TimeSpan::new(Fraction::new(0, 1), Fraction::new(1, 3)));
        assert_eq!(haps[2].part, TimeSpan::new(Fraction::new(2, 3), Fraction::new(1, 1)));
        assert_eq!(haps[2].value, "c");
        assert_eq!(pat.steps(), Some(Fraction::from_integer(3)));
    }

    #[test]
    fn test_stepcat_weighted() {
        let pat = stepcat_weighted(vec![
            (Fraction::from_integer(2), pure("a")),
            (Fraction::from_integer(1), pure("b")),
        ]);
        let haps = sort_haps_by_part(pat.first_cycle());
        assert_eq!(haps[0].part.end, Fraction::new(2, 3));
        assert_eq!(pat.steps(), Some(Fraction::from_integer(3)));
    }

    #[test]
    fn test_stepcat_skips_nothing() {
        let pat = stepcat(vec![pure("a"), nothing(), pure("b")]);
        assert_eq!(values_in_order(&pat), vec!["a", "b"]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(2)));
    }

    #[test]
    fn test_polymeter_steps_lcm() {
        let pat = polymeter(vec![
            fastcat(vec![pure("a"), pure("b")]),
            fastcat(vec![pure("c"), pure("d"), pure("e")]),
        ]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(6)));
        // Each arm unrolls to six steps.
        assert_eq!(pat.first_cycle().len(), 12);
    }

    #[test]
    fn test_polymeter_stepless_is_nothing() {
        let sig = crate::pattern::signal(|t| t.to_f64());
        let pat = polymeter(vec![sig]);
        assert_eq!(pat.first_cycle().len(), 0);
    }

    #[test]
    fn test_pace() {
        let pat = fastcat(vec![pure("a"), pure("b")]).pace(Fraction::from_integer(4));
        assert_eq!(values_in_order(&pat), vec!["a", "b", "a", "b"]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(4)));
    }

    #[test]
    fn test_pace_stepless_is_nothing() {
        let pat = crate::pattern::signal(|t| t.to_f64()).pace(Fraction::from_integer(4));
        assert_eq!(pat.first_cycle().len(), 0);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(0)));
    }

    #[test]
    fn test_take_steps() {
        let pat = crate::pattern::run(4);
        assert_eq!(values_in_order(&pat.clone().take_steps(2)), vec![0, 1]);
        assert_eq!(
            pat.clone().take_steps(2).steps(),
            Some(Fraction::from_integer(2))
        );
        assert_eq!(values_in_order(&pat.clone().take_steps(-1)), vec![3]);
        assert_eq!(pat.clone().take_steps(0).first_cycle().len(), 0);
        assert_eq!(values_in_order(&pat.take_steps(9)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_drop_steps() {
        let pat = crate::pattern::run(4);
        assert_eq!(values_in_order(&pat.clone().drop_steps(1)), vec![1, 2, 3]);
        assert_eq!(values_in_order(&pat.clone().drop_steps(-2)), vec![0, 1]);
        assert_eq!(values_in_order(&pat.clone().drop_steps(0)), vec![0, 1, 2, 3]);
        assert_eq!(pat.drop_steps(5).first_cycle().len(), 0);
    }

    #[test]
    fn test_shrink() {
        let pat = fastcat(vec![pure("a"), pure("b"), pure("c")]).shrink(1);
        assert_eq!(
            values_in_order(&pat),
            vec!["a", "b", "c", "b", "c", "c"]
        );
        assert_eq!(pat.steps(), Some(Fraction::from_integer(6)));
    }

    #[test]
    fn test_grow() {
        let pat = fastcat(vec![pure("a"), pure("b"), pure("c")]).grow(1);
        assert_eq!(
            values_in_order(&pat),
            vec!["c", "b", "c", "a", "b", "c"]
        );
    }

    #[test]
    fn test_shrink_from_end() {
        let pat = fastcat(vec![pure("a"), pure("b"), pure("c")]).shrink(-1);
        assert_eq!(
            values_in_order(&pat),
            vec!["a", "b", "c", "a", "b", "a"]
        );
    }

    #[test]
    fn test_expand_contract() {
        let pat = fastcat(vec![pure(1), pure(2)]);
        assert_eq!(
            pat.clone().expand(Fraction::from_integer(3)).steps(),
            Some(Fraction::from_integer(6))
        );
        assert_eq!(
            pat.contract(Fraction::from_integer(2)).steps(),
            Some(Fraction::from_integer(1))
        );
    }

    #[test]
    fn test_extend() {
        let pat = fastcat(vec![pure("a"), pure("b")]).extend(Fraction::from_integer(2));
        assert_eq!(values_in_order(&pat), vec!["a", "b", "a", "b"]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(4)));
    }

    #[test]
    fn test_replicate_advances_cycles() {
        let alt = crate::pattern::slowcat_prime(vec![pure("a"), pure("b")]);
        let pat = alt.replicate(2);
        // Cycle 0 repeats cycle 0 of the source twice; the source is held
        // so both repetitions see the same content.
        assert_eq!(cycle_values(&pat, 0), vec!["a", "a"]);
        assert_eq!(cycle_values(&pat, 1), vec!["b", "b"]);
    }

    #[test]
    fn test_zip_interleaves() {
        let pat = zip(vec![
            fastcat(vec![pure("a"), pure("b")]),
            fastcat(vec![pure("x"), pure("y")]),
        ]);
        assert_eq!(values_in_order(&pat), vec!["a", "x", "b", "y"]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(4)));
    }

    #[test]
    fn test_zip_uneven_arms() {
        let pat = zip(vec![
            fastcat(vec![pure("a"), pure("b")]),
            pure("x"),
        ]);
        // lcm of 2 and 1 is 2: arms paced to two steps each, four slots.
        assert_eq!(values_in_order(&pat), vec!["a", "x", "b", "x"]);
    }

    #[test]
    fn test_tour() {
        let pat = tour(pure("p"), vec![pure("a"), pure("b")]);
        assert_eq!(cycle_values(&pat, 0), vec!["a", "b", "p"]);
        assert_eq!(cycle_values(&pat, 1), vec!["a", "p", "b"]);
        assert_eq!(cycle_values(&pat, 2), vec!["p", "a", "b"]);
        assert_eq!(cycle_values(&pat, 3), vec!["a", "b", "p"]);
    }

    #[test]
    fn test_stepalt() {
        let pat = stepalt(vec![
            vec![pure("a"), pure("b")],
            vec![pure("c")],
        ]);
        assert_eq!(cycle_values(&pat, 0), vec!["a", "c"]);
        assert_eq!(cycle_values(&pat, 1), vec!["b", "c"]);
        assert_eq!(pat.steps(), Some(Fraction::from_integer(2)));
    }

    #[test]
    fn test_stack_left() {
        let pat = stack_left(vec![
            fastcat(vec![pure("a"), pure("b"), pure("c"), pure("d")]),
            fastcat(vec![pure("x"), pure("y")]),
        ]);
        let haps = sort_haps_by_part(pat.first_cycle());
        let shorts: Vec<_> = haps.iter().filter(|h| h.value == "x" || h.value == "y").collect();
        assert_eq!(shorts[0].part.begin, Fraction::new(0, 1));
        assert_eq!(shorts[1].part.end, Fraction::new(1, 2));
        assert_eq!(pat.steps(), Some(Fraction::from_integer(4)));
    }

    #[test]
    fn test_stack_right() {
        let pat = stack_right(vec![
            fastcat(vec![pure("a"), pure("b"), pure("c"), pure("d")]),
            fastcat(vec![pure("x"), pure("y")]),
        ]);
        let haps = sort_haps_by_part(pat.first_cycle());
        let shorts: Vec<_> = haps.iter().filter(|h| h.value == "x" || h.value == "y").collect();
        assert_eq!(shorts[0].part.begin, Fraction::new(1, 2));
        assert_eq!(shorts[1].part.end, Fraction::new(1, 1));
    }

    #[test]
    fn test_stack_centre() {
        let pat = stack_centre(vec![
            fastcat(vec![pure("a"), pure("b"), pure("c"), pure("d")]),
            fastcat(vec![pure("x"), pure("y")]),
        ]);
        let haps = sort_haps_by_part(pat.first_cycle());
        let shorts: Vec<_> = haps.iter().filter(|h| h.value == "x" || h.value == "y").collect();
        assert_eq!(shorts[0].part.begin, Fraction::new(1, 4));
        assert_eq!(shorts[1].part.end, Fraction::new(3, 4));
    }

    #[test]
    fn test_stack_by_selects_alignment() {
        let by = crate::pattern::slowcat_prime(vec![
            pure("left".to_string()),
            pure("right".to_string()),
        ]);
        let pat = stack_by(
            by,
            vec![
                fastcat(vec![pure("a"), pure("b"), pure("c"), pure("d")]),
                fastcat(vec![pure("x"), pure("y")]),
            ],
        );
        let c0 = sort_haps_by_part(pat.query_arc(
            Fraction::from_integer(0),
            Fraction::from_integer(1),
        ));
        let x0 = c0.iter().find(|h| h.value == "x").unwrap();
        assert_eq!(x0.part.begin, Fraction::new(0, 1));
        let c1 = sort_haps_by_part(pat.query_arc(
            Fraction::from_integer(1),
            Fraction::from_integer(2),
        ));
        let x1 = c1.iter().find(|h| h.value == "x").unwrap();
        assert_eq!(x1.part.begin, Fraction::new(3, 2));
    }

    #[test]
    fn test_step_join_single_outer() {
        let pp = pure(fastcat(vec![pure("a"), pure("b")]));
        let pat = pp.step_join();
        assert_eq!(values_in_order(&pat), vec!["a", "b"]);
    }

    #[test]
    fn test_step_join_two_outer_halves() {
        let pp = fastcat(vec![
            pure(fastcat(vec![pure("a"), pure("b")])),
            pure(pure("c")),
        ]);
        let pat = pp.step_join();
        let haps = sort_haps_by_part(pat.first_cycle());
        let values: Vec<_> = haps.iter().map(|h| h.value).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        // First half carries the squeezed two-step inner.
        assert_eq!(haps[1].part.end, Fraction::new(1, 2));
    }

    #[test]
    fn test_nothing_vs_silence_in_stepcat() {
        // `silence` occupies a step, `nothing` does not.
        let with_silence = stepcat(vec![pure("a"), silence()]);
        let with_nothing = stepcat(vec![pure("a"), nothing()]);
        let a_in_silence = sort_haps_by_part(with_silence.first_cycle());
        let a_in_nothing = sort_haps_by_part(with_nothing.first_cycle());
        assert_eq!(a_in_silence[0].part.end, Fraction::new(1, 2));
        assert_eq!(a_in_nothing[0].part.end, Fraction::new(1, 1));
    }
}
