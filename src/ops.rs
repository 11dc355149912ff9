//! Time transformations.
//!
//! Everything here preserves purity: a transform builds a new pattern
//! whose query reads the source through remapped time, and never mutates
//! the source. Invalid arguments collapse to `silence` (or `nothing` for
//! stepwise failures) and log a warning; neighbouring events are never
//! affected.

use crate::fraction::{mul_maybe, Fraction};
use crate::hap::Hap;
use crate::pattern::{
    app_left, app_right, pure, silence, slowcat, slowcat_prime, stack, steps_if, JoinKind,
    Pattern,
};
use crate::timespan::TimeSpan;
use std::sync::Arc;
use tracing::warn;

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Speed up the pattern by a factor. `fast(0)` is silence, avoiding
    /// a division by zero in the hap mapping.
    pub fn fast<N: Into<Fraction>>(self, factor: N) -> Self {
        let factor = factor.into();
        if factor.is_zero() {
            return silence();
        }
        self.with_query_time(move |t| t * factor)
            .with_hap_time(move |t| t / factor)
    }

    /// Slow down the pattern by a factor.
    pub fn slow<N: Into<Fraction>>(self, factor: N) -> Self {
        let factor = factor.into();
        if factor.is_zero() {
            return silence();
        }
        self.fast(factor.recip())
    }

    /// Shift the pattern earlier in time.
    pub fn early<N: Into<Fraction>>(self, offset: N) -> Self {
        let offset = offset.into();
        self.with_query_time(move |t| t + offset)
            .with_hap_time(move |t| t - offset)
    }

    /// Shift the pattern later in time.
    pub fn late<N: Into<Fraction>>(self, offset: N) -> Self {
        self.early(-offset.into())
    }

    /// Patternified `fast`: the factor pattern selects speeds, inner
    /// structure dominates.
    pub fn fast_with(self, factor: Pattern<Fraction>) -> Self {
        self.apply_with(factor, JoinKind::Inner, |k, p| p.fast(k))
    }

    /// Patternified `slow`.
    pub fn slow_with(self, factor: Pattern<Fraction>) -> Self {
        self.apply_with(factor, JoinKind::Inner, |k, p| p.slow(k))
    }

    /// Patternified `early`.
    pub fn early_with(self, offset: Pattern<Fraction>) -> Self {
        self.apply_with(offset, JoinKind::Inner, |o, p| p.early(o))
    }

    /// Patternified `late`.
    pub fn late_with(self, offset: Pattern<Fraction>) -> Self {
        self.apply_with(offset, JoinKind::Inner, |o, p| p.late(o))
    }

    /// Reverse the pattern within each cycle. Both wholes and parts are
    /// reflected across the cycle midpoint, endpoints swapped so spans
    /// stay ordered.
    pub fn rev(self) -> Self {
        let steps = self.steps();
        let pat = Arc::new(self);
        Pattern::new(move |state| {
            let span = state.span;
            let cycle = span.begin.sam();
            let next_cycle = span.begin.next_sam();

            let reflect = move |ts: TimeSpan| {
                let new_begin = cycle + (next_cycle - ts.end);
                let new_end = cycle + (next_cycle - ts.begin);
                TimeSpan::new(new_begin, new_end)
            };

            let haps = pat.query(&state.set_span(reflect(span)));

            haps.into_iter()
                .map(|hap| {
                    let new_part = reflect(hap.part);
                    let new_whole = hap.whole.map(reflect);
                    Hap::with_context(new_whole, new_part, hap.value, hap.context)
                })
                .collect()
        })
        .split_queries()
        .set_steps(steps)
    }

    /// Play the pattern forward, then backward.
    pub fn palindrome(self) -> Self {
        slowcat(vec![self.clone(), self.rev()])
    }

    /// Play one cycle compressed into the first `1/factor` of each cycle,
    /// with silence after. Queries that collapse onto the next cycle
    /// boundary are dropped rather than producing zero-width events.
    pub fn fast_gap<N: Into<Fraction>>(self, factor: N) -> Self {
        let factor = factor.into();
        if factor <= Fraction::zero() {
            return silence();
        }
        let factor = factor.max(Fraction::one());
        let steps = self.steps();
        let pat = Arc::new(self);

        Pattern::new(move |state| {
            let span = state.span;
            let cycle = span.begin.sam();
            let clamp = |t: Fraction| cycle + (t - cycle).min(Fraction::one());

            let qb = clamp(cycle + (span.begin - cycle) * factor);
            let qe = clamp(cycle + (span.end - cycle) * factor);
            if qb == cycle + Fraction::one() {
                return Vec::new();
            }

            let haps = pat.query(&state.set_span(TimeSpan::new(qb, qe)));
            haps.into_iter()
                .map(|hap| {
                    hap.with_span(|ts| {
                        ts.with_time(|t| {
                            let sam = t.sam();
                            sam + (t - sam) / factor
                        })
                    })
                })
                .collect()
        })
        .split_queries()
        .set_steps(steps)
    }

    /// Compress the pattern into `[begin, end]` of each cycle, silent
    /// outside. Degenerate or out-of-range intervals collapse to silence.
    pub fn compress(self, begin: Fraction, end: Fraction) -> Self {
        if begin > end
            || begin > Fraction::one()
            || end > Fraction::one()
            || begin < Fraction::zero()
            || end < Fraction::zero()
            || begin == end
        {
            warn!(%begin, %end, "compress interval is degenerate, yielding silence");
            return silence();
        }
        self.fast_gap((end - begin).recip()).late(begin)
    }

    /// `compress` with a span argument.
    pub fn compress_span(self, span: TimeSpan) -> Self {
        self.compress(span.begin, span.end)
    }

    /// Like compress but without the gap; the focus may span more than
    /// one cycle.
    pub fn focus(self, begin: Fraction, end: Fraction) -> Self {
        if begin == end {
            return silence();
        }
        self.early(begin.sam())
            .fast((end - begin).recip())
            .late(begin)
    }

    /// `focus` with a span argument: maps one cycle of the pattern onto
    /// the span. This is what squeezes inner patterns into outer events.
    pub fn focus_span(self, span: TimeSpan) -> Self {
        self.focus(span.begin, span.end)
    }

    /// Play the `[begin, end]` slice of the pattern over one full cycle.
    /// The slice is taken cycle-relatively, so zooming a changing pattern
    /// follows it cycle by cycle. Degenerate intervals yield `nothing`.
    pub fn zoom_arc(self, begin: Fraction, end: Fraction) -> Self {
        if begin >= end {
            return crate::pattern::nothing();
        }
        let duration = end - begin;
        let steps = mul_maybe(self.steps(), steps_if(duration));
        self.with_query_span(move |span| {
            span.with_cycle(|t| t * duration + begin)
        })
        .with_hap_span(move |span| {
            let sam = span.begin.sam();
            TimeSpan::new(
                sam + (span.begin - sam - begin) / duration,
                sam + (span.end - sam - begin) / duration,
            )
        })
        .split_queries()
        .set_steps(steps)
    }

    /// Alias for `zoom_arc`.
    pub fn zoom(self, begin: Fraction, end: Fraction) -> Self {
        self.zoom_arc(begin, end)
    }

    /// Repeat each event `n` times within its original span.
    pub fn ply<N: Into<Fraction>>(self, n: N) -> Self {
        let n = n.into();
        if n <= Fraction::zero() {
            return silence();
        }
        let steps = mul_maybe(self.steps(), steps_if(n));
        self.fmap(move |v| pure(v).fast(n))
            .squeeze_join()
            .set_steps(steps)
    }

    /// Patternified `ply`.
    pub fn ply_with(self, n: Pattern<Fraction>) -> Self {
        self.apply_with(n, JoinKind::Inner, |k, p| p.ply(k))
    }

    /// Repeat just the `[0, t]` portion of the pattern for the whole
    /// cycle. Negative `t` loops the tail instead.
    pub fn linger(self, t: Fraction) -> Self {
        if t.is_zero() {
            return silence();
        }
        if t < Fraction::zero() {
            self.zoom_arc(Fraction::one() + t, Fraction::one()).slow(-t)
        } else {
            self.zoom_arc(Fraction::zero(), t).slow(t)
        }
    }

    /// On cycle `c`, shift the pattern early by `c/n`, cycling through
    /// all `n` rotations.
    pub fn iter(self, n: i64) -> Self {
        self.iter_impl(n, false)
    }

    /// Like `iter` but rotating backwards.
    pub fn iter_back(self, n: i64) -> Self {
        self.iter_impl(n, true)
    }

    fn iter_impl(self, n: i64, back: bool) -> Self {
        if n <= 0 {
            return silence();
        }
        let steps = self.steps();
        let copies = (0..n)
            .map(|i| {
                let shift = Fraction::new(i, n);
                if back {
                    self.clone().late(shift)
                } else {
                    self.clone().early(shift)
                }
            })
            .collect();
        slowcat(copies).set_steps(steps)
    }

    /// Sample cycle `k` from source cycle `⌊k/n⌋`: every source cycle is
    /// held for `n` cycles.
    pub fn repeat_cycles(self, n: i64) -> Self {
        if n <= 0 {
            return silence();
        }
        let n_frac = Fraction::from_integer(n);
        let steps = self.steps();
        let pat = Arc::new(self);
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let source_cycle = (cycle / n_frac).floor();
            let delta = cycle - source_cycle;

            let new_span = state.span.with_time(|t| t - delta);
            let new_state = state.set_span(new_span);

            pat.query(&new_state)
                .into_iter()
                .map(|hap| hap.with_span(|span| span.with_time(|t| t + delta)))
                .collect()
        })
        .split_queries()
        .set_steps(steps)
    }

    /// Apply a function on cycles whose index is `0 mod n`.
    pub fn every<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if n <= 1 {
            return f(self);
        }
        let transformed = f(self.clone());
        let steps = self.steps();
        let patterns: Vec<Self> = std::iter::once(transformed)
            .chain(std::iter::repeat(self).take((n - 1) as usize))
            .collect();
        slowcat_prime(patterns).set_steps(steps)
    }

    /// Alias for `every`.
    pub fn first_of<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.every(n, f)
    }

    /// Apply a function on cycles whose index is `n-1 mod n`.
    pub fn last_of<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if n <= 1 {
            return f(self);
        }
        let transformed = f(self.clone());
        let steps = self.steps();
        let patterns: Vec<Self> = std::iter::repeat(self)
            .take((n - 1) as usize)
            .chain(std::iter::once(transformed))
            .collect();
        slowcat_prime(patterns).set_steps(steps)
    }

    /// Stack the pattern with a shifted, transformed copy of itself.
    pub fn off<F>(self, offset: Fraction, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let shifted = f(self.clone().late(offset));
        stack(vec![self, shifted])
    }

    /// Superimpose a transformation on top of the original.
    pub fn superimpose<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        stack(vec![self.clone(), f(self)])
    }

    /// Stack several transformed copies of the pattern.
    pub fn layer<F>(self, funcs: Vec<F>) -> Self
    where
        F: Fn(Self) -> Self,
    {
        stack(funcs.into_iter().map(|f| f(self.clone())).collect())
    }

    /// Apply a function where a boolean pattern is true, evaluated at
    /// query time. The value pattern keeps its structure; the boolean
    /// pattern selects between original and transformed events.
    pub fn when<F>(self, bool_pat: Pattern<bool>, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let id = |x: T| x;
        let on = bool_pat.clone().filter_values(|b| *b);
        let off = bool_pat.filter_values(|b| !*b);
        let transformed = f(self.clone());
        stack(vec![
            app_right(on.fmap(move |_| id), transformed),
            app_right(off.fmap(move |_| id), self),
        ])
    }

    /// Apply a function on cycles whose index satisfies the predicate.
    pub fn when_cycle<C, F>(self, test: C, f: F) -> Self
    where
        C: Fn(i64) -> bool + Send + Sync + 'static,
        F: FnOnce(Self) -> Self,
    {
        let pat = self.clone();
        let transformed = f(self);
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam().to_integer();
            if test(cycle) {
                transformed.query(state)
            } else {
                pat.query(state)
            }
        })
        .split_queries()
    }

    /// Keep only haps whose reference time (the whole's begin) satisfies
    /// the predicate.
    pub fn filter_when<P>(self, pred: P) -> Self
    where
        P: Fn(Fraction) -> bool + Send + Sync + 'static,
    {
        self.filter_haps(move |hap| pred(hap.whole_or_part().begin))
    }

    /// Apply a function only to the part of each cycle between `begin`
    /// and `end` (cycle positions in `[0, 1]`).
    pub fn within<F>(self, begin: Fraction, end: Fraction, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let in_window = move |t: Fraction| {
            let pos = t.cycle_pos();
            begin <= pos && pos < end
        };
        stack(vec![
            f(self.clone()).filter_when(in_window),
            self.filter_when(move |t| !in_window(t)),
        ])
    }

    /// Apply a function at a slower timescale: the pattern is slowed,
    /// transformed, then sped back up.
    pub fn inside<F>(self, factor: Fraction, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self.slow(factor)).fast(factor)
    }

    /// Apply a function at a faster timescale.
    pub fn outside<F>(self, factor: Fraction, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self.fast(factor)).slow(factor)
    }

    /// Cut `cycles` cycles out of the pattern starting at `offset`, and
    /// loop them. The mapping is a projection (cycles already inside the
    /// window map to themselves), so re-applying the same ribbon is a
    /// no-op.
    pub fn ribbon(self, offset: Fraction, cycles: Fraction) -> Self {
        if cycles <= Fraction::zero() {
            return silence();
        }
        let pat = Arc::new(self);
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let mapped = offset + (cycle - offset).modulo(cycles);
            let delta = mapped - cycle;
            pat.query(&state.with_span(|s| s.with_time(|t| t + delta)))
                .into_iter()
                .map(|hap| hap.with_span(|sp| sp.with_time(|t| t - delta)))
                .collect()
        })
        .split_queries()
    }

    /// Discretize a (typically continuous) pattern into `n` events per
    /// cycle.
    pub fn segment<N: Into<Fraction>>(self, n: N) -> Self {
        let n = n.into();
        if n <= Fraction::zero() {
            return silence();
        }
        self.struct_(pure(true).fast(n)).set_steps(steps_if(n))
    }

    /// Patternified `segment`.
    pub fn segment_with(self, n: Pattern<Fraction>) -> Self {
        self.apply_with(n, JoinKind::Inner, |k, p| p.segment(k))
    }

    /// Take structure (and steps) from a boolean pattern, keeping values
    /// from this one. False events produce nothing.
    pub fn struct_(self, bool_pat: Pattern<bool>) -> Self {
        let funcs = bool_pat.fmap(|b| move |v: T| if b { Some(v) } else { None });
        app_left(funcs, self)
            .filter_values(Option::is_some)
            .fmap(|v| v.unwrap())
    }

    /// Keep this pattern's structure, masked by a boolean pattern: events
    /// survive only where the mask is true.
    pub fn mask(self, bool_pat: Pattern<bool>) -> Self {
        let funcs = bool_pat.fmap(|b| move |v: T| if b { Some(v) } else { None });
        app_right(funcs, self)
            .filter_values(Option::is_some)
            .fmap(|v| v.unwrap())
    }

    /// Re-align this pattern's cycle to each onset of the trigger
    /// pattern (cycle position only).
    pub fn reset(self, trig: Pattern<bool>) -> Self {
        let pat = self;
        trig.filter_values(|b| *b)
            .fmap(move |_| pat.clone())
            .reset_join()
    }

    /// Restart this pattern from its time zero at each onset of the
    /// trigger pattern.
    pub fn restart(self, trig: Pattern<bool>) -> Self {
        let pat = self;
        trig.filter_values(|b| *b)
            .fmap(move |_| pat.clone())
            .restart_join()
    }

    /// Split the cycle into `n` slices; on cycle `c`, apply `f` to slice
    /// `c mod n` only. Source cycles are held for `n` cycles so every
    /// slice of the same content gets transformed once per rotation.
    pub fn chunk<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.chunk_impl(n, false, false, f)
    }

    /// Like `chunk`, rotating backwards.
    pub fn chunk_back<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.chunk_impl(n, true, false, f)
    }

    /// Like `chunk`, but without holding source cycles.
    pub fn fast_chunk<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.chunk_impl(n, false, true, f)
    }

    fn chunk_impl<F>(self, n: i64, back: bool, fast_: bool, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if n <= 0 {
            warn!(n, "chunk size must be positive, yielding silence");
            return silence();
        }
        let binary = rotating_mask(n, back);
        let pat = if fast_ { self } else { self.repeat_cycles(n) };
        pat.when(binary, f)
    }

    /// Chunk through a rotating binary mask: the masked slice is
    /// transformed and stacked with the unmasked remainder.
    pub fn chunk_into<F>(self, n: i64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if n <= 0 {
            warn!(n, "chunk size must be positive, yielding silence");
            return silence();
        }
        let binary = rotating_mask(n, false);
        let inverted = binary.clone().fmap(|b| !b);
        stack(vec![
            f(self.clone().mask(binary)),
            self.mask(inverted),
        ])
    }
}

/// A boolean sequence that is true in slice `c mod n` on cycle `c`.
fn rotating_mask(n: i64, back: bool) -> Pattern<bool> {
    let mut bools = vec![false; n as usize];
    bools[0] = true;
    let seq = crate::pattern::fastcat(bools.into_iter().map(pure).collect());
    if back {
        seq.iter_back(n)
    } else {
        seq.iter(n)
    }
}
