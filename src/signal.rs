//! Continuous signals and deterministic randomness.
//!
//! Signals are continuous patterns sampled at the query's begin point.
//! Randomness is a pure hash of time: the same query always sees the same
//! draws, so "random" patterns stay reproducible and shareable across
//! threads without any generator state.

use crate::fraction::Fraction;
use crate::pattern::{app_left, fastcat, signal, silence, Pattern};
use std::sync::Arc;

// ============================================
// Waveforms
// ============================================

/// A sawtooth rising 0 to 1 over each cycle.
pub fn saw() -> Pattern<f64> {
    signal(|t| t.cycle_pos().to_f64())
}

/// A sawtooth falling 1 to 0 over each cycle.
pub fn isaw() -> Pattern<f64> {
    signal(|t| 1.0 - t.cycle_pos().to_f64())
}

/// A sine wave in [0, 1].
pub fn sine() -> Pattern<f64> {
    signal(|t| ((t.to_f64() * std::f64::consts::TAU).sin() + 1.0) / 2.0)
}

/// A cosine wave in [0, 1].
pub fn cosine() -> Pattern<f64> {
    signal(|t| ((t.to_f64() * std::f64::consts::TAU).cos() + 1.0) / 2.0)
}

/// A triangle wave in [0, 1], peaking mid-cycle.
pub fn tri() -> Pattern<f64> {
    signal(|t| 1.0 - (2.0 * t.cycle_pos().to_f64() - 1.0).abs())
}

/// An inverted triangle wave.
pub fn itri() -> Pattern<f64> {
    signal(|t| (2.0 * t.cycle_pos().to_f64() - 1.0).abs())
}

/// A square wave: 0 for the first half of each cycle, 1 for the second.
pub fn square() -> Pattern<f64> {
    signal(|t| if t.cycle_pos().to_f64() < 0.5 { 0.0 } else { 1.0 })
}

/// Bipolar variants in [-1, 1].
pub fn saw2() -> Pattern<f64> {
    saw().to_bipolar()
}
pub fn isaw2() -> Pattern<f64> {
    isaw().to_bipolar()
}
pub fn sine2() -> Pattern<f64> {
    sine().to_bipolar()
}
pub fn cosine2() -> Pattern<f64> {
    cosine().to_bipolar()
}
pub fn tri2() -> Pattern<f64> {
    tri().to_bipolar()
}
pub fn itri2() -> Pattern<f64> {
    itri().to_bipolar()
}
pub fn square2() -> Pattern<f64> {
    square().to_bipolar()
}

impl Pattern<f64> {
    /// Map a unipolar [0, 1] signal to bipolar [-1, 1].
    pub fn to_bipolar(self) -> Self {
        self.fmap(|x| x * 2.0 - 1.0)
    }

    /// Map a bipolar [-1, 1] signal to unipolar [0, 1].
    pub fn from_bipolar(self) -> Self {
        self.fmap(|x| (x + 1.0) / 2.0)
    }

    /// Scale a [0, 1] signal to [min, max].
    pub fn range(self, min: f64, max: f64) -> Self {
        self.fmap(move |x| x * (max - min) + min)
    }
}

/// Scale a signal from [0, 1] to [min, max].
pub fn range(min: f64, max: f64, pat: Pattern<f64>) -> Pattern<f64> {
    pat.range(min, max)
}

// ============================================
// Deterministic PRNG
// ============================================

const SEED_SPACE: i64 = 536870912; // 2^29

/// One round of 32-bit xorshift, with JavaScript-style wrapping shifts so
/// seeds match across ports.
pub fn xorwise(x: i32) -> i32 {
    let a = x.wrapping_shl(13) ^ x;
    let b = (a >> 17) ^ a;
    b.wrapping_shl(5) ^ b
}

/// Hash a time to a seed: 300 cycles are stretched over the 2^29 seed
/// space, truncated, then mixed.
pub fn time_to_int_seed(t: f64) -> i32 {
    let scaled = ((t / 300.0) * SEED_SPACE as f64).trunc() as i64 % SEED_SPACE;
    xorwise(scaled as i32)
}

fn int_seed_to_rand(x: i32) -> f64 {
    (x as i64 % SEED_SPACE) as f64 / SEED_SPACE as f64
}

/// A deterministic draw in [0, 1) for a time point.
pub fn time_to_rand(t: f64) -> f64 {
    int_seed_to_rand(time_to_int_seed(t)).abs()
}

/// `n` successive draws for a time point, advancing the seed each step.
pub fn time_to_rands(t: f64, n: usize) -> Vec<f64> {
    let mut seed = time_to_int_seed(t);
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(int_seed_to_rand(seed).abs());
        seed = xorwise(seed);
    }
    out
}

/// A continuous pattern of deterministic random values in [0, 1).
pub fn rand() -> Pattern<f64> {
    signal(|t| time_to_rand(t.to_f64()))
}

/// A continuous pattern of random integers in [0, n).
pub fn irand(n: i64) -> Pattern<i64> {
    if n <= 0 {
        return silence();
    }
    signal(move |t| {
        let i = (time_to_rand(t.to_f64()) * n as f64).floor() as i64;
        i.min(n - 1)
    })
}

/// A continuous pattern of coin flips.
pub fn brand() -> Pattern<bool> {
    brand_by(0.5)
}

/// A continuous pattern of biased coin flips: true with probability `p`.
pub fn brand_by(p: f64) -> Pattern<bool> {
    signal(move |t| time_to_rand(t.to_f64()) < p)
}

// ============================================
// Perlin noise
// ============================================

fn smootherstep(x: f64) -> f64 {
    6.0 * x.powi(5) - 15.0 * x.powi(4) + 10.0 * x.powi(3)
}

/// Perlin-style noise over a pattern of times: interpolates between the
/// draws at the surrounding integers with a smootherstep curve.
pub fn perlin_with(pat: Pattern<f64>) -> Pattern<f64> {
    pat.fmap(|t| {
        let fl = t.floor();
        let a = time_to_rand(fl);
        let b = time_to_rand(fl + 1.0);
        a + smootherstep(t - fl) * (b - a)
    })
}

/// Smooth noise drifting once per cycle.
pub fn perlin() -> Pattern<f64> {
    perlin_with(signal(|t| t.to_f64()))
}

/// The ramp-only sibling of `perlin`: linear interpolation between the
/// same draws.
pub fn berlin() -> Pattern<f64> {
    signal(|t| {
        let t = t.to_f64();
        let fl = t.floor();
        let a = time_to_rand(fl);
        let b = time_to_rand(fl + 1.0);
        a + (t - fl) * (b - a)
    })
}

// ============================================
// Choosing
// ============================================

/// Index a list continuously by a [0, 1) signal.
pub fn choose_with<T: Clone + Send + Sync + 'static>(
    pat: Pattern<f64>,
    xs: Vec<T>,
) -> Pattern<T> {
    if xs.is_empty() {
        return silence();
    }
    let len = xs.len();
    pat.fmap(move |r| {
        let i = ((r * len as f64).floor() as usize).min(len - 1);
        xs[i].clone()
    })
}

/// A continuous pattern choosing randomly from a list.
pub fn choose<T: Clone + Send + Sync + 'static>(xs: Vec<T>) -> Pattern<T> {
    choose_with(rand(), xs)
}

/// Choose one value per cycle.
pub fn choose_cycles<T: Clone + Send + Sync + 'static>(xs: Vec<T>) -> Pattern<T> {
    choose_with(rand().segment(1), xs)
}

/// A continuous weighted choice: each entry is picked in proportion to
/// its weight.
pub fn wchoose<T: Clone + Send + Sync + 'static>(pairs: Vec<(T, f64)>) -> Pattern<T> {
    if pairs.is_empty() {
        return silence();
    }
    let total: f64 = pairs.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return silence();
    }
    let pairs = Arc::new(pairs);
    rand().fmap(move |r| {
        let target = r * total;
        let mut cumulative = 0.0;
        for (value, weight) in pairs.iter() {
            cumulative += weight.max(0.0);
            if target < cumulative {
                return value.clone();
            }
        }
        pairs.last().unwrap().0.clone()
    })
}

/// Play a randomly chosen pattern each cycle.
pub fn randcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    choose_cycles(patterns).inner_join()
}

/// Play a pattern each cycle, chosen by weight.
pub fn wrandcat<T: Clone + Send + Sync + 'static>(
    pairs: Vec<(Pattern<T>, f64)>,
) -> Pattern<T> {
    if pairs.is_empty() {
        return silence();
    }
    wchoose(pairs).segment(1).inner_join()
}

// ============================================
// Shuffling and degrading
// ============================================

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Split each cycle into `n` slices and play them in a random
    /// permutation, drawn once per cycle.
    pub fn shuffle(self, n: i64) -> Self {
        if n <= 0 {
            return silence();
        }
        let pat = Arc::new(self);
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let rands = time_to_rands(cycle.to_f64() + 0.5, n as usize);
            let mut order: Vec<usize> = (0..n as usize).collect();
            order.sort_by(|&a, &b| {
                rands[a]
                    .partial_cmp(&rands[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let arms: Vec<Pattern<T>> = order
                .iter()
                .map(|&i| {
                    pat.as_ref().clone().zoom_arc(
                        Fraction::new(i as i64, n),
                        Fraction::new(i as i64 + 1, n),
                    )
                })
                .collect();
            fastcat(arms).query(state)
        })
        .split_queries()
        .set_steps(crate::pattern::steps_if(Fraction::from_integer(n)))
    }

    /// Split each cycle into `n` slices and resample each slot randomly
    /// (slices may repeat or go missing, unlike `shuffle`).
    pub fn scramble(self, n: i64) -> Self {
        if n <= 0 {
            return silence();
        }
        let pat = self;
        irand(n)
            .segment(n)
            .squeeze_bind(move |i| {
                pat.clone()
                    .zoom_arc(Fraction::new(i, n), Fraction::new(i + 1, n))
            })
            .set_steps(crate::pattern::steps_if(Fraction::from_integer(n)))
    }

    /// Drop events whose associated random draw is below `prob`, using
    /// the supplied random signal.
    pub fn degrade_by_with(self, rnd: Pattern<f64>, prob: f64) -> Self {
        let funcs = self.fmap(|v| move |_r: f64| v.clone());
        app_left(funcs, rnd.filter_values(move |r| *r >= prob))
    }

    /// Randomly drop events with probability `prob`.
    pub fn degrade_by(self, prob: f64) -> Self {
        self.degrade_by_with(rand(), prob)
    }

    /// Keep exactly the events `degrade_by` would drop.
    pub fn undegrade_by(self, prob: f64) -> Self {
        self.degrade_by_with(rand().fmap(|r| 1.0 - r), prob)
    }

    /// Randomly drop half of the events.
    pub fn degrade(self) -> Self {
        self.degrade_by(0.5)
    }

    /// Keep the complementary half of `degrade`.
    pub fn undegrade(self) -> Self {
        self.undegrade_by(0.5)
    }

    /// Apply a function to a random `prob` share of events; the rest pass
    /// through. The two shares partition the original events exactly.
    pub fn sometimes_by<F>(self, prob: f64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        crate::pattern::stack(vec![
            self.clone().degrade_by(prob),
            f(self.undegrade_by(1.0 - prob)),
        ])
    }

    /// Apply a function to half of the events.
    pub fn sometimes<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.5, f)
    }

    /// Apply a function to three quarters of the events.
    pub fn often<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.75, f)
    }

    /// Apply a function to one quarter of the events.
    pub fn rarely<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.25, f)
    }

    /// Apply a function to nearly all events.
    pub fn almost_always<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.9, f)
    }

    /// Apply a function to very few events.
    pub fn almost_never<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.1, f)
    }

    /// Apply the function to every event.
    pub fn always<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(1.0, f)
    }

    /// Never apply the function.
    pub fn never<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.sometimes_by(0.0, f)
    }

    /// Apply a function on a random `prob` share of whole cycles.
    pub fn some_cycles_by<F>(self, prob: f64, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let pat = self.clone();
        let transformed = f(self);
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam().to_f64();
            if time_to_rand(cycle) < prob {
                transformed.query(state)
            } else {
                pat.query(state)
            }
        })
        .split_queries()
    }

    /// Apply a function on half of the cycles.
    pub fn some_cycles<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.some_cycles_by(0.5, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hap::sort_haps_by_part;
    use crate::pattern::{pure, run, sequence};

    #[test]
    fn test_saw_samples_begin() {
        let haps = saw().query_arc(Fraction::new(1, 4), Fraction::new(1, 2));
        assert_eq!(haps.len(), 1);
        assert!(haps[0].whole.is_none());
        assert_eq!(haps[0].value, 0.25);
    }

    #[test]
    fn test_waveform_ranges() {
        for pat in [saw(), isaw(), sine(), cosine(), tri(), itri(), square()] {
            for i in 0..16 {
                let haps = pat.query_arc(Fraction::new(i, 16), Fraction::new(i + 1, 16));
                let v = haps[0].value;
                assert!((0.0..=1.0).contains(&v), "value {v} out of range");
            }
        }
    }

    #[test]
    fn test_bipolar_conversion() {
        let haps = sine2().query_arc(Fraction::new(0, 1), Fraction::new(1, 8));
        let v = haps[0].value;
        assert!((-1.0..=1.0).contains(&v));

        let round = sine().to_bipolar().from_bipolar();
        let a = sine().query_arc(Fraction::new(1, 3), Fraction::new(1, 2))[0].value;
        let b = round.query_arc(Fraction::new(1, 3), Fraction::new(1, 2))[0].value;
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_range_scaling() {
        let pat = range(100.0, 200.0, saw());
        let v = pat.query_arc(Fraction::new(1, 2), Fraction::new(3, 4))[0].value;
        assert_eq!(v, 150.0);
    }

    #[test]
    fn test_rand_matches_hash() {
        let haps = rand().first_cycle();
        assert_eq!(haps.len(), 1);
        assert_eq!(haps[0].value, time_to_rand(0.0));
    }

    #[test]
    fn test_rand_deterministic() {
        let a = rand().query_arc(Fraction::new(3, 7), Fraction::new(5, 7));
        let b = rand().query_arc(Fraction::new(3, 7), Fraction::new(5, 7));
        assert_eq!(a[0].value, b[0].value);
        assert!((0.0..1.0).contains(&a[0].value));
    }

    #[test]
    fn test_time_to_rands_advances() {
        let rands = time_to_rands(0.5, 4);
        assert_eq!(rands.len(), 4);
        // Successive draws differ (the seed advances).
        assert!(rands.windows(2).any(|w| w[0] != w[1]));
        assert!(rands.iter().all(|r| (0.0..1.0).contains(r)));
    }

    #[test]
    fn test_irand_bounds() {
        for i in 0..8 {
            let haps = irand(4).query_arc(Fraction::new(i, 3), Fraction::new(i + 1, 3));
            let v = haps[0].value;
            assert!((0..4).contains(&v));
        }
    }

    #[test]
    fn test_brand_is_boolean() {
        let t = brand_by(1.0).first_cycle();
        assert!(t[0].value);
        let f = brand_by(0.0).first_cycle();
        assert!(!f[0].value);
    }

    #[test]
    fn test_perlin_range_and_continuity() {
        for i in 0..12 {
            let v = perlin()
                .query_arc(Fraction::new(i, 4), Fraction::new(i + 1, 4))[0]
                .value;
            assert!((0.0..1.0).contains(&v));
        }
        // At integer times the noise equals the integer draw exactly.
        let at_two = perlin().query_arc(Fraction::from_integer(2), Fraction::from_integer(3))[0]
            .value;
        assert!((at_two - time_to_rand(2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_berlin_is_linear_between_draws() {
        let a = time_to_rand(0.0);
        let b = time_to_rand(1.0);
        let mid = berlin().query_arc(Fraction::new(1, 2), Fraction::new(3, 4))[0].value;
        assert!((mid - (a + 0.5 * (b - a))).abs() < 1e-12);
    }

    #[test]
    fn test_choose_picks_from_list() {
        let pat = choose(vec!["a", "b", "c"]);
        for i in 0..10 {
            let v = pat.query_arc(Fraction::new(i, 3), Fraction::new(i + 1, 3))[0].value;
            assert!(["a", "b", "c"].contains(&v));
        }
    }

    #[test]
    fn test_choose_cycles_constant_within_cycle() {
        let pat = choose_cycles(vec![1, 2, 3, 4]);
        let haps = pat.first_cycle();
        assert_eq!(haps.len(), 1);
        assert!(haps[0].whole.is_some());
    }

    #[test]
    fn test_wchoose_certain_weight() {
        let pat = wchoose(vec![("always", 1.0), ("never", 0.0)]);
        for i in 0..6 {
            let v = pat.query_arc(Fraction::new(i, 2), Fraction::new(i + 1, 2))[0].value;
            assert_eq!(v, "always");
        }
    }

    #[test]
    fn test_randcat_plays_one_arm_per_cycle() {
        let pat = randcat(vec![pure("a"), pure("b")]);
        for c in 0..6 {
            let haps = pat.query_arc(Fraction::from_integer(c), Fraction::from_integer(c + 1));
            assert_eq!(haps.len(), 1);
            assert!(["a", "b"].contains(&haps[0].value));
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let pat = run(4).shuffle(4);
        for c in 0..4 {
            let mut values: Vec<i64> = pat
                .query_arc(Fraction::from_integer(c), Fraction::from_integer(c + 1))
                .into_iter()
                .map(|h| h.value)
                .collect();
            values.sort_unstable();
            assert_eq!(values, vec![0, 1, 2, 3], "cycle {c}");
        }
    }

    #[test]
    fn test_shuffle_deterministic() {
        let pat = run(4).shuffle(4);
        let a: Vec<i64> = sort_haps_by_part(pat.first_cycle())
            .into_iter()
            .map(|h| h.value)
            .collect();
        let b: Vec<i64> = sort_haps_by_part(pat.first_cycle())
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scramble_resamples() {
        let pat = run(4).scramble(4);
        let haps = pat.first_cycle();
        assert_eq!(haps.len(), 4);
        assert!(haps.iter().all(|h| (0..4).contains(&h.value)));
    }

    #[test]
    fn test_degrade_extremes() {
        let pat = pure("x").degrade_by(1.0);
        assert_eq!(pat.first_cycle().len(), 0);

        let pat = pure("x").degrade_by(0.0);
        let haps = pat.first_cycle();
        assert_eq!(haps.len(), 1);
        assert_eq!(haps[0].value, "x");
    }

    #[test]
    fn test_degrade_partition() {
        // degrade and undegrade split the events exactly in two.
        let pat = run(16);
        let kept = pat.clone().degrade_by(0.5).first_cycle().len();
        let dropped = pat.clone().undegrade_by(0.5).first_cycle().len();
        assert_eq!(kept + dropped, 16);
    }

    #[test]
    fn test_sometimes_by_preserves_event_count() {
        let pat = run(16).sometimes_by(0.3, |p| p.fmap(|x| x + 100));
        assert_eq!(pat.first_cycle().len(), 16);
    }

    #[test]
    fn test_always_and_never() {
        let always = sequence(vec![pure(1), pure(2)]).always(|p| p.fmap(|x| x * 10));
        assert_eq!(
            sort_haps_by_part(always.first_cycle())
                .into_iter()
                .map(|h| h.value)
                .collect::<Vec<_>>(),
            vec![10, 20]
        );
        let never = sequence(vec![pure(1), pure(2)]).never(|p| p.fmap(|x| x * 10));
        assert_eq!(
            sort_haps_by_part(never.first_cycle())
                .into_iter()
                .map(|h| h.value)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_some_cycles_by_extremes() {
        let on = pure(1).some_cycles_by(1.0, |p| p.fast(2));
        assert_eq!(on.first_cycle().len(), 2);
        let off = pure(1).some_cycles_by(0.0, |p| p.fast(2));
        assert_eq!(off.first_cycle().len(), 1);
    }
}
