//! # weft
//!
//! A temporal pattern algebra: musical (or any time-varying) structures
//! described as pure functions from time spans to sets of timed events,
//! with combinators to transform, compose, align, randomize and join
//! them.
//!
//! ## Core Concepts
//!
//! - **Pattern**: A function from time to events. Patterns can be
//!   transformed, combined, and queried to produce events.
//! - **Hap**: An event (happening) with a value active during a timespan.
//! - **Fraction**: Rational numbers for precise timing within cycles.
//! - **TimeSpan**: An arc of time with begin and end points.
//!
//! There is no scheduler and no clock in here: a host samples a pattern
//! over successive windows with [`Pattern::query_arc`] and receives the
//! discrete events that fall inside.
//!
//! ## Example
//!
//! ```rust
//! use weft::*;
//!
//! // Four events per cycle.
//! let pat = sequence(vec![pure(1), pure(2), pure(3), pure(4)]);
//! assert_eq!(pat.first_cycle().len(), 4);
//!
//! // Transform it: double the values, play twice as fast.
//! let faster = pat.fmap(|x| x * 2).fast(Fraction::from_integer(2));
//! assert_eq!(faster.first_cycle().len(), 8);
//! ```

pub mod compose;
pub mod fraction;
pub mod hap;
pub mod ops;
pub mod pattern;
pub mod runtime;
pub mod signal;
pub mod slice;
pub mod state;
pub mod stepwise;
pub mod timespan;
pub mod value;

// Re-export core types
pub use fraction::{gcd, lcm, mul_maybe, Fraction};
pub use hap::{defragment_haps, sort_haps_by_part, Context, Hap, Location};
pub use pattern::{
    app_both, app_left, app_right, app_whole, arrange, cat, euclid, euclid_rot, fastcat, gap,
    iota, nothing, pure, run, seq_p_loop, sequence, signal, silence, slowcat, slowcat_prime,
    stack, steady, time, timecat, JoinKind, Pattern,
};
pub use state::State;
pub use timespan::TimeSpan;
pub use value::{ControlMap, Value, ValueOp};

pub use compose::MixMode;
pub use runtime::{
    canonical_control, compute_steps, control_value, ctrl, register_control, reify,
    set_compute_steps, set_parser, ParseError, ParserFn, TriggerFn, TriggerTime,
};
pub use signal::{
    berlin, brand, brand_by, choose, choose_cycles, choose_with, cosine, cosine2, irand, isaw,
    isaw2, itri, itri2, perlin, perlin_with, rand, randcat, range, saw, saw2, sine, sine2,
    square, square2, time_to_int_seed, time_to_rand, time_to_rands, tri, tri2, wchoose,
    wrandcat, xorwise,
};
pub use slice::{ArpMode, Slices};
pub use stepwise::{
    polymeter, stack_by, stack_centre, stack_left, stack_right, stepalt, stepcat,
    stepcat_weighted, tour, zip,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fraction::Fraction;
    pub use crate::hap::{sort_haps_by_part, Context, Hap};
    pub use crate::pattern::{
        app_both, app_left, app_right, cat, euclid, euclid_rot, fastcat, gap, iota, nothing,
        pure, run, sequence, signal, silence, slowcat, stack, steady, timecat, JoinKind,
        Pattern,
    };
    pub use crate::runtime::reify;
    pub use crate::signal::{
        brand, choose, irand, perlin, rand, randcat, range, saw, sine, square, tri,
    };
    pub use crate::state::State;
    pub use crate::stepwise::{polymeter, stepcat, zip};
    pub use crate::timespan::TimeSpan;
    pub use crate::value::{ControlMap, Value};
}
