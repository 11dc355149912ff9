//! The composer matrix: every binary value operation crossed with every
//! structural mix mode.
//!
//! All 168 methods funnel through one kernel, `compose_with`, which picks
//! the applicative or join matching the mix mode and applies the value
//! operation over the cross-product of events. Operations that cannot
//! combine their operands yield `None`, and the offending event is
//! dropped -- `keepif` relies on this to prune.

use crate::pattern::{app_both, app_left, app_right, Pattern};
use crate::value::{Value, ValueOp};

/// How the two patterns' structures combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixMode {
    /// Structure from the left (this) pattern.
    In,
    /// Structure from the right (other) pattern.
    Out,
    /// Structure from both; events exist only where both do.
    Mix,
    /// The right pattern is squeezed into each left event.
    Squeeze,
    /// The left pattern is squeezed into each right event.
    SqueezeOut,
    /// The left pattern re-aligns to right onsets (cycle position).
    Reset,
    /// The left pattern restarts from zero at right onsets.
    Restart,
    /// The right pattern is extended to the left's step count.
    Poly,
}

fn prune(pat: Pattern<Option<Value>>) -> Pattern<Value> {
    let steps = pat.steps();
    pat.filter_values(Option::is_some)
        .fmap(|v| v.unwrap())
        .set_steps(steps)
}

impl Pattern<Value> {
    /// The matrix kernel: combine with `other` using `op`, mixing
    /// structures per `how`.
    pub fn compose_with(self, other: Pattern<Value>, op: ValueOp, how: MixMode) -> Pattern<Value> {
        match how {
            MixMode::In => prune(app_left(
                self.fmap(move |a: Value| move |b: Value| op.apply(&a, &b)),
                other,
            )),
            MixMode::Out => prune(app_right(
                self.fmap(move |a: Value| move |b: Value| op.apply(&a, &b)),
                other,
            )),
            MixMode::Mix => prune(app_both(
                self.fmap(move |a: Value| move |b: Value| op.apply(&a, &b)),
                other,
            )),
            MixMode::Squeeze => prune(
                self.fmap(move |a: Value| other.clone().fmap(move |b| op.apply(&a, &b)))
                    .squeeze_join(),
            ),
            MixMode::SqueezeOut => prune(
                other
                    .fmap(move |b: Value| self.clone().fmap(move |a| op.apply(&a, &b)))
                    .squeeze_join(),
            ),
            MixMode::Reset => prune(
                other
                    .fmap(move |b: Value| self.clone().fmap(move |a| op.apply(&a, &b)))
                    .reset_join(),
            ),
            MixMode::Restart => prune(
                other
                    .fmap(move |b: Value| self.clone().fmap(move |a| op.apply(&a, &b)))
                    .restart_join(),
            ),
            MixMode::Poly => prune(
                self.fmap(move |a: Value| other.clone().fmap(move |b| op.apply(&a, &b)))
                    .poly_join(),
            ),
        }
    }
}

// One macro arm per operation; the default spelling takes structure from
// the left, matching the `in` mix mode.
macro_rules! composers {
    ($( $op:expr =>
        $base:ident, $out:ident, $mix:ident, $squeeze:ident,
        $squeezeout:ident, $reset:ident, $restart:ident, $poly:ident; )*) => {
        impl Pattern<Value> {
            $(
                pub fn $base(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::In)
                }
                pub fn $out(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Out)
                }
                pub fn $mix(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Mix)
                }
                pub fn $squeeze(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Squeeze)
                }
                pub fn $squeezeout(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::SqueezeOut)
                }
                pub fn $reset(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Reset)
                }
                pub fn $restart(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Restart)
                }
                pub fn $poly(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.compose_with(other, $op, MixMode::Poly)
                }
            )*
        }
    };
}

composers! {
    ValueOp::Add => add, add_out, add_mix, add_squeeze, add_squeezeout, add_reset, add_restart, add_poly;
    ValueOp::Sub => sub, sub_out, sub_mix, sub_squeeze, sub_squeezeout, sub_reset, sub_restart, sub_poly;
    ValueOp::Mul => mul, mul_out, mul_mix, mul_squeeze, mul_squeezeout, mul_reset, mul_restart, mul_poly;
    ValueOp::Div => div, div_out, div_mix, div_squeeze, div_squeezeout, div_reset, div_restart, div_poly;
    ValueOp::Mod => modulo, modulo_out, modulo_mix, modulo_squeeze, modulo_squeezeout, modulo_reset, modulo_restart, modulo_poly;
    ValueOp::Pow => pow, pow_out, pow_mix, pow_squeeze, pow_squeezeout, pow_reset, pow_restart, pow_poly;
    ValueOp::Band => band, band_out, band_mix, band_squeeze, band_squeezeout, band_reset, band_restart, band_poly;
    ValueOp::Bor => bor, bor_out, bor_mix, bor_squeeze, bor_squeezeout, bor_reset, bor_restart, bor_poly;
    ValueOp::Bxor => bxor, bxor_out, bxor_mix, bxor_squeeze, bxor_squeezeout, bxor_reset, bxor_restart, bxor_poly;
    ValueOp::Blshift => blshift, blshift_out, blshift_mix, blshift_squeeze, blshift_squeezeout, blshift_reset, blshift_restart, blshift_poly;
    ValueOp::Brshift => brshift, brshift_out, brshift_mix, brshift_squeeze, brshift_squeezeout, brshift_reset, brshift_restart, brshift_poly;
    ValueOp::Lt => lt, lt_out, lt_mix, lt_squeeze, lt_squeezeout, lt_reset, lt_restart, lt_poly;
    ValueOp::Gt => gt, gt_out, gt_mix, gt_squeeze, gt_squeezeout, gt_reset, gt_restart, gt_poly;
    ValueOp::Lte => lte, lte_out, lte_mix, lte_squeeze, lte_squeezeout, lte_reset, lte_restart, lte_poly;
    ValueOp::Gte => gte, gte_out, gte_mix, gte_squeeze, gte_squeezeout, gte_reset, gte_restart, gte_poly;
    ValueOp::Eq => eq, eq_out, eq_mix, eq_squeeze, eq_squeezeout, eq_reset, eq_restart, eq_poly;
    ValueOp::Ne => ne, ne_out, ne_mix, ne_squeeze, ne_squeezeout, ne_reset, ne_restart, ne_poly;
    ValueOp::And => and, and_out, and_mix, and_squeeze, and_squeezeout, and_reset, and_restart, and_poly;
    ValueOp::Or => or, or_out, or_mix, or_squeeze, or_squeezeout, or_reset, or_restart, or_poly;
    ValueOp::Set => set, set_out, set_mix, set_squeeze, set_squeezeout, set_reset, set_restart, set_poly;
    ValueOp::Keep => keep, keep_out, keep_mix, keep_squeeze, keep_squeezeout, keep_reset, keep_restart, keep_poly;
    ValueOp::KeepIf => keepif, keepif_out, keepif_mix, keepif_squeeze, keepif_squeezeout, keepif_reset, keepif_restart, keepif_poly;
}
