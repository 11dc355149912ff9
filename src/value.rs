//! Dynamic values carried by control patterns.
//!
//! Most combinators are generic over the event value type, but the
//! composer matrix and the control layer need a common currency: numbers,
//! strings, booleans and named-control records that can be merged
//! field-wise. `Value` is that currency and `ControlMap` is the record
//! type that flows through sample-slicing and control patterns.

use crate::fraction::Fraction;
use std::collections::BTreeMap;
use std::fmt;

/// A dynamic value: the payload of control patterns and the operand type
/// of the composer matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Fraction(Fraction),
    String(String),
    Bool(bool),
    Map(ControlMap),
}

/// A record of named controls. Ordered so queries are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlMap(pub BTreeMap<String, Value>);

impl ControlMap {
    pub fn new() -> Self {
        ControlMap(BTreeMap::new())
    }

    /// A one-entry record.
    pub fn single(key: &str, value: Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.to_string(), value);
        ControlMap(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Right-biased union: keys from `other` win, keys present on only
    /// one side are preserved.
    pub fn union(&self, other: &ControlMap) -> ControlMap {
        let mut map = self.0.clone();
        for (k, v) in &other.0 {
            map.insert(k.clone(), v.clone());
        }
        ControlMap(map)
    }

    /// Union applying `op` where both sides define a key.
    pub fn union_with<F>(&self, other: &ControlMap, op: F) -> Option<ControlMap>
    where
        F: Fn(&Value, &Value) -> Option<Value>,
    {
        let mut map = self.0.clone();
        for (k, v) in &other.0 {
            let merged = match self.0.get(k) {
                Some(existing) => op(existing, v)?,
                None => v.clone(),
            };
            map.insert(k.clone(), merged);
        }
        Some(ControlMap(map))
    }

    /// A numeric field, coerced to f64 if present.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

impl Value {
    /// Coerce to a float if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Fraction(f) => Some(f.to_f64()),
            _ => None,
        }
    }

    /// Coerce to an integer if the value is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            Value::Fraction(f) => Some(f.to_integer()),
            _ => None,
        }
    }

    /// Integer coercion for bitwise operators: numbers truncate, numeric
    /// strings parse, everything else is a contained failure.
    pub fn parse_numeral(&self) -> Option<i64> {
        match self {
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Bool(b) => Some(*b as i64),
            other => other.as_i64(),
        }
    }

    /// Truthiness for the logical operators: zero, empty string, false
    /// and empty records are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Fraction(f) => !f.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Map(m) => !m.0.is_empty(),
        }
    }
}

/// The binary operations of the composer matrix. Each returns `None` for
/// operand types it cannot combine; the event carrying the result is then
/// dropped rather than corrupting the rest of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Band,
    Bor,
    Bxor,
    Blshift,
    Brshift,
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Ne,
    And,
    Or,
    Set,
    Keep,
    KeepIf,
}

impl ValueOp {
    /// Apply the operation to two values. Records compose field-wise:
    /// keys present on both sides are combined with the operation, the
    /// rest are preserved.
    pub fn apply(self, a: &Value, b: &Value) -> Option<Value> {
        use Value::*;
        // Record handling comes first so every op distributes over maps.
        match (a, b) {
            (Map(ma), Map(mb)) => {
                return match self {
                    ValueOp::Set => Some(Map(ma.union(mb))),
                    ValueOp::Keep => Some(Map(mb.union(ma))),
                    ValueOp::KeepIf => {
                        if b.is_truthy() {
                            Some(a.clone())
                        } else {
                            None
                        }
                    }
                    op => ma.union_with(mb, |x, y| op.apply(x, y)).map(Map),
                };
            }
            (Map(ma), scalar) if self.distributes() => {
                let mut out = BTreeMap::new();
                for (k, v) in &ma.0 {
                    out.insert(k.clone(), self.apply(v, scalar)?);
                }
                return Some(Map(ControlMap(out)));
            }
            (scalar, Map(mb)) if self.distributes() => {
                let mut out = BTreeMap::new();
                for (k, v) in &mb.0 {
                    out.insert(k.clone(), self.apply(scalar, v)?);
                }
                return Some(Map(ControlMap(out)));
            }
            _ => {}
        }

        match self {
            ValueOp::Add => match (a, b) {
                (Integer(x), Integer(y)) => Some(Integer(x + y)),
                (Fraction(x), Fraction(y)) => Some(Fraction(*x + *y)),
                (String(x), String(y)) => Some(String(format!("{x}{y}"))),
                _ => Some(Float(a.as_f64()? + b.as_f64()?)),
            },
            ValueOp::Sub => match (a, b) {
                (Integer(x), Integer(y)) => Some(Integer(x - y)),
                (Fraction(x), Fraction(y)) => Some(Fraction(*x - *y)),
                _ => Some(Float(a.as_f64()? - b.as_f64()?)),
            },
            ValueOp::Mul => match (a, b) {
                (Integer(x), Integer(y)) => Some(Integer(x * y)),
                (Fraction(x), Fraction(y)) => Some(Fraction(*x * *y)),
                _ => Some(Float(a.as_f64()? * b.as_f64()?)),
            },
            ValueOp::Div => {
                let y = b.as_f64()?;
                if y == 0.0 {
                    return None;
                }
                match (a, b) {
                    (Fraction(x), Fraction(y)) => Some(Fraction(*x / *y)),
                    _ => Some(Float(a.as_f64()? / y)),
                }
            }
            ValueOp::Mod => match (a, b) {
                (Integer(x), Integer(y)) if *y != 0 => Some(Integer(x.rem_euclid(*y))),
                _ => {
                    let y = b.as_f64()?;
                    if y == 0.0 {
                        None
                    } else {
                        Some(Float(a.as_f64()?.rem_euclid(y)))
                    }
                }
            },
            ValueOp::Pow => Some(Float(a.as_f64()?.powf(b.as_f64()?))),
            ValueOp::Band => Some(Integer(a.parse_numeral()? & b.parse_numeral()?)),
            ValueOp::Bor => Some(Integer(a.parse_numeral()? | b.parse_numeral()?)),
            ValueOp::Bxor => Some(Integer(a.parse_numeral()? ^ b.parse_numeral()?)),
            ValueOp::Blshift => Some(Integer(a.parse_numeral()? << b.parse_numeral()?)),
            ValueOp::Brshift => Some(Integer(a.parse_numeral()? >> b.parse_numeral()?)),
            ValueOp::Lt => Some(Bool(a.as_f64()? < b.as_f64()?)),
            ValueOp::Gt => Some(Bool(a.as_f64()? > b.as_f64()?)),
            ValueOp::Lte => Some(Bool(a.as_f64()? <= b.as_f64()?)),
            ValueOp::Gte => Some(Bool(a.as_f64()? >= b.as_f64()?)),
            ValueOp::Eq => Some(Bool(a == b)),
            ValueOp::Ne => Some(Bool(a != b)),
            ValueOp::And => Some(if a.is_truthy() { b.clone() } else { a.clone() }),
            ValueOp::Or => Some(if a.is_truthy() { a.clone() } else { b.clone() }),
            ValueOp::Set => Some(b.clone()),
            ValueOp::Keep => Some(a.clone()),
            ValueOp::KeepIf => {
                if b.is_truthy() {
                    Some(a.clone())
                } else {
                    None
                }
            }
        }
    }

    /// Whether the op distributes a scalar over record fields.
    fn distributes(self) -> bool {
        !matches!(self, ValueOp::Set | ValueOp::Keep | ValueOp::KeepIf)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Fraction> for Value {
    fn from(f: Fraction) -> Self {
        Value::Fraction(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ControlMap> for Value {
    fn from(m: ControlMap) -> Self {
        Value::Map(m)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Fraction(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.0.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_add() {
        assert_eq!(
            ValueOp::Add.apply(&Value::Integer(2), &Value::Integer(3)),
            Some(Value::Integer(5))
        );
        assert_eq!(
            ValueOp::Add.apply(&Value::Integer(2), &Value::Float(0.5)),
            Some(Value::Float(2.5))
        );
    }

    #[test]
    fn test_add_rejects_mismatched_types() {
        assert_eq!(
            ValueOp::Sub.apply(&Value::from("a"), &Value::Integer(1)),
            None
        );
    }

    #[test]
    fn test_map_union_is_right_biased() {
        let mut a = ControlMap::new();
        a.insert("s", Value::from("bd"));
        a.insert("gain", Value::Float(0.5));
        let mut b = ControlMap::new();
        b.insert("gain", Value::Float(0.9));
        b.insert("pan", Value::Float(0.2));

        let set = ValueOp::Set
            .apply(&Value::Map(a.clone()), &Value::Map(b.clone()))
            .unwrap();
        match set {
            Value::Map(m) => {
                assert_eq!(m.get("s"), Some(&Value::from("bd")));
                assert_eq!(m.get("gain"), Some(&Value::Float(0.9)));
                assert_eq!(m.get("pan"), Some(&Value::Float(0.2)));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_map_add_composes_fieldwise() {
        let a = ControlMap::single("note", Value::Integer(60));
        let b = ControlMap::single("note", Value::Integer(7));
        let out = ValueOp::Add
            .apply(&Value::Map(a), &Value::Map(b))
            .unwrap();
        assert_eq!(out, Value::Map(ControlMap::single("note", Value::Integer(67))));
    }

    #[test]
    fn test_scalar_distributes_over_map() {
        let a = ControlMap::single("note", Value::Integer(60));
        let out = ValueOp::Add
            .apply(&Value::Map(a), &Value::Integer(12))
            .unwrap();
        assert_eq!(out, Value::Map(ControlMap::single("note", Value::Integer(72))));
    }

    #[test]
    fn test_keepif() {
        assert_eq!(
            ValueOp::KeepIf.apply(&Value::Integer(1), &Value::Bool(true)),
            Some(Value::Integer(1))
        );
        assert_eq!(
            ValueOp::KeepIf.apply(&Value::Integer(1), &Value::Bool(false)),
            None
        );
    }

    #[test]
    fn test_parse_numeral() {
        assert_eq!(Value::from("42").parse_numeral(), Some(42));
        assert_eq!(Value::Float(3.9).parse_numeral(), Some(3));
        assert_eq!(Value::from("x").parse_numeral(), None);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(
            ValueOp::Bor.apply(&Value::Integer(5), &Value::from("2")),
            Some(Value::Integer(7))
        );
        assert_eq!(
            ValueOp::Blshift.apply(&Value::Integer(1), &Value::Integer(4)),
            Some(Value::Integer(16))
        );
    }
}
