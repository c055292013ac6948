//! Numeric normalization.
//!
//! Constraint operands are often typed by whatever the literal happened to be (`1` is an
//! `i32`), while the slot they are bound to is declared wider (`i64`). Before comparing,
//! both sides are canonicalized according to the slot's *declared* kind:
//!
//! - integer slots of any width: integers widen losslessly to `i128`; floats are not
//!   comparable with integer slots;
//! - `f32` slots: integers and floats are narrowed to `f32` precision;
//! - `f64` slots: integers and floats are widened to `f64`;
//! - `any` slots: integers widen to `i128`, floats compare at the narrower of the two
//!   widths involved, and integers never compare equal to floats.

use std::cmp::Ordering;

use super::{Value, ValueKind};

/// A value reduced to a representation that compares by value.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable<'a> {
    Nil,
    Bool(bool),
    Char(char),
    Int(i128),
    Float(f64),
    Text(&'a str),
    /// Lists and maps; compared structurally by [`equivalent`].
    Other(&'a Value),
}

/// Canonicalizes `value` for comparison inside a slot declared as `kind`.
///
/// Returns `None` when the value cannot be compared in that slot at all (a float inside an
/// integer slot).
pub fn canonicalize(kind: ValueKind, value: &Value) -> Option<Comparable<'_>> {
    if kind.is_integer() {
        if let Some(n) = value.as_i128() {
            return Some(Comparable::Int(n));
        }
        if value.as_f64().is_some() {
            return None;
        }
    }
    match kind {
        ValueKind::F32 => {
            if let Some(n) = value.as_i128() {
                return Some(Comparable::Float(f64::from(n as f32)));
            }
            if let Some(x) = value.as_f64() {
                return Some(Comparable::Float(f64::from(x as f32)));
            }
        }
        ValueKind::F64 => {
            if let Some(n) = value.as_i128() {
                return Some(Comparable::Float(n as f64));
            }
            if let Some(x) = value.as_f64() {
                return Some(Comparable::Float(x));
            }
        }
        _ => {}
    }
    Some(natural(value))
}

// Canonical form by the value's own representation.
fn natural(value: &Value) -> Comparable<'_> {
    if let Some(n) = value.as_i128() {
        return Comparable::Int(n);
    }
    match value {
        Value::Nil => Comparable::Nil,
        Value::Bool(b) => Comparable::Bool(*b),
        Value::Char(c) => Comparable::Char(*c),
        Value::F32(x) => Comparable::Float(f64::from(*x)),
        Value::F64(x) => Comparable::Float(*x),
        Value::Text(s) => Comparable::Text(s),
        other => Comparable::Other(other),
    }
}

/// Resolves the kind a pair of values is compared under. Only `any` slots depend on the
/// values themselves: two floats of different widths are compared at `f32` precision.
fn effective_kind(kind: ValueKind, a: &Value, b: &Value) -> ValueKind {
    if kind != ValueKind::Any {
        return kind;
    }
    match (a, b) {
        (Value::F32(_), Value::F32(_) | Value::F64(_)) | (Value::F64(_), Value::F32(_)) => {
            ValueKind::F32
        }
        (Value::F64(_), Value::F64(_)) => ValueKind::F64,
        _ => ValueKind::Any,
    }
}

/// Orders `actual` against `expected` inside a slot declared as `kind`.
///
/// Returns `None` when the two values are not comparable (different families, a float in
/// an integer slot, NaN, or collections).
pub fn compare(kind: ValueKind, actual: &Value, expected: &Value) -> Option<Ordering> {
    let kind = effective_kind(kind, actual, expected);
    let a = canonicalize(kind, actual)?;
    let b = canonicalize(kind, expected)?;
    match (a, b) {
        (Comparable::Nil, Comparable::Nil) => Some(Ordering::Equal),
        (Comparable::Bool(x), Comparable::Bool(y)) => Some(x.cmp(&y)),
        (Comparable::Char(x), Comparable::Char(y)) => Some(x.cmp(&y)),
        (Comparable::Int(x), Comparable::Int(y)) => Some(x.cmp(&y)),
        (Comparable::Float(x), Comparable::Float(y)) => x.partial_cmp(&y),
        (Comparable::Text(x), Comparable::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Value equality inside a slot declared as `kind`. Collections compare element-wise with
/// `any` semantics.
pub fn equivalent(kind: ValueKind, actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b.iter())
                    .all(|(x, y)| equivalent(ValueKind::Any, x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, x)| {
                    b.get(k)
                        .is_some_and(|y| equivalent(ValueKind::Any, x, y))
                })
        }
        _ => compare(kind, actual, expected) == Some(Ordering::Equal),
    }
}

/// Converts `value` into the representation of a slot declared as `kind`.
///
/// Integers are range-checked; floats may be narrowed to `f32`. `Nil` is accepted only by
/// nullable kinds. Returns `None` when the value cannot live in the slot.
pub fn coerce(kind: ValueKind, value: &Value) -> Option<Value> {
    if value.is_nil() {
        return match kind {
            ValueKind::Unit => Some(Value::Nil),
            k if k.is_nullable() => Some(Value::Nil),
            _ => None,
        };
    }
    if kind.is_integer() {
        let n = value.as_i128()?;
        return match kind {
            ValueKind::I8 => i8::try_from(n).ok().map(Value::I8),
            ValueKind::I16 => i16::try_from(n).ok().map(Value::I16),
            ValueKind::I32 => i32::try_from(n).ok().map(Value::I32),
            ValueKind::I64 => i64::try_from(n).ok().map(Value::I64),
            ValueKind::U8 => u8::try_from(n).ok().map(Value::U8),
            ValueKind::U16 => u16::try_from(n).ok().map(Value::U16),
            ValueKind::U32 => u32::try_from(n).ok().map(Value::U32),
            ValueKind::U64 => u64::try_from(n).ok().map(Value::U64),
            _ => None,
        };
    }
    match kind {
        ValueKind::Any => Some(value.clone()),
        ValueKind::F32 => value
            .as_i128()
            .map(|n| n as f32)
            .or_else(|| value.as_f64().map(|x| x as f32))
            .map(Value::F32),
        ValueKind::F64 => value
            .as_i128()
            .map(|n| n as f64)
            .or_else(|| value.as_f64())
            .map(Value::F64),
        k if k == value.kind() => Some(value.clone()),
        _ => None,
    }
}
