//! Dynamic argument and return values.
//!
//! Surrogates are driven through a narrow, untyped boundary: every actual argument,
//! injected output value and configured return value travels as a [`Value`]. The
//! declared type of a parameter slot travels separately as a [`ValueKind`], which is what
//! numeric normalization keys on (see [`numeric`]).

use std::fmt;

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::{err_msg, DecoyError};

pub mod numeric;

// ============================================================================
// VALUE
// ============================================================================

/// Represents a value crossing the surrogate boundary.
///
/// # Examples
///
/// ```rust
/// use decoy::value::Value;
/// let n = Value::from(3i64);
/// assert_eq!(n.type_name(), "I64");
/// let s = Value::from("hello");
/// assert_eq!(s.type_name(), "Text");
/// assert!(Value::default().is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    List(Vec<Value>),
    Map(OrdMap<String, Value>),
}

impl Value {
    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::I8(_) => "I8",
            Value::I16(_) => "I16",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::U8(_) => "U8",
            Value::U16(_) => "U16",
            Value::U32(_) => "U32",
            Value::U64(_) => "U64",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::Text(_) => "Text",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    /// The kind this value naturally carries. `Nil` has no kind of its own.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Any,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Text(_) => ValueKind::Text,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns the integer payload widened to `i128`, for any integer width.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I8(n) => Some(n.into()),
            Value::I16(n) => Some(n.into()),
            Value::I32(n) => Some(n.into()),
            Value::I64(n) => Some(n.into()),
            Value::U8(n) => Some(n.into()),
            Value::U16(n) => Some(n.into()),
            Value::U32(n) => Some(n.into()),
            Value::U64(n) => Some(n.into()),
            _ => None,
        }
    }

    /// Returns the float payload widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(x) => Some(x.into()),
            Value::F64(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Number of elements of a collection value (list items or map entries).
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Renders the value the way it appears in a call description: text is quoted,
    /// characters are single-quoted, everything else uses `Display`.
    pub fn describe(&self) -> String {
        match self {
            Value::Text(s) => format!("{s:?}"),
            Value::Char(c) => format!("{c:?}"),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::describe).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.describe()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::I8(n) => write!(f, "{n}"),
            Value::I16(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::U8(n) => write!(f, "{n}"),
            Value::U16(n) => write!(f, "{n}"),
            Value::U32(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::F32(x) => write!(f, "{x}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.describe()),
        }
    }
}

// ============================================================================
// CONVERSIONS INTO VALUE
// ============================================================================

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::U64(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::I64(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl<T: Into<Value> + Clone> From<OrdMap<String, T>> for Value {
    fn from(map: OrdMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

// ============================================================================
// CONVERSIONS OUT OF VALUE
// ============================================================================

/// Converts a [`Value`] back into caller-owned storage.
///
/// Integer targets accept any integer width whose value fits; float targets accept any
/// float width. Used by slot writers to store injected output/reference values.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, DecoyError>;
}

fn conversion_error(value: &Value, target: &str) -> DecoyError {
    err_msg!(
        Conversion,
        "cannot store {} ({}) into a {} slot",
        value.describe(),
        value.type_name(),
        target
    )
}

macro_rules! impl_from_value_numeric {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, DecoyError> {
                    match numeric::coerce(ValueKind::$kind, &value) {
                        Some(Value::$kind(n)) => Ok(n),
                        _ => Err(conversion_error(&value, stringify!($ty))),
                    }
                }
            }
        )*
    };
}

impl_from_value_numeric! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(conversion_error(&other, "bool")),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(conversion_error(&other, "char")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(conversion_error(&other, "String")),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, DecoyError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(conversion_error(&other, "Vec")),
        }
    }
}

// ============================================================================
// VALUE KINDS
// ============================================================================

/// The declared type of a parameter slot or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Untyped slot; values are compared by their own representation.
    Any,
    /// No value (`()` returns).
    Unit,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    List,
    Map,
}

/// Coarse grouping of kinds that may be bound to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFamily {
    Any,
    Unit,
    Bool,
    Char,
    Numeric,
    Text,
    List,
    Map,
}

impl ValueKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueKind::I8
                | ValueKind::I16
                | ValueKind::I32
                | ValueKind::I64
                | ValueKind::U8
                | ValueKind::U16
                | ValueKind::U32
                | ValueKind::U64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ValueKind::F32 | ValueKind::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Kinds whose slots accept `Nil`.
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            ValueKind::Any | ValueKind::Text | ValueKind::List | ValueKind::Map
        )
    }

    pub fn family(self) -> KindFamily {
        match self {
            ValueKind::Any => KindFamily::Any,
            ValueKind::Unit => KindFamily::Unit,
            ValueKind::Bool => KindFamily::Bool,
            ValueKind::Char => KindFamily::Char,
            ValueKind::Text => KindFamily::Text,
            ValueKind::List => KindFamily::List,
            ValueKind::Map => KindFamily::Map,
            _ => KindFamily::Numeric,
        }
    }

    /// Whether a constraint typed for `self` may be bound to a slot declared as `slot`.
    /// Numeric widths are interchangeable; `Any` binds to everything.
    pub fn is_compatible_with(self, slot: ValueKind) -> bool {
        let (a, b) = (self.family(), slot.family());
        a == KindFamily::Any || b == KindFamily::Any || a == b
    }

    /// The value a lenient surrogate returns when nothing matched.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Char => Value::Char('\0'),
            ValueKind::I8 => Value::I8(0),
            ValueKind::I16 => Value::I16(0),
            ValueKind::I32 => Value::I32(0),
            ValueKind::I64 => Value::I64(0),
            ValueKind::U8 => Value::U8(0),
            ValueKind::U16 => Value::U16(0),
            ValueKind::U32 => Value::U32(0),
            ValueKind::U64 => Value::U64(0),
            ValueKind::F32 => Value::F32(0.0),
            ValueKind::F64 => Value::F64(0.0),
            ValueKind::Any
            | ValueKind::Unit
            | ValueKind::Text
            | ValueKind::List
            | ValueKind::Map => Value::Nil,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Any => "any",
            ValueKind::Unit => "unit",
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Text => "text",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a Rust type onto the [`ValueKind`] its slots are declared with.
pub trait SlotType {
    const KIND: ValueKind;
}

macro_rules! impl_slot_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl SlotType for $ty {
                const KIND: ValueKind = ValueKind::$kind;
            }
        )*
    };
}

impl_slot_type! {
    () => Unit,
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Value => Any,
}

impl SlotType for &str {
    const KIND: ValueKind = ValueKind::Text;
}

impl<T> SlotType for Vec<T> {
    const KIND: ValueKind = ValueKind::List;
}

impl<T> SlotType for &[T] {
    const KIND: ValueKind = ValueKind::List;
}

impl<T> SlotType for OrdMap<String, T> {
    const KIND: ValueKind = ValueKind::Map;
}

impl<T: SlotType> SlotType for Option<T> {
    const KIND: ValueKind = T::KIND;
}
