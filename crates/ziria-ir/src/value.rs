//! Ground scalar values.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A ground scalar value.
///
/// Arrays and records are not values: they stay in expression form
/// (`ValArr`, `StructLit`) so partly-reduced data can coexist with concrete
/// elements. The integer payload is a 64-bit approximation of the
/// mathematical integer of the semantics; the width lives in the
/// surrounding type tag and is applied only by casts.
///
/// `Bit` and `Bool` are distinct values; only an explicit cast converts.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bit(bool),
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl Value {
    /// Return a human-readable kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bit(_) => "bit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
        }
    }

    /// Get as boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as bit, if this is a bit value.
    pub fn as_bit(&self) -> Option<bool> {
        match self {
            Value::Bit(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as double, if this is a double value.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

// Doubles compare and hash by bit pattern so expressions containing them can
// key the guess memo maps. The dynamic comparison operators use IEEE
// comparison separately.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bit(a), Value::Bit(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Unit => 0u8.hash(state),
            Value::Bit(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Bool(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            Value::Int(n) => {
                3u8.hash(state);
                n.hash(state);
            }
            Value::Double(d) => {
                4u8.hash(state);
                d.to_bits().hash(state);
            }
            Value::Str(s) => {
                5u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bit(b) => write!(f, "'{}", if *b { 1 } else { 0 }),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    write!(f, "{:.1}", d)
                } else {
                    write!(f, "{}", d)
                }
            }
            Value::Str(s) => write!(f, "\"{}\"", s.escape_default()),
        }
    }
}
