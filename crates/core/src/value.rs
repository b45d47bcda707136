//! Value types for the datatable
//!
//! This module defines:
//! - Value: closed enum over every storable attribute category
//! - FromValue: typed extraction used by the facade's defaulted reads
//!
//! ## Value Model
//!
//! The Value enum has exactly 8 variants:
//! - Nil, Bool, Int, Long, Float, Double, Str, Blob
//!
//! ### Type Rules
//!
//! - Eight variants only; the encoder is exhaustive over them
//! - No implicit coercions: `Int(1) != Long(1)`, `Float(1.0) != Double(1.0)`
//! - `Blob` bytes are not `Str` text
//! - Float/Double use IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - `Nil` is a real variant, not an error: lookups for unset keys return it
//!
//! ## Classification
//!
//! Storing a plain value picks the narrowest matching variant via the `From`
//! conversions below (bool → Bool, i8/i16/i32 → Int, i64 → Long, f32 → Float,
//! f64 → Double, text → Str). Arbitrary structured payloads go through
//! [`Value::from_serialize`], which classifies to Blob, or to Nil when the
//! payload cannot be serialized. Classification is total and never panics.

use serde::{Deserialize, Serialize};

/// A single typed attribute value
///
/// Different variants are NEVER equal, even when numerically identical:
/// `Int(1) != Long(1)`. Float equality follows IEEE-754 semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Absent sentinel: "no value stored under this key"
    Nil,
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer (also holds widened i8/i16 inputs)
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point (IEEE-754)
    Float(f32),
    /// 64-bit floating point (IEEE-754)
    Double(f64),
    /// UTF-8 string
    Str(String),
    /// Opaque serialized payload
    Blob(Vec<u8>),
}

// IEEE-754 float semantics: NaN != NaN, -0.0 == 0.0
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            // Different variants are never equal
            _ => false,
        }
    }
}

impl Value {
    /// Get the variant name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Str(_) => "Str",
            Value::Blob(_) => "Blob",
        }
    }

    /// Check if this is the absent sentinel
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32 if this is an Int value
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64 if this is a Long value
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f32 if this is a Float value
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as f64 if this is a Double value
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a Str value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[u8] if this is a Blob value
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Classify an arbitrary serializable payload as a Blob
    ///
    /// Totality: a payload that fails to serialize classifies as Nil rather
    /// than surfacing an error, keeping single-key writes infallible.
    pub fn from_serialize<T: Serialize>(payload: &T) -> Value {
        match bincode::serialize(payload) {
            Ok(bytes) => Value::Blob(bytes),
            Err(_) => Value::Nil,
        }
    }

    /// Decode a Blob back into a typed payload
    ///
    /// Returns None for non-Blob variants and for payloads that do not
    /// decode as `T`. Type mismatch is not an error on this path.
    pub fn to_deserialize<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        match self {
            Value::Blob(bytes) => bincode::deserialize(bytes).ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "blob({} bytes)", b.len()),
        }
    }
}

// ============================================================================
// From implementations: the total classification function
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i8> for Value {
    fn from(i: i8) -> Self {
        Value::Int(i as i32)
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Value::Int(i as i32)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

// ============================================================================
// Typed extraction for defaulted reads
// ============================================================================

/// Extract a concrete type from a stored value
///
/// Implementations match the exact variant: asking for `i32` where a `Long`
/// is stored yields None, and the facade degrades to the caller's default.
pub trait FromValue: Sized {
    /// Extract `Self` from a value, or None on variant mismatch
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_long()
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_double()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_blob().map(<[u8]>::to_vec)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
