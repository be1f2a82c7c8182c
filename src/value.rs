//! Scalar values
//!
//! The closed set of types a calibration entry can hold, and the typed
//! lookup result returned by reads.

use serde::{Deserialize, Serialize};

/// A typed calibration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Value {
    /// Payload bytes as the validation layer sees them
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Str(s) => s.as_bytes().to_vec(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// A Rust type that maps onto exactly one `Value` variant.
///
/// Reads go through this trait so a value stored as one type is never
/// returned as another.
pub trait Scalar: Sized {
    /// `None` when `value` holds a different variant
    fn from_value(value: Value) -> Option<Self>;
}

impl Scalar for i32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl Scalar for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Scalar for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of a typed read.
///
/// `value` is always usable: it holds the caller's default whenever the
/// stored value could not be returned. `found` reports whether the key
/// exists in the namespace, not whether the read produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub value: T,
    pub found: bool,
}

impl<T> Lookup<T> {
    pub(crate) fn found(value: T) -> Self {
        Self { value, found: true }
    }

    pub(crate) fn missing(default: T) -> Self {
        Self {
            value: default,
            found: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
