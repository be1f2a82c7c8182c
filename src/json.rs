//! JSON document codec
//!
//! A calibration document is one flat JSON object of scalar fields, with a
//! hard cap on its serialized size.

use serde_json::{Map, Number};

use crate::error::{CalibrationError, Result};
use crate::value::Value;

/// Fields recovered from a document
#[derive(Debug, Default)]
pub struct Document {
    /// Scalar fields, sorted by key
    pub entries: Vec<(String, Value)>,
    /// Fields whose JSON type has no scalar counterpart
    pub skipped: Vec<String>,
}

/// Serialize `entries` as a flat object no larger than `capacity` bytes.
///
/// Non-finite floats have no JSON form and are left out.
pub fn encode_document<'a, I>(entries: I, capacity: usize) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut root = Map::new();
    for (key, value) in entries {
        let field = match value {
            Value::Int(v) => serde_json::Value::Number(Number::from(*v)),
            Value::Float(v) => match Number::from_f64(f64::from(*v)) {
                Some(n) => serde_json::Value::Number(n),
                None => {
                    tracing::debug!(key, "skipping non-finite float");
                    continue;
                }
            },
            Value::Str(s) => serde_json::Value::String(s.clone()),
        };
        root.insert(key.to_string(), field);
    }

    let text = serde_json::to_string(&serde_json::Value::Object(root))
        .map_err(|e| CalibrationError::Memory(format!("serialize failed: {}", e)))?;

    if text.len() > capacity {
        return Err(CalibrationError::Memory(format!(
            "document of {} bytes exceeds capacity of {}",
            text.len(),
            capacity
        )));
    }
    Ok(text)
}

/// Parse a flat object of at most `capacity` bytes.
///
/// Integers that fit `i32` become `Int`, every other number becomes
/// `Float`, strings become `Str`; anything else is skipped.
pub fn decode_document(text: &str, capacity: usize) -> Result<Document> {
    if text.len() > capacity {
        return Err(CalibrationError::Memory(format!(
            "document of {} bytes exceeds capacity of {}",
            text.len(),
            capacity
        )));
    }

    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CalibrationError::InvalidParam(format!("malformed JSON: {}", e)))?;

    let root = match parsed {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(CalibrationError::InvalidParam(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            )))
        }
    };

    let mut doc = Document::default();
    for (key, field) in root {
        match scalar_from_json(&field) {
            Some(value) => doc.entries.push((key, value)),
            None => doc.skipped.push(key),
        }
    }
    Ok(doc)
}

fn scalar_from_json(field: &serde_json::Value) -> Option<Value> {
    match field {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(Value::Int(v))
            } else {
                n.as_f64().map(|f| Value::Float(f as f32))
            }
        }
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
