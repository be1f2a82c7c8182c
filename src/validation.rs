//! Validation Layer
//!
//! Pure predicates over key names and value payloads. The store only runs
//! them on writes when `strict_validation` is enabled; callers may invoke
//! them directly at any time.

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 15;

/// Maximum value payload size in bytes
pub const MAX_VALUE_SIZE: usize = 4096;

/// Check a key: 1..=15 characters, each ASCII alphanumeric or `_`.
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Check a value payload: 1..=4096 bytes.
pub fn validate_value(value: &[u8]) -> bool {
    (1..=MAX_VALUE_SIZE).contains(&value.len())
}

