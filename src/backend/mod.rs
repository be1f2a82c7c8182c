//! Backend Module
//!
//! Durable key-value namespaces the store persists into.
//!
//! ## Responsibilities
//! - Bind to one named partition at a time
//! - Typed put/get of stored values, existence checks, removal, wipe
//! - Key enumeration and entry-budget accounting
//!
//! ## Implementations
//! - `MemoryBackend`: shared in-memory partitions, for tests and hosts
//!   without flash
//! - `FileBackend`: one checksummed file per namespace on disk

mod file;
mod memory;

use serde::{Deserialize, Serialize};

use crate::batch::Operation;
use crate::error::Result;
use crate::value::Value;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Default entry budget of a namespace (20 KiB partition, 32-byte entries)
pub const DEFAULT_MAX_ENTRIES: usize = 630;

/// A value as persisted by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Int(i32),
    Float(f32),
    Str(String),
    ULong(u64),
    Blob(Vec<u8>),
}

/// Tag of a `StoredValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Str,
    ULong,
    Blob,
}

impl StoredValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            StoredValue::Int(_) => ValueType::Int,
            StoredValue::Float(_) => ValueType::Float,
            StoredValue::Str(_) => ValueType::Str,
            StoredValue::ULong(_) => ValueType::ULong,
            StoredValue::Blob(_) => ValueType::Blob,
        }
    }

    /// The plaintext scalar, if this is one
    pub fn into_scalar(self) -> Option<Value> {
        match self {
            StoredValue::Int(v) => Some(Value::Int(v)),
            StoredValue::Float(v) => Some(Value::Float(v)),
            StoredValue::Str(v) => Some(Value::Str(v)),
            StoredValue::ULong(_) | StoredValue::Blob(_) => None,
        }
    }
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(v) => StoredValue::Int(v),
            Value::Float(v) => StoredValue::Float(v),
            Value::Str(v) => StoredValue::Str(v),
        }
    }
}

/// A durable namespace store.
///
/// Every method except `open` requires an open namespace; implementations
/// return `CalibrationError::NotInitialized` (or `false`/empty for the
/// infallible queries) otherwise.
pub trait KvBackend {
    /// Bind to `namespace`, creating it if needed. Closes any open namespace.
    fn open(&mut self, namespace: &str) -> Result<()>;

    /// Release the open namespace. No-op when none is open.
    fn close(&mut self);

    fn put(&mut self, key: &str, value: StoredValue) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    fn exists(&self, key: &str) -> bool;

    /// Returns whether the key was present
    fn remove(&mut self, key: &str) -> Result<bool>;

    fn clear(&mut self) -> Result<()>;

    /// All keys of the open namespace, sorted
    fn keys(&self) -> Vec<String>;

    fn type_of(&self, key: &str) -> Option<ValueType>;

    fn free_entries(&self) -> usize;

    fn used_entries(&self) -> usize;

    /// Apply `ops` in order as one unit.
    ///
    /// The default applies them one by one; implementations with a cheaper
    /// atomic path override it.
    fn apply(&mut self, ops: &[Operation]) -> Result<()> {
        for op in ops {
            match op {
                Operation::Put { key, value } => self.put(key, value.clone())?,
                Operation::Remove { key } => {
                    self.remove(key)?;
                }
                Operation::Clear => self.clear()?,
            }
        }
        Ok(())
    }
}
