//! # calstore
//!
//! A persistent key-value calibration store for embedded devices, with:
//! - Typed scalar entries (i32, f32, string) in a named namespace
//! - Transparent value encryption under a passphrase-derived key
//! - Version and timestamp metadata for staleness checks
//! - Batch grouping of writes
//! - Flat JSON import/export with a fixed document capacity
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CalibrationStore                        │
//! │        (lifecycle, typed get/set, metadata, batch)          │
//! └──────┬───────────────────┬───────────────────┬──────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Validation  │     │   Cipher    │     │    JSON     │
//! │ (key/value) │     │ (GCM / ECB) │     │  (codec)    │
//! └─────────────┘     └──────┬──────┘     └─────────────┘
//!                            │
//!                            ▼
//!                   ┌─────────────────┐
//!                   │    KvBackend    │
//!                   │ (file / memory) │
//!                   └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use calstore::{CalibrationStore, MemoryBackend};
//!
//! let mut store = CalibrationStore::new(MemoryBackend::new());
//! store.begin("calib").unwrap();
//! store.set_value("offset_x", 12).unwrap();
//! assert_eq!(store.get_value("offset_x", 0).value, 12);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod batch;
pub mod cipher;
pub mod clock;
pub mod config;
pub mod error;
pub mod json;
pub mod logging;
pub mod store;
pub mod validation;
pub mod value;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{FileBackend, KvBackend, MemoryBackend, StoredValue, ValueType};
pub use cipher::{CipherEngine, CipherMode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BatchMode, StoreConfig};
pub use error::{CalibrationError, ErrorCode, Result};
pub use logging::DebugLevel;
pub use store::{CalibrationStore, DEFAULT_NAMESPACE, TIMESTAMP_KEY, VERSION_KEY};
pub use validation::{validate_key, validate_value};
pub use value::{Lookup, Scalar, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of calstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
