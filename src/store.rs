//! Calibration Store
//!
//! The orchestrator that binds a backend namespace, the cipher engine and
//! batch state into typed calibration reads and writes.
//!
//! ## Responsibilities
//! - Lifecycle: `begin(namespace)` / `end()`
//! - Typed get/set/remove over the open namespace
//! - Transparent value encryption while a key is active
//! - Version and timestamp metadata for staleness checks
//! - Batch grouping (flag-only or buffered)
//! - Flat JSON export/import
//!
//! ## Error Reporting
//! Every failure is latched into a single last-error slot before it is
//! returned. Reads never fail outright: they hand back the caller's default
//! in a `Lookup` and leave the cause in the slot.

use zeroize::Zeroizing;

use crate::backend::{KvBackend, StoredValue, ValueType};
use crate::batch::{Batch, Operation};
use crate::cipher::{CipherEngine, CipherMode};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{CalibrationError, ErrorCode, Result};
use crate::json;
use crate::logging::DebugLevel;
use crate::validation::{validate_key, validate_value, MAX_VALUE_SIZE};
use crate::value::{Lookup, Scalar, Value};

/// Reserved key holding the calibration version string
pub const VERSION_KEY: &str = "_version";

/// Reserved key holding the calibration timestamp (ms)
pub const TIMESTAMP_KEY: &str = "_timestamp";

/// Namespace used when the caller has no preference
pub const DEFAULT_NAMESPACE: &str = "calib";

macro_rules! log_info {
    ($store:expr, $($arg:tt)+) => {
        if $store.debug_level.allows(DebugLevel::Info) {
            tracing::info!($($arg)+);
        }
    };
}

macro_rules! log_verbose {
    ($store:expr, $($arg:tt)+) => {
        if $store.debug_level.allows(DebugLevel::Verbose) {
            tracing::debug!($($arg)+);
        }
    };
}

/// Persistent calibration key-value store
///
/// Single-threaded by contract: one owner drives it, every call runs to
/// completion on the caller's thread.
pub struct CalibrationStore<B: KvBackend, C: Clock = SystemClock> {
    /// Durable namespace storage
    backend: B,

    /// Source of "now" for timestamps
    clock: C,

    /// Store configuration
    config: StoreConfig,

    /// Key material and value format
    cipher: CipherEngine,

    /// Batch flag and pending writes
    batch: Batch,

    /// True between a successful `begin` and `end`
    initialized: bool,

    /// Namespace bound by `begin`
    namespace: Option<String>,

    /// Current log gate
    debug_level: DebugLevel,

    /// Most recent failure
    last_error: ErrorCode,
}

impl<B: KvBackend> CalibrationStore<B, SystemClock> {
    /// Create an inert store over `backend` with default config
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self::with_clock(backend, SystemClock, config)
    }
}

impl<B: KvBackend, C: Clock> CalibrationStore<B, C> {
    pub fn with_clock(backend: B, clock: C, config: StoreConfig) -> Self {
        Self {
            backend,
            clock,
            cipher: CipherEngine::new(config.cipher_mode),
            batch: Batch::new(config.batch_mode),
            initialized: false,
            namespace: None,
            debug_level: config.debug_level,
            last_error: ErrorCode::Ok,
            config,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind the store to `namespace`, closing any namespace already open.
    pub fn begin(&mut self, namespace: &str) -> Result<()> {
        if namespace.is_empty() {
            log_info!(self, "begin called without a namespace");
            return self.fail(CalibrationError::NotInitialized);
        }

        if self.initialized {
            self.end();
        }

        if let Err(e) = self.backend.open(namespace) {
            log_info!(self, namespace, error = %e, "backend open failed");
            return self.fail(CalibrationError::NotInitialized);
        }

        self.initialized = true;
        self.namespace = Some(namespace.to_string());
        log_info!(self, namespace, "Initialized with namespace");
        Ok(())
    }

    /// Release the namespace. Discards an open batch. No-op when not initialized.
    pub fn end(&mut self) {
        if !self.initialized {
            return;
        }

        if self.batch.is_open() {
            let dropped = self.batch.discard();
            log_info!(self, dropped, "open batch discarded at end");
        }

        self.backend.close();
        self.initialized = false;
        if let Some(namespace) = self.namespace.take() {
            log_verbose!(self, namespace = %namespace, "namespace closed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Namespace bound by the last successful `begin`
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Store `value` under `key`. Last write wins.
    ///
    /// Key and value shape are only checked when `strict_validation` is on.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_initialized()?;
        let value = value.into();

        if self.config.strict_validation {
            self.check_entry(key, &value)?;
        }

        let stored = match self.seal(key, &value) {
            Ok(stored) => stored,
            Err(e) => return self.fail(e),
        };

        log_verbose!(self, key, kind = value.type_name(), "set value");
        self.write_put(key, stored)
    }

    /// Read `key` as `T`, falling back to `default`.
    ///
    /// A key stored with another type yields `default` with `found == true`.
    pub fn get_value<T: Scalar>(&mut self, key: &str, default: T) -> Lookup<T> {
        if self.ensure_initialized().is_err() {
            return Lookup::missing(default);
        }

        let found = self.backend.exists(key);
        let stored = match self.backend.get(key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Lookup::missing(default),
            Err(e) => {
                let _ = self.fail::<()>(e);
                return Lookup {
                    value: default,
                    found,
                };
            }
        };

        match self.unseal(stored) {
            Ok(Some(value)) => {
                let kind = value.type_name();
                match T::from_value(value) {
                    Some(v) => Lookup::found(v),
                    None => {
                        log_verbose!(self, key, stored = kind, "type mismatch, using default");
                        Lookup {
                            value: default,
                            found,
                        }
                    }
                }
            }
            Ok(None) => Lookup {
                value: default,
                found,
            },
            Err(e) => {
                let _ = self.fail::<()>(e);
                Lookup {
                    value: default,
                    found,
                }
            }
        }
    }

    /// Read `key` with whatever scalar type it holds
    pub fn read_value(&mut self, key: &str) -> Result<Option<Value>> {
        self.ensure_initialized()?;
        let stored = match self.backend.get(key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(None),
            Err(e) => return self.fail(e),
        };
        let result = self.unseal(stored);
        self.track(result)
    }

    pub fn has_value(&mut self, key: &str) -> bool {
        if self.ensure_initialized().is_err() {
            return false;
        }
        self.backend.exists(key)
    }

    /// Stored type tag of `key`; encrypted entries report `Blob`
    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        if !self.initialized {
            return None;
        }
        self.backend.type_of(key)
    }

    /// Delete `key`. Returns whether it existed.
    pub fn remove_value(&mut self, key: &str) -> Result<bool> {
        self.ensure_initialized()?;

        if self.batch.is_buffering() {
            let existed = self.backend.exists(key);
            self.batch.push(Operation::Remove {
                key: key.to_string(),
            });
            return Ok(existed);
        }

        let result = self.backend.remove(key);
        let existed = self.track(result)?;
        log_verbose!(self, key, existed, "removed value");
        Ok(existed)
    }

    /// Wipe every entry of the namespace, metadata included
    pub fn clear_all(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        if self.batch.is_buffering() {
            self.batch.push(Operation::Clear);
            return Ok(());
        }

        let result = self.backend.clear();
        self.track(result)?;
        log_info!(self, "namespace cleared");
        Ok(())
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Serialize every readable scalar entry as one flat JSON object.
    ///
    /// Timestamp metadata and entries that cannot be decrypted with the
    /// current key are left out.
    pub fn export_to_json(&mut self) -> Result<String> {
        self.ensure_initialized()?;

        let mut entries: Vec<(String, Value)> = Vec::new();
        for key in self.backend.keys() {
            let stored = match self.backend.get(&key) {
                Ok(Some(stored)) => stored,
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            };
            match self.unseal(stored) {
                Ok(Some(value)) => entries.push((key, value)),
                Ok(None) => log_verbose!(self, key = %key, "skipping non-scalar entry"),
                Err(e) => log_info!(self, key = %key, error = %e, "skipping unreadable entry"),
            }
        }

        let result = json::encode_document(
            entries.iter().map(|(k, v)| (k.as_str(), v)),
            self.config.json_capacity,
        );
        let text = self.track(result)?;
        log_info!(self, entries = entries.len(), bytes = text.len(), "exported calibration");
        Ok(text)
    }

    /// Write every scalar field of a flat JSON object. Returns how many
    /// fields were stored.
    ///
    /// Fields of other JSON types are skipped. A `_version` string updates
    /// the version metadata and any other `_version` is skipped;
    /// `_timestamp` is device-local and ignored.
    pub fn import_from_json(&mut self, text: &str) -> Result<usize> {
        self.ensure_initialized()?;

        let result = json::decode_document(text, self.config.json_capacity);
        let doc = self.track(result)?;

        for key in &doc.skipped {
            log_verbose!(self, key = %key, "skipping field of unsupported type");
        }

        let mut imported = 0;
        for (key, value) in doc.entries {
            match (key.as_str(), value) {
                (VERSION_KEY, Value::Str(version)) => self.set_version(&version)?,
                (VERSION_KEY, other) => {
                    log_verbose!(self, kind = other.type_name(), "ignoring non-string version");
                    continue;
                }
                (TIMESTAMP_KEY, _) => {
                    log_verbose!(self, "ignoring imported timestamp");
                    continue;
                }
                (_, value) => self.set_value(&key, value)?,
            }
            imported += 1;
        }

        log_info!(self, imported, skipped = doc.skipped.len(), "imported calibration");
        Ok(imported)
    }

    // =========================================================================
    // Version & Timestamp Metadata
    // =========================================================================

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.write_put(VERSION_KEY, StoredValue::Str(version.to_string()))
    }

    /// Stored version, or `""` when absent
    pub fn get_version(&mut self) -> Lookup<String> {
        match self.read_meta(VERSION_KEY) {
            Some(Some(StoredValue::Str(version))) => Lookup::found(version),
            Some(Some(_)) => Lookup {
                value: String::new(),
                found: true,
            },
            _ => Lookup::missing(String::new()),
        }
    }

    /// True when no version is stored or it differs from `current`
    pub fn is_outdated(&mut self, current: &str) -> bool {
        let stored = self.get_version();
        !stored.found || stored.value != current
    }

    /// Record `timestamp_ms`, or the clock's current reading when it is 0
    pub fn set_timestamp(&mut self, timestamp_ms: u64) -> Result<()> {
        self.ensure_initialized()?;
        let timestamp = if timestamp_ms == 0 {
            self.clock.now_ms()
        } else {
            timestamp_ms
        };
        log_verbose!(self, timestamp, "set timestamp");
        self.write_put(TIMESTAMP_KEY, StoredValue::ULong(timestamp))
    }

    /// Stored timestamp, or 0 when absent
    pub fn get_timestamp(&mut self) -> Lookup<u64> {
        match self.read_meta(TIMESTAMP_KEY) {
            Some(Some(StoredValue::ULong(ts))) => Lookup::found(ts),
            Some(Some(_)) => Lookup {
                value: 0,
                found: true,
            },
            _ => Lookup::missing(0),
        }
    }

    /// True when no timestamp is stored, the stored one is ahead of the
    /// clock, or it is more than `max_age_ms` old
    pub fn is_expired(&mut self, max_age_ms: u64) -> bool {
        let stored = self.get_timestamp();
        if !stored.found {
            return true;
        }
        match self.clock.now_ms().checked_sub(stored.value) {
            Some(age) => age > max_age_ms,
            None => true,
        }
    }

    // =========================================================================
    // Batch
    // =========================================================================

    /// Open a batch.
    ///
    /// Re-opening an open batch is a no-op in flag-only mode; in buffered
    /// mode it fails so the pending log is not lost.
    pub fn batch_begin(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if self.batch.is_open() {
            if self.batch.is_buffering() {
                return self.fail(CalibrationError::InvalidParam(
                    "batch already open".to_string(),
                ));
            }
            log_verbose!(self, "batch already open");
            return Ok(());
        }
        self.batch.begin();
        log_info!(self, mode = ?self.batch.mode(), "Batch operation started");
        Ok(())
    }

    /// Close the batch, applying buffered writes as one unit
    pub fn batch_commit(&mut self) -> Result<()> {
        if !self.initialized || !self.batch.is_open() {
            return self.fail(CalibrationError::NotInitialized);
        }

        let ops = self.batch.take();
        if !ops.is_empty() {
            let result = self.backend.apply(&ops);
            self.track(result)?;
        }
        log_info!(self, applied = ops.len(), "Batch operation committed");
        Ok(())
    }

    /// Close the batch, dropping buffered writes. Writes already applied
    /// (flag-only mode) stay applied.
    pub fn batch_rollback(&mut self) -> Result<()> {
        if !self.initialized || !self.batch.is_open() {
            return self.fail(CalibrationError::NotInitialized);
        }

        let dropped = self.batch.discard();
        log_info!(self, dropped, "Batch operation rolled back");
        Ok(())
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_open()
    }

    /// Writes waiting for `batch_commit`
    pub fn pending_operations(&self) -> &[Operation] {
        self.batch.pending()
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Entries still available in the namespace
    pub fn free_space(&self) -> usize {
        if !self.initialized {
            return 0;
        }
        self.backend.free_entries()
    }

    /// Entries in use, metadata included
    pub fn used_space(&self) -> usize {
        if !self.initialized {
            return 0;
        }
        self.backend.used_entries()
    }

    // =========================================================================
    // Encryption
    // =========================================================================

    /// Derive a key from `passphrase` (at least 16 bytes) and encrypt all
    /// subsequent value writes
    pub fn enable_encryption(&mut self, passphrase: &str) -> Result<()> {
        let result = self.cipher.enable(passphrase);
        self.track(result)?;
        log_info!(self, mode = ?self.cipher.mode(), "Encryption enabled");
        Ok(())
    }

    /// Wipe the key. Always succeeds.
    pub fn disable_encryption(&mut self) {
        if self.cipher.is_enabled() {
            self.cipher.disable();
            log_info!(self, "Encryption disabled");
        }
    }

    pub fn is_encryption_enabled(&self) -> bool {
        self.cipher.is_enabled()
    }

    pub fn cipher_mode(&self) -> CipherMode {
        self.cipher.mode()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn clear_error(&mut self) {
        self.last_error = ErrorCode::Ok;
    }

    pub fn set_debug_level(&mut self, level: DebugLevel) {
        self.debug_level = level;
    }

    pub fn debug_level(&self) -> DebugLevel {
        self.debug_level
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Latch `err` and return it
    fn fail<T>(&mut self, err: CalibrationError) -> Result<T> {
        self.last_error = err.code();
        if self.debug_level.allows(DebugLevel::Error) {
            tracing::error!(code = self.last_error.as_i32(), "Error: {}", err);
        }
        Err(err)
    }

    /// Latch the error of a failed `result`
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => self.fail(e),
        }
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            self.fail(CalibrationError::NotInitialized)
        }
    }

    fn check_entry(&mut self, key: &str, value: &Value) -> Result<()> {
        if !validate_key(key) || key == VERSION_KEY || key == TIMESTAMP_KEY {
            return self.fail(CalibrationError::InvalidParam(format!(
                "invalid key '{}'",
                key
            )));
        }
        if !validate_value(&value.payload()) {
            return self.fail(CalibrationError::InvalidParam(format!(
                "value for '{}' must be 1..={} bytes",
                key, MAX_VALUE_SIZE
            )));
        }
        Ok(())
    }

    /// Apply or buffer a put
    fn write_put(&mut self, key: &str, value: StoredValue) -> Result<()> {
        if self.batch.is_buffering() {
            self.batch.push(Operation::Put {
                key: key.to_string(),
                value,
            });
            return Ok(());
        }
        let result = self.backend.put(key, value);
        self.track(result)
    }

    /// Raw read of a reserved key. `None` when the store is not initialized.
    fn read_meta(&mut self, key: &str) -> Option<Option<StoredValue>> {
        self.ensure_initialized().ok()?;
        match self.backend.get(key) {
            Ok(stored) => Some(stored),
            Err(e) => {
                let _ = self.fail::<()>(e);
                None
            }
        }
    }

    /// Turn a value into its stored form, encrypting user keys when a key
    /// is active
    fn seal(&self, key: &str, value: &Value) -> Result<StoredValue> {
        if !self.cipher.is_enabled() || key == VERSION_KEY || key == TIMESTAMP_KEY {
            return Ok(value.clone().into());
        }
        let plain = Zeroizing::new(
            bincode::serialize(value)
                .map_err(|e| CalibrationError::Encryption(format!("encode failed: {}", e)))?,
        );
        Ok(StoredValue::Blob(self.cipher.encrypt(&plain)?))
    }

    /// Recover the scalar behind a stored value
    fn unseal(&self, stored: StoredValue) -> Result<Option<Value>> {
        match stored {
            StoredValue::Blob(bytes) => {
                let plain = Zeroizing::new(self.cipher.decrypt(&bytes)?);
                let value: Value = bincode::deserialize(&plain).map_err(|e| {
                    CalibrationError::Encryption(format!("decrypted payload is not a value: {}", e))
                })?;
                Ok(Some(value))
            }
            other => Ok(other.into_scalar()),
        }
    }
}
