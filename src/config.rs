//! Configuration for calstore
//!
//! Centralized configuration with sensible defaults.

use crate::cipher::CipherMode;
use crate::logging::DebugLevel;

/// Default maximum serialized size of an exported/imported JSON document
pub const DEFAULT_JSON_CAPACITY: usize = 512;

/// Main configuration for a CalibrationStore instance
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Initial log gate; adjustable later with `set_debug_level`
    pub debug_level: DebugLevel,

    // -------------------------------------------------------------------------
    // Cipher Configuration
    // -------------------------------------------------------------------------
    /// Scheme used for values written while encryption is enabled
    pub cipher_mode: CipherMode,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// How batch_begin/commit/rollback treat writes
    pub batch_mode: BatchMode,

    /// Run key/value validation inside `set_value`
    pub strict_validation: bool,

    // -------------------------------------------------------------------------
    // JSON Configuration
    // -------------------------------------------------------------------------
    /// Max serialized JSON document size (bytes) for export and import
    pub json_capacity: usize,
}

/// Batch semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Flag only: writes apply immediately, rollback undoes nothing
    #[default]
    Immediate,

    /// Writes are logged while a batch is open, applied on commit,
    /// discarded on rollback
    Buffered,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debug_level: DebugLevel::None,
            cipher_mode: CipherMode::Gcm,
            batch_mode: BatchMode::Immediate,
            strict_validation: false,
            json_capacity: DEFAULT_JSON_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the initial debug level
    pub fn debug_level(mut self, level: DebugLevel) -> Self {
        self.config.debug_level = level;
        self
    }

    /// Set the cipher mode used for value encryption
    pub fn cipher_mode(mut self, mode: CipherMode) -> Self {
        self.config.cipher_mode = mode;
        self
    }

    /// Set the batch mode
    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.config.batch_mode = mode;
        self
    }

    /// Enforce key/value validation on every write
    pub fn strict_validation(mut self, strict: bool) -> Self {
        self.config.strict_validation = strict;
        self
    }

    /// Set the JSON document capacity (in bytes)
    pub fn json_capacity(mut self, bytes: usize) -> Self {
        self.config.json_capacity = bytes;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
