//! Error types for calstore
//!
//! Provides a unified error type for all operations, plus the `ErrorCode`
//! value latched in the store's last-error slot.

use std::fmt;

use thiserror::Error;

/// Result type alias using CalibrationError
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Unified error type for calstore operations
#[derive(Debug, Error)]
pub enum CalibrationError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Library not initialized")]
    NotInitialized,

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    // -------------------------------------------------------------------------
    // Backend I/O Errors
    // -------------------------------------------------------------------------
    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Memory error: {0}")]
    Memory(String),

    // -------------------------------------------------------------------------
    // Cipher Errors
    // -------------------------------------------------------------------------
    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl CalibrationError {
    /// The last-error code this error is reported as.
    ///
    /// Raw I/O errors only surface from the file backend's persist path,
    /// so they count as write failures.
    pub fn code(&self) -> ErrorCode {
        match self {
            CalibrationError::NotInitialized => ErrorCode::NotInitialized,
            CalibrationError::InvalidParam(_) => ErrorCode::InvalidParam,
            CalibrationError::Write(_) | CalibrationError::Io(_) => ErrorCode::WriteError,
            CalibrationError::Read(_) => ErrorCode::ReadError,
            CalibrationError::Memory(_) => ErrorCode::MemoryError,
            CalibrationError::Encryption(_) => ErrorCode::EncryptionError,
        }
    }
}

impl From<bincode::Error> for CalibrationError {
    fn from(err: bincode::Error) -> Self {
        CalibrationError::Read(format!("decode failed: {}", err))
    }
}

/// Value of the single-slot "last error" field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum ErrorCode {
    #[default]
    Ok = 0,
    NotInitialized = -1,
    InvalidParam = -2,
    WriteError = -3,
    ReadError = -4,
    MemoryError = -5,
    EncryptionError = -6,
}

impl ErrorCode {
    /// Stable numeric code
    pub fn as_i32(self) -> i32 {
        self as i8 as i32
    }

    /// Fixed human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Ok => "No error",
            ErrorCode::NotInitialized => "Library not initialized",
            ErrorCode::InvalidParam => "Invalid parameter",
            ErrorCode::WriteError => "Write error",
            ErrorCode::ReadError => "Read error",
            ErrorCode::MemoryError => "Memory error",
            ErrorCode::EncryptionError => "Encryption error",
        }
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
