//! Cipher Module
//!
//! Passphrase-keyed symmetric encryption for stored values.
//!
//! ## Responsibilities
//! - Derive a 256-bit key from a passphrase (SHA-256)
//! - Hold key material only while encryption is enabled
//! - Encrypt/decrypt value payloads in one of two formats
//!
//! ## Value Formats
//! ```text
//! Gcm (default)
//! ┌────────────┬──────────────────────────┬───────────┐
//! │ Nonce (12) │ Ciphertext (len = input) │ Tag (16)  │
//! └────────────┴──────────────────────────┴───────────┘
//!
//! LegacyEcb
//! ┌──────────────┬──────────────┬─────┬─────────────────────────┐
//! │ AES block 0  │ AES block 1  │ ... │ last block, PKCS#7 pad  │
//! └──────────────┴──────────────┴─────┴─────────────────────────┘
//!   every block encrypted independently; output len = next multiple of 16
//! ```
//!
//! LegacyEcb leaks equality of 16-byte plaintext blocks and carries no
//! integrity tag. It exists for compatibility with data written by older
//! firmware.

mod engine;
mod padding;

pub use engine::{CipherEngine, CipherMode};
pub use padding::{pad, unpad};

/// Cipher block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// GCM tag length in bytes
pub const TAG_LEN: usize = 16;

/// Minimum passphrase length in bytes
pub const MIN_PASSPHRASE_LEN: usize = 16;
