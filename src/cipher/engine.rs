//! Cipher Engine
//!
//! Two-state machine (Disabled / Enabled) around a derived AES-256 key.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CalibrationError, Result};

use super::padding::{pad, unpad};
use super::{BLOCK_SIZE, KEY_LEN, MIN_PASSPHRASE_LEN, NONCE_LEN, TAG_LEN};

/// Encryption scheme applied to value payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    /// AES-256-GCM with a random nonce per value
    #[default]
    Gcm,

    /// AES-256 in ECB mode with PKCS#7 padding
    LegacyEcb,
}

/// Holds the derived key while encryption is enabled.
///
/// The key never leaves this type; it is wiped when encryption is disabled
/// or the engine is dropped.
#[derive(Default)]
pub struct CipherEngine {
    mode: CipherMode,
    key: Option<Zeroizing<[u8; KEY_LEN]>>,
}

impl CipherEngine {
    pub fn new(mode: CipherMode) -> Self {
        Self { mode, key: None }
    }

    /// Derive a key from `passphrase` and enter the Enabled state.
    ///
    /// Re-enabling replaces the previous key.
    pub fn enable(&mut self, passphrase: &str) -> Result<()> {
        if passphrase.len() < MIN_PASSPHRASE_LEN {
            return Err(CalibrationError::Encryption(format!(
                "passphrase must be at least {} bytes, got {}",
                MIN_PASSPHRASE_LEN,
                passphrase.len()
            )));
        }

        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&digest);
        self.key = Some(key);
        Ok(())
    }

    /// Wipe the key and enter the Disabled state. No-op when already disabled.
    pub fn disable(&mut self) {
        self.key = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Switch formats. Values already stored in the other format stop
    /// decrypting.
    pub fn set_mode(&mut self, mode: CipherMode) {
        self.mode = mode;
    }

    /// Encrypt `plaintext` with the active key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.active_key()?;
        match self.mode {
            CipherMode::Gcm => encrypt_gcm(key, plaintext),
            CipherMode::LegacyEcb => Ok(encrypt_ecb(key, plaintext)),
        }
    }

    /// Decrypt `ciphertext` produced by `encrypt` under the same key and mode.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let key = self.active_key()?;
        match self.mode {
            CipherMode::Gcm => decrypt_gcm(key, ciphertext),
            CipherMode::LegacyEcb => decrypt_ecb(key, ciphertext),
        }
    }

    fn active_key(&self) -> Result<&[u8; KEY_LEN]> {
        self.key
            .as_deref()
            .ok_or_else(|| CalibrationError::Encryption("encryption is not enabled".to_string()))
    }
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("mode", &self.mode)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

// =============================================================================
// ECB
// =============================================================================

fn encrypt_ecb(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut buf = pad(plaintext);
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    buf
}

fn decrypt_ecb(key: &[u8; KEY_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CalibrationError::Encryption(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    unpad(&mut buf)?;
    Ok(buf.to_vec())
}

// =============================================================================
// GCM
// =============================================================================

fn encrypt_gcm(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CalibrationError::Encryption("AES-GCM seal failed".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn decrypt_gcm(key: &[u8; KEY_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < NONCE_LEN + TAG_LEN {
        return Err(CalibrationError::Encryption(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }

    let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CalibrationError::Encryption("authentication tag mismatch".to_string()))
}
