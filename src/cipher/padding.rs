//! PKCS#7 padding

use crate::error::{CalibrationError, Result};

use super::BLOCK_SIZE;

/// Pad `data` to the next multiple of the block size.
///
/// Input that is already block-aligned gains a full block of padding.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip PKCS#7 padding in place.
pub fn unpad(buf: &mut Vec<u8>) -> Result<()> {
    let pad_len = match buf.last() {
        Some(&last) => last as usize,
        None => {
            return Err(CalibrationError::Encryption(
                "empty plaintext has no padding".to_string(),
            ))
        }
    };

    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > buf.len() {
        return Err(CalibrationError::Encryption(format!(
            "invalid pad length {}",
            pad_len
        )));
    }

    let body_len = buf.len() - pad_len;
    if buf[body_len..].iter().any(|&b| b as usize != pad_len) {
        return Err(CalibrationError::Encryption(
            "inconsistent padding bytes".to_string(),
        ));
    }

    buf.truncate(body_len);
    Ok(())
}
