//! AES-256-GCM authenticated encryption of the vault payload.
//!
//! Layout of a sealed buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]
//!
//! The caller supplies associated data (the envelope's version and KDF
//! id) which is authenticated but not stored in the buffer.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use super::keys::DerivedKey;
use crate::errors::{LockaError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, binding `aad` into the tag.
pub fn seal(key: &DerivedKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LockaError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| LockaError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a buffer produced by [`seal`].
///
/// Every failure, from a short buffer to a tag mismatch, is reported as
/// `AuthenticationFailure`.
pub fn open(key: &DerivedKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(LockaError::AuthenticationFailure);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| LockaError::AuthenticationFailure)?;

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| LockaError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> DerivedKey {
        DerivedKey::new([byte; 32])
    }

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(&key(0xAB), b"hello", b"v1").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 5 + TAG_LEN);
        assert_eq!(open(&key(0xAB), &sealed, b"v1").unwrap(), b"hello");
    }

    #[test]
    fn different_aad_fails() {
        let sealed = seal(&key(0x01), b"hello", b"v1").unwrap();
        assert!(matches!(
            open(&key(0x01), &sealed, b"v2"),
            Err(LockaError::AuthenticationFailure)
        ));
    }

    #[test]
    fn truncated_buffer_fails() {
        assert!(matches!(
            open(&key(0x01), &[0u8; 20], b""),
            Err(LockaError::AuthenticationFailure)
        ));
    }
}
