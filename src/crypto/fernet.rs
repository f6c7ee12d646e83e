//! Read-only support for Fernet tokens, the payload format of vault
//! files written before the switch to AES-GCM.
//!
//! Token layout (all big-endian):
//!   [ 0x80 | 8-byte timestamp | 16-byte IV | AES-128-CBC ciphertext | 32-byte HMAC-SHA256 ]
//!
//! The 32-byte key splits into a signing half and an encryption half.
//! The MAC covers everything before it and is checked before any
//! decryption happens.  The timestamp is not checked; vault files carry
//! no expiry.

use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes128, Block};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{LockaError, Result};

const VERSION_BYTE: u8 = 0x80;
const HEADER_LEN: usize = 1 + 8 + 16;
const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Whether `token` is long enough, block-aligned and carries the
/// Fernet version byte.  Says nothing about whether it verifies.
pub fn is_token(token: &[u8]) -> bool {
    token.len() >= HEADER_LEN + BLOCK_LEN + MAC_LEN
        && (token.len() - HEADER_LEN - MAC_LEN) % BLOCK_LEN == 0
        && token[0] == VERSION_BYTE
}

/// Verify and decrypt a raw (already base64-decoded) Fernet token.
///
/// Any failure, whether a wrong key, a bad MAC or broken padding, is
/// reported as `AuthenticationFailure`.
pub fn open(key: &[u8; 32], token: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if !is_token(token) {
        return Err(LockaError::AuthenticationFailure);
    }
    let (signing_key, encryption_key) = key.split_at(16);
    let (signed, tag) = token.split_at(token.len() - MAC_LEN);

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(signing_key)
        .map_err(|_| LockaError::AuthenticationFailure)?;
    mac.update(signed);
    mac.verify_slice(tag)
        .map_err(|_| LockaError::AuthenticationFailure)?;

    let iv = &signed[9..HEADER_LEN];
    let ciphertext = &signed[HEADER_LEN..];

    let cipher =
        Aes128::new_from_slice(encryption_key).map_err(|_| LockaError::AuthenticationFailure)?;

    let mut plaintext = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    let mut previous = iv;
    for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
        let mut block = Block::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        plaintext.extend(block.iter().zip(previous).map(|(b, p)| b ^ p));
        previous = chunk;
    }

    let pad = usize::from(plaintext.last().copied().unwrap_or(0));
    let valid_pad = (1..=BLOCK_LEN).contains(&pad)
        && plaintext[plaintext.len() - pad..]
            .iter()
            .all(|&b| usize::from(b) == pad);
    if !valid_pad {
        return Err(LockaError::AuthenticationFailure);
    }
    let unpadded = plaintext.len() - pad;
    plaintext.truncate(unpadded);
    Ok(plaintext)
}
