//! Password-based key derivation.
//!
//! Two functions are supported and identified by the string stored in
//! the envelope's `kdf` field:
//!
//! - `pbkdf2-sha256` — PBKDF2-HMAC-SHA256, the default.  `iters` is the
//!   PBKDF2 round count (default 390 000).
//! - `argon2id` — Argon2id with 64 MB of memory and 4 lanes.  `iters` is
//!   the Argon2 time cost.
//!
//! The iteration count always travels with the file, so raising the
//! default never locks anyone out of an older vault.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use sha2::Sha256;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{LockaError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Default PBKDF2 round count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 390_000;

/// Default Argon2id time cost.
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 3;

/// Lowest PBKDF2 round count we accept.
const MIN_PBKDF2_ITERATIONS: u32 = 1_000;

/// Argon2id memory cost in KiB (64 MB).
const ARGON2_MEMORY_KIB: u32 = 65_536;

/// Argon2id parallelism lanes.
const ARGON2_PARALLELISM: u32 = 4;

/// Which key derivation function an envelope was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfKind {
    Pbkdf2Sha256,
    Argon2id,
}

impl KdfKind {
    /// The identifier written to the envelope's `kdf` field.
    pub fn id(self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 => "pbkdf2-sha256",
            Self::Argon2id => "argon2id",
        }
    }

    /// Iteration count used when the config does not name one.
    pub fn default_iterations(self) -> u32 {
        match self {
            Self::Pbkdf2Sha256 => DEFAULT_PBKDF2_ITERATIONS,
            Self::Argon2id => DEFAULT_ARGON2_ITERATIONS,
        }
    }

    fn min_iterations(self) -> u32 {
        match self {
            Self::Pbkdf2Sha256 => MIN_PBKDF2_ITERATIONS,
            Self::Argon2id => 1,
        }
    }
}

impl fmt::Display for KdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for KdfKind {
    type Err = LockaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pbkdf2-sha256" => Ok(Self::Pbkdf2Sha256),
            "argon2id" => Ok(Self::Argon2id),
            other => Err(LockaError::KeyDerivationFailed(format!(
                "unknown key derivation function '{other}'"
            ))),
        }
    }
}

/// KDF choice plus its cost, as configured or as read from an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub kind: KdfKind,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            kind: KdfKind::Pbkdf2Sha256,
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Reject costs too low to be worth calling a KDF.
    pub fn validate(&self) -> Result<()> {
        let min = self.kind.min_iterations();
        if self.iterations < min {
            return Err(LockaError::KeyDerivationFailed(format!(
                "{} iterations must be at least {min} (got {})",
                self.kind, self.iterations
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte key from a passphrase with PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same passphrase, salt and iteration count always
/// produce the same key.
pub fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> Result<DerivedKey> {
    derive_key_with_params(
        passphrase,
        salt,
        &KdfParams {
            kind: KdfKind::Pbkdf2Sha256,
            iterations,
        },
    )
}

/// Derive a 32-byte key with whichever function `params` names.
pub fn derive_key_with_params(
    passphrase: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<DerivedKey> {
    params.validate()?;

    let mut key = [0u8; KEY_LEN];
    match params.kind {
        KdfKind::Pbkdf2Sha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, params.iterations, &mut key);
        }
        KdfKind::Argon2id => {
            let argon_params = Params::new(
                ARGON2_MEMORY_KIB,
                params.iterations,
                ARGON2_PARALLELISM,
                Some(KEY_LEN),
            )
            .map_err(|e| {
                LockaError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
            })?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
                .hash_password_into(passphrase, salt, &mut key)
                .map_err(|e| {
                    LockaError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
                })?;
        }
    }

    Ok(DerivedKey::new(key))
}

/// Generate a fresh cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
