//! The on-disk envelope: KDF parameters, salt and the sealed payload.
//!
//! A vault file is a pretty-printed JSON object:
//!
//! ```text
//! {
//!   "v": 1,
//!   "kdf": "pbkdf2-sha256",
//!   "iters": 390000,
//!   "salt_b64": "<base64, 16 bytes>",
//!   "token": "<base64 of nonce | ciphertext | tag>"
//! }
//! ```
//!
//! Only `token` is secret.  The outer fields stay readable so a file
//! written with older KDF settings can still be opened after the
//! defaults change; `v` and `kdf` are bound into the AEAD tag.
//!
//! Older files of the same version carry a Fernet token (urlsafe
//! base64) instead of an AES-GCM one.  Those are read but never
//! written: the next save reseals the vault with AES-GCM.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::record::VaultContents;
use crate::crypto::{encryption, fernet};
use crate::crypto::kdf::{self, KdfKind, KdfParams};
use crate::errors::{LockaError, Result};

/// Current envelope format version.
pub const CURRENT_VERSION: u32 = 1;

/// The encrypted container written to the vault file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "v")]
    pub version: u32,

    #[serde(rename = "kdf")]
    pub kdf_id: String,

    #[serde(rename = "iters")]
    pub iterations: u32,

    #[serde(
        rename = "salt_b64",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub salt: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub token: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Serialize to the pretty JSON stored on disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| LockaError::EncryptionFailed(format!("envelope serialization: {e}")))
    }

    /// Parse the on-disk JSON.  Does not decrypt anything.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(data)
            .map_err(|e| LockaError::MalformedEnvelope(format!("envelope JSON: {e}")))?;

        check_version(envelope.version)?;
        Ok(envelope)
    }

    /// Whether `token` has the shape of a Fernet token.
    pub fn has_fernet_token(&self) -> bool {
        fernet::is_token(&self.token)
    }

    /// KDF parameters recorded in this envelope.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let kind: KdfKind = self
            .kdf_id
            .parse()
            .map_err(|e: LockaError| LockaError::MalformedEnvelope(e.to_string()))?;
        let params = KdfParams {
            kind,
            iterations: self.iterations,
        };
        params
            .validate()
            .map_err(|e| LockaError::MalformedEnvelope(e.to_string()))?;
        Ok(params)
    }
}

fn check_version(version: u32) -> Result<()> {
    if version != CURRENT_VERSION {
        return Err(LockaError::MalformedEnvelope(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }
    Ok(())
}

/// Associated data binding the envelope header into the AEAD tag.
fn header_aad(version: u32, kdf_id: &str) -> Vec<u8> {
    format!("locka:v{version}:{kdf_id}").into_bytes()
}

/// Encrypt `contents` under `passphrase` with the default KDF settings.
pub fn encrypt(contents: &VaultContents, passphrase: &str) -> Result<EncryptedEnvelope> {
    encrypt_with_params(contents, passphrase, &KdfParams::default())
}

/// Encrypt `contents` under `passphrase`.
///
/// A fresh salt is drawn on every call, so two encryptions of the same
/// contents never share a key or a ciphertext.
pub fn encrypt_with_params(
    contents: &VaultContents,
    passphrase: &str,
    params: &KdfParams,
) -> Result<EncryptedEnvelope> {
    seal_value(contents, passphrase, params)
}

/// Serialize any payload to JSON and seal it into a fresh envelope.
///
/// `decrypt` accepts whatever `VaultContents` can deserialize from, so
/// this is also how older payload shapes (a bare record list) are
/// produced in tests and migrations.
pub fn seal_value<T: Serialize>(
    value: &T,
    passphrase: &str,
    params: &KdfParams,
) -> Result<EncryptedEnvelope> {
    let salt = kdf::generate_salt();
    let key = kdf::derive_key_with_params(passphrase.as_bytes(), &salt, params)?;

    let plaintext = Zeroizing::new(
        serde_json::to_vec(value)
            .map_err(|e| LockaError::EncryptionFailed(format!("vault serialization: {e}")))?,
    );

    let kdf_id = params.kind.id().to_string();
    let token = encryption::seal(&key, &plaintext, &header_aad(CURRENT_VERSION, &kdf_id))?;

    Ok(EncryptedEnvelope {
        version: CURRENT_VERSION,
        kdf_id,
        iterations: params.iterations,
        salt: salt.to_vec(),
        token,
    })
}

/// Decrypt an envelope back into `VaultContents`.
///
/// The key is re-derived from the envelope's own salt, KDF id and
/// iteration count.
pub fn decrypt(envelope: &EncryptedEnvelope, passphrase: &str) -> Result<VaultContents> {
    check_version(envelope.version)?;
    if envelope.salt.is_empty() {
        return Err(LockaError::MalformedEnvelope("empty salt".into()));
    }

    let params = envelope.kdf_params()?;
    let key = kdf::derive_key_with_params(passphrase.as_bytes(), &envelope.salt, &params)?;

    let aad = header_aad(envelope.version, &envelope.kdf_id);
    let plaintext = match encryption::open(&key, &envelope.token, &aad) {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(LockaError::AuthenticationFailure) if envelope.has_fernet_token() => {
            fernet::open(key.as_bytes(), &envelope.token)?
        }
        Err(e) => return Err(e),
    };

    serde_json::from_slice(&plaintext)
        .map_err(|e| LockaError::MalformedEnvelope(format!("vault contents: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE};
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Fernet tokens are urlsafe.
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    BASE64
        .decode(s)
        .or_else(|_| URL_SAFE.decode(s))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::record::{Record, Settings};

    fn fast() -> KdfParams {
        KdfParams {
            kind: KdfKind::Pbkdf2Sha256,
            iterations: 1_000,
        }
    }

    fn sample() -> VaultContents {
        VaultContents {
            records: vec![Record::new("Example", "alice", "p@ss", vec!["work".into()])],
            settings: Settings::default(),
        }
    }

    #[test]
    fn on_disk_field_names() {
        let env = encrypt_with_params(&sample(), "pw", &fast()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&env.to_bytes().unwrap()).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["kdf"], "pbkdf2-sha256");
        assert_eq!(json["iters"], 1_000);
        assert!(json["salt_b64"].is_string());
        assert!(json["token"].is_string());
        assert_eq!(env.salt.len(), kdf::SALT_LEN);
    }

    #[test]
    fn from_bytes_rejects_wrong_version() {
        let mut env = encrypt_with_params(&sample(), "pw", &fast()).unwrap();
        env.version = 2;
        let bytes = env.to_bytes().unwrap();
        assert!(matches!(
            EncryptedEnvelope::from_bytes(&bytes),
            Err(LockaError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn from_bytes_rejects_missing_fields() {
        let result = EncryptedEnvelope::from_bytes(br#"{"v":1,"kdf":"pbkdf2-sha256"}"#);
        assert!(matches!(result, Err(LockaError::MalformedEnvelope(_))));
    }

    #[test]
    fn unknown_kdf_is_malformed() {
        let mut env = encrypt_with_params(&sample(), "pw", &fast()).unwrap();
        env.kdf_id = "rot13".into();
        assert!(matches!(
            decrypt(&env, "pw"),
            Err(LockaError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn argon2id_envelopes_roundtrip() {
        let params = KdfParams {
            kind: KdfKind::Argon2id,
            iterations: 1,
        };
        let env = encrypt_with_params(&sample(), "pw", &params).unwrap();
        assert_eq!(env.kdf_id, "argon2id");
        assert_eq!(decrypt(&env, "pw").unwrap(), sample());
    }

    #[test]
    fn fernet_shaped_garbage_is_authentication_failure() {
        let mut env = encrypt_with_params(&sample(), "pw", &fast()).unwrap();
        env.token = vec![0x80; 1 + 8 + 16 + 32 + 32];
        assert!(env.has_fernet_token());
        assert!(matches!(
            decrypt(&env, "pw"),
            Err(LockaError::AuthenticationFailure)
        ));
    }
}
