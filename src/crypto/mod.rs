//! Cryptographic primitives for Locka.
//!
//! This module provides:
//! - PBKDF2-SHA256 / Argon2id password-based key derivation (`kdf`)
//! - AES-256-GCM authenticated encryption (`encryption`)
//! - Fernet token verification for older vault files (`fernet`)
//! - A zeroize-on-drop key holder (`keys`)

pub mod encryption;
pub mod fernet;
pub mod kdf;
pub mod keys;

pub use kdf::{derive_key, derive_key_with_params, generate_salt, KdfKind, KdfParams};
pub use keys::DerivedKey;
