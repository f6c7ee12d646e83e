//! Vault module — records, the encrypted envelope, and persistence.
//!
//! This module provides:
//! - `Record`, `Settings` and `VaultContents` (`record`)
//! - The versioned encrypted envelope codec (`envelope`)
//! - `VaultStore` for loading, saving and failure backups (`store`)
//! - `Vault`, the in-memory owner that commits every mutation (`commit`)

pub mod commit;
pub mod envelope;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use commit::Vault;
pub use envelope::{decrypt, encrypt, encrypt_with_params, EncryptedEnvelope};
pub use record::{format_for_display, Record, Settings, VaultContents};
pub use store::VaultStore;
