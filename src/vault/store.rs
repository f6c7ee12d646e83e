//! On-disk persistence of the vault file and failure backups.
//!
//! `VaultStore` owns the path of the encrypted vault and the KDF
//! settings new envelopes are sealed with.  It never holds the
//! in-memory contents; that is the job of [`super::commit::Vault`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use super::envelope::{self, EncryptedEnvelope};
use super::record::VaultContents;
use crate::crypto::kdf::KdfParams;
use crate::errors::{LockaError, Result};

/// Prefix of plaintext backup files written when a save fails.
pub const BACKUP_PREFIX: &str = "locka_unsaved_";

/// Sortable timestamp used in backup file names.
const BACKUP_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Handle on a single vault file.
#[derive(Debug, Clone)]
pub struct VaultStore {
    /// Path to the encrypted vault file (e.g. `data/locka.enc`).
    path: PathBuf,

    /// KDF settings used when sealing new envelopes.
    kdf: KdfParams,
}

impl VaultStore {
    pub fn new(path: impl Into<PathBuf>, kdf: KdfParams) -> Self {
        Self {
            path: path.into(),
            kdf,
        }
    }

    /// Load and decrypt the vault.
    ///
    /// A missing file is a first run and yields empty contents.  Any
    /// other failure, including a wrong passphrase, is returned as is:
    /// an existing vault is never silently replaced by an empty one.
    pub fn load(&self, passphrase: &str) -> Result<VaultContents> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(VaultContents::default()),
            Err(source) => {
                return Err(LockaError::PersistenceFailure {
                    action: "read",
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let envelope = EncryptedEnvelope::from_bytes(&data)?;
        envelope::decrypt(&envelope, passphrase)
    }

    /// Encrypt `contents` and replace the vault file.
    ///
    /// The envelope is written to a staging file next to the vault and
    /// renamed over it, so an interrupted save leaves the previous file
    /// intact.
    pub fn save(&self, contents: &VaultContents, passphrase: &str) -> Result<()> {
        let envelope = envelope::encrypt_with_params(contents, passphrase, &self.kdf)?;
        let bytes = envelope.to_bytes()?;

        self.ensure_parent_dir()?;

        let staging = self.staging_path();
        fs::write(&staging, &bytes).map_err(|source| LockaError::PersistenceFailure {
            action: "write",
            path: staging.clone(),
            source,
        })?;
        restrict_permissions(&staging);

        fs::rename(&staging, &self.path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            LockaError::PersistenceFailure {
                action: "replace",
                path: self.path.clone(),
                source,
            }
        })?;

        Ok(())
    }

    /// Write `contents` as plaintext JSON to a fresh timestamped file.
    ///
    /// Only used after `save` has failed.  The file sits next to the
    /// vault as `locka_unsaved_<YYYYMMDD_HHMMSS>.json` and is never
    /// overwritten: a counter is appended if the name is taken.
    pub fn write_failure_backup(&self, contents: &VaultContents) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(contents)
            .map_err(|e| LockaError::CommandFailed(format!("backup serialization: {e}")))?;

        let dir = self.data_dir();
        fs::create_dir_all(&dir).map_err(|source| LockaError::PersistenceFailure {
            action: "create directory",
            path: dir.clone(),
            source,
        })?;

        let stamp = Local::now().format(BACKUP_TIMESTAMP).to_string();
        let mut path = dir.join(format!("{BACKUP_PREFIX}{stamp}.json"));
        let mut counter = 1u32;

        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(&json)
                        .map_err(|source| LockaError::PersistenceFailure {
                            action: "write backup",
                            path: path.clone(),
                            source,
                        })?;
                    restrict_permissions(&path);
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    path = dir.join(format!("{BACKUP_PREFIX}{stamp}_{counter}.json"));
                    counter += 1;
                }
                Err(source) => {
                    return Err(LockaError::PersistenceFailure {
                        action: "create backup",
                        path,
                        source,
                    })
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Path to the encrypted vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the vault and its backups.
    pub fn data_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Sibling file the envelope is written to before the rename.
    pub fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string());
        self.data_dir().join(format!(".{name}.tmp"))
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        let dir = self.data_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| LockaError::PersistenceFailure {
                action: "create directory",
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Owner-only permissions for files holding secrets.  Best effort.
fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::KdfKind;
    use crate::vault::record::Record;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> VaultStore {
        VaultStore::new(
            dir.path().join("data").join("locka.enc"),
            KdfParams {
                kind: KdfKind::Pbkdf2Sha256,
                iterations: 1_000,
            },
        )
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        let store = VaultStore::new("data/locka.enc", KdfParams::default());
        assert_eq!(store.staging_path(), PathBuf::from("data/.locka.enc.tmp"));
        assert_eq!(store.data_dir(), PathBuf::from("data"));
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        let store = VaultStore::new("locka.enc", KdfParams::default());
        assert_eq!(store.data_dir(), PathBuf::from("."));
    }

    #[test]
    fn save_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&VaultContents::default(), "pw").unwrap();
        assert!(store.path().exists());
        assert!(!store.staging_path().exists());
    }

    #[test]
    fn backups_never_overwrite_each_other() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let contents = VaultContents {
            records: vec![Record::new("A", "a", "p", vec![])],
            ..VaultContents::default()
        };

        let first = store.write_failure_backup(&contents).unwrap();
        let second = store.write_failure_backup(&contents).unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());

        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(BACKUP_PREFIX));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn unreadable_path_is_an_error_not_an_empty_vault() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        // `exists()` is false here, but the file is not simply missing.
        let store = VaultStore::new(blocker.join("locka.enc"), KdfParams::default());
        assert!(matches!(
            store.load("pw"),
            Err(LockaError::PersistenceFailure { action: "read", .. })
        ));
    }

    #[test]
    fn directory_at_vault_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path()).unwrap();

        assert!(matches!(
            store.load("pw"),
            Err(LockaError::PersistenceFailure { action: "read", .. })
        ));
    }
}
