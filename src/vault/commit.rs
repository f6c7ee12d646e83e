//! The in-memory vault and its commit protocol.
//!
//! Every mutation runs through [`Vault::commit`]:
//!
//! 1. the change is applied to the in-memory contents,
//! 2. the whole vault is saved,
//! 3. on failure the unsaved contents are dumped to a plaintext backup,
//!    the vault is reloaded from disk, and one composite error is
//!    returned naming the action, the backup and the cause.
//!
//! If the reload fails too, the contents from just before the mutation
//! are restored, so memory never keeps a change the disk rejected.

use zeroize::Zeroizing;

use super::record::{Record, Settings, VaultContents};
use super::store::VaultStore;
use crate::errors::{BackupOutcome, LockaError, Result};

/// Single owner of the decrypted vault contents for one session.
pub struct Vault {
    store: VaultStore,
    contents: VaultContents,
    passphrase: Zeroizing<String>,
}

impl Vault {
    /// Load the vault behind `store` with `passphrase`.
    ///
    /// A missing file opens as an empty vault; it is created on the
    /// first commit.
    pub fn open(store: VaultStore, passphrase: &str) -> Result<Self> {
        let contents = store.load(passphrase)?;
        Ok(Self {
            store,
            contents,
            passphrase: Zeroizing::new(passphrase.to_string()),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn records(&self) -> &[Record] {
        &self.contents.records
    }

    pub fn settings(&self) -> &Settings {
        &self.contents.settings
    }

    pub fn contents(&self) -> &VaultContents {
        &self.contents
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    /// Fetch the record at `index`.
    pub fn get(&self, index: usize) -> Result<&Record> {
        self.contents
            .records
            .get(index)
            .ok_or(LockaError::RecordNotFound(index))
    }

    // ------------------------------------------------------------------
    // Mutations (each one is a commit)
    // ------------------------------------------------------------------

    /// Append a new record.
    pub fn add(&mut self, record: Record) -> Result<()> {
        let record = record.normalized()?;
        self.commit("add", move |contents| {
            contents.records.push(record);
            Ok(())
        })
    }

    /// Replace every field of the record at `index`.
    pub fn edit(&mut self, index: usize, record: Record) -> Result<()> {
        let record = record.normalized()?;
        self.get(index)?;
        self.commit("edit", move |contents| {
            contents.records[index] = record;
            Ok(())
        })
    }

    /// Remove the record at `index` and return it.
    pub fn delete(&mut self, index: usize) -> Result<Record> {
        let removed = self.get(index)?.clone();
        self.commit("delete", move |contents| {
            contents.records.remove(index);
            Ok(())
        })?;
        Ok(removed)
    }

    pub fn set_show_password(&mut self, show: bool) -> Result<()> {
        self.commit("toggle password visibility", move |contents| {
            contents.settings.show_password = show;
            Ok(())
        })
    }

    /// Persist the current contents unchanged.
    pub fn save(&mut self) -> Result<()> {
        self.commit("save", |_| Ok(()))
    }

    /// Apply `mutate`, save, and roll back on failure.
    ///
    /// If `mutate` itself fails nothing is saved and the contents are
    /// left exactly as they were.
    pub fn commit<F>(&mut self, action: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut VaultContents) -> Result<()>,
    {
        let snapshot = self.contents.clone();

        if let Err(e) = mutate(&mut self.contents) {
            self.contents = snapshot;
            return Err(e);
        }

        match self.store.save(&self.contents, &self.passphrase) {
            Ok(()) => Ok(()),
            Err(cause) => Err(self.roll_back(action, snapshot, &cause)),
        }
    }

    /// Back up the unsaved contents, then resync from disk.
    fn roll_back(&mut self, action: &str, snapshot: VaultContents, cause: &LockaError) -> LockaError {
        let backup = match self.store.write_failure_backup(&self.contents) {
            Ok(path) => BackupOutcome::Written(path),
            Err(e) => BackupOutcome::Failed(e.to_string()),
        };

        let reload_error = match self.store.load(&self.passphrase) {
            Ok(contents) => {
                self.contents = contents;
                None
            }
            Err(e) => {
                self.contents = snapshot;
                Some(e.to_string())
            }
        };

        LockaError::CommitRolledBack {
            action: action.to_string(),
            backup,
            cause: cause.to_string(),
            reload_error,
        }
    }
}
