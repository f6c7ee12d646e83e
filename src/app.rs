//! `Locka` — the facade the UI layer talks to.
//!
//! Pairs the in-memory [`Vault`] with the idle-lock [`Session`] and is
//! the one place where the lock gate is applied: every record query or
//! mutation calls `self.gate()` first, and rendering shows a single
//! placeholder line while the session is locked.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{LockaError, Result};
use crate::session::{LockEvent, ReauthOutcome, Session};
use crate::vault::{format_for_display, Record, Settings, Vault, VaultStore};

/// The only line rendered while the session is locked.
pub const LOCKED_PLACEHOLDER: &str = "\u{1f512} Locked";

/// Operation hook used for the audit trail.
type AuditHook = Box<dyn Fn(&str, Option<&str>) + Send>;

pub struct Locka {
    vault: Vault,
    session: Arc<Mutex<Session>>,
    audit: Option<AuditHook>,
}

impl Locka {
    /// Open the vault at `store` and start an unlocked session.
    ///
    /// Fails on a wrong passphrase or unreadable file.  Only a missing
    /// file opens as an empty vault.
    pub fn open(store: VaultStore, passphrase: &str, idle_timeout: Duration) -> Result<Self> {
        let vault = Vault::open(store, passphrase)?;
        Ok(Self {
            vault,
            session: Arc::new(Mutex::new(Session::new(passphrase, idle_timeout))),
            audit: None,
        })
    }

    /// Open using the paths and timings from `config`.
    pub fn open_with_config(config: &Config, passphrase: &str) -> Result<Self> {
        let store = VaultStore::new(config.vault_path(), config.kdf_params()?);
        Self::open(store, passphrase, config.idle_timeout())
    }

    /// Report every operation to `hook` (operation name, detail).
    pub fn with_audit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Option<&str>) + Send + 'static,
    {
        self.audit = Some(Box::new(hook));
        self
    }

    /// Shared handle for an [`crate::session::IdleWatcher`].
    pub fn session_handle(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    pub fn session(&self) -> MutexGuard<'_, Session> {
        // A poisoned lock only means a watcher thread panicked mid-tick;
        // the session data itself is still consistent.
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn gate(&self) -> Result<()> {
        self.session().gate()
    }

    fn audit(&self, operation: &str, detail: Option<&str>) {
        if let Some(hook) = &self.audit {
            hook(operation, detail);
        }
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn is_locked(&self) -> bool {
        self.session().is_locked()
    }

    pub fn touch_activity(&self) {
        self.session().touch_activity();
    }

    pub fn tick(&self) -> Option<LockEvent> {
        let event = self.session().tick();
        if event.is_some() {
            self.audit("lock", Some("idle timeout"));
        }
        event
    }

    pub fn lock(&self) -> Option<LockEvent> {
        let event = self.session().lock();
        if event.is_some() {
            self.audit("lock", Some("requested"));
        }
        event
    }

    /// Record a lock performed by an [`crate::session::IdleWatcher`].
    pub fn note_idle_lock(&self) {
        self.audit("lock", Some("idle timeout"));
    }

    pub fn begin_reauth(&self) {
        self.session().begin_reauth();
    }

    pub fn authenticate(&self, passphrase: &str) -> bool {
        self.answer_reauth(Some(passphrase)) == ReauthOutcome::Unlocked
    }

    /// Feed the unlock prompt's answer (`None` = cancelled) to the session.
    pub fn answer_reauth(&self, answer: Option<&str>) -> ReauthOutcome {
        let outcome = self.session().answer_reauth(answer);
        match outcome {
            ReauthOutcome::Unlocked => self.audit("unlock", None),
            ReauthOutcome::Retry => self.audit("unlock-failed", None),
            ReauthOutcome::Exit => self.audit("exit", Some("unlock cancelled")),
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    pub fn list_records(&self) -> Result<&[Record]> {
        self.gate()?;
        Ok(self.vault.records())
    }

    /// Records whose site, id or tags contain `query`, paired with their
    /// position in the full list.
    pub fn search(&self, query: &str) -> Result<Vec<(usize, &Record)>> {
        self.gate()?;
        Ok(self
            .vault
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(query))
            .collect())
    }

    pub fn get(&self, index: usize) -> Result<&Record> {
        self.gate()?;
        self.vault.get(index)
    }

    pub fn settings(&self) -> Result<&Settings> {
        self.gate()?;
        Ok(self.vault.settings())
    }

    pub fn add(&mut self, record: Record) -> Result<()> {
        self.gate()?;
        let result = self.vault.add(record);
        let total = self.vault.records().len();
        let detail = position_detail(total.saturating_sub(1), total);
        self.audit_commit("add", &detail, &result);
        result
    }

    pub fn edit(&mut self, index: usize, record: Record) -> Result<()> {
        self.gate()?;
        let result = self.vault.edit(index, record);
        let detail = position_detail(index, self.vault.records().len());
        self.audit_commit("edit", &detail, &result);
        result
    }

    pub fn delete(&mut self, index: usize) -> Result<Record> {
        self.gate()?;
        let result = self.vault.delete(index);
        match &result {
            Ok(_) => {
                let detail = position_detail(index, self.vault.records().len() + 1);
                self.audit("delete", Some(&detail));
            }
            Err(e) => self.audit_failure("delete", e),
        }
        result
    }

    pub fn set_show_password(&mut self, show: bool) -> Result<()> {
        self.gate()?;
        let detail = format!("show_password={show}");
        let result = self.vault.set_show_password(show);
        self.audit_commit("settings", &detail, &result);
        result
    }

    pub fn save(&mut self) -> Result<()> {
        self.gate()?;
        let result = self.vault.save();
        self.audit_commit("save", &format!("{} record(s)", self.vault.records().len()), &result);
        result
    }

    fn audit_commit(&self, operation: &str, detail: &str, result: &Result<()>) {
        match result {
            Ok(()) => self.audit(operation, Some(detail)),
            Err(e) => self.audit_failure(operation, e),
        }
    }

    fn audit_failure(&self, operation: &str, error: &LockaError) {
        if matches!(error, LockaError::CommitRolledBack { .. }) {
            self.audit("commit-failed", Some(operation));
        }
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// One display line for `record` under the current settings.
    pub fn format_for_display(&self, record: &Record) -> String {
        format_for_display(record, self.vault.settings())
    }

    /// The lines the record list should show right now.
    ///
    /// While locked this is exactly one placeholder line; no record
    /// text, masked or not, is ever produced.
    pub fn render(&self, query: &str) -> Vec<String> {
        match self.search(query) {
            Ok(matches) => matches
                .into_iter()
                .map(|(i, r)| format!("{:>3}. {}", i + 1, self.format_for_display(r)))
                .collect(),
            Err(_) => vec![LOCKED_PLACEHOLDER.to_string()],
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }
}

/// Audit detail for a record: its 1-based position and the record count.
///
/// Record fields never leave the vault file, so the audit trail only
/// ever says *where* a change happened.
fn position_detail(index: usize, total: usize) -> String {
    format!("#{} of {total}", index + 1)
}
