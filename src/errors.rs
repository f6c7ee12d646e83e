use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Locka.
#[derive(Debug, Error)]
pub enum LockaError {
    // --- Crypto errors ---
    /// Wrong passphrase and tampered ciphertext are deliberately the same error.
    #[error("Authentication failed — wrong passphrase or corrupted vault data")]
    AuthenticationFailure,

    #[error("Malformed vault envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Persistence errors ---
    #[error("Could not {action} {}: {source}", .path.display())]
    PersistenceFailure {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", commit_report(.action, .backup, .cause, .reload_error.as_deref()))]
    CommitRolledBack {
        action: String,
        backup: BackupOutcome,
        cause: String,
        reload_error: Option<String>,
    },

    // --- Record / session errors ---
    #[error("Vault is locked — unlock it with the master passphrase first")]
    SessionLocked,

    #[error("No record at position {0}")]
    RecordNotFound(usize),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// What happened to the plaintext backup written after a failed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The unsaved contents were written to this file.
    Written(PathBuf),
    /// The backup itself failed; the text is the secondary cause.
    Failed(String),
}

fn commit_report(
    action: &str,
    backup: &BackupOutcome,
    cause: &str,
    reload_error: Option<&str>,
) -> String {
    let mut msg = format!(
        "Failed to save after '{action}' — rolling back to the last saved state. "
    );
    match backup {
        BackupOutcome::Written(path) => msg.push_str(&format!(
            "Your unsaved data was written UNENCRYPTED to {} — move it somewhere safe or delete it. ",
            path.display()
        )),
        BackupOutcome::Failed(why) => msg.push_str(&format!(
            "An emergency backup could not be written either ({why}); unsaved changes are lost. "
        )),
    }
    msg.push_str(&format!("Cause: {cause}"));
    if let Some(reload) = reload_error {
        msg.push_str(&format!(
            ". Reloading the vault also failed ({reload}); kept the state from before '{action}'"
        ));
    }
    msg
}

/// Convenience type alias for Locka results.
pub type Result<T> = std::result::Result<T, LockaError>;
