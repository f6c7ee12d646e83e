use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{KdfKind, KdfParams};
use crate::errors::{LockaError, Result};

/// Project-level configuration, loaded from `locka.toml`.
///
/// Every field has a sensible default so Locka works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the vault, backups and the audit log.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File name of the encrypted vault inside `data_dir`.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// Key derivation function for newly written envelopes.
    #[serde(default = "default_kdf")]
    pub kdf: String,

    /// KDF cost.  Omit to use the default for the chosen `kdf`.
    #[serde(default)]
    pub kdf_iterations: Option<u32>,

    /// Seconds without input before the session locks.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the idle timer is checked, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause between locking and prompting, in milliseconds.
    #[serde(default = "default_reauth_delay_ms")]
    pub reauth_delay_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_vault_file() -> String {
    "locka.enc".to_string()
}

fn default_kdf() -> String {
    KdfKind::Pbkdf2Sha256.id().to_string()
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_reauth_delay_ms() -> u64 {
    100
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            vault_file: default_vault_file(),
            kdf: default_kdf(),
            kdf_iterations: None,
            idle_timeout_secs: default_idle_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            reauth_delay_ms: default_reauth_delay_ms(),
        }
    }
}

impl Config {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = "locka.toml";

    /// Load settings from `<project_dir>/locka.toml`.
    ///
    /// If the file does not exist, defaults are returned.  Relative
    /// `data_dir` values are resolved against `project_dir`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&contents).map_err(|e| {
                LockaError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
            })?
        } else {
            Self::default()
        };

        if Path::new(&config.data_dir).is_relative() {
            config.data_dir = project_dir.join(&config.data_dir).to_string_lossy().into_owned();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.vault_file.trim().is_empty() {
            return Err(LockaError::ConfigError("vault_file cannot be empty".into()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(LockaError::ConfigError(
                "idle_timeout_secs must be at least 1".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(LockaError::ConfigError(
                "poll_interval_ms must be at least 1".into(),
            ));
        }
        self.kdf_params()
            .map_err(|e| LockaError::ConfigError(e.to_string()))?;
        Ok(())
    }

    /// Directory holding the vault file.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Full path of the encrypted vault, e.g. `data/locka.enc`.
    pub fn vault_path(&self) -> PathBuf {
        self.data_dir().join(&self.vault_file)
    }

    /// KDF settings for new envelopes.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let kind: KdfKind = self.kdf.parse()?;
        let params = KdfParams {
            kind,
            iterations: self.kdf_iterations.unwrap_or_else(|| kind.default_iterations()),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reauth_delay(&self) -> Duration {
        Duration::from_millis(self.reauth_delay_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_sensible() {
        let c = Config::default();
        assert_eq!(c.vault_path(), PathBuf::from("data/locka.enc"));
        assert_eq!(c.idle_timeout(), Duration::from_secs(120));
        assert_eq!(c.poll_interval(), Duration::from_secs(1));
        assert_eq!(c.reauth_delay(), Duration::from_millis(100));
        assert_eq!(c.kdf_params().unwrap(), KdfParams::default());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let c = Config::load(tmp.path()).unwrap();
        assert_eq!(c.vault_path(), tmp.path().join("data").join("locka.enc"));
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
data_dir = "secrets"
kdf = "argon2id"
kdf_iterations = 2
idle_timeout_secs = 30
poll_interval_ms = 250
"#;
        fs::write(tmp.path().join(Config::FILE_NAME), config).unwrap();

        let c = Config::load(tmp.path()).unwrap();
        assert_eq!(c.vault_path(), tmp.path().join("secrets").join("locka.enc"));
        assert_eq!(c.kdf_params().unwrap().kind, KdfKind::Argon2id);
        assert_eq!(c.kdf_params().unwrap().iterations, 2);
        assert_eq!(c.idle_timeout(), Duration::from_secs(30));
        assert_eq!(c.poll_interval(), Duration::from_millis(250));
        // Untouched fields keep their defaults.
        assert_eq!(c.reauth_delay(), Duration::from_millis(100));
    }

    #[test]
    fn kdf_default_iterations_follow_kind() {
        let c = Config {
            kdf: "argon2id".into(),
            ..Config::default()
        };
        assert_eq!(c.kdf_params().unwrap().iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Config::FILE_NAME), "not valid {{toml").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_bad_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Config::FILE_NAME), "kdf = \"md5\"\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());

        fs::write(tmp.path().join(Config::FILE_NAME), "kdf_iterations = 5\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());

        fs::write(tmp.path().join(Config::FILE_NAME), "idle_timeout_secs = 0\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }
}
