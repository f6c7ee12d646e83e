//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::app::Locka;
use crate::config::Config;
use crate::errors::{LockaError, Result};

/// Environment variable that supplies the master passphrase non-interactively.
pub const PASSWORD_ENV: &str = "LOCKA_PASSWORD";

/// Locka CLI: local encrypted password vault.
#[derive(Parser)]
#[command(name = "locka", about = "Local encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the vault (overrides locka.toml)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List records (optionally filtered)
    List {
        /// Only show records whose site, id or tags contain this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Add a record (password is prompted or read from stdin)
    Add {
        /// Site or service name
        site: String,
        /// Account identifier (user name, e-mail, ...)
        #[arg(long, default_value = "")]
        id: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Edit the record at a position shown by `list`
    Edit {
        /// 1-based record position
        index: usize,
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        id: Option<String>,
        /// Comma-separated tags (replaces the existing ones)
        #[arg(long)]
        tags: Option<String>,
        /// Prompt for (or read from stdin) a new password
        #[arg(long)]
        password: bool,
    },

    /// Delete the record at a position shown by `list`
    Delete {
        /// 1-based record position
        index: usize,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show or mask passwords in listings
    ShowPassword {
        /// on or off
        state: Toggle,
    },

    /// Re-encrypt and save the vault
    Save,

    /// Interactive session with idle auto-lock
    Shell,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Self::On
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `locka.toml` from the working directory and apply CLI overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::load(&cwd)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = cwd.join(dir).to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Get the master passphrase, trying in order:
/// 1. `LOCKA_PASSWORD` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Master passphrase")
        .interact()
        .map_err(|e| LockaError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Read a record's password from piped stdin or a confirmed prompt.
pub fn read_record_password(site: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string()));
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for {site}"))
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| LockaError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Open the configured vault, prompting for the passphrase.
///
/// Operations are reported to the audit log when that feature is on.
pub fn open_vault(config: &Config) -> Result<Locka> {
    let password = prompt_password()?;
    let locka = Locka::open_with_config(config, &password)?;
    Ok(attach_audit(locka, config.data_dir()))
}

#[cfg(feature = "audit-log")]
fn attach_audit(locka: Locka, data_dir: PathBuf) -> Locka {
    locka.with_audit(move |op, detail| crate::audit::log_audit(&data_dir, op, detail))
}

#[cfg(not(feature = "audit-log"))]
fn attach_audit(locka: Locka, _data_dir: PathBuf) -> Locka {
    locka
}

/// Convert a 1-based position typed by the user into an index.
pub fn parse_position(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| LockaError::CommandFailed("record positions start at 1".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(parse_position(1).unwrap(), 0);
        assert_eq!(parse_position(7).unwrap(), 6);
        assert!(parse_position(0).is_err());
    }

    #[test]
    fn cli_parses_edit_flags() {
        let cli = Cli::try_parse_from([
            "locka", "edit", "2", "--site", "GitLab", "--tags", "work,git", "--password",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit {
                index,
                site,
                tags,
                password,
                id,
            } => {
                assert_eq!(index, 2);
                assert_eq!(site.as_deref(), Some("GitLab"));
                assert_eq!(tags.as_deref(), Some("work,git"));
                assert!(password);
                assert!(id.is_none());
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn cli_parses_toggle() {
        let cli = Cli::try_parse_from(["locka", "show-password", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ShowPassword { state: Toggle::Off }
        ));
    }
}
