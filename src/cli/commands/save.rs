//! `locka save` — re-encrypt the vault with a fresh salt.

use crate::cli::output;
use crate::cli::{load_config, open_vault, Cli};
use crate::errors::Result;

/// Execute the `save` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut locka = open_vault(&config)?;

    locka.save()?;

    output::success(&format!(
        "Saved {} record(s) to {}",
        locka.list_records()?.len(),
        config.vault_path().display()
    ));
    Ok(())
}
