//! `locka delete` — remove a record from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{load_config, open_vault, parse_position, Cli};
use crate::errors::{LockaError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, position: usize, force: bool) -> Result<()> {
    let index = parse_position(position)?;
    let config = load_config(cli)?;
    let mut locka = open_vault(&config)?;

    let site = locka.get(index)?.site.clone();

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete record #{position} ({site})?"))
            .default(false)
            .interact()
            .map_err(|e| LockaError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    locka.delete(index)?;
    output::success(&format!("Deleted record #{position} ({site})"));

    Ok(())
}
