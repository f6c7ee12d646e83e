//! `locka show-password` — toggle password masking in listings.

use crate::cli::output;
use crate::cli::{load_config, open_vault, Cli, Toggle};
use crate::errors::Result;

/// Execute the `show-password` command.
pub fn execute(cli: &Cli, state: Toggle) -> Result<()> {
    let config = load_config(cli)?;
    let mut locka = open_vault(&config)?;

    locka.set_show_password(state.enabled())?;

    if state.enabled() {
        output::success("Passwords will be shown in listings.");
    } else {
        output::success("Passwords will be masked in listings.");
    }
    Ok(())
}
