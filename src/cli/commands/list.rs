//! `locka list` — display records in a table.

use crate::cli::output;
use crate::cli::{load_config, open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, search: Option<&str>) -> Result<()> {
    let config = load_config(cli)?;
    let locka = open_vault(&config)?;

    let rows = locka.search(search.unwrap_or(""))?;
    let total = locka.list_records()?.len();

    match search {
        Some(q) if !q.trim().is_empty() => {
            output::info(&format!("{} of {total} record(s) match '{q}'", rows.len()));
        }
        _ => output::info(&format!("{total} record(s)")),
    }

    output::print_records_table(&rows, locka.settings()?);

    Ok(())
}
