//! `locka add` — append a record to the vault.

use crate::cli::output;
use crate::cli::{load_config, open_vault, read_record_password, Cli};
use crate::errors::Result;
use crate::vault::record::parse_tags;
use crate::vault::Record;

/// Execute the `add` command.
pub fn execute(cli: &Cli, site: &str, id: &str, tags: &str) -> Result<()> {
    let config = load_config(cli)?;

    // Read the record's password before the master passphrase so piped
    // input is consumed first.
    let password = read_record_password(site)?;
    let mut locka = open_vault(&config)?;

    let record = Record::new(site, id, password.as_str(), parse_tags(tags));
    locka.add(record)?;

    output::success(&format!(
        "Added '{}' ({} total)",
        site.trim(),
        locka.list_records()?.len()
    ));

    Ok(())
}
