//! `locka edit` — replace the fields of one record.
//!
//! Fields not given on the command line keep their current value; the
//! record is then written back as a whole.

use crate::cli::output;
use crate::cli::{load_config, open_vault, parse_position, read_record_password, Cli};
use crate::errors::Result;
use crate::vault::record::parse_tags;
use crate::vault::Record;

/// Field overrides collected from the command line.
pub struct EditArgs<'a> {
    pub site: Option<&'a str>,
    pub id: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub new_password: bool,
}

/// Execute the `edit` command.
pub fn execute(cli: &Cli, position: usize, args: &EditArgs<'_>) -> Result<()> {
    let index = parse_position(position)?;
    let config = load_config(cli)?;

    let new_password = if args.new_password {
        Some(read_record_password(args.site.unwrap_or("this record"))?)
    } else {
        None
    };

    let mut locka = open_vault(&config)?;
    let current = locka.get(index)?.clone();

    let updated = Record::new(
        args.site.unwrap_or(&current.site),
        args.id.unwrap_or(&current.id),
        new_password
            .as_ref()
            .map_or(current.password.as_str(), |p| p.as_str()),
        args.tags.map_or(current.tags.clone(), parse_tags),
    );

    let site = updated.site.trim().to_string();
    locka.edit(index, updated)?;

    output::success(&format!("Updated record #{position} ({site})"));
    Ok(())
}
