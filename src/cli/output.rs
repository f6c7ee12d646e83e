//! Terminal output for the CLI commands.
//!
//! Status lines go through [`success`], [`info`] and [`error`]; record
//! listings through [`print_records_table`].

use comfy_table::{ContentArrangement, Table};
use console::{style, StyledObject};

use crate::vault::{Record, Settings};

fn status_line(mark: StyledObject<&str>, msg: &str) -> String {
    format!("{} {msg}", mark.bold())
}

pub fn success(msg: &str) {
    println!("{}", status_line(style("\u{2713}").green(), msg));
}

/// Errors go to stderr so piped listings stay clean.
pub fn error(msg: &str) {
    eprintln!("{}", status_line(style("\u{2717}").red(), msg));
}

pub fn info(msg: &str) {
    println!("{}", status_line(style("\u{2139}").blue(), msg));
}

/// Print records as a table (#, Site, ID, Password, Tags).
///
/// `rows` pairs each record with its position in the full list so the
/// numbers stay valid for `edit`/`delete` even when filtered.
pub fn print_records_table(rows: &[(usize, &Record)], settings: &Settings) {
    if rows.is_empty() {
        info("No records to show.");
        println!(
            "{}",
            style("\u{2192} Run `locka add <SITE>` to add a record.").dim()
        );
        return;
    }

    println!("{}", records_table(rows, settings));
}

fn records_table(rows: &[(usize, &Record)], settings: &Settings) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Site", "ID", "Password", "Tags"]);

    for (index, record) in rows {
        table.add_row(vec![
            (index + 1).to_string(),
            record.site.clone(),
            record.id.clone(),
            record.displayed_password(settings).to_string(),
            record.tags.join(", "),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keeps_full_list_positions_and_masks() {
        let record = Record::new("Example", "alice", "p@ss", vec!["work".into()]);
        let hidden = Settings {
            show_password: false,
        };

        let text = records_table(&[(4, &record)], &hidden).to_string();
        assert!(text.contains('5'));
        assert!(text.contains("Example"));
        assert!(!text.contains("p@ss"));
    }
}
