use clap::Parser;
use locka::cli::commands::edit::EditArgs;
use locka::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { ref search } => locka::cli::commands::list::execute(&cli, search.as_deref()),
        Commands::Add {
            ref site,
            ref id,
            ref tags,
        } => locka::cli::commands::add::execute(&cli, site, id, tags),
        Commands::Edit {
            index,
            ref site,
            ref id,
            ref tags,
            password,
        } => locka::cli::commands::edit::execute(
            &cli,
            index,
            &EditArgs {
                site: site.as_deref(),
                id: id.as_deref(),
                tags: tags.as_deref(),
                new_password: password,
            },
        ),
        Commands::Delete { index, force } => {
            locka::cli::commands::delete::execute(&cli, index, force)
        }
        Commands::ShowPassword { state } => {
            locka::cli::commands::show_password::execute(&cli, state)
        }
        Commands::Save => locka::cli::commands::save::execute(&cli),
        Commands::Shell => locka::cli::commands::shell::execute(&cli),
        Commands::Audit { last, ref since } => audit(&cli, last, since.as_deref()),
        Commands::Version => locka::cli::commands::version::execute(),
    };

    if let Err(e) = result {
        locka::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

#[cfg(feature = "audit-log")]
fn audit(cli: &Cli, last: usize, since: Option<&str>) -> locka::errors::Result<()> {
    locka::cli::commands::audit_cmd::execute(cli, last, since)
}

#[cfg(not(feature = "audit-log"))]
fn audit(_cli: &Cli, _last: usize, _since: Option<&str>) -> locka::errors::Result<()> {
    Err(locka::errors::LockaError::AuditError(
        "this build was compiled without the `audit-log` feature".into(),
    ))
}
