//! One module per subcommand.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod add;
pub mod delete;
pub mod edit;
pub mod list;
pub mod save;
pub mod shell;
pub mod show_password;
pub mod version;
