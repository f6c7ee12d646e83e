pub mod app;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod session;
pub mod vault;

#[cfg(feature = "audit-log")]
pub mod audit;

pub use app::Locka;
