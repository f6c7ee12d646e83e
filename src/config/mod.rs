//! Configuration loaded from `locka.toml`.

pub mod settings;

pub use settings::Config;
