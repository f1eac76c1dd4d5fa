//! Process settings: a TOML file selected by `--settings`, overlaid with
//! `TURNSTILE__*` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
