//! Library half of the `pkmodel` binary.
//!
//! `main.rs` only parses arguments and maps results to exit codes; the
//! subcommands live in [`commands`].

pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;

pub use commands::FmtOutcome;
pub use config::{CliConfig, ConfigError, ExportFormat, CONFIG_ENV};
pub use error::{CliError, CliResult};
pub use export::{sha256_hex, ExportEnvelope};
pub use logging::init_logging;
