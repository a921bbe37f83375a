//! CLI command implementations

pub mod commands;
pub mod error;

pub use commands::{Cli, Commands, RunArgs, ScheduleArgs};
pub use error::CliError;
