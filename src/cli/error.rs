//! CLI error types and conversions

use crate::config::ConfigError;
use crate::export::ExportError;

/// CLI errors: everything fatal that can surface at the run boundary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export run error
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Health endpoint error
    #[error("health endpoint error: {0}")]
    Health(String),
}
