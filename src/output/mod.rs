//! CSV artifact writers
//!
//! Both output files are written atomically: rows serialize into a temporary
//! file in the destination directory which is then renamed into place, so a
//! crash mid-write never leaves a truncated file visible under the final
//! name.

pub mod csv;

pub use csv::{write_department_summary, write_employee_export};

/// Output writer errors (all fatal for the run).
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Filesystem error (directory creation, temp file, rename)
    #[error("IO error: {0}")]
    Io(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
