//! Error types for control operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building control primitives.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A lookup table row could not be parsed as (capacity, temperature).
    #[error("Invalid lookup table row {line}: {what}")]
    TableRow { line: usize, what: String },

    /// The lookup table source held no data rows.
    #[error("Lookup table has no data rows")]
    EmptyTable,

    /// The lookup table file could not be read.
    #[error("Failed to read lookup table: {path}")]
    TableFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
