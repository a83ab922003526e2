//! Error types for device operations.

use std::path::PathBuf;

use ec_core::CoreError;
use thiserror::Error;

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by sensor drivers and driver selection.
///
/// Relay faults never show up here: relays degrade to logging no-ops.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Configuration named a driver that does not exist.
    #[error("Unsupported {kind} driver: {name}")]
    UnsupportedDriver { kind: &'static str, name: String },

    /// A device attribute could not be read.
    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A device attribute held something other than a number.
    #[error("Invalid value for {what}: '{value}'")]
    Parse { what: &'static str, value: String },

    /// The sample was read but is not a valid reading.
    #[error(transparent)]
    Core(#[from] CoreError),
}
