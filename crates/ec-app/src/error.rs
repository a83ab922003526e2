//! Error types for the ec-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the lower crates and gives
/// the command line a single error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ec-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ec_core::CoreError> for AppError {
    fn from(err: ec_core::CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<ec_controls::ControlError> for AppError {
    fn from(err: ec_controls::ControlError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<ec_devices::DeviceError> for AppError {
    fn from(err: ec_devices::DeviceError) -> Self {
        AppError::Device(err.to_string())
    }
}

impl From<rumqttc::ClientError> for AppError {
    fn from(err: rumqttc::ClientError) -> Self {
        AppError::Transport(err.to_string())
    }
}
