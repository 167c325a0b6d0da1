//! Tuya integration errors.

use casita_core::HubError;
use thiserror::Error;

/// Errors from the Tuya cloud surface and the tracker adapter.
#[derive(Debug, Error)]
pub enum TuyaError {
    /// The device id is not known to the manager.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The cloud request failed.
    #[error("Cloud request failed: {0}")]
    Request(String),

    /// The command or its parameters were rejected before sending.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl From<TuyaError> for HubError {
    fn from(err: TuyaError) -> Self {
        match err {
            TuyaError::InvalidCommand(msg) => HubError::InvalidArgument(msg),
            other => HubError::Integration(other.to_string()),
        }
    }
}
