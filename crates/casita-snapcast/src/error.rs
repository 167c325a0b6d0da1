//! Snapcast integration errors.

use casita_core::HubError;
use thiserror::Error;

use crate::control::ControlError;

/// Errors from the Snapcast media player adapters.
#[derive(Debug, Error)]
pub enum SnapcastError {
    /// The control connection reported a failure.
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// A source name that is not in the group's stream list.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// No group on the server contains the requested master client.
    #[error("No group contains master client {0}")]
    NoGroupForMaster(String),
}

impl From<SnapcastError> for HubError {
    fn from(err: SnapcastError) -> Self {
        match err {
            SnapcastError::UnknownSource(source) => {
                HubError::InvalidArgument(format!("unknown source: {source}"))
            }
            other => HubError::Integration(other.to_string()),
        }
    }
}
