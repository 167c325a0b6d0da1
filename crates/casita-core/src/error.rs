//! Error taxonomy shared by the hub primitives and the integrations.

use thiserror::Error;

/// Convenience alias used across the hub crates.
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors surfaced by the hub primitives.
#[derive(Debug, Error)]
pub enum HubError {
    /// No entity with the given id is registered.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// No service with the given name is registered.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// A service was invoked against an entity of the wrong kind.
    #[error("Entity {entity_id} is not a {expected}")]
    WrongEntityKind {
        entity_id: String,
        expected: &'static str,
    },

    /// A required service argument was not provided.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// A service argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Platform setup could not complete.
    #[error("Setup failed: {0}")]
    SetupFailed(String),

    /// An integration reported a failure while talking to its backend.
    #[error("Integration error: {0}")]
    Integration(String),
}
