//! Contracts for the Snapcast control connection.
//!
//! The hub never opens the control socket itself. A [`ServerConnector`]
//! yields a [`ServerHandle`] whose group and client handles stay owned by
//! the connection layer; the media player adapters only hold shared
//! references into it. Getters read the connection's cached server state
//! and are synchronous, setters go over the wire and are asynchronous.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Default Snapcast control port.
pub const CONTROL_PORT: u16 = 1705;

/// Callback fired by the connection layer when a server push changed the
/// state behind a handle.
pub type StatusCallback = Arc<dyn Fn() + Send + Sync>;

/// Errors from the control connection.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The server could not be reached.
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// The group is not known to the server.
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// The client is not known to the server.
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// The stream is not known to the server.
    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    /// A control request failed.
    #[error("Request failed: {0}")]
    Request(String),
}

/// Opens control connections to Snapcast servers.
#[async_trait]
pub trait ServerConnector: Send + Sync {
    /// Connect to a server and return a handle onto its live state.
    ///
    /// With `reconnect` the connection layer keeps the handle usable
    /// across server restarts.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        reconnect: bool,
    ) -> Result<Arc<dyn ServerHandle>, ControlError>;
}

/// Live view of one connected Snapcast server.
pub trait ServerHandle: Send + Sync {
    /// All groups currently on the server.
    fn groups(&self) -> Vec<Arc<dyn GroupHandle>>;

    /// All clients currently known to the server.
    fn clients(&self) -> Vec<Arc<dyn ClientHandle>>;

    /// Server streams keyed by friendly name, values are stream ids.
    fn streams_by_name(&self) -> HashMap<String, String>;
}

/// One group on the server.
#[async_trait]
pub trait GroupHandle: Send + Sync {
    fn identifier(&self) -> String;

    fn friendly_name(&self) -> String;

    /// Identifier of the stream the group plays.
    fn stream(&self) -> String;

    /// Playback status of the group's stream, as reported by the server
    /// (`"playing"`, `"idle"` or `"unknown"`).
    fn stream_status(&self) -> String;

    /// Server streams keyed by friendly name, values are stream ids.
    fn streams_by_name(&self) -> HashMap<String, String>;

    fn muted(&self) -> bool;

    /// Group volume in percent, `0..=100`.
    fn volume(&self) -> u32;

    /// Identifiers of the clients in this group.
    fn clients(&self) -> Vec<String>;

    async fn set_muted(&self, muted: bool) -> Result<(), ControlError>;

    async fn set_volume(&self, volume: u32) -> Result<(), ControlError>;

    async fn set_stream(&self, stream_id: &str) -> Result<(), ControlError>;

    /// Move a client into this group.
    async fn add_client(&self, client_id: &str) -> Result<(), ControlError>;

    /// Move a client out of this group.
    async fn remove_client(&self, client_id: &str) -> Result<(), ControlError>;

    /// Record the current group state locally. Does not touch the server.
    fn snapshot(&self);

    /// Send the last snapshot back to the server.
    async fn restore(&self) -> Result<(), ControlError>;

    /// Install or clear the server-push callback for this group.
    fn set_callback(&self, callback: Option<StatusCallback>);
}

/// One client on the server.
///
/// A client always belongs to exactly one group; the server keeps that
/// invariant, so [`ClientHandle::group`] is total.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    fn identifier(&self) -> String;

    fn friendly_name(&self) -> String;

    fn connected(&self) -> bool;

    fn muted(&self) -> bool;

    /// Client volume in percent, `0..=100`.
    fn volume(&self) -> u32;

    /// Configured playback latency in milliseconds, if the server
    /// reports one.
    fn latency(&self) -> Option<i64>;

    /// The group this client belongs to.
    fn group(&self) -> Arc<dyn GroupHandle>;

    /// All groups this client could join.
    fn groups_available(&self) -> Vec<Arc<dyn GroupHandle>>;

    async fn set_muted(&self, muted: bool) -> Result<(), ControlError>;

    async fn set_volume(&self, volume: u32) -> Result<(), ControlError>;

    async fn set_latency(&self, latency: i64) -> Result<(), ControlError>;

    /// Record the current client state locally. Does not touch the server.
    fn snapshot(&self);

    /// Send the last snapshot back to the server.
    async fn restore(&self) -> Result<(), ControlError>;

    /// Install or clear the server-push callback for this client.
    fn set_callback(&self, callback: Option<StatusCallback>);
}
