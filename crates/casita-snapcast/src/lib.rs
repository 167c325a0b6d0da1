//! Snapcast multi-room audio integration.
//!
//! Wraps the groups and clients of a Snapcast server in hub media
//! player entities. Groups expose the stream they play, clients expose
//! their connection state; both forward volume, mute and source writes
//! to the control connection. Client-only services cover latency,
//! snapshot and restore, and regrouping.
//!
//! The control connection itself lives behind the [`control`] traits;
//! [`testing`] provides an in-memory server for tests and demos.

pub mod config;
pub mod control;
pub mod error;
pub mod media_player;
pub mod setup;
pub mod testing;

pub use config::SnapcastConfig;
pub use control::{
    ClientHandle, ControlError, GroupHandle, ServerConnector, ServerHandle, StatusCallback,
    CONTROL_PORT,
};
pub use error::SnapcastError;
pub use media_player::{
    ClientMediaPlayer, GroupMediaPlayer, MediaPlayerFeature, SnapcastPlayer, CLIENT_PREFIX,
    CLIENT_SUFFIX, GROUP_PREFIX, GROUP_SUFFIX,
};
pub use setup::{
    setup_platform, SnapcastPlayers, ATTR_LATENCY, ATTR_MASTER, DATA_KEY, SERVICE_JOIN,
    SERVICE_RESTORE, SERVICE_SET_LATENCY, SERVICE_SNAPSHOT, SERVICE_UNJOIN,
};
