//! Media player adapters for Snapcast groups and clients.
//!
//! Each adapter wraps one connection-owned handle. Reads go straight to
//! the handle on every call, writes forward to the control connection
//! and then request a refresh when the policy asks for one. Identity
//! (unique id, name) is derived once at construction and never changes.

use std::sync::Arc;

use async_trait::async_trait;
use casita_core::{Entity, EntityState, RefreshHandle, RefreshPolicy, SharedEntity};
use serde_json::{Map, Value};

use crate::control::{ClientHandle, GroupHandle};
use crate::error::SnapcastError;

/// Unique id and name prefix for group players.
pub const GROUP_PREFIX: &str = "snapcast_group_";
/// Friendly name suffix for group players.
pub const GROUP_SUFFIX: &str = "Snapcast Group";
/// Unique id and name prefix for client players.
pub const CLIENT_PREFIX: &str = "snapcast_client_";
/// Friendly name suffix for client players.
pub const CLIENT_SUFFIX: &str = "Snapcast Client";

bitflags::bitflags! {
    /// Capabilities a media player adapter advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MediaPlayerFeature: u32 {
        /// Volume can be set as a fraction.
        const VOLUME_SET = 1 << 0;
        /// Volume can be muted.
        const VOLUME_MUTE = 1 << 1;
        /// The playback source can be selected.
        const SELECT_SOURCE = 1 << 2;
    }
}

/// Map a server stream status onto the hub state vocabulary.
///
/// Anything outside the three documented statuses maps to no state.
fn stream_state(status: &str) -> Option<EntityState> {
    match status {
        "idle" => Some(EntityState::Idle),
        "playing" => Some(EntityState::Playing),
        _ => None,
    }
}

/// Media player for one Snapcast group.
pub struct GroupMediaPlayer {
    group: Arc<dyn GroupHandle>,
    uid: String,
    refresh: RefreshHandle,
    policy: RefreshPolicy,
}

impl GroupMediaPlayer {
    /// Wrap a group handle. `server_id` is the `host:port` part that
    /// keeps ids unique across servers.
    pub fn new(
        group: Arc<dyn GroupHandle>,
        server_id: &str,
        refresh: RefreshHandle,
        policy: RefreshPolicy,
    ) -> Self {
        let uid = format!("{GROUP_PREFIX}{server_id}_{}", group.identifier());
        Self {
            group,
            uid,
            refresh,
            policy,
        }
    }

    fn maybe_refresh(&self) {
        if self.policy.on_write() {
            self.refresh.request(self.uid.as_str());
        }
    }

    /// Capabilities of group players.
    pub fn features(&self) -> MediaPlayerFeature {
        MediaPlayerFeature::VOLUME_SET
            | MediaPlayerFeature::VOLUME_MUTE
            | MediaPlayerFeature::SELECT_SOURCE
    }

    /// Volume as a fraction, `0.0..=1.0`.
    pub fn volume_level(&self) -> f64 {
        f64::from(self.group.volume()) / 100.0
    }

    pub fn is_muted(&self) -> bool {
        self.group.muted()
    }

    /// Identifier of the stream the group plays.
    pub fn source(&self) -> String {
        self.group.stream()
    }

    /// Friendly names of the selectable streams.
    pub fn source_list(&self) -> Vec<String> {
        self.group.streams_by_name().keys().cloned().collect()
    }

    /// Set the group volume from a fraction.
    pub async fn set_volume_level(&self, level: f64) -> Result<(), SnapcastError> {
        self.group.set_volume((level * 100.0).round() as u32).await?;
        self.maybe_refresh();
        Ok(())
    }

    pub async fn mute_volume(&self, mute: bool) -> Result<(), SnapcastError> {
        self.group.set_muted(mute).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Switch the group to the stream with this friendly name.
    pub async fn select_source(&self, source: &str) -> Result<(), SnapcastError> {
        let streams = self.group.streams_by_name();
        let stream_id = streams
            .get(source)
            .ok_or_else(|| SnapcastError::UnknownSource(source.to_string()))?;
        self.group.set_stream(stream_id).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Record the group state for a later restore.
    pub fn snapshot(&self) {
        self.group.snapshot();
    }

    /// Apply the last recorded snapshot.
    pub async fn restore(&self) -> Result<(), SnapcastError> {
        self.group.restore().await?;
        self.maybe_refresh();
        Ok(())
    }
}

#[async_trait]
impl Entity for GroupMediaPlayer {
    fn unique_id(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> String {
        format!("{GROUP_PREFIX}{}", self.group.identifier())
    }

    fn state(&self) -> Option<EntityState> {
        stream_state(&self.group.stream_status())
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert(
            "friendly_name".to_string(),
            Value::from(format!("{} {GROUP_SUFFIX}", self.group.friendly_name())),
        );
        attrs
    }

    async fn added_to_hub(&self) {
        let refresh = self.refresh.clone();
        let uid = self.uid.clone();
        self.group.set_callback(Some(Arc::new(move || {
            refresh.request(uid.as_str());
        })));
    }

    async fn removed_from_hub(&self) {
        self.group.set_callback(None);
    }
}

/// Media player for one Snapcast client.
pub struct ClientMediaPlayer {
    client: Arc<dyn ClientHandle>,
    uid: String,
    refresh: RefreshHandle,
    policy: RefreshPolicy,
}

impl ClientMediaPlayer {
    /// Wrap a client handle. `server_id` is the `host:port` part that
    /// keeps ids unique across servers.
    pub fn new(
        client: Arc<dyn ClientHandle>,
        server_id: &str,
        refresh: RefreshHandle,
        policy: RefreshPolicy,
    ) -> Self {
        let uid = format!("{CLIENT_PREFIX}{server_id}_{}", client.identifier());
        Self {
            client,
            uid,
            refresh,
            policy,
        }
    }

    fn maybe_refresh(&self) {
        if self.policy.on_write() {
            self.refresh.request(self.uid.as_str());
        }
    }

    /// Vendor identifier of the wrapped client, used for group
    /// membership lookups.
    pub fn identifier(&self) -> String {
        self.client.identifier()
    }

    /// Capabilities of client players.
    pub fn features(&self) -> MediaPlayerFeature {
        MediaPlayerFeature::VOLUME_SET
            | MediaPlayerFeature::VOLUME_MUTE
            | MediaPlayerFeature::SELECT_SOURCE
    }

    /// Volume as a fraction, `0.0..=1.0`.
    pub fn volume_level(&self) -> f64 {
        f64::from(self.client.volume()) / 100.0
    }

    pub fn is_muted(&self) -> bool {
        self.client.muted()
    }

    /// Configured latency in milliseconds, if the server reports one.
    pub fn latency(&self) -> Option<i64> {
        self.client.latency()
    }

    /// Identifier of the stream the client's group plays.
    pub fn source(&self) -> String {
        self.client.group().stream()
    }

    /// Friendly names of the streams selectable through the group.
    pub fn source_list(&self) -> Vec<String> {
        self.client.group().streams_by_name().keys().cloned().collect()
    }

    /// Set the client volume from a fraction.
    pub async fn set_volume_level(&self, level: f64) -> Result<(), SnapcastError> {
        self.client.set_volume((level * 100.0).round() as u32).await?;
        self.maybe_refresh();
        Ok(())
    }

    pub async fn mute_volume(&self, mute: bool) -> Result<(), SnapcastError> {
        self.client.set_muted(mute).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Switch the client's group to the stream with this friendly name.
    pub async fn select_source(&self, source: &str) -> Result<(), SnapcastError> {
        let group = self.client.group();
        let streams = group.streams_by_name();
        let stream_id = streams
            .get(source)
            .ok_or_else(|| SnapcastError::UnknownSource(source.to_string()))?;
        group.set_stream(stream_id).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Set the client's playback latency in milliseconds.
    pub async fn set_latency(&self, latency: i64) -> Result<(), SnapcastError> {
        self.client.set_latency(latency).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Move this client into the group the master client plays in.
    pub async fn join(&self, master: &ClientMediaPlayer) -> Result<(), SnapcastError> {
        let master_id = master.identifier();
        let group = self
            .client
            .groups_available()
            .into_iter()
            .find(|group| group.clients().contains(&master_id))
            .ok_or_else(|| SnapcastError::NoGroupForMaster(master.unique_id().to_string()))?;
        group.add_client(&self.client.identifier()).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Move this client out of its current group.
    pub async fn unjoin(&self) -> Result<(), SnapcastError> {
        self.client
            .group()
            .remove_client(&self.client.identifier())
            .await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Record the client state for a later restore.
    pub fn snapshot(&self) {
        self.client.snapshot();
    }

    /// Apply the last recorded snapshot.
    pub async fn restore(&self) -> Result<(), SnapcastError> {
        self.client.restore().await?;
        self.maybe_refresh();
        Ok(())
    }
}

#[async_trait]
impl Entity for ClientMediaPlayer {
    fn unique_id(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> String {
        format!("{CLIENT_PREFIX}{}", self.client.identifier())
    }

    fn state(&self) -> Option<EntityState> {
        if self.client.connected() {
            Some(EntityState::On)
        } else {
            Some(EntityState::Off)
        }
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if let Some(latency) = self.client.latency() {
            attrs.insert("latency".to_string(), Value::from(latency));
        }
        attrs.insert(
            "friendly_name".to_string(),
            Value::from(format!("{} {CLIENT_SUFFIX}", self.client.friendly_name())),
        );
        attrs
    }

    fn available(&self) -> bool {
        self.client.connected()
    }

    async fn added_to_hub(&self) {
        let refresh = self.refresh.clone();
        let uid = self.uid.clone();
        self.client.set_callback(Some(Arc::new(move || {
            refresh.request(uid.as_str());
        })));
    }

    async fn removed_from_hub(&self) {
        self.client.set_callback(None);
    }
}

/// One registered Snapcast player, group or client.
///
/// Service handlers match on the kind, so a call that only makes sense
/// for clients fails with a typed error instead of a downcast.
#[derive(Clone)]
pub enum SnapcastPlayer {
    Group(Arc<GroupMediaPlayer>),
    Client(Arc<ClientMediaPlayer>),
}

impl SnapcastPlayer {
    /// Unique id of the wrapped player.
    pub fn unique_id(&self) -> &str {
        match self {
            SnapcastPlayer::Group(group) => group.unique_id(),
            SnapcastPlayer::Client(client) => client.unique_id(),
        }
    }

    /// The client adapter, if this player is one.
    pub fn as_client(&self) -> Option<&Arc<ClientMediaPlayer>> {
        match self {
            SnapcastPlayer::Group(_) => None,
            SnapcastPlayer::Client(client) => Some(client),
        }
    }

    /// The player as a platform entity.
    pub fn entity(&self) -> SharedEntity {
        match self {
            SnapcastPlayer::Group(group) => group.clone(),
            SnapcastPlayer::Client(client) => client.clone(),
        }
    }

    /// Record the player state for a later restore.
    pub fn snapshot(&self) {
        match self {
            SnapcastPlayer::Group(group) => group.snapshot(),
            SnapcastPlayer::Client(client) => client.snapshot(),
        }
    }

    /// Apply the last recorded snapshot.
    pub async fn restore(&self) -> Result<(), SnapcastError> {
        match self {
            SnapcastPlayer::Group(group) => group.restore().await,
            SnapcastPlayer::Client(client) => client.restore().await,
        }
    }
}
