//! In-memory Snapcast server for tests and demos.
//!
//! [`FakeServer`] implements the control contracts over plain structs.
//! Mutations change state without firing callbacks; tests call
//! `push_status` to model a server push. The fake keeps the server
//! invariant that every client belongs to exactly one group, including
//! across `add_client` / `remove_client` moves.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::control::{
    ClientHandle, ControlError, GroupHandle, ServerConnector, ServerHandle, StatusCallback,
};

#[derive(Default)]
struct FakeServerInner {
    /// Stream friendly name to stream id.
    streams: RwLock<HashMap<String, String>>,
    groups: RwLock<Vec<Arc<FakeGroup>>>,
    clients: RwLock<Vec<Arc<FakeClient>>>,
}

impl ServerHandle for FakeServerInner {
    fn groups(&self) -> Vec<Arc<dyn GroupHandle>> {
        self.groups
            .read()
            .iter()
            .map(|group| group.clone() as Arc<dyn GroupHandle>)
            .collect()
    }

    fn clients(&self) -> Vec<Arc<dyn ClientHandle>> {
        self.clients
            .read()
            .iter()
            .map(|client| client.clone() as Arc<dyn ClientHandle>)
            .collect()
    }

    fn streams_by_name(&self) -> HashMap<String, String> {
        self.streams.read().clone()
    }
}

/// Builder and handle registry for the in-memory server.
pub struct FakeServer {
    inner: Arc<FakeServerInner>,
}

impl FakeServer {
    /// Empty server with no streams, groups or clients.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeServerInner::default()),
        }
    }

    /// Add a stream.
    pub fn with_stream(self, id: &str, name: &str) -> Self {
        self.inner
            .streams
            .write()
            .insert(name.to_string(), id.to_string());
        self
    }

    /// Add a group playing the given stream id.
    pub fn with_group(self, id: &str, friendly_name: &str, stream: &str) -> Self {
        let group = Arc::new(FakeGroup {
            id: id.to_string(),
            server: Arc::downgrade(&self.inner),
            state: Mutex::new(GroupState {
                friendly_name: friendly_name.to_string(),
                stream: stream.to_string(),
                stream_status: "idle".to_string(),
                muted: false,
                volume: 0,
                clients: Vec::new(),
                snapshot: None,
            }),
            callback: Mutex::new(None),
        });
        self.inner.groups.write().push(group);
        self
    }

    /// Add a client as a member of an existing group.
    ///
    /// Panics if the group does not exist; fixtures must declare groups
    /// first.
    pub fn with_client(self, group_id: &str, id: &str, friendly_name: &str) -> Self {
        self.group(group_id)
            .state
            .lock()
            .clients
            .push(id.to_string());
        let client = Arc::new(FakeClient {
            id: id.to_string(),
            server: Arc::downgrade(&self.inner),
            state: Mutex::new(ClientState {
                friendly_name: friendly_name.to_string(),
                connected: true,
                muted: false,
                volume: 0,
                latency: None,
                snapshot: None,
            }),
            callback: Mutex::new(None),
        });
        self.inner.clients.write().push(client);
        self
    }

    /// Fetch a group by id. Panics if it does not exist.
    pub fn group(&self, id: &str) -> Arc<FakeGroup> {
        self.inner
            .groups
            .read()
            .iter()
            .find(|group| group.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("unknown group: {id}"))
    }

    /// Fetch a client by id. Panics if it does not exist.
    pub fn client(&self, id: &str) -> Arc<FakeClient> {
        self.inner
            .clients
            .read()
            .iter()
            .find(|client| client.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("unknown client: {id}"))
    }

    /// Ids of all groups, including ones created by membership moves.
    pub fn group_ids(&self) -> Vec<String> {
        self.inner
            .groups
            .read()
            .iter()
            .map(|group| group.id.clone())
            .collect()
    }

    /// The server as a control handle.
    pub fn handle(&self) -> Arc<dyn ServerHandle> {
        self.inner.clone()
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

struct GroupState {
    friendly_name: String,
    stream: String,
    stream_status: String,
    muted: bool,
    volume: u32,
    clients: Vec<String>,
    snapshot: Option<GroupSnapshot>,
}

#[derive(Clone)]
struct GroupSnapshot {
    muted: bool,
    volume: u32,
    stream: String,
}

/// In-memory group handle.
pub struct FakeGroup {
    id: String,
    server: Weak<FakeServerInner>,
    state: Mutex<GroupState>,
    // Separate from the state lock so a firing callback can read state
    callback: Mutex<Option<StatusCallback>>,
}

impl FakeGroup {
    fn server(&self) -> Arc<FakeServerInner> {
        self.server.upgrade().expect("fake server dropped")
    }

    /// Change the reported stream status.
    pub fn set_stream_status(&self, status: &str) {
        self.state.lock().stream_status = status.to_string();
    }

    /// Fire the installed callback, modelling a server push.
    pub fn push_status(&self) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Whether a callback is currently installed.
    pub fn has_callback(&self) -> bool {
        self.callback.lock().is_some()
    }
}

#[async_trait]
impl GroupHandle for FakeGroup {
    fn identifier(&self) -> String {
        self.id.clone()
    }

    fn friendly_name(&self) -> String {
        self.state.lock().friendly_name.clone()
    }

    fn stream(&self) -> String {
        self.state.lock().stream.clone()
    }

    fn stream_status(&self) -> String {
        self.state.lock().stream_status.clone()
    }

    fn streams_by_name(&self) -> HashMap<String, String> {
        self.server().streams.read().clone()
    }

    fn muted(&self) -> bool {
        self.state.lock().muted
    }

    fn volume(&self) -> u32 {
        self.state.lock().volume
    }

    fn clients(&self) -> Vec<String> {
        self.state.lock().clients.clone()
    }

    async fn set_muted(&self, muted: bool) -> Result<(), ControlError> {
        self.state.lock().muted = muted;
        Ok(())
    }

    async fn set_volume(&self, volume: u32) -> Result<(), ControlError> {
        self.state.lock().volume = volume.min(100);
        Ok(())
    }

    async fn set_stream(&self, stream_id: &str) -> Result<(), ControlError> {
        let known = self
            .server()
            .streams
            .read()
            .values()
            .any(|id| id == stream_id);
        if !known {
            return Err(ControlError::UnknownStream(stream_id.to_string()));
        }
        self.state.lock().stream = stream_id.to_string();
        Ok(())
    }

    async fn add_client(&self, client_id: &str) -> Result<(), ControlError> {
        let server = self.server();
        let known = server
            .clients
            .read()
            .iter()
            .any(|client| client.id == client_id);
        if !known {
            return Err(ControlError::UnknownClient(client_id.to_string()));
        }

        // Take the client out of every other group first
        for group in server.groups.read().iter() {
            if group.id != self.id {
                group.state.lock().clients.retain(|c| c != client_id);
            }
        }
        let mut state = self.state.lock();
        if !state.clients.iter().any(|c| c == client_id) {
            state.clients.push(client_id.to_string());
        }
        Ok(())
    }

    async fn remove_client(&self, client_id: &str) -> Result<(), ControlError> {
        let stream = {
            let mut state = self.state.lock();
            let before = state.clients.len();
            state.clients.retain(|c| c != client_id);
            if state.clients.len() == before {
                return Err(ControlError::UnknownClient(client_id.to_string()));
            }
            state.stream.clone()
        };

        // The server puts a removed client into a fresh group of its own
        let server = self.server();
        let solo = Arc::new(FakeGroup {
            id: format!("group_{client_id}"),
            server: Arc::downgrade(&server),
            state: Mutex::new(GroupState {
                friendly_name: client_id.to_string(),
                stream,
                stream_status: "idle".to_string(),
                muted: false,
                volume: 0,
                clients: vec![client_id.to_string()],
                snapshot: None,
            }),
            callback: Mutex::new(None),
        });
        server.groups.write().push(solo);
        Ok(())
    }

    fn snapshot(&self) {
        let mut state = self.state.lock();
        state.snapshot = Some(GroupSnapshot {
            muted: state.muted,
            volume: state.volume,
            stream: state.stream.clone(),
        });
    }

    async fn restore(&self) -> Result<(), ControlError> {
        let mut state = self.state.lock();
        if let Some(snapshot) = state.snapshot.clone() {
            state.muted = snapshot.muted;
            state.volume = snapshot.volume;
            state.stream = snapshot.stream;
        }
        Ok(())
    }

    fn set_callback(&self, callback: Option<StatusCallback>) {
        *self.callback.lock() = callback;
    }
}

struct ClientState {
    friendly_name: String,
    connected: bool,
    muted: bool,
    volume: u32,
    latency: Option<i64>,
    snapshot: Option<ClientSnapshot>,
}

#[derive(Clone)]
struct ClientSnapshot {
    muted: bool,
    volume: u32,
    latency: Option<i64>,
}

/// In-memory client handle.
pub struct FakeClient {
    id: String,
    server: Weak<FakeServerInner>,
    state: Mutex<ClientState>,
    // Separate from the state lock so a firing callback can read state
    callback: Mutex<Option<StatusCallback>>,
}

impl FakeClient {
    fn server(&self) -> Arc<FakeServerInner> {
        self.server.upgrade().expect("fake server dropped")
    }

    /// Flip the connected flag.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Fire the installed callback, modelling a server push.
    pub fn push_status(&self) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Whether a callback is currently installed.
    pub fn has_callback(&self) -> bool {
        self.callback.lock().is_some()
    }
}

#[async_trait]
impl ClientHandle for FakeClient {
    fn identifier(&self) -> String {
        self.id.clone()
    }

    fn friendly_name(&self) -> String {
        self.state.lock().friendly_name.clone()
    }

    fn connected(&self) -> bool {
        self.state.lock().connected
    }

    fn muted(&self) -> bool {
        self.state.lock().muted
    }

    fn volume(&self) -> u32 {
        self.state.lock().volume
    }

    fn latency(&self) -> Option<i64> {
        self.state.lock().latency
    }

    fn group(&self) -> Arc<dyn GroupHandle> {
        self.server()
            .groups
            .read()
            .iter()
            .find(|group| group.state.lock().clients.iter().any(|c| c == &self.id))
            .cloned()
            .map(|group| group as Arc<dyn GroupHandle>)
            .expect("client not in any group")
    }

    fn groups_available(&self) -> Vec<Arc<dyn GroupHandle>> {
        self.server()
            .groups
            .read()
            .iter()
            .map(|group| group.clone() as Arc<dyn GroupHandle>)
            .collect()
    }

    async fn set_muted(&self, muted: bool) -> Result<(), ControlError> {
        self.state.lock().muted = muted;
        Ok(())
    }

    async fn set_volume(&self, volume: u32) -> Result<(), ControlError> {
        self.state.lock().volume = volume.min(100);
        Ok(())
    }

    async fn set_latency(&self, latency: i64) -> Result<(), ControlError> {
        self.state.lock().latency = Some(latency);
        Ok(())
    }

    fn snapshot(&self) {
        let mut state = self.state.lock();
        state.snapshot = Some(ClientSnapshot {
            muted: state.muted,
            volume: state.volume,
            latency: state.latency,
        });
    }

    async fn restore(&self) -> Result<(), ControlError> {
        let mut state = self.state.lock();
        if let Some(snapshot) = state.snapshot.clone() {
            state.muted = snapshot.muted;
            state.volume = snapshot.volume;
            state.latency = snapshot.latency;
        }
        Ok(())
    }

    fn set_callback(&self, callback: Option<StatusCallback>) {
        *self.callback.lock() = callback;
    }
}

/// Connector that hands out the in-memory server, or refuses to.
pub struct FakeConnector {
    server: Option<Arc<dyn ServerHandle>>,
    connections: Mutex<Vec<(String, u16, bool)>>,
}

impl FakeConnector {
    /// Connector that always yields the given server.
    pub fn ok(server: &FakeServer) -> Self {
        Self {
            server: Some(server.handle()),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Connector that fails every attempt.
    pub fn unreachable() -> Self {
        Self {
            server: None,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Arguments of every connect attempt so far.
    pub fn connections(&self) -> Vec<(String, u16, bool)> {
        self.connections.lock().clone()
    }
}

#[async_trait]
impl ServerConnector for FakeConnector {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        reconnect: bool,
    ) -> Result<Arc<dyn ServerHandle>, ControlError> {
        self.connections
            .lock()
            .push((host.to_string(), port, reconnect));
        self.server
            .clone()
            .ok_or_else(|| ControlError::Unreachable(format!("{host}:{port}")))
    }
}
