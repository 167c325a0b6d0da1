//! Platform: the registry one integration populates with entities and
//! entity services.
//!
//! A platform owns the entity map, the registered service handlers, the
//! refresh channel adapters use to ask for a state re-read, and the
//! dispatcher discovery bridges send their signals on.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::dispatcher::{Dispatcher, SharedDispatcher, SignalPayload};
use crate::entity::{EntityId, SharedEntity};
use crate::error::{HubError, Result};
use crate::service::{ServiceCall, ServiceSchema};
use crate::store::DataStore;

/// Signal sent after entities were added to a platform. The payload is
/// the batch of new unique ids.
pub const SIGNAL_ENTITY_ADDED: &str = "entity_added";

/// Capacity of the refresh request channel.
pub const REFRESH_CHANNEL_CAPACITY: usize = 256;

/// When an adapter re-reads vendor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Request a refresh after every successful write.
    OnWrite,
    /// Rely on vendor push updates only.
    PushOnly,
}

impl RefreshPolicy {
    /// Whether writes should be followed by a refresh request.
    pub fn on_write(&self) -> bool {
        matches!(self, RefreshPolicy::OnWrite)
    }
}

/// Handle adapters use to request a state re-read for one entity.
///
/// Requests are broadcast; whoever drives the platform (a poll loop, a
/// state publisher) subscribes and re-reads the named entity. Sending
/// never blocks and never touches vendor objects.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: broadcast::Sender<EntityId>,
}

impl RefreshHandle {
    /// Standalone handle with its own channel.
    ///
    /// Platforms hand out their own handle through
    /// [`Platform::refresh_handle`]; this constructor exists for code
    /// that wires adapters without a platform.
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(REFRESH_CHANNEL_CAPACITY).0,
        }
    }

    /// Ask for a refresh of one entity. Returns `true` if anyone listened.
    pub fn request(&self, id: impl Into<EntityId>) -> bool {
        self.tx.send(id.into()).is_ok()
    }

    /// Subscribe to refresh requests.
    pub fn subscribe(&self) -> RefreshRequests {
        RefreshRequests {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RefreshHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of refresh requests.
pub struct RefreshRequests {
    rx: broadcast::Receiver<EntityId>,
}

impl RefreshRequests {
    /// Receive the next request.
    ///
    /// Returns `None` if the platform is gone.
    pub async fn recv(&mut self) -> Option<EntityId> {
        loop {
            match self.rx.recv().await {
                Ok(id) => return Some(id),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some requests, newer ones still arrive
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a request without blocking.
    pub fn try_recv(&mut self) -> Option<EntityId> {
        self.rx.try_recv().ok()
    }
}

/// Boxed async service handler.
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct RegisteredService {
    schema: ServiceSchema,
    handler: ServiceHandler,
}

/// Entity registry for one integration.
pub struct Platform {
    name: String,
    entities: DashMap<String, SharedEntity>,
    services: DashMap<String, RegisteredService>,
    refresh: RefreshHandle,
    dispatcher: SharedDispatcher,
    data: DataStore,
}

impl Platform {
    /// Create an empty platform.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dispatcher: Arc::new(Dispatcher::with_name(name.clone())),
            name,
            entities: DashMap::new(),
            services: DashMap::new(),
            refresh: RefreshHandle::new(),
            data: DataStore::new(),
        }
    }

    /// Platform name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatcher shared with this platform's bridges.
    pub fn dispatcher(&self) -> SharedDispatcher {
        self.dispatcher.clone()
    }

    /// Runtime data store shared with this platform's setup code.
    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Handle for requesting entity refreshes.
    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Subscribe to refresh requests.
    pub fn subscribe_refresh(&self) -> RefreshRequests {
        self.refresh.subscribe()
    }

    /// Register a batch of entities.
    ///
    /// Each entity gets its `added_to_hub` hook before it becomes
    /// visible, then one `entity_added` signal carries the whole batch.
    pub async fn add_entities(&self, entities: Vec<SharedEntity>) {
        if entities.is_empty() {
            return;
        }

        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            entity.added_to_hub().await;
            let id = entity.unique_id().to_string();
            tracing::debug!(platform = %self.name, entity = %id, "entity added");
            if self.entities.insert(id.clone(), entity).is_some() {
                tracing::warn!(platform = %self.name, entity = %id, "entity replaced");
            }
            ids.push(id);
        }

        tracing::info!(platform = %self.name, count = ids.len(), "entities registered");
        self.dispatcher
            .send_from(SIGNAL_ENTITY_ADDED, SignalPayload::Ids(ids), &self.name)
            .await;
    }

    /// Remove one entity and run its `removed_from_hub` hook.
    pub async fn remove_entity(&self, unique_id: &str) -> Result<()> {
        let (_, entity) = self
            .entities
            .remove(unique_id)
            .ok_or_else(|| HubError::EntityNotFound(unique_id.to_string()))?;
        entity.removed_from_hub().await;
        tracing::debug!(platform = %self.name, entity = %unique_id, "entity removed");
        Ok(())
    }

    /// Look up an entity by unique id.
    pub fn entity(&self, unique_id: &str) -> Option<SharedEntity> {
        self.entities.get(unique_id).map(|e| e.value().clone())
    }

    /// Unique ids of all registered entities.
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Register a named entity service with its argument schema.
    pub fn register_entity_service<F, Fut>(
        &self,
        name: impl Into<String>,
        schema: ServiceSchema,
        handler: F,
    ) where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(platform = %self.name, service = %name, "service registered");
        self.services.insert(
            name,
            RegisteredService {
                schema,
                handler: Arc::new(move |call| Box::pin(handler(call))),
            },
        );
    }

    /// Whether a service is registered.
    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Names of all registered services.
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.key().clone()).collect()
    }

    /// Validate and dispatch one service call.
    pub async fn call_service(&self, call: ServiceCall) -> Result<()> {
        let handler = {
            let service = self
                .services
                .get(&call.service)
                .ok_or_else(|| HubError::ServiceNotFound(call.service.clone()))?;
            service.schema.validate(&call.args)?;
            service.handler.clone()
        };
        handler(call).await
    }
}
