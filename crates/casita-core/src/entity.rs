//! Entity contract shared by all integrations.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Hub-level state vocabulary shared by all entity kinds.
///
/// Integrations map vendor status fields into this fixed set. A vendor
/// status with no sensible mapping is reported as `None` by the entity,
/// never coerced into a wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Off,
    On,
    Idle,
    Playing,
    Paused,
    Docked,
    Returning,
    Error,
}

impl EntityState {
    /// Lowercase wire form of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Off => "off",
            EntityState::On => "on",
            EntityState::Idle => "idle",
            EntityState::Playing => "playing",
            EntityState::Paused => "paused",
            EntityState::Docked => "docked",
            EntityState::Returning => "returning",
            EntityState::Error => "error",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-assigned entity identifier.
///
/// Integrations derive these once at entity construction (typically from
/// a vendor identifier plus a per-server part) and never change them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stateful object an integration exposes to the hub.
///
/// The read side is a pure function of the wrapped vendor object: `state`,
/// `attributes` and `available` are recomputed from live vendor fields on
/// every call and must never be cached by the implementation. The write
/// side lives on the concrete adapter types, not on this trait.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Stable identifier, unique across the platform.
    fn unique_id(&self) -> &str;

    /// Machine-oriented name of the entity.
    fn name(&self) -> String;

    /// Current hub state, or `None` when the vendor status has no mapping.
    fn state(&self) -> Option<EntityState>;

    /// Extra attributes published alongside the state.
    fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// Whether the backing vendor object is usable right now.
    fn available(&self) -> bool {
        true
    }

    /// Called once after the entity is registered with a platform.
    ///
    /// Adapters install their vendor push callbacks here.
    async fn added_to_hub(&self) {}

    /// Called when the entity is removed from its platform.
    ///
    /// Adapters clear their vendor push callbacks here.
    async fn removed_from_hub(&self) {}
}

/// Shared entity handle.
pub type SharedEntity = Arc<dyn Entity>;
