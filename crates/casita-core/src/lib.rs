//! Core primitives shared by the Casita integrations.
//!
//! This crate defines the hub side of the adapter pattern:
//!
//! - [`entity`]: the `Entity` contract plus the fixed state vocabulary
//! - [`platform`]: per-integration registry of entities and services
//! - [`service`]: service calls with validated argument schemas
//! - [`dispatcher`]: named-signal broadcast used by discovery bridges
//! - [`store`]: typed runtime storage keyed per integration
//! - [`error`]: the shared error taxonomy
//!
//! Integrations wrap externally-owned vendor objects in entities whose
//! read side is recomputed from live vendor state on every call, and
//! whose write side forwards to vendor calls.

pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod platform;
pub mod service;
pub mod store;

// Entity exports
pub use entity::{Entity, EntityId, EntityState, SharedEntity};

// Platform exports
pub use platform::{
    Platform, RefreshHandle, RefreshPolicy, RefreshRequests, ServiceHandler,
    REFRESH_CHANNEL_CAPACITY, SIGNAL_ENTITY_ADDED,
};

// Service exports
pub use service::{ArgKind, ArgSpec, ServiceCall, ServiceSchema};

// Dispatcher exports
pub use dispatcher::{
    Dispatcher, SharedDispatcher, SignalMeta, SignalPayload, SignalReceiver, Subscription,
    DEFAULT_CHANNEL_CAPACITY,
};

// Store and error exports
pub use error::{HubError, Result};
pub use store::DataStore;

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::dispatcher::{Dispatcher, SharedDispatcher, SignalPayload};
    pub use crate::entity::{Entity, EntityId, EntityState, SharedEntity};
    pub use crate::error::{HubError, Result};
    pub use crate::platform::{Platform, RefreshHandle, RefreshPolicy};
    pub use crate::service::{ArgKind, ServiceCall, ServiceSchema};
    pub use crate::store::DataStore;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build profile the library was compiled with.
pub const BUILD_PROFILE: &str = if cfg!(debug_assertions) {
    "debug"
} else {
    "release"
};
