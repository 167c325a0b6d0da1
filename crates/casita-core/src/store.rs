//! Typed key-value store for integration runtime data.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

/// Shared store where integrations stash runtime objects under string keys.
///
/// Each integration owns one key (for example `"snapcast"`) and keeps its
/// per-server state there, so service handlers resolve entities through
/// the store instead of reaching into globals.
#[derive(Default)]
pub struct DataStore {
    entries: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl DataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under a key, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.entries.insert(key.into(), value);
    }

    /// Fetch the value under a key, if present and of the requested type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value().clone().downcast::<T>().ok())
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
