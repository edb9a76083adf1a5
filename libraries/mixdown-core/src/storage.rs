//! Key-value persistence collaborator
//!
//! Mixer state (per-track gains, cached loudness values) is persisted through a
//! simple get/set/subscribe interface holding JSON values. The real backend
//! (browser storage, a settings file, ...) lives outside this workspace;
//! `MemoryStore` is the in-process implementation.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Notification sent to subscribers after a key is written
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    /// Key that changed
    pub key: String,
    /// New value
    pub value: Value,
}

/// Persistence collaborator with JSON-serializable values
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value and notify subscribers
    fn set(&self, key: &str, value: Value);

    /// Subscribe to all subsequent writes
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Read and deserialize a typed value
///
/// Returns `Ok(None)` when the key is absent.
///
/// # Errors
/// Returns an error if the stored JSON does not match `T`
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and write a typed value
///
/// # Errors
/// Returns an error if `value` cannot be represented as JSON
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?);
    Ok(())
}

/// In-memory `KeyValueStore`
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());

        // No subscribers is fine
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
