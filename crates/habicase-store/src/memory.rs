//! In-memory snapshot store for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{SnapshotStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with one blob.
    pub fn with_blob(key: &str, blob: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(key.to_string(), blob.to_string());
        }
        store
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))?;
        slots.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))?;
        Ok(slots.get(key).cloned())
    }
}
