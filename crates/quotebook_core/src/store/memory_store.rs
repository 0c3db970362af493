//! In-process key-value store.

use super::{validate_key, KeyValueStore, StoreResult};
use std::collections::HashMap;

/// Map-backed store for tests and ephemeral runs.
///
/// Durable values live as long as the value itself; there is one session.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    durable: HashMap<String, String>,
    session: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a durable value, for tests that start from prior state.
    pub fn with_durable(mut self, key: &str, value: impl Into<String>) -> Self {
        self.durable.insert(key.to_string(), value.into());
        self
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_durable(&self, key: &str) -> StoreResult<Option<String>> {
        let key = validate_key(key)?;
        Ok(self.durable.get(key).cloned())
    }

    fn set_durable(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let key = validate_key(key)?;
        self.durable.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_session(&self, key: &str) -> StoreResult<Option<String>> {
        let key = validate_key(key)?;
        Ok(self.session.get(key).cloned())
    }

    fn set_session(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let key = validate_key(key)?;
        self.session.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_session(&mut self) -> StoreResult<()> {
        self.session.clear();
        Ok(())
    }
}
