//! In-memory storage backend
//!
//! Holds every key in a `HashMap` behind a `RwLock`. Useful for embedding the
//! store without a filesystem and for tests, which can inject failures and
//! override the reported byte usage through [`MemoryStorageConfig`].
//!
//! ```ignore
//! use snapnote::storage::{MemoryStorage, MemoryStorageConfig, StorageBackend};
//!
//! let storage = MemoryStorage::new_with_config(MemoryStorageConfig {
//!     fail_set: true,
//!     ..Default::default()
//! });
//! assert!(storage.set("notes", serde_json::json!([])).await.is_err());
//! ```

use super::{KeyLock, StorageBackend};
use crate::config::DEFAULT_QUOTA_BYTES;
use crate::error::{Result, SnapNoteError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Knobs for simulating storage conditions
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageConfig {
    /// Fail every `get`
    pub fail_get: bool,
    /// Fail every `set` and `remove`
    pub fail_set: bool,
    /// Fail `bytes_in_use`
    pub fail_usage: bool,
    /// Fail `set` only for this key
    pub fail_set_key: Option<String>,
    /// Report this usage instead of the serialized size
    pub bytes_in_use_override: Option<u64>,
    /// Delay added to every call, in milliseconds
    pub operation_delay_ms: Option<u64>,
}

/// In-memory key/value storage
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, Value>>>,
    config: Arc<RwLock<MemoryStorageConfig>>,
    key_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    quota_bytes: u64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new_with_config(MemoryStorageConfig::default())
    }
}

impl MemoryStorage {
    /// Create an empty store with default behavior
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom behavior
    pub fn new_with_config(config: MemoryStorageConfig) -> Self {
        Self {
            entries: Arc::default(),
            config: Arc::new(RwLock::new(config)),
            key_locks: Arc::default(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }

    /// Set the reported capacity
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Replace the behavior configuration mid-test
    pub async fn set_config(&self, config: MemoryStorageConfig) {
        *self.config.write().await = config;
    }

    /// Adjust the behavior configuration in place
    pub async fn update_config(&self, f: impl FnOnce(&mut MemoryStorageConfig)) {
        f(&mut *self.config.write().await);
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no keys are stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn simulate_delay(&self) {
        let delay = self.config.read().await.operation_delay_ms;
        if let Some(ms) = delay {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.simulate_delay().await;
        if self.config.read().await.fail_get {
            return Err(SnapNoteError::storage("Simulated get failure"));
        }
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.simulate_delay().await;
        {
            let config = self.config.read().await;
            if config.fail_set || config.fail_set_key.as_deref() == Some(key) {
                return Err(SnapNoteError::storage("Simulated set failure"));
            }
        }
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.simulate_delay().await;
        if self.config.read().await.fail_set {
            return Err(SnapNoteError::storage("Simulated remove failure"));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        if self.config.read().await.fail_get {
            return Err(SnapNoteError::storage("Simulated get failure"));
        }
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        let config = self.config.read().await;
        if config.fail_usage {
            return Err(SnapNoteError::storage("Simulated usage failure"));
        }
        if let Some(bytes) = config.bytes_in_use_override {
            return Ok(bytes);
        }
        drop(config);

        let entries = self.entries.read().await;
        let mut total = 0u64;
        for (key, value) in entries.iter() {
            total += key.len() as u64 + serde_json::to_vec(value)?.len() as u64;
        }
        Ok(total)
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    async fn lock_key(&self, key: &str) -> Result<KeyLock> {
        let lock = self
            .key_locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone();
        Ok(KeyLock::local(lock.lock_owned().await))
    }
}
