//! Key/value persistence shared by every context
//!
//! The store keeps each piece of state under a single key: the whole note
//! collection under [`NOTES_KEY`], settings under [`SETTINGS_KEY`] and
//! statistics under [`STATS_KEY`]. A single `set` replaces a key atomically,
//! but a read followed by a write is two calls, so callers that mutate a key
//! hold [`StorageBackend::lock_key`] for the whole cycle. The lock is shared
//! with every other store on the same backend, including other processes
//! pointed at the same data directory.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStorage;
pub use memory::{MemoryStorage, MemoryStorageConfig};

use crate::error::{Result, SnapNoteError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use tokio::sync::OwnedMutexGuard;

/// Key holding the canonical, newest-first note collection
pub const NOTES_KEY: &str = "notes";

/// Key holding user settings
pub const SETTINGS_KEY: &str = "settings";

/// Key holding running statistics
pub const STATS_KEY: &str = "stats";

/// Prefix of the per-domain shadow copies written by older versions
pub const LEGACY_DOMAIN_PREFIX: &str = "notes_";

/// Exclusive hold on one key, released on drop
#[derive(Debug)]
pub struct KeyLock {
    _held: Held,
}

#[derive(Debug)]
enum Held {
    Nothing,
    File(File),
    Local(OwnedMutexGuard<()>),
}

impl KeyLock {
    /// A lock with nothing behind it, for backends no one else can reach
    pub fn unshared() -> Self {
        Self {
            _held: Held::Nothing,
        }
    }

    /// Hold an OS file lock; dropping the file releases it
    pub(crate) fn file(file: File) -> Self {
        Self {
            _held: Held::File(file),
        }
    }

    /// Hold an in-process mutex
    pub(crate) fn local(guard: OwnedMutexGuard<()>) -> Self {
        Self {
            _held: Held::Local(guard),
        }
    }
}

/// Trait for key/value storage backends
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a key, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace a key's value atomically
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    async fn keys(&self) -> Result<Vec<String>>;

    /// Bytes currently used across all keys
    async fn bytes_in_use(&self) -> Result<u64>;

    /// Total capacity in bytes
    fn quota_bytes(&self) -> u64;

    /// Wait until `key` is exclusively ours; other holders block until the
    /// returned lock drops
    async fn lock_key(&self, key: &str) -> Result<KeyLock> {
        let _ = key;
        Ok(KeyLock::unshared())
    }
}

/// Read and deserialize a key
///
/// A value that no longer matches `T` is reported as a storage failure rather
/// than silently replaced.
pub async fn load_value<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> Result<Option<T>> {
    match backend.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SnapNoteError::storage(format!("corrupt value under '{key}': {e}"))),
    }
}

/// Serialize and write a key
pub async fn store_value<T: Serialize + ?Sized>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value)?;
    backend.set(key, value).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_typed_round_trip() {
        let backend = MemoryStorage::new();
        store_value(&backend, "numbers", &vec![1, 2, 3]).await.unwrap();

        let loaded: Option<Vec<i32>> = load_value(&backend, "numbers").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = load_value(&backend, "absent").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_value_is_storage_error() {
        let backend = MemoryStorage::new();
        backend
            .set("numbers", serde_json::json!("not a list"))
            .await
            .unwrap();

        let result: Result<Option<Vec<i32>>> = load_value(&backend, "numbers").await;
        assert!(matches!(result, Err(SnapNoteError::StorageUnavailable(_))));
    }
}
