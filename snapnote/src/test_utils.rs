//! Test utilities shared by unit and integration tests
//!
//! Builds stores and routers over [`MemoryStorage`] so tests never touch the
//! user's data directory.

use crate::config::StoreConfig;
use crate::notes::{NoteDraft, NoteStore};
use crate::notify::{BroadcastNotifier, Notifier};
use crate::router::MessageRouter;
use crate::storage::{MemoryStorage, MemoryStorageConfig};
use std::sync::Arc;

/// In-memory store, its backend and a notifier tests can subscribe to
pub struct TestHarness {
    /// Backend, for failure injection and inspection
    pub backend: Arc<MemoryStorage>,
    /// Receives every delivered notification
    pub notifier: BroadcastNotifier,
    /// Router over the store
    pub router: MessageRouter,
}

impl TestHarness {
    /// Harness with default behavior
    pub fn new() -> Self {
        Self::with_backend(MemoryStorage::new())
    }

    /// Harness over a backend configured for failure injection
    pub fn with_config(config: MemoryStorageConfig) -> Self {
        Self::with_backend(MemoryStorage::new_with_config(config))
    }

    /// Harness over a prepared backend
    pub fn with_backend(backend: MemoryStorage) -> Self {
        let backend = Arc::new(backend);
        let notifier = BroadcastNotifier::default();
        let store = NoteStore::new(
            backend.clone(),
            &StoreConfig::default(),
            Arc::new(notifier.clone()) as Arc<dyn Notifier>,
        );
        Self {
            backend,
            notifier,
            router: MessageRouter::new(Arc::new(store)),
        }
    }

    /// The store behind the router
    pub fn store(&self) -> &Arc<NoteStore> {
        self.router.store()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Text draft for `https://<domain>/<path>`
pub fn draft_on(domain: &str, path: &str, content: &str) -> NoteDraft {
    NoteDraft::text(content, format!("https://{domain}/{path}"))
}
