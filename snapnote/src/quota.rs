//! Storage quota monitoring and eviction
//!
//! After every create the store asks the [`QuotaManager`] whether byte usage
//! has reached the cleanup threshold. If it has, the oldest share of notes
//! (the tail of the newest-first collection) is evicted and the user is warned.
//! This is advisory cleanup; the hard note ceiling is `maxNotes`, enforced by
//! the store itself.

use crate::config::{StoreConfig, DEFAULT_CLEANUP_THRESHOLD, DEFAULT_EVICTION_FRACTION};
use crate::error::Result;
use crate::notes::Note;
use crate::notify::{Notification, NotificationDispatcher};
use crate::storage::{load_value, store_value, StorageBackend, NOTES_KEY};
use serde::Serialize;
use std::sync::Arc;

/// Message shown to the user when notes are evicted
pub const LOW_STORAGE_MESSAGE: &str = "Storage space is getting low. Deleting older notes.";

/// When to clean up and how much to remove
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaPolicy {
    /// Usage ratio at or above which cleanup runs
    pub threshold: f64,
    /// Share of notes evicted per cleanup, rounded up
    pub eviction_fraction: f64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLEANUP_THRESHOLD,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
        }
    }
}

impl QuotaPolicy {
    /// Policy from the store configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            threshold: config.cleanup_threshold,
            eviction_fraction: config.eviction_fraction,
        }
    }

    /// Whether `bytes_in_use` out of `quota_bytes` calls for cleanup
    pub fn should_clean(&self, bytes_in_use: u64, quota_bytes: u64) -> bool {
        bytes_in_use as f64 >= quota_bytes as f64 * self.threshold
    }

    /// Number of notes to evict from a collection of `len`
    pub fn eviction_count(&self, len: usize) -> usize {
        // Absorbs representation error in the product.
        let exact = len as f64 * self.eviction_fraction;
        ((exact - 1e-9).ceil().max(0.0) as usize).min(len)
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReport {
    /// Usage measured before any cleanup
    pub bytes_in_use: u64,
    /// Capacity of the backend
    pub quota_bytes: u64,
    /// Whether usage had reached the threshold
    pub cleaned: bool,
    /// Number of notes evicted
    pub evicted_count: usize,
    /// The evicted notes, oldest last
    #[serde(skip)]
    pub evicted: Vec<Note>,
}

impl QuotaReport {
    /// Usage as a fraction of capacity
    pub fn usage_ratio(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 1.0;
        }
        self.bytes_in_use as f64 / self.quota_bytes as f64
    }
}

/// Evicts the oldest notes when storage runs low
///
/// The manager reads and rewrites the note collection, so callers must hold
/// the store's writer lock while calling [`QuotaManager::check_and_clean`].
pub struct QuotaManager {
    backend: Arc<dyn StorageBackend>,
    policy: QuotaPolicy,
    notifications: NotificationDispatcher,
}

impl QuotaManager {
    /// Create a quota manager
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        policy: QuotaPolicy,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            backend,
            policy,
            notifications,
        }
    }

    /// Active policy
    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    /// Measure usage and evict the oldest notes if the threshold is reached
    pub async fn check_and_clean(&self) -> Result<QuotaReport> {
        let bytes_in_use = self.backend.bytes_in_use().await?;
        let quota_bytes = self.backend.quota_bytes();

        let mut report = QuotaReport {
            bytes_in_use,
            quota_bytes,
            cleaned: false,
            evicted_count: 0,
            evicted: Vec::new(),
        };

        if !self.policy.should_clean(bytes_in_use, quota_bytes) {
            tracing::debug!("Storage usage {} of {} bytes", bytes_in_use, quota_bytes);
            return Ok(report);
        }
        report.cleaned = true;

        tracing::warn!(
            "Storage usage ({} bytes) is high, cleaning up oldest notes",
            bytes_in_use
        );

        let mut notes: Vec<Note> = load_value(self.backend.as_ref(), NOTES_KEY)
            .await?
            .unwrap_or_default();
        let count = self.policy.eviction_count(notes.len());
        if count == 0 {
            return Ok(report);
        }

        let keep = notes.len() - count;
        let evicted = notes.split_off(keep);
        store_value(self.backend.as_ref(), NOTES_KEY, &notes).await?;

        if let Err(e) = self
            .notifications
            .dispatch(&Notification::warning(LOW_STORAGE_MESSAGE))
            .await
        {
            tracing::warn!("Failed to send low storage notification: {}", e);
        }

        match self.backend.bytes_in_use().await {
            Ok(after) => tracing::info!("Evicted {} notes, usage now {} bytes", count, after),
            Err(_) => tracing::info!("Evicted {} notes", count),
        }

        report.evicted_count = evicted.len();
        report.evicted = evicted;
        Ok(report)
    }
}
