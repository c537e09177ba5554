//! Running statistics derived from store mutations
//!
//! Statistics are best-effort: the store records an event after every
//! successful mutation and only logs when recording fails. They can always be
//! rebuilt from the note collection with [`StatsTracker::rebuild`].

use crate::error::Result;
use crate::notes::{Note, NoteType};
use crate::storage::{load_value, store_value, StorageBackend, STATS_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Aggregate counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Notes created, ever
    pub notes_added: u64,
    /// Notes deleted or evicted, ever
    pub notes_deleted: u64,
    /// Live text notes
    pub text_notes: u64,
    /// Live image notes
    pub image_notes: u64,
    /// Time of the last recorded event, `null` before the first one
    pub last_updated: Option<DateTime<Utc>>,
}

/// Store mutation that affects statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsEvent {
    /// A note was created
    NoteAdded,
    /// A note was deleted or evicted
    NoteDeleted,
}

impl fmt::Display for StatsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsEvent::NoteAdded => f.write_str("noteAdded"),
            StatsEvent::NoteDeleted => f.write_str("noteDeleted"),
        }
    }
}

impl Stats {
    /// Apply one event; per-type counters never go below zero
    pub fn apply(&mut self, event: StatsEvent, kind: NoteType, at: DateTime<Utc>) {
        let counter = match kind {
            NoteType::Text => &mut self.text_notes,
            NoteType::Image => &mut self.image_notes,
        };
        match event {
            StatsEvent::NoteAdded => {
                self.notes_added += 1;
                *counter += 1;
            }
            StatsEvent::NoteDeleted => {
                self.notes_deleted += 1;
                *counter = counter.saturating_sub(1);
            }
        }
        self.last_updated = Some(at);
    }

    /// Live notes according to the per-type counters
    pub fn live_notes(&self) -> u64 {
        self.text_notes + self.image_notes
    }
}

/// Reads and updates [`Stats`] under the `stats` key
pub struct StatsTracker {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl StatsTracker {
    /// Create a tracker over a storage backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Write zeroed counters if nothing is stored yet
    pub async fn initialize(&self) -> Result<Stats> {
        let _guard = self.write_lock.lock().await;
        let _shared = self.backend.lock_key(STATS_KEY).await?;
        if let Some(existing) = load_value::<Stats>(self.backend.as_ref(), STATS_KEY).await? {
            return Ok(existing);
        }

        let stats = Stats {
            last_updated: Some(Utc::now()),
            ..Stats::default()
        };
        store_value(self.backend.as_ref(), STATS_KEY, &stats).await?;
        Ok(stats)
    }

    /// Current counters, zeros when nothing has been recorded
    pub async fn get(&self) -> Result<Stats> {
        Ok(load_value(self.backend.as_ref(), STATS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Record a single event
    pub async fn record(&self, event: StatsEvent, kind: NoteType) -> Result<Stats> {
        self.record_many(event, std::iter::once(kind)).await
    }

    /// Record the same event for several notes in one write
    pub async fn record_many(
        &self,
        event: StatsEvent,
        kinds: impl IntoIterator<Item = NoteType>,
    ) -> Result<Stats> {
        let _guard = self.write_lock.lock().await;
        let _shared = self.backend.lock_key(STATS_KEY).await?;
        let mut stats = self.get().await?;
        let now = Utc::now();
        for kind in kinds {
            stats.apply(event, kind, now);
        }
        store_value(self.backend.as_ref(), STATS_KEY, &stats).await?;

        tracing::debug!("Recorded {} in statistics", event);
        Ok(stats)
    }

    /// Recompute the per-type counters from the note collection
    ///
    /// Lifetime counters are kept, except that `notes_added` is raised to at
    /// least the number of live notes.
    pub async fn rebuild(&self, notes: &[Note]) -> Result<Stats> {
        let _guard = self.write_lock.lock().await;
        let _shared = self.backend.lock_key(STATS_KEY).await?;
        let mut stats = self.get().await?;

        stats.text_notes = notes
            .iter()
            .filter(|n| n.note_type == NoteType::Text)
            .count() as u64;
        stats.image_notes = notes.len() as u64 - stats.text_notes;
        stats.notes_added = stats.notes_added.max(notes.len() as u64);
        stats.last_updated = Some(Utc::now());

        store_value(self.backend.as_ref(), STATS_KEY, &stats).await?;
        tracing::info!("Rebuilt statistics from {} notes", notes.len());
        Ok(stats)
    }
}
