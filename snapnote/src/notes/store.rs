//! The note store: sole owner of the persisted note collection
//!
//! The collection lives under a single storage key, newest first. Every
//! mutation is a read-modify-write of that whole value, which spans two
//! storage calls, so all mutations run under one FIFO writer lock and
//! execute strictly in submission order. The writer also holds the backend's
//! lock on the notes key, which keeps a second store on the same data
//! directory (another process, say) from interleaving its own cycles. Reads
//! take a snapshot of the key without either lock.

use super::export::NotesExport;
use super::validation::Validator;
use super::{domain_of, Note, NoteDraft, NoteId, NoteType};
use crate::config::StoreConfig;
use crate::error::{Result, SnapNoteError};
use crate::notify::{NotificationDispatcher, Notifier};
use crate::quota::{QuotaManager, QuotaPolicy, QuotaReport};
use crate::settings::{Settings, SettingsStore};
use crate::stats::{Stats, StatsEvent, StatsTracker};
use crate::storage::{
    load_value, store_value, FileSystemStorage, KeyLock, StorageBackend, LEGACY_DOMAIN_PREFIX,
    NOTES_KEY,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Number of notes stored for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    /// Host the notes were captured on
    pub domain: String,
    /// Number of notes
    pub count: usize,
}

/// Held for the length of one read-modify-write
///
/// Fields drop in order, so the shared key lock is released before the next
/// local writer is admitted.
struct WriterGuard<'a> {
    _shared: KeyLock,
    _local: MutexGuard<'a, ()>,
}

/// Persistent, serialized note collection
pub struct NoteStore {
    backend: Arc<dyn StorageBackend>,
    writer: Mutex<()>,
    validator: Validator,
    settings: Arc<SettingsStore>,
    stats: Arc<StatsTracker>,
    quota: QuotaManager,
    notifications: NotificationDispatcher,
}

impl NoteStore {
    /// Create a store over an existing backend
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        config: &StoreConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let settings = Arc::new(SettingsStore::with_defaults(
            backend.clone(),
            Settings {
                max_notes: config.default_max_notes,
                ..Settings::default()
            },
        ));
        let stats = Arc::new(StatsTracker::new(backend.clone()));
        let notifications = NotificationDispatcher::new(notifier, settings.clone());
        let quota = QuotaManager::new(
            backend.clone(),
            QuotaPolicy::from_config(config),
            notifications.clone(),
        );

        Self {
            backend,
            writer: Mutex::new(()),
            validator: Validator::new(config.max_content_length),
            settings,
            stats,
            quota,
            notifications,
        }
    }

    /// Open the filesystem store described by `config` and initialize it
    pub async fn open(config: &StoreConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let backend = Arc::new(FileSystemStorage::new(
            config.data_dir.clone(),
            config.quota_bytes,
        ));
        let store = Self::new(backend, config, notifier);
        store.initialize().await?;
        Ok(store)
    }

    /// Install-time setup: default settings, zeroed statistics and removal
    /// of per-domain copies left by older versions
    pub async fn initialize(&self) -> Result<()> {
        self.settings.initialize().await?;
        self.stats.initialize().await?;
        self.purge_legacy_indices().await?;
        Ok(())
    }

    /// User settings
    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Statistics tracker
    pub fn stats(&self) -> &Arc<StatsTracker> {
        &self.stats
    }

    /// Notification routing shared with the store
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    /// Validation limits in effect
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    async fn lock_writer(&self) -> Result<WriterGuard<'_>> {
        let local = self.writer.lock().await;
        let shared = self.backend.lock_key(NOTES_KEY).await?;
        Ok(WriterGuard {
            _shared: shared,
            _local: local,
        })
    }

    async fn load_notes(&self) -> Result<Vec<Note>> {
        Ok(load_value(self.backend.as_ref(), NOTES_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_notes(&self, notes: &[Note]) -> Result<()> {
        store_value(self.backend.as_ref(), NOTES_KEY, notes).await
    }

    /// Validate a draft and insert the resulting note at the head
    pub async fn create(&self, draft: NoteDraft) -> Result<Note> {
        let note = Note::from_draft_with(draft, &self.validator)?;
        tracing::debug!("Creating note for domain '{}'", note.domain);

        let _guard = self.lock_writer().await?;
        let settings = self.settings.get().await?;
        let mut notes = self.load_notes().await?;
        if notes.len() >= settings.max_notes {
            return Err(SnapNoteError::QuotaExceeded {
                limit: settings.max_notes,
            });
        }

        notes.insert(0, note.clone());
        self.save_notes(&notes).await?;
        tracing::info!("Created note {} ({} total)", note.id, notes.len());

        self.record_stats(StatsEvent::NoteAdded, [note.note_type])
            .await;
        if let Err(e) = self.clean_locked().await {
            tracing::warn!("Storage quota check failed: {}", e);
        }

        Ok(note)
    }

    /// All notes, or those on the same domain as `url`, newest first
    pub async fn list(&self, url: Option<&str>) -> Result<Vec<Note>> {
        let notes = self.load_notes().await?;
        match url {
            None => Ok(notes),
            Some(url) => {
                let domain = domain_of(url)?;
                Ok(notes.into_iter().filter(|n| n.domain == domain).collect())
            }
        }
    }

    /// A single note
    pub async fn get(&self, id: &NoteId) -> Result<Note> {
        self.load_notes()
            .await?
            .into_iter()
            .find(|n| &n.id == id)
            .ok_or_else(|| SnapNoteError::note_not_found(id))
    }

    /// Remove a note and return it
    pub async fn delete(&self, id: &NoteId) -> Result<Note> {
        let _guard = self.lock_writer().await?;
        let mut notes = self.load_notes().await?;
        let index = notes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| SnapNoteError::note_not_found(id))?;

        let deleted = notes.remove(index);
        self.save_notes(&notes).await?;
        tracing::info!("Deleted note {}", deleted.id);

        self.record_stats(StatsEvent::NoteDeleted, [deleted.note_type])
            .await;
        Ok(deleted)
    }

    /// Replace a note's content
    ///
    /// Content is validated before anything is read, so a rejected update
    /// never touches storage.
    pub async fn update(&self, id: &NoteId, content: &str) -> Result<Note> {
        self.validator.validate_content(content)?;

        let _guard = self.lock_writer().await?;
        let mut notes = self.load_notes().await?;
        let note = notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| SnapNoteError::note_not_found(id))?;

        note.update_content(content);
        let updated = note.clone();
        self.save_notes(&notes).await?;

        tracing::info!("Updated note {}", updated.id);
        Ok(updated)
    }

    /// Case-insensitive search over content, title, domain, tags and category
    pub async fn search(&self, query: &str, url: Option<&str>) -> Result<Vec<Note>> {
        let needle = query.trim().to_lowercase();
        let notes = self.list(url).await?;
        if needle.is_empty() {
            return Ok(notes);
        }
        Ok(notes.into_iter().filter(|n| n.matches(&needle)).collect())
    }

    /// Distinct domains with their note counts, in order of first appearance
    pub async fn domains(&self) -> Result<Vec<DomainSummary>> {
        let mut summaries: Vec<DomainSummary> = Vec::new();
        for note in self.load_notes().await? {
            match summaries.iter_mut().find(|s| s.domain == note.domain) {
                Some(summary) => summary.count += 1,
                None => summaries.push(DomainSummary {
                    domain: note.domain,
                    count: 1,
                }),
            }
        }
        Ok(summaries)
    }

    /// Snapshot of the whole collection for download
    pub async fn export(&self, format: Option<&str>) -> Result<NotesExport> {
        NotesExport::check_format(format)?;
        Ok(NotesExport::new(self.load_notes().await?))
    }

    /// Current statistics
    pub async fn get_stats(&self) -> Result<Stats> {
        self.stats.get().await
    }

    /// Recompute statistics from the collection
    pub async fn rebuild_stats(&self) -> Result<Stats> {
        let _guard = self.lock_writer().await?;
        let notes = self.load_notes().await?;
        self.stats.rebuild(&notes).await
    }

    /// Run the quota check explicitly and report the outcome
    pub async fn check_quota(&self) -> Result<QuotaReport> {
        let _guard = self.lock_writer().await?;
        self.clean_locked().await
    }

    /// Remove `notes_<domain>` keys written by older versions
    ///
    /// Returns the number of keys removed.
    pub async fn purge_legacy_indices(&self) -> Result<usize> {
        let _guard = self.lock_writer().await?;
        let legacy: Vec<String> = self
            .backend
            .keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(LEGACY_DOMAIN_PREFIX))
            .collect();

        for key in &legacy {
            self.backend.remove(key).await?;
        }
        if !legacy.is_empty() {
            tracing::info!("Removed {} legacy per-domain keys", legacy.len());
        }
        Ok(legacy.len())
    }

    async fn clean_locked(&self) -> Result<QuotaReport> {
        let report = self.quota.check_and_clean().await?;
        if !report.evicted.is_empty() {
            self.record_stats(
                StatsEvent::NoteDeleted,
                report.evicted.iter().map(|n| n.note_type),
            )
            .await;
        }
        Ok(report)
    }

    async fn record_stats(&self, event: StatsEvent, kinds: impl IntoIterator<Item = NoteType>) {
        if let Err(e) = self.stats.record_many(event, kinds).await {
            tracing::warn!("Failed to record {} in statistics: {}", event, e);
        }
    }
}
