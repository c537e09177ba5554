//! # SnapNote
//!
//! Storage core for a web highlighter: text highlights and captured images are
//! kept as notes grouped by the domain of the page they came from.
//!
//! ## Features
//!
//! - **Note Store**: validated, sanitized notes in one newest-first collection,
//!   with every mutation serialized through a single writer
//! - **Quota Management**: oldest notes are evicted when storage runs low
//! - **Statistics**: best-effort counters that can be rebuilt from the notes
//! - **Message Router**: `{action, ...}` requests in, `{success, ...}` responses
//!   out, with per-context session state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapnote::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> snapnote::Result<()> {
//! let store = NoteStore::open(&StoreConfig::new(), Arc::new(LogNotifier)).await?;
//!
//! let note = store.create(NoteDraft::text("hello", "https://a.com/x")).await?;
//! assert_eq!(note.domain, "a.com");
//!
//! let same_site = store.list(Some("https://a.com/y")).await?;
//! assert_eq!(same_site.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Shared helpers
pub mod common;

/// Layered configuration
pub mod config;

/// Error types
pub mod error;

/// Notes, validation, sanitization and the note store
pub mod notes;

/// User-visible notifications
pub mod notify;

/// Storage usage monitoring and eviction
pub mod quota;

/// Request dispatch between contexts and the store
pub mod router;

/// Per-context capture modes
pub mod session;

/// User settings
pub mod settings;

/// Running statistics
pub mod stats;

/// Key/value storage backends
pub mod storage;

pub use config::StoreConfig;
pub use error::{ErrorContext, Result, SnapNoteError, ValidationError};
pub use notes::{Note, NoteDraft, NoteId, NoteStore, NoteType, NotesExport};
pub use notify::{BroadcastNotifier, LogNotifier, Notification, NotificationKind, Notifier};
pub use quota::{QuotaManager, QuotaPolicy, QuotaReport};
pub use router::{MessageRouter, Request, Response, RouterClient, RouterInput};
pub use session::{SessionRegistry, SessionState};
pub use settings::{Settings, SettingsPatch, SettingsStore};
pub use stats::{Stats, StatsEvent, StatsTracker};
pub use storage::{FileSystemStorage, MemoryStorage, StorageBackend};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        LogNotifier, MessageRouter, Note, NoteDraft, NoteId, NoteStore, NoteType, Notifier,
        Request, Response, Result, SnapNoteError, StorageBackend, StoreConfig,
    };
}

/// Test utilities module for testing support
#[doc(hidden)]
pub mod test_utils;
