//! Unified error handling for the SnapNote library
//!
//! Validation and store operations raise typed failures from this module. The
//! message router is the single boundary that turns them into `success: false`
//! responses (see [`crate::router::errors`]).

use std::fmt;
use std::io;
use thiserror::Error;

/// Note-shape defects detected before anything is persisted.
///
/// The display strings are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Content missing or blank after trimming
    #[error("Note content cannot be empty")]
    EmptyContent,

    /// Content longer than the allowed number of characters
    #[error("Note content is too long (max {} characters)", format_thousands(*max))]
    ContentTooLong {
        /// Maximum number of characters allowed
        max: usize,
    },

    /// URL missing or not an absolute URL
    #[error("Invalid URL provided")]
    InvalidUrl,

    /// Note type outside of `text` / `image`
    #[error("Invalid note type")]
    InvalidType(String),
}

/// The main error type for the SnapNote library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapNoteError {
    /// Draft or content failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No note carries the referenced id
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// The store already holds `maxNotes` notes
    #[error("Maximum number of notes reached ({limit})")]
    QuotaExceeded {
        /// Configured note ceiling
        limit: usize,
    },

    /// The persistence layer could not be read or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A router request carried a malformed payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Export requested in a format other than JSON
    #[error("Unsupported export format: {0}")]
    UnsupportedExportFormat(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SnapNoteError {
    /// Create a not-found error for the given note id
    pub fn note_not_found(id: impl fmt::Display) -> Self {
        Self::NoteNotFound(id.to_string())
    }

    /// Create a storage error from any displayable cause
    pub fn storage(reason: impl fmt::Display) -> Self {
        Self::StorageUnavailable(reason.to_string())
    }

    /// Whether this error stems from bad caller input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NoteNotFound(_)
                | Self::QuotaExceeded { .. }
                | Self::InvalidRequest(_)
                | Self::UnsupportedExportFormat(_)
        )
    }
}

/// Result type alias for SnapNote operations
pub type Result<T> = std::result::Result<T, SnapNoteError>;

/// Extension trait for turning foreign errors into storage failures
pub trait ErrorContext<T> {
    /// Wrap an error as [`SnapNoteError::StorageUnavailable`] with a message
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Same as [`ErrorContext::context`], building the message lazily
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| SnapNoteError::StorageUnavailable(format!("{}: {e}", msg.into())))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| SnapNoteError::StorageUnavailable(format!("{}: {e}", f().into())))
    }
}

fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::EmptyContent.to_string(),
            "Note content cannot be empty"
        );
        assert_eq!(
            ValidationError::ContentTooLong { max: 10_000 }.to_string(),
            "Note content is too long (max 10,000 characters)"
        );
        assert_eq!(ValidationError::InvalidUrl.to_string(), "Invalid URL provided");
        assert_eq!(
            ValidationError::InvalidType("video".into()).to_string(),
            "Invalid note type"
        );
    }

    #[test]
    fn test_quota_message_carries_limit() {
        let err = SnapNoteError::QuotaExceeded { limit: 25 };
        assert_eq!(err.to_string(), "Maximum number of notes reached (25)");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_error_context() {
        let err: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let wrapped = err.context("Failed to read notes").unwrap_err();

        assert!(matches!(wrapped, SnapNoteError::StorageUnavailable(_)));
        assert!(wrapped.to_string().contains("Failed to read notes"));
        assert!(wrapped.to_string().contains("file not found"));
        assert!(!wrapped.is_user_error());
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(7), "7");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }
}
