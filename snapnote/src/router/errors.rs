//! Mapping of library errors to response messages
//!
//! User errors are surfaced with their own message. System errors are logged
//! in full and surfaced generically so storage internals never reach the UI.

use super::Response;
use crate::error::SnapNoteError;

/// Message for failures of the persistence layer
pub const STORAGE_UNAVAILABLE: &str = "Storage is unavailable";

/// Message for handler crashes
pub const INTERNAL_ERROR: &str = "Internal error";

/// Message for references to an absent note
pub const NOTE_NOT_FOUND: &str = "Note not found";

/// User-facing message for an error
pub fn error_message(error: &SnapNoteError) -> String {
    match error {
        SnapNoteError::Validation(e) => e.to_string(),
        SnapNoteError::NoteNotFound(_) => NOTE_NOT_FOUND.to_string(),
        SnapNoteError::QuotaExceeded { .. } | SnapNoteError::UnsupportedExportFormat(_) => {
            error.to_string()
        }
        SnapNoteError::InvalidRequest(message) => message.clone(),
        SnapNoteError::StorageUnavailable(_)
        | SnapNoteError::Io(_)
        | SnapNoteError::Json(_)
        | SnapNoteError::Yaml(_) => STORAGE_UNAVAILABLE.to_string(),
        SnapNoteError::Config(_) | SnapNoteError::Other(_) => error.to_string(),
    }
}

/// Log an error raised by `action` and turn it into a failure response
pub fn error_response(action: &str, error: &SnapNoteError) -> Response {
    if error.is_user_error() {
        tracing::warn!("'{}' rejected: {}", action, error);
    } else {
        tracing::error!("'{}' failed: {}", action, error);
    }
    Response::failure(error_message(error))
}
