//! JSON export of the note collection

use super::Note;
use crate::error::{Result, SnapNoteError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only supported export format
pub const EXPORT_FORMAT: &str = "json";

const FILE_PREFIX: &str = "web-highlighter-notes";

/// A timestamped snapshot of every note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesExport {
    /// When the snapshot was taken
    pub exported_at: DateTime<Utc>,
    /// Number of notes in the snapshot
    pub count: usize,
    /// Notes, newest first
    pub notes: Vec<Note>,
}

impl NotesExport {
    /// Snapshot `notes` now
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            exported_at: Utc::now(),
            count: notes.len(),
            notes,
        }
    }

    /// Accept `None` or `json` (any case), reject everything else
    pub fn check_format(format: Option<&str>) -> Result<()> {
        match format {
            None => Ok(()),
            Some(f) if f.eq_ignore_ascii_case(EXPORT_FORMAT) => Ok(()),
            Some(other) => Err(SnapNoteError::UnsupportedExportFormat(other.to_string())),
        }
    }

    /// Download name, e.g. `web-highlighter-notes-2024-03-01.json`
    pub fn suggested_filename(&self) -> String {
        format!(
            "{FILE_PREFIX}-{}.{EXPORT_FORMAT}",
            self.exported_at.format("%Y-%m-%d")
        )
    }

    /// Pretty-printed JSON document
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NoteDraft;
    use chrono::TimeZone;

    #[test]
    fn test_format_check() {
        assert!(NotesExport::check_format(None).is_ok());
        assert!(NotesExport::check_format(Some("JSON")).is_ok());
        assert!(matches!(
            NotesExport::check_format(Some("csv")),
            Err(SnapNoteError::UnsupportedExportFormat(f)) if f == "csv"
        ));
    }

    #[test]
    fn test_filename_and_document() {
        let note = Note::from_draft(NoteDraft::text("hello", "https://a.com")).unwrap();
        let mut export = NotesExport::new(vec![note]);
        export.exported_at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap();

        assert_eq!(
            export.suggested_filename(),
            "web-highlighter-notes-2024-03-01.json"
        );

        let doc: serde_json::Value = serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();
        assert_eq!(doc["count"], 1);
        assert_eq!(doc["notes"][0]["content"], "hello");
        assert!(doc["exportedAt"].is_string());
    }
}
