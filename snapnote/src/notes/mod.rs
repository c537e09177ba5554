//! Notes: the persisted unit of the store
//!
//! A [`Note`] is a piece of highlighted text or a captured image tied to the
//! page it came from. Notes are grouped by [`Note::domain`], the host part of
//! the source URL, which is always derived from [`Note::url`] and never taken
//! from the client.
//!
//! ## Basic Usage
//!
//! ```rust
//! use snapnote::notes::{Note, NoteDraft, NoteType};
//!
//! let draft = NoteDraft::text("hello", "https://a.com/x");
//! let note = Note::from_draft(draft).unwrap();
//!
//! assert_eq!(note.domain, "a.com");
//! assert_eq!(note.note_type, NoteType::Text);
//! assert_eq!(note.title, "Untitled");
//! ```

pub mod export;
pub mod sanitize;
pub mod store;
pub mod validation;

pub use export::NotesExport;
pub use sanitize::sanitize_html;
pub use store::{DomainSummary, NoteStore};
pub use validation::{validate_content, validate_draft, Validator, MAX_CONTENT_LENGTH};

use crate::common::generate_monotonic_ulid_string;
use crate::error::{Result, SnapNoteError, ValidationError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Title used when the capturing page had none
pub const DEFAULT_TITLE: &str = "Untitled";

/// Category used when the draft does not name one
pub const DEFAULT_CATEGORY: &str = "general";

/// Unique, immutable note identifier
///
/// New ids are monotonic ULIDs. Any non-empty string is accepted when loading,
/// so collections written with older id schemes keep working.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(generate_monotonic_ulid_string())
    }

    /// Wrap an existing id, rejecting blank strings
    pub fn from_string(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SnapNoteError::InvalidRequest(
                "Note ID is required".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = SnapNoteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_string(raw).map_err(serde::de::Error::custom)
    }
}

/// Kind of captured content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    /// Highlighted text
    #[default]
    Text,
    /// Captured image
    Image,
}

impl NoteType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Text => "text",
            NoteType::Image => "image",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(NoteType::Text),
            "image" => Ok(NoteType::Image),
            other => Err(ValidationError::InvalidType(other.to_string())),
        }
    }
}

/// A persisted annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, assigned at creation
    pub id: NoteId,
    /// HTML-escaped note text or image caption
    pub content: String,
    /// Full source page URL
    pub url: String,
    /// Page title at capture time
    pub title: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Set only when the content is edited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Host component of `url`
    pub domain: String,
    /// Text or image
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    /// Encoded image payload (image notes only)
    #[serde(default)]
    pub image_data: Option<String>,
    /// Original image source (image notes only)
    #[serde(default)]
    pub image_src: Option<String>,
    /// Original image alt text (image notes only)
    #[serde(default)]
    pub image_alt: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Classification bucket
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Note {
    /// Build a note from a draft: validate, sanitize, derive the domain and
    /// fill in defaults
    pub fn from_draft(draft: NoteDraft) -> Result<Self> {
        Self::from_draft_with(draft, &Validator::default())
    }

    /// Same as [`Note::from_draft`] with explicit validation limits
    pub fn from_draft_with(draft: NoteDraft, validator: &Validator) -> Result<Self> {
        let note_type = validator.validate(&draft)?;
        let domain = domain_of(&draft.url)?;

        let (image_data, image_src, image_alt) = match note_type {
            NoteType::Image => (draft.image_data, draft.image_src, draft.image_alt),
            NoteType::Text => (None, None, None),
        };

        Ok(Self {
            id: NoteId::new(),
            content: sanitize_html(draft.content.trim()),
            url: draft.url,
            title: draft
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            timestamp: draft.timestamp.unwrap_or_else(Utc::now),
            last_modified: None,
            domain,
            note_type,
            image_data,
            image_src,
            image_alt,
            tags: draft.tags.unwrap_or_default(),
            category: draft
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
        })
    }

    /// Replace the content with its sanitized form and stamp `last_modified`
    ///
    /// `last_modified` never precedes `timestamp`, even if the creation time
    /// came from a client clock running ahead.
    pub fn update_content(&mut self, content: &str) {
        self.content = sanitize_html(content.trim());
        self.last_modified = Some(Utc::now().max(self.timestamp));
    }

    /// Whether any searchable field contains `needle` (already lowercased)
    pub fn matches(&self, needle: &str) -> bool {
        self.content.to_lowercase().contains(needle)
            || self.title.to_lowercase().contains(needle)
            || self.domain.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Unvalidated note input as sent by a content script or the UI
///
/// Client-supplied `id` and `domain` fields are ignored; both are synthesized
/// by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    /// Note text or caption
    #[serde(default)]
    pub content: String,
    /// Source page URL
    #[serde(default)]
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: Option<String>,
    /// Capture time, as RFC 3339 or epoch milliseconds
    #[serde(default, deserialize_with = "deserialize_flexible_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// `text` or `image`; anything else fails validation
    #[serde(rename = "type", default)]
    pub note_type: Option<String>,
    /// Encoded image payload
    #[serde(default)]
    pub image_data: Option<String>,
    /// Image source URL
    #[serde(default)]
    pub image_src: Option<String>,
    /// Image alt text
    #[serde(default)]
    pub image_alt: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Classification bucket
    #[serde(default)]
    pub category: Option<String>,
}

impl NoteDraft {
    /// Convenience constructor for a text draft
    pub fn text(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}

fn deserialize_flexible_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Some(RawTimestamp::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Host component of `url`, the grouping key for notes
///
/// URLs without a host (`file:`, `data:`, `about:`) map to an empty domain.
pub fn domain_of(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|_| ValidationError::InvalidUrl)?;
    Ok(parsed.host_str().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_generation() {
        let id1 = NoteId::new();
        let id2 = NoteId::new();

        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id1.as_str().len(), 26);
    }

    #[test]
    fn test_note_id_accepts_legacy_format() {
        let id: NoteId = serde_json::from_str("\"1699999999999_k3j4h5g6f\"").unwrap();
        assert_eq!(id.as_str(), "1699999999999_k3j4h5g6f");

        assert!(serde_json::from_str::<NoteId>("\"  \"").is_err());
        assert!(NoteId::from_string("").is_err());
    }

    #[test]
    fn test_from_draft_defaults() {
        let note = Note::from_draft(NoteDraft::text("  hello  ", "https://a.com/x")).unwrap();

        assert_eq!(note.content, "hello");
        assert_eq!(note.domain, "a.com");
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.category, DEFAULT_CATEGORY);
        assert_eq!(note.note_type, NoteType::Text);
        assert!(note.tags.is_empty());
        assert!(note.last_modified.is_none());
    }

    #[test]
    fn test_from_draft_sanitizes_content() {
        let note =
            Note::from_draft(NoteDraft::text("<script>alert(1)</script>", "https://a.com"))
                .unwrap();
        assert_eq!(note.content, "&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[test]
    fn test_from_draft_drops_image_fields_on_text_notes() {
        let draft = NoteDraft {
            image_data: Some("data:image/png;base64,AAAA".into()),
            ..NoteDraft::text("caption", "https://a.com")
        };
        let note = Note::from_draft(draft).unwrap();
        assert!(note.image_data.is_none());

        let draft = NoteDraft {
            note_type: Some("image".into()),
            image_data: Some("data:image/png;base64,AAAA".into()),
            image_alt: Some("a cat".into()),
            ..NoteDraft::text("caption", "https://a.com")
        };
        let note = Note::from_draft(draft).unwrap();
        assert_eq!(note.note_type, NoteType::Image);
        assert_eq!(note.image_alt.as_deref(), Some("a cat"));
    }

    #[test]
    fn test_draft_timestamp_formats() {
        let draft: NoteDraft = serde_json::from_value(serde_json::json!({
            "content": "x",
            "url": "https://a.com",
            "timestamp": 1_700_000_000_000i64
        }))
        .unwrap();
        assert_eq!(draft.timestamp.unwrap().timestamp_millis(), 1_700_000_000_000);

        let draft: NoteDraft = serde_json::from_value(serde_json::json!({
            "content": "x",
            "url": "https://a.com",
            "timestamp": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(draft.timestamp.unwrap().to_rfc3339(), "2024-03-01T12:00:00+00:00");

        let draft: NoteDraft = serde_json::from_value(serde_json::json!({
            "content": "x",
            "url": "https://a.com",
            "timestamp": null
        }))
        .unwrap();
        assert!(draft.timestamp.is_none());
    }

    #[test]
    fn test_note_wire_format() {
        let note = Note::from_draft(NoteDraft::text("hi", "https://a.com")).unwrap();
        let json = serde_json::to_value(&note).unwrap();

        assert_eq!(json["type"], "text");
        assert_eq!(json["domain"], "a.com");
        assert!(json.get("lastModified").is_none());
        assert!(json.get("imageData").is_some());

        let back: Note = serde_json::from_value(json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_update_content_sets_last_modified() {
        let mut note = Note::from_draft(NoteDraft::text("old", "https://a.com")).unwrap();
        note.update_content(" a & b ");

        assert_eq!(note.content, "a &amp; b");
        assert!(note.last_modified.unwrap() >= note.timestamp);
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://a.com/x?y=1").unwrap(), "a.com");
        assert_eq!(domain_of("http://sub.example.org:8080/").unwrap(), "sub.example.org");
        assert_eq!(domain_of("file:///tmp/page.html").unwrap(), "");
        assert!(domain_of("not a url").is_err());
        assert!(domain_of("/relative/path").is_err());
    }
}
