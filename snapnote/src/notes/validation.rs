//! Note-shape checks applied before anything is persisted
//!
//! Validation is pure: no I/O, no clock, same answer for the same input.
//! Rules run in a fixed order and the first failure wins:
//!
//! 1. content present and non-blank after trimming
//! 2. content at most `max_content_length` characters
//! 3. `url` is an absolute URL
//! 4. `type`, if present, is `text` or `image`

use super::{NoteDraft, NoteType};
use crate::config::DEFAULT_MAX_CONTENT_LENGTH;
use crate::error::ValidationError;

/// Maximum note length in characters (Unicode scalar values)
pub const MAX_CONTENT_LENGTH: usize = DEFAULT_MAX_CONTENT_LENGTH;

/// Validation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    max_content_length: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(MAX_CONTENT_LENGTH)
    }
}

impl Validator {
    /// Create a validator with a custom content limit
    pub fn new(max_content_length: usize) -> Self {
        Self { max_content_length }
    }

    /// Configured content limit
    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    /// Validate a draft, returning the resolved note type
    pub fn validate(&self, draft: &NoteDraft) -> Result<NoteType, ValidationError> {
        self.validate_content(&draft.content)?;

        if url::Url::parse(&draft.url).is_err() {
            return Err(ValidationError::InvalidUrl);
        }

        match draft.note_type.as_deref() {
            None | Some("") => Ok(NoteType::Text),
            Some(raw) => raw.parse(),
        }
    }

    /// Validate note content on its own, as for an edit
    pub fn validate_content(&self, content: &str) -> Result<(), ValidationError> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if content.chars().count() > self.max_content_length {
            return Err(ValidationError::ContentTooLong {
                max: self.max_content_length,
            });
        }
        Ok(())
    }
}

/// Validate a draft with the default limits
pub fn validate_draft(draft: &NoteDraft) -> Result<NoteType, ValidationError> {
    Validator::default().validate(draft)
}

/// Validate edited content with the default limits
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    Validator::default().validate_content(content)
}
