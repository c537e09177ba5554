//! Per-context capture modes
//!
//! Each content context (one per tab) is either idle, highlighting text or
//! picking images. The two modes are mutually exclusive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Identifies the sending context (a tab, the popup, a CLI invocation)
pub type ContextId = String;

/// Capture modes of one context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    highlight_mode: bool,
    image_mode: bool,
}

/// Wire form of [`SessionState`] for `getStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Text highlighting is on
    pub is_highlight_active: bool,
    /// Image picking is on
    pub is_image_mode_active: bool,
}

impl SessionState {
    /// Whether text highlighting is on
    pub fn highlight_mode(&self) -> bool {
        self.highlight_mode
    }

    /// Whether image picking is on
    pub fn image_mode(&self) -> bool {
        self.image_mode
    }

    /// Set highlight mode, or flip it when `active` is `None`
    ///
    /// Turning it on turns image mode off. Returns the new value.
    pub fn toggle_highlight(&mut self, active: Option<bool>) -> bool {
        self.highlight_mode = active.unwrap_or(!self.highlight_mode);
        if self.highlight_mode {
            self.image_mode = false;
        }
        self.highlight_mode
    }

    /// Set image mode, or flip it when `active` is `None`
    ///
    /// Turning it on turns highlight mode off. Returns the new value.
    pub fn toggle_image(&mut self, active: Option<bool>) -> bool {
        self.image_mode = active.unwrap_or(!self.image_mode);
        if self.image_mode {
            self.highlight_mode = false;
        }
        self.image_mode
    }

    /// Snapshot for `getStatus`
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            is_highlight_active: self.highlight_mode,
            is_image_mode_active: self.image_mode,
        }
    }
}

/// Session state for every live context
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ContextId, SessionState>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the context's session, creating it on first use
    pub fn with_session<R>(&self, context: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(sessions.entry(context.to_string()).or_default())
    }

    /// Current state of a context; idle if it has none
    pub fn get(&self, context: &str) -> SessionState {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(context)
            .copied()
            .unwrap_or_default()
    }

    /// Forget a torn-down context; returns whether it had a session
    pub fn close(&self, context: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(context)
            .is_some()
    }

    /// Number of contexts with a session
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no context has a session
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_exclusive() {
        let mut state = SessionState::default();
        assert!(state.toggle_highlight(None));
        assert!(state.toggle_image(None));
        assert!(!state.highlight_mode());

        assert!(state.toggle_highlight(Some(true)));
        assert!(!state.image_mode());
        assert!(!state.toggle_highlight(None));
        assert_eq!(
            state.status(),
            SessionStatus {
                is_highlight_active: false,
                is_image_mode_active: false
            }
        );
    }

    #[test]
    fn test_explicit_off_keeps_other_mode() {
        let mut state = SessionState::default();
        state.toggle_image(Some(true));
        state.toggle_highlight(Some(false));
        assert!(state.image_mode());
    }

    #[test]
    fn test_registry_isolates_contexts() {
        let registry = SessionRegistry::new();
        registry.with_session("tab-1", |s| s.toggle_highlight(None));

        assert!(registry.get("tab-1").highlight_mode());
        assert!(!registry.get("tab-2").highlight_mode());
        assert_eq!(registry.len(), 1);

        assert!(registry.close("tab-1"));
        assert!(!registry.close("tab-1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_value(SessionState::default().status()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isHighlightActive": false, "isImageModeActive": false})
        );
    }
}
