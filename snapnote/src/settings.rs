//! User settings
//!
//! Settings are written once at install time and then toggled from the UI.
//! They are never deleted; reading before initialization yields the defaults.

use crate::config::DEFAULT_MAX_NOTES;
use crate::error::{Result, SnapNoteError};
use crate::storage::{load_value, store_value, StorageBackend, SETTINGS_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-wide user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Dark UI theme
    #[serde(alias = "isDarkMode")]
    pub dark_mode: bool,
    /// Periodic export reminder
    pub auto_backup: bool,
    /// Note ceiling enforced on create
    pub max_notes: usize,
    /// Deliver user-visible notifications
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            auto_backup: true,
            max_notes: DEFAULT_MAX_NOTES,
            notifications: true,
        }
    }
}

/// Partial settings update; absent fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// New dark mode flag
    #[serde(default, alias = "isDarkMode", skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    /// New auto backup flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup: Option<bool>,
    /// New note ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_notes: Option<usize>,
    /// New notifications flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
}

impl SettingsPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.dark_mode {
            settings.dark_mode = v;
        }
        if let Some(v) = self.auto_backup {
            settings.auto_backup = v;
        }
        if let Some(v) = self.max_notes {
            settings.max_notes = v;
        }
        if let Some(v) = self.notifications {
            settings.notifications = v;
        }
    }
}

/// Reads and writes [`Settings`] under the `settings` key
pub struct SettingsStore {
    backend: Arc<dyn StorageBackend>,
    defaults: Settings,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Create a settings store with the built-in defaults
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_defaults(backend, Settings::default())
    }

    /// Create a settings store with custom defaults
    pub fn with_defaults(backend: Arc<dyn StorageBackend>, defaults: Settings) -> Self {
        Self {
            backend,
            defaults,
            write_lock: Mutex::new(()),
        }
    }

    /// Write the defaults if nothing is stored yet
    ///
    /// Returns the settings in effect afterwards. Calling this again never
    /// overwrites what the user changed.
    pub async fn initialize(&self) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;
        let _shared = self.backend.lock_key(SETTINGS_KEY).await?;
        if let Some(existing) = load_value::<Settings>(self.backend.as_ref(), SETTINGS_KEY).await? {
            tracing::debug!("Settings already initialized");
            return Ok(existing);
        }

        store_value(self.backend.as_ref(), SETTINGS_KEY, &self.defaults).await?;
        tracing::info!("Initialized default settings");
        Ok(self.defaults.clone())
    }

    /// Current settings, or the defaults when none are stored
    pub async fn get(&self) -> Result<Settings> {
        Ok(load_value(self.backend.as_ref(), SETTINGS_KEY)
            .await?
            .unwrap_or_else(|| self.defaults.clone()))
    }

    /// Merge a partial update into the stored settings
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        if patch.max_notes == Some(0) {
            return Err(SnapNoteError::InvalidRequest(
                "maxNotes must be at least 1".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let _shared = self.backend.lock_key(SETTINGS_KEY).await?;
        let mut settings = self.get().await?;
        patch.apply(&mut settings);
        store_value(self.backend.as_ref(), SETTINGS_KEY, &settings).await?;

        tracing::info!("Updated settings: {:?}", patch);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn store() -> (Arc<MemoryStorage>, SettingsStore) {
        let backend = Arc::new(MemoryStorage::new());
        let settings = SettingsStore::new(backend.clone());
        (backend, settings)
    }

    #[tokio::test]
    async fn test_get_defaults_when_uninitialized() {
        let (backend, settings) = store();
        let current = settings.get().await.unwrap();

        assert_eq!(current, Settings::default());
        assert!(current.auto_backup);
        assert_eq!(current.max_notes, 10_000);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_backend, settings) = store();
        settings.initialize().await.unwrap();
        settings
            .update(SettingsPatch {
                dark_mode: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        let after = settings.initialize().await.unwrap();
        assert!(after.dark_mode);
    }

    #[tokio::test]
    async fn test_update_merges() {
        let (_backend, settings) = store();
        let updated = settings
            .update(SettingsPatch {
                max_notes: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.max_notes, 5);
        assert!(updated.notifications);
        assert_eq!(settings.get().await.unwrap().max_notes, 5);
    }

    #[tokio::test]
    async fn test_update_rejects_zero_ceiling() {
        let (_backend, settings) = store();
        let result = settings
            .update(SettingsPatch {
                max_notes: Some(0),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(SnapNoteError::InvalidRequest(_))));
    }

    #[test]
    fn test_is_dark_mode_alias() {
        let settings: Settings = serde_json::from_value(json!({"isDarkMode": true})).unwrap();
        assert!(settings.dark_mode);
        assert_eq!(settings.max_notes, 10_000);

        let patch: SettingsPatch = serde_json::from_value(json!({"isDarkMode": false})).unwrap();
        assert_eq!(patch.dark_mode, Some(false));
        assert!(!patch.is_empty());

        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["darkMode"], false);
        assert_eq!(json["maxNotes"], 10_000);
    }
}
