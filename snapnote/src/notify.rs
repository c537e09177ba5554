//! User-visible notifications
//!
//! The store raises notifications for conditions the user should see (storage
//! running low) and the router forwards `showNotification` requests from
//! content scripts. Where they end up depends on the [`Notifier`]: the log, or
//! a broadcast channel that `serve` mode relays to connected clients.

use crate::error::{Result, SnapNoteError};
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Severity of a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Neutral information
    #[default]
    Info,
    /// An operation completed
    Success,
    /// Something needs attention
    Warning,
    /// An operation failed
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Text shown to the user
    pub message: String,
    /// Severity
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
}

impl Notification {
    /// Create a notification
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Shorthand for a warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Warning)
    }
}

/// Sink for user-visible notifications
pub trait Notifier: Send + Sync {
    /// Deliver a notification
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the tracing log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.kind {
            NotificationKind::Error => tracing::error!("{}", notification.message),
            NotificationKind::Warning => tracing::warn!("{}", notification.message),
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!("{}", notification.message)
            }
        }
        Ok(())
    }
}

/// Fans notifications out to every subscriber
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` undelivered messages
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if self.sender.send(notification.clone()).is_err() {
            // Nobody is listening; the message would only be dropped.
            tracing::debug!("No notification subscribers: {}", notification.message);
        }
        Ok(())
    }
}

/// Routes notifications through a [`Notifier`] while honoring the user's
/// `notifications` setting
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    settings: Arc<SettingsStore>,
}

impl NotificationDispatcher {
    /// Create a dispatcher
    pub fn new(notifier: Arc<dyn Notifier>, settings: Arc<SettingsStore>) -> Self {
        Self { notifier, settings }
    }

    /// Deliver a notification unless the user turned notifications off
    ///
    /// Returns whether the notification was handed to the notifier.
    pub async fn dispatch(&self, notification: &Notification) -> Result<bool> {
        let settings = self.settings.get().await?;
        if !settings.notifications {
            tracing::info!(
                "Notifications disabled, not delivering {}: {}",
                notification.kind,
                notification.message
            );
            return Ok(false);
        }

        self.notifier
            .notify(notification)
            .map_err(|e| SnapNoteError::Other(format!("Failed to deliver notification: {e}")))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsPatch;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_notification_wire_format() {
        let n = Notification::warning("low");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json, serde_json::json!({"message": "low", "type": "warning"}));

        let parsed: Notification =
            serde_json::from_value(serde_json::json!({"message": "hi"})).unwrap();
        assert_eq!(parsed.kind, NotificationKind::Info);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();

        notifier.notify(&Notification::warning("disk")).unwrap();
        assert_eq!(rx.recv().await.unwrap().message, "disk");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let notifier = BroadcastNotifier::default();
        assert!(notifier.notify(&Notification::warning("nobody")).is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_honors_setting() {
        let settings = Arc::new(SettingsStore::new(Arc::new(MemoryStorage::new())));
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();
        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), settings.clone());

        assert!(dispatcher.dispatch(&Notification::warning("one")).await.unwrap());
        assert_eq!(rx.recv().await.unwrap().message, "one");

        settings
            .update(SettingsPatch {
                notifications: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!dispatcher.dispatch(&Notification::warning("two")).await.unwrap());
        assert!(rx.try_recv().is_err());
    }
}
