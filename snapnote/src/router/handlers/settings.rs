//! Settings and notification actions

use crate::error::{Result, SnapNoteError};
use crate::notify::{Notification, NotificationKind};
use crate::router::{parse_payload, HandlerRegistry, MessageHandler, Response, RouterContext};
use crate::settings::SettingsPatch;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Register settings and notification actions
pub fn register_settings_handlers(registry: &mut HandlerRegistry) {
    registry.register(GetSettingsHandler);
    registry.register(UpdateSettingsHandler);
    registry.register(ShowNotificationHandler);
}

#[derive(Debug, Deserialize)]
struct UpdateSettingsRequest {
    #[serde(default)]
    settings: Option<SettingsPatch>,
}

#[derive(Debug, Deserialize)]
struct ShowNotificationRequest {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: NotificationKind,
}

/// `getSettings{}` -> `{settings}`
pub struct GetSettingsHandler;

#[async_trait]
impl MessageHandler for GetSettingsHandler {
    fn action(&self) -> &'static str {
        "getSettings"
    }

    fn description(&self) -> &'static str {
        "Current user settings"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let settings = context.store.settings().get().await?;
        Response::ok_with("settings", &settings)
    }
}

/// `updateSettings{settings}` -> `{settings}`
pub struct UpdateSettingsHandler;

#[async_trait]
impl MessageHandler for UpdateSettingsHandler {
    fn action(&self) -> &'static str {
        "updateSettings"
    }

    fn description(&self) -> &'static str {
        "Merge a partial update into the user settings"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: UpdateSettingsRequest = parse_payload(payload)?;
        let patch = request
            .settings
            .ok_or_else(|| SnapNoteError::InvalidRequest("Settings are required".to_string()))?;
        let settings = context.store.settings().update(patch).await?;
        Response::ok_with("settings", &settings)
    }
}

/// `showNotification{message, type}` -> `{}`
///
/// Delivery is fire-and-forget: a failed delivery is logged and the request
/// still succeeds.
pub struct ShowNotificationHandler;

#[async_trait]
impl MessageHandler for ShowNotificationHandler {
    fn action(&self) -> &'static str {
        "showNotification"
    }

    fn description(&self) -> &'static str {
        "Show a message to the user"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        sender: &str,
    ) -> Result<Response> {
        let request: ShowNotificationRequest = parse_payload(payload)?;
        if request.message.trim().is_empty() {
            return Err(SnapNoteError::InvalidRequest(
                "Notification message is required".to_string(),
            ));
        }

        let notification = Notification::new(request.message, request.kind);
        if let Err(e) = context.store.notifications().dispatch(&notification).await {
            tracing::warn!("Failed to deliver notification from {}: {}", sender, e);
        }
        Ok(Response::ok())
    }
}
