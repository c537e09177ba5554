//! Capture mode actions, scoped to the sending context

use crate::error::Result;
use crate::router::{parse_payload, HandlerRegistry, MessageHandler, Response, RouterContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Register session actions
pub fn register_session_handlers(registry: &mut HandlerRegistry) {
    registry.register(ToggleHighlightModeHandler);
    registry.register(ToggleImageModeHandler);
    registry.register(GetStatusHandler);
    registry.register(PingHandler);
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    #[serde(default)]
    is_active: Option<bool>,
}

/// `toggleHighlightMode{isActive?}` -> `{isActive}`
pub struct ToggleHighlightModeHandler;

#[async_trait]
impl MessageHandler for ToggleHighlightModeHandler {
    fn action(&self) -> &'static str {
        "toggleHighlightMode"
    }

    fn description(&self) -> &'static str {
        "Turn text highlighting on or off for the sender"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        sender: &str,
    ) -> Result<Response> {
        let request: ToggleRequest = parse_payload(payload)?;
        let active = context
            .sessions
            .with_session(sender, |s| s.toggle_highlight(request.is_active));
        tracing::debug!("Highlight mode for {}: {}", sender, active);
        Response::ok_with("isActive", &active)
    }
}

/// `toggleImageMode{isActive?}` -> `{isActive}`
pub struct ToggleImageModeHandler;

#[async_trait]
impl MessageHandler for ToggleImageModeHandler {
    fn action(&self) -> &'static str {
        "toggleImageMode"
    }

    fn description(&self) -> &'static str {
        "Turn image picking on or off for the sender"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        sender: &str,
    ) -> Result<Response> {
        let request: ToggleRequest = parse_payload(payload)?;
        let active = context
            .sessions
            .with_session(sender, |s| s.toggle_image(request.is_active));
        tracing::debug!("Image mode for {}: {}", sender, active);
        Response::ok_with("isActive", &active)
    }
}

/// `getStatus{}` -> `{isHighlightActive, isImageModeActive}`
pub struct GetStatusHandler;

#[async_trait]
impl MessageHandler for GetStatusHandler {
    fn action(&self) -> &'static str {
        "getStatus"
    }

    fn description(&self) -> &'static str {
        "Capture modes of the sender"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        sender: &str,
    ) -> Result<Response> {
        let status = context.sessions.get(sender).status();
        Response::ok()
            .with("isHighlightActive", &status.is_highlight_active)?
            .with("isImageModeActive", &status.is_image_mode_active)
    }
}

/// `ping{}` -> `{}`
pub struct PingHandler;

#[async_trait]
impl MessageHandler for PingHandler {
    fn action(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "Liveness check"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        _context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        Ok(Response::ok())
    }
}
