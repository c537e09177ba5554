//! Message router between contexts and the note store
//!
//! Content scripts, the popup and the CLI talk to the store by sending a
//! [`Request`] (`{"action": ..., ...payload}`) and receiving a [`Response`]
//! (`{"success": bool, "error"?: ..., ...data}`). Each action is served by a
//! [`MessageHandler`] registered under its name in a [`HandlerRegistry`].
//!
//! The router is the single error boundary: every failure raised by a handler
//! becomes a `success: false` response, see [`errors`].
//!
//! ```rust
//! use snapnote::router::{MessageRouter, Request};
//! use snapnote::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let router = MessageRouter::in_memory(Arc::new(MemoryStorage::new()));
//! let response = router.dispatch("tab-1", Request::new("ping")).await;
//! assert!(response.success);
//! # }
//! ```

pub mod errors;
pub mod handlers;

use crate::config::StoreConfig;
use crate::error::{Result, SnapNoteError};
use crate::notes::NoteStore;
use crate::notify::{LogNotifier, Notifier};
use crate::session::{ContextId, SessionRegistry};
use crate::storage::StorageBackend;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

/// Error message for actions without a handler
pub const UNKNOWN_ACTION: &str = "Unknown action";

/// A tagged request from a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the action to run
    #[serde(default)]
    pub action: String,
    /// Action-specific fields
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Request {
    /// Create a request without payload
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Structured reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the action succeeded
    pub success: bool,
    /// Failure message, present only when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Action-specific result fields
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Response {
    /// A success without data
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: Map::new(),
        }
    }

    /// A success carrying one serialized field
    pub fn ok_with<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Self> {
        Self::ok().with(key, value)
    }

    /// Add a serialized field
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Result<Self> {
        self.data
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// A failure with a user-facing message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: Map::new(),
        }
    }

    /// Raw data field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Deserialize a data field
    pub fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<T> {
        let value = self.data.remove(key).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            SnapNoteError::InvalidRequest(format!("Unexpected '{key}' in response: {e}"))
        })
    }
}

/// Shared state every handler runs against
pub struct RouterContext {
    /// The note store
    pub store: Arc<NoteStore>,
    /// Per-context capture modes
    pub sessions: Arc<SessionRegistry>,
}

/// One action the router can serve
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Action name this handler answers to
    fn action(&self) -> &'static str;

    /// One-line description, shown in listings
    fn description(&self) -> &'static str;

    /// Run the action for `sender`
    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        sender: &str,
    ) -> Result<Response>;
}

/// Parse a request payload into a typed struct
pub fn parse_payload<T: DeserializeOwned>(payload: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(payload))
        .map_err(|e| SnapNoteError::InvalidRequest(format!("Invalid request payload: {e}")))
}

/// Handlers keyed by action name
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn MessageHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in action
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        handlers::register_all(&mut registry);
        registry
    }

    /// Register a handler, replacing any previous one for the same action
    pub fn register<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.handlers
            .insert(handler.action().to_string(), Box::new(handler));
    }

    /// Handler for an action
    pub fn get(&self, action: &str) -> Option<&dyn MessageHandler> {
        self.handlers.get(action).map(|h| h.as_ref())
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> Vec<&'static str> {
        let mut actions: Vec<&'static str> = self.handlers.values().map(|h| h.action()).collect();
        actions.sort_unstable();
        actions
    }

    /// Action names with their descriptions, sorted by action
    pub fn descriptions(&self) -> Vec<(&'static str, &'static str)> {
        let mut described: Vec<_> = self
            .handlers
            .values()
            .map(|h| (h.action(), h.description()))
            .collect();
        described.sort_unstable();
        described
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A request waiting for its reply
#[derive(Debug)]
pub struct Envelope {
    /// Sending context
    pub context: ContextId,
    /// The request
    pub request: Request,
    /// Where the response goes; dropped receivers are tolerated
    pub reply: oneshot::Sender<Response>,
}

/// Input accepted by [`MessageRouter::serve`]
#[derive(Debug)]
pub enum RouterInput {
    /// Handle a request
    Message(Envelope),
    /// The context was torn down; drop its session
    CloseContext(ContextId),
}

/// Dispatches requests to handlers
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<HandlerRegistry>,
    context: Arc<RouterContext>,
}

impl MessageRouter {
    /// Router over a store with every built-in action
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self::with_registry(store, HandlerRegistry::with_default_handlers())
    }

    /// Router over a store with a custom handler set
    pub fn with_registry(store: Arc<NoteStore>, registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            context: Arc::new(RouterContext {
                store,
                sessions: Arc::new(SessionRegistry::new()),
            }),
        }
    }

    /// Router over a backend with default configuration and log notifications
    pub fn in_memory(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_notifier(backend, Arc::new(LogNotifier))
    }

    /// Router over a backend with default configuration
    pub fn with_notifier(backend: Arc<dyn StorageBackend>, notifier: Arc<dyn Notifier>) -> Self {
        let store = NoteStore::new(backend, &StoreConfig::default(), notifier);
        Self::new(Arc::new(store))
    }

    /// Handlers known to this router
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The store behind this router
    pub fn store(&self) -> &Arc<NoteStore> {
        &self.context.store
    }

    /// Per-context sessions
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.context.sessions
    }

    /// Handle one request; never fails
    pub async fn dispatch(&self, sender: &str, request: Request) -> Response {
        let Some(handler) = self.registry.get(&request.action) else {
            tracing::warn!("Unknown action: {:?}", request.action);
            return Response::failure(UNKNOWN_ACTION);
        };

        tracing::debug!("Dispatching '{}' from {}", request.action, sender);
        match handler.execute(request.payload, &self.context, sender).await {
            Ok(response) => response,
            Err(e) => errors::error_response(&request.action, &e),
        }
    }

    /// Handle a raw JSON request; malformed requests become failures
    pub async fn dispatch_value(&self, sender: &str, value: Value) -> Response {
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.dispatch(sender, request).await,
            Err(e) => {
                tracing::warn!("Malformed request from {}: {}", sender, e);
                Response::failure(format!("Invalid request: {e}"))
            }
        }
    }

    /// Handle one request on its own task so a panicking handler yields a
    /// failure response instead of taking the caller down
    pub async fn dispatch_isolated(&self, sender: ContextId, request: Request) -> Response {
        let router = self.clone();
        let action = request.action.clone();
        match tokio::spawn(async move { router.dispatch(&sender, request).await }).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Handler for '{}' aborted: {}", action, e);
                Response::failure(errors::INTERNAL_ERROR)
            }
        }
    }

    /// Serve requests until every sender is dropped
    ///
    /// Each request runs on its own task, so replies may complete in any
    /// order. In-flight requests finish before this returns.
    pub async fn serve(self, mut input: mpsc::Receiver<RouterInput>) {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                message = input.recv() => match message {
                    Some(RouterInput::Message(envelope)) => {
                        let router = self.clone();
                        in_flight.spawn(async move {
                            let Envelope {
                                context,
                                request,
                                reply,
                            } = envelope;
                            let response = router.dispatch_isolated(context.clone(), request).await;
                            if reply.send(response).is_err() {
                                tracing::debug!("Context {} went away, reply discarded", context);
                            }
                        });
                    }
                    Some(RouterInput::CloseContext(context)) => {
                        if self.context.sessions.close(&context) {
                            tracing::debug!("Closed session for {}", context);
                        }
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        while in_flight.join_next().await.is_some() {}
        tracing::debug!("Router input closed");
    }

    /// Start [`MessageRouter::serve`] on a task and return a client for it
    pub fn spawn(self, buffer: usize) -> (RouterClient, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(self.serve(rx));
        (RouterClient { sender: tx }, handle)
    }
}

/// Sending side of a served router
#[derive(Debug, Clone)]
pub struct RouterClient {
    sender: mpsc::Sender<RouterInput>,
}

impl RouterClient {
    /// Send a request and wait for its reply
    pub async fn request(
        &self,
        context: impl Into<ContextId>,
        request: Request,
    ) -> Result<Response> {
        self.send(context, request)
            .await?
            .await
            .map_err(|_| SnapNoteError::Other("Router dropped the request".to_string()))
    }

    /// Queue a request without waiting for its reply
    pub async fn send(
        &self,
        context: impl Into<ContextId>,
        request: Request,
    ) -> Result<oneshot::Receiver<Response>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(RouterInput::Message(Envelope {
                context: context.into(),
                request,
                reply,
            }))
            .await
            .map_err(|_| SnapNoteError::Other("Router is not running".to_string()))?;
        Ok(response)
    }

    /// Tell the router a context was torn down
    pub async fn close_context(&self, context: impl Into<ContextId>) -> Result<()> {
        self.sender
            .send(RouterInput::CloseContext(context.into()))
            .await
            .map_err(|_| SnapNoteError::Other("Router is not running".to_string()))
    }
}
