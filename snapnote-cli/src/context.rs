//! Router access for CLI commands
//!
//! CLI commands never touch the store directly. They build the same
//! `{action, ...}` requests an extension context would send and go through
//! the message router, so both surfaces share validation and error messages.

use crate::error::{CliError, CliResult};
use serde_json::{Map, Value};
use snapnote::{MessageRouter, NoteStore, Notifier, Request, Response, StoreConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Context name CLI requests are sent under
pub const CLI_CONTEXT: &str = "cli";

/// Opens the store and dispatches requests through the router
pub struct CliContext {
    router: MessageRouter,
}

impl CliContext {
    /// Open the store under `data_dir`, or the configured directory
    pub async fn new(data_dir: Option<PathBuf>, notifier: Arc<dyn Notifier>) -> CliResult<Self> {
        let config = Self::create_config(data_dir);
        config.validate().map_err(CliError::fatal)?;
        tracing::debug!("Opening note store at {}", config.data_dir.display());

        let store = NoteStore::open(&config, notifier).await?;
        Ok(Self {
            router: MessageRouter::new(Arc::new(store)),
        })
    }

    fn create_config(data_dir: Option<PathBuf>) -> StoreConfig {
        match data_dir {
            Some(dir) => StoreConfig::with_data_dir(dir),
            None => StoreConfig::new(),
        }
    }

    /// The router behind this context
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Run `action` and turn a `success: false` reply into a [`CliError`]
    pub async fn execute(&self, action: &str, payload: Map<String, Value>) -> CliResult<Response> {
        let request = Request {
            action: action.to_string(),
            payload,
        };
        let response = self.router.dispatch(CLI_CONTEXT, request).await;

        if response.success {
            Ok(response)
        } else {
            let message = response
                .error
                .unwrap_or_else(|| format!("{action} failed"));
            Err(CliError::rejected(message))
        }
    }

    /// Build a payload from key/value pairs, skipping `None` values
    pub fn create_arguments(pairs: Vec<(&str, Option<Value>)>) -> Map<String, Value> {
        pairs
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect()
    }
}
