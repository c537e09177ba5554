//! Statistics and quota actions

use crate::error::Result;
use crate::router::{HandlerRegistry, MessageHandler, Response, RouterContext};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Register statistics and quota actions
pub fn register_stats_handlers(registry: &mut HandlerRegistry) {
    registry.register(GetStatsHandler);
    registry.register(RebuildStatsHandler);
    registry.register(CheckQuotaHandler);
}

/// `getStats{}` -> `{stats}`
pub struct GetStatsHandler;

#[async_trait]
impl MessageHandler for GetStatsHandler {
    fn action(&self) -> &'static str {
        "getStats"
    }

    fn description(&self) -> &'static str {
        "Running note statistics"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let stats = context.store.get_stats().await?;
        Response::ok_with("stats", &stats)
    }
}

/// `rebuildStats{}` -> `{stats}`
pub struct RebuildStatsHandler;

#[async_trait]
impl MessageHandler for RebuildStatsHandler {
    fn action(&self) -> &'static str {
        "rebuildStats"
    }

    fn description(&self) -> &'static str {
        "Recompute statistics from the stored notes"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let stats = context.store.rebuild_stats().await?;
        Response::ok_with("stats", &stats)
    }
}

/// `checkQuota{}` -> `{quota, usageRatio}`
pub struct CheckQuotaHandler;

#[async_trait]
impl MessageHandler for CheckQuotaHandler {
    fn action(&self) -> &'static str {
        "checkQuota"
    }

    fn description(&self) -> &'static str {
        "Measure storage usage and evict old notes if it is high"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let report = context.store.check_quota().await?;
        Response::ok_with("quota", &report)?.with("usageRatio", &report.usage_ratio())
    }
}
