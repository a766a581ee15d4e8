//! `tools`: print the tool definitions offered to the reasoning service

use std::sync::Arc;

use oracle_tools::{standard_registry, MetricsCollector};
use tracing::info;

use crate::config::OracleConfig;

use super::emit_json;

pub async fn list_tools(config: &OracleConfig, include_hosted: bool) -> anyhow::Result<()> {
    let registry = standard_registry(&config.tools, &Arc::new(MetricsCollector::new()))?;
    let definitions = registry.definitions(include_hosted);
    info!("{} tool definitions", definitions.len());
    emit_json(&definitions, None).await
}
