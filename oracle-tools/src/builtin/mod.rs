//! Built-in capabilities and the default middleware stack

mod calculator;
mod datetime;
mod statistics;

use std::sync::Arc;
use std::time::Duration;

use oracle_core::OracleResult;

use crate::metrics::MetricsCollector;
use crate::middleware::{Logging, Metrics, Recover, Retry, Timeout, Timing};
use crate::registry::ToolRegistry;
use crate::tool::Tool;

pub use calculator::{calculator_tool, evaluate, CALCULATOR_TOOL};
pub use datetime::{datetime_tool, DATETIME_TOOL};
pub use statistics::{statistics_tool, STATISTICS_TOOL};

pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Hosted web search, carried out by the reasoning service
pub fn web_search_tool() -> Tool {
    Tool::delegated(
        WEB_SEARCH_TOOL,
        "Search the live web for recent, citable information.",
    )
}

/// Settings for the default middleware stack
#[derive(Debug, Clone)]
pub struct ToolStackOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ToolStackOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Wrap a tool in the default stack, innermost first:
/// recover, timeout, retry, timing, metrics, logging.
pub fn with_default_stack(
    tool: Tool,
    options: &ToolStackOptions,
    collector: &Arc<MetricsCollector>,
) -> Tool {
    tool.with_middleware(Recover)
        .with_middleware(Timeout::new(options.timeout))
        .with_middleware(Retry::new(options.max_retries, options.retry_delay))
        .with_middleware(Timing)
        .with_middleware(Metrics::new(Arc::clone(collector)))
        .with_middleware(Logging)
}

/// Registry holding every built-in tool behind the default stack
pub fn standard_registry(
    options: &ToolStackOptions,
    collector: &Arc<MetricsCollector>,
) -> OracleResult<ToolRegistry> {
    let registry = ToolRegistry::new();
    for tool in [calculator_tool(), datetime_tool(), statistics_tool()] {
        registry.register(with_default_stack(tool, options, collector))?;
    }
    registry.register(web_search_tool())?;
    Ok(registry)
}
