//! Tool execution engine for the Prediction Market Oracle
//!
//! Capabilities ([`Tool`]) are typed units of work the reasoning service can
//! call. They are catalogued in a [`ToolRegistry`], wrapped in a middleware
//! chain (logging, timing, timeout, retry, panic recovery, metrics), and
//! projected to the reasoning service's tool-calling format.

pub mod builtin;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod value;
pub mod wire;

pub use builtin::{standard_registry, with_default_stack, ToolStackOptions};
pub use metrics::{MetricsCollector, ToolMetricsSnapshot};
pub use middleware::{Logging, Metrics, Middleware, Recover, Retry, Timeout, Timing};
pub use registry::ToolRegistry;
pub use schema::{ParameterSchema, Property, PropertyType};
pub use tool::{make_handler, Handler, Invocation, Tool, ToolKind, ToolResult};
pub use value::{arguments_from_json, Arguments, Value};
pub use wire::ToolDefinition;
