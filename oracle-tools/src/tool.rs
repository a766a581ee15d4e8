//! Capabilities: named, typed units of work the reasoning service can call

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use oracle_core::{OracleError, ValidationError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::middleware::Middleware;
use crate::schema::ParameterSchema;
use crate::value::Arguments;
use crate::wire::ToolDefinition;

/// How a capability receives its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Typed parameters validated against a [`ParameterSchema`]
    Function,
    /// A single raw text input
    FreeText,
    /// Executed entirely by the reasoning service (e.g. hosted web search)
    Delegated,
}

/// An immutable request to run a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Arguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub call_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Invocation {
    /// Invocation of a typed capability
    pub fn with_args(args: Arguments) -> Self {
        Self {
            args: Some(args),
            input: None,
            call_id: new_call_id(),
            timestamp: Utc::now(),
        }
    }

    /// Invocation of a free-text capability
    pub fn with_input(input: impl Into<String>) -> Self {
        Self {
            args: None,
            input: Some(input.into()),
            call_id: new_call_id(),
            timestamp: Utc::now(),
        }
    }

    /// Invocation carrying neither arguments nor text
    pub fn empty() -> Self {
        Self {
            args: None,
            input: None,
            call_id: new_call_id(),
            timestamp: Utc::now(),
        }
    }

    /// Use the caller's call id; an empty id keeps the generated one
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        let call_id = call_id.into();
        if !call_id.is_empty() {
            self.call_id = call_id;
        }
        self
    }
}

fn new_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Outcome of running a capability
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub data: Option<serde_json::Value>,
    pub error: Option<OracleError>,
    pub logs: Vec<String>,
    pub duration: Duration,
    pub call_id: String,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            error: None,
            logs: Vec::new(),
            duration: Duration::ZERO,
            call_id: call_id.into(),
        }
    }

    pub fn failure(call_id: impl Into<String>, error: OracleError) -> Self {
        Self {
            data: None,
            error: Some(error),
            logs: Vec::new(),
            duration: Duration::ZERO,
            call_id: call_id.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Collapse into a plain `Result`, dropping logs and timing
    pub fn into_result(self) -> Result<serde_json::Value, OracleError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data.unwrap_or(serde_json::Value::Null)),
        }
    }
}

/// A composed invocation handler
pub type Handler =
    Arc<dyn Fn(Invocation, CancellationToken) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// The capability's own logic: validated input in, data or failure out
pub type ExecuteFn = Arc<
    dyn Fn(Invocation, CancellationToken) -> BoxFuture<'static, Result<serde_json::Value, OracleError>>
        + Send
        + Sync,
>;

/// Build a [`Handler`] from a closure
pub fn make_handler<F>(f: F) -> Handler
where
    F: Fn(Invocation, CancellationToken) -> BoxFuture<'static, ToolResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn make_execute<F>(f: F) -> ExecuteFn
where
    F: Fn(Invocation, CancellationToken) -> BoxFuture<'static, Result<serde_json::Value, OracleError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// A named, typed unit of work
pub struct Tool {
    name: String,
    description: String,
    kind: ToolKind,
    schema: Option<ParameterSchema>,
    execute: ExecuteFn,
    middleware: Vec<Arc<dyn Middleware>>,
    handler: OnceLock<Handler>,
}

impl Tool {
    fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ToolKind,
        schema: Option<ParameterSchema>,
        execute: ExecuteFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            schema,
            execute,
            middleware: Vec::new(),
            handler: OnceLock::new(),
        }
    }

    /// Capability with typed parameters
    pub fn function<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        execute: F,
    ) -> Self
    where
        F: Fn(Arguments, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, OracleError>> + Send + 'static,
    {
        let execute = make_execute(move |invocation, cancel| {
            let args = invocation.args.unwrap_or_default();
            execute(args, cancel).boxed()
        });
        Self::new(name, description, ToolKind::Function, Some(schema), execute)
    }

    /// Capability taking raw text
    pub fn free_text<F, Fut>(name: impl Into<String>, description: impl Into<String>, execute: F) -> Self
    where
        F: Fn(String, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, OracleError>> + Send + 'static,
    {
        let execute = make_execute(move |invocation, cancel| {
            let input = invocation.input.unwrap_or_default();
            execute(input, cancel).boxed()
        });
        Self::new(name, description, ToolKind::FreeText, None, execute)
    }

    /// Capability carried out by the reasoning service itself
    pub fn delegated(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let marker = name.clone();
        let execute = make_execute(move |_, _| {
            let marker = marker.clone();
            async move { Ok(serde_json::json!({ "delegated": true, "tool": marker })) }.boxed()
        });
        Self::new(name, description, ToolKind::Delegated, None, execute)
    }

    /// Append a middleware; later additions wrap earlier ones
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self.handler = OnceLock::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn schema(&self) -> Option<&ParameterSchema> {
        self.schema.as_ref()
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Check the capability is registrable
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "tool name must not be empty"));
        }
        match (self.kind, &self.schema) {
            (ToolKind::Function, None) => Err(ValidationError::new(
                "schema",
                "typed tool must declare a parameter schema",
            )),
            (_, Some(schema)) => schema.validate(),
            _ => Ok(()),
        }
    }

    fn input_checker(&self) -> InputChecker {
        InputChecker {
            kind: self.kind,
            schema: self.schema.clone(),
        }
    }

    /// Composed handler, built once from the middleware list
    pub fn handler(&self) -> &Handler {
        self.handler.get_or_init(|| {
            self.middleware
                .iter()
                .fold(self.core_handler(), |next, middleware| {
                    middleware.wrap(&self.name, next)
                })
        })
    }

    /// Innermost handler: validate, apply defaults, run, measure
    fn core_handler(&self) -> Handler {
        let execute = Arc::clone(&self.execute);
        let schema = self.schema.clone();
        let name = self.name.clone();
        let checker = self.input_checker();

        make_handler(move |mut invocation, cancel| {
            let execute = Arc::clone(&execute);
            let call_id = invocation.call_id.clone();
            let checked = checker.check(&invocation);
            if let (Some(schema), Some(args)) = (&schema, invocation.args.as_mut()) {
                schema.apply_defaults(args);
            }
            let name = name.clone();

            async move {
                if let Err(err) = checked {
                    tracing::debug!(tool = %name, error = %err, "Rejected invocation input");
                    return ToolResult::failure(call_id, OracleError::Validation(err));
                }
                if cancel.is_cancelled() {
                    return ToolResult::failure(
                        call_id,
                        OracleError::cancelled(format!("{name} cancelled before start")),
                    );
                }

                let started = Instant::now();
                let outcome = execute(invocation, cancel).await;
                let mut result = match outcome {
                    Ok(data) => ToolResult::success(call_id, data),
                    Err(err) => ToolResult::failure(call_id, err),
                };
                result.duration = started.elapsed();
                result
            }
            .boxed()
        })
    }

    /// Run the capability through its middleware chain
    pub async fn execute(&self, invocation: Invocation, cancel: CancellationToken) -> ToolResult {
        (self.handler())(invocation, cancel).await
    }

    /// Wire-format projection for the reasoning service
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_tool(self)
    }
}

/// Input checks, detached from the tool so the core handler can own them
#[derive(Clone)]
struct InputChecker {
    kind: ToolKind,
    schema: Option<ParameterSchema>,
}

impl InputChecker {
    fn check(&self, invocation: &Invocation) -> Result<(), ValidationError> {
        match self.kind {
            ToolKind::Function => {
                let args = invocation
                    .args
                    .as_ref()
                    .ok_or_else(|| ValidationError::new("args", "arguments are required"))?;
                match &self.schema {
                    Some(schema) => schema.validate_args(args),
                    None => Ok(()),
                }
            }
            ToolKind::FreeText => match invocation.input.as_deref() {
                Some(text) if !text.trim().is_empty() => Ok(()),
                _ => Err(ValidationError::new("input", "input text must not be empty")),
            },
            ToolKind::Delegated => Ok(()),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
