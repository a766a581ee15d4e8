//! Error types for the oracle

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejected input value, naming the field that failed and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field (or `field[index]` for array items) that failed validation
    pub field: String,
    pub message: String,
    /// The offending value, if one was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {} (got {})", self.field, self.message, value),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Pipeline stage that produced a wrapped error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Search,
    Contradictions,
    Decide,
    Citations,
    Sign,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Search => "search",
            Stage::Contradictions => "contradiction check",
            Stage::Decide => "decide",
            Stage::Citations => "citations",
            Stage::Sign => "sign",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oracle-wide error type
#[derive(Error, Debug, Clone)]
pub enum OracleError {
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Timed out after {after:?}: {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<OracleError>,
    },
}

impl OracleError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        OracleError::Validation(ValidationError::new(field, message))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        OracleError::NotFound(msg.into())
    }

    pub fn already_registered(msg: impl Into<String>) -> Self {
        OracleError::AlreadyRegistered(msg.into())
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        OracleError::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        OracleError::Execution(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        OracleError::Parse(msg.into())
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        OracleError::Signature(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        OracleError::Cancelled(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        OracleError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        OracleError::Network(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        OracleError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        OracleError::Internal(msg.into())
    }

    /// Wrap this error with the pipeline stage it surfaced from
    pub fn in_stage(self, stage: Stage) -> Self {
        OracleError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Innermost error, unwrapping any stage context
    pub fn root(&self) -> &OracleError {
        match self {
            OracleError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), OracleError::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), OracleError::Cancelled(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), OracleError::Timeout { .. })
    }

    /// Validation failures and caller cancellation are never retried
    pub fn is_retryable(&self) -> bool {
        !self.is_validation() && !self.is_cancelled()
    }
}

impl From<ValidationError> for OracleError {
    fn from(err: ValidationError) -> Self {
        OracleError::Validation(err)
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Parse(err.to_string())
    }
}

/// Result type alias for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;
