//! Contract with the external reasoning service

use async_trait::async_trait;
use oracle_core::OracleResult;
use oracle_tools::ToolDefinition;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

/// One item of conversation state sent to the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    CustomToolCall {
        call_id: String,
        name: String,
        input: String,
    },
    CustomToolCallOutput {
        call_id: String,
        output: String,
    },
}

impl InputItem {
    pub fn user(content: impl Into<String>) -> Self {
        InputItem::Message {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// What the model handed to a tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallPayload {
    /// JSON-encoded arguments for a typed tool
    Arguments(String),
    /// Raw text for a free-text tool
    Input(String),
}

/// A tool call requested by the reasoning service
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub payload: ToolCallPayload,
}

impl ToolCall {
    pub fn function(call_id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            payload: ToolCallPayload::Arguments(arguments.into()),
        }
    }

    pub fn custom(call_id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            payload: ToolCallPayload::Input(input.into()),
        }
    }

    /// The call itself, echoed back so the output has something to attach to
    pub fn to_input_item(&self) -> InputItem {
        match &self.payload {
            ToolCallPayload::Arguments(arguments) => InputItem::FunctionCall {
                call_id: self.call_id.clone(),
                name: self.name.clone(),
                arguments: arguments.clone(),
            },
            ToolCallPayload::Input(input) => InputItem::CustomToolCall {
                call_id: self.call_id.clone(),
                name: self.name.clone(),
                input: input.clone(),
            },
        }
    }

    pub fn output_item(&self, output: impl Into<String>) -> InputItem {
        match self.payload {
            ToolCallPayload::Arguments(_) => InputItem::FunctionCallOutput {
                call_id: self.call_id.clone(),
                output: output.into(),
            },
            ToolCallPayload::Input(_) => InputItem::CustomToolCallOutput {
                call_id: self.call_id.clone(),
                output: output.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReasoningRequest {
    pub instructions: String,
    pub input: Vec<InputItem>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
}

impl ReasoningRequest {
    /// Whether hosted web retrieval is enabled for this request
    pub fn uses_web_search(&self) -> bool {
        self.tools.iter().any(ToolDefinition::is_hosted)
    }
}

/// Final text, or tool calls the caller must run before asking again
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasoningResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ReasoningResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }
}

/// The large-language-model backend consulted by each pipeline pass.
/// Implementations must abort with `OracleError::Cancelled` once `cancel` fires.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn respond(&self, request: &ReasoningRequest, cancel: &CancellationToken) -> OracleResult<ReasoningResponse>;
}
