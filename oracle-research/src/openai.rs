//! Reasoning service backed by the OpenAI Responses API

use async_trait::async_trait;
use oracle_core::{OracleError, OracleResult};
use oracle_tools::ToolDefinition;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::reasoning::{InputItem, ReasoningRequest, ReasoningResponse, ReasoningService, ToolCall};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct OpenAIReasoner {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a [InputItem],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    CustomToolCall {
        call_id: String,
        name: String,
        #[serde(default)]
        input: String,
    },
    /// Hosted tool activity (web search, reasoning summaries, ...)
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText { text: String },
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

impl OpenAIReasoner {
    pub fn new(api_key: impl Into<String>) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .map_err(|e| OracleError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Reads OPENAI_API_KEY, OPENAI_BASE_URL and OPENAI_MODEL
    pub fn from_env() -> Result<Self, OracleError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OracleError::config("OPENAI_API_KEY environment variable not set"))?;

        let mut reasoner = Self::new(api_key)?;
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            reasoner = reasoner.with_base_url(&base_url);
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            reasoner = reasoner.with_model(&model);
        }
        Ok(reasoner)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &ReasoningRequest) -> OracleResult<ReasoningResponse> {
        let url = format!("{}/responses", self.base_url);
        let body = ResponsesRequest {
            model: &self.model,
            instructions: &request.instructions,
            input: &request.input,
            tools: &request.tools,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::network(format!("OpenAI API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::api(format!("OpenAI API error ({}): {}", status, body)));
        }

        let body: ResponsesBody = response
            .json()
            .await
            .map_err(|e| OracleError::parse(format!("Failed to parse OpenAI response: {}", e)))?;

        into_reasoning_response(body)
    }
}

fn into_reasoning_response(body: ResponsesBody) -> OracleResult<ReasoningResponse> {
    if let Some(error) = body.error {
        return Err(OracleError::api(format!("OpenAI API error: {}", error.message)));
    }

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut refusal = None;

    for item in body.output {
        match item {
            OutputItem::Message { content } => {
                for part in content {
                    match part {
                        OutputContent::OutputText { text: chunk } => text.push_str(&chunk),
                        OutputContent::Refusal { refusal: reason } => refusal = Some(reason),
                        OutputContent::Other => {}
                    }
                }
            }
            OutputItem::FunctionCall { call_id, name, arguments } => {
                tool_calls.push(ToolCall::function(call_id, name, arguments));
            }
            OutputItem::CustomToolCall { call_id, name, input } => {
                tool_calls.push(ToolCall::custom(call_id, name, input));
            }
            OutputItem::Other => {}
        }
    }

    if text.is_empty() && tool_calls.is_empty() {
        return Err(match refusal {
            Some(reason) => OracleError::api(format!("OpenAI refused the request: {}", reason)),
            None => OracleError::parse("No response from OpenAI"),
        });
    }

    Ok(ReasoningResponse { text, tool_calls })
}

#[async_trait]
impl ReasoningService for OpenAIReasoner {
    #[instrument(skip(self, request, cancel), fields(model = %self.model, web = request.uses_web_search()))]
    async fn respond(&self, request: &ReasoningRequest, cancel: &CancellationToken) -> OracleResult<ReasoningResponse> {
        debug!(items = request.input.len(), tools = request.tools.len(), "Sending reasoning request");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OracleError::cancelled("reasoning request cancelled")),
            response = self.send(request) => response,
        }
    }
}
