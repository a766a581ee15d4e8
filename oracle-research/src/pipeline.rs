//! Four-pass decision pipeline: search, contradiction check, decide, cite

use std::sync::Arc;

use chrono::Utc;
use oracle_core::{
    validate_outcome, Decision, Fact, MarketQuestion, OracleError, OracleResult, Source, Stage,
};
use oracle_tools::{arguments_from_json, Invocation, ToolDefinition, ToolRegistry};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::citations::build_citations;
use crate::json::{parse_array, parse_object};
use crate::prompts::{
    contradiction_prompt, decision_prompt, search_prompt, CONTRADICTION_INSTRUCTIONS,
    DECISION_INSTRUCTIONS, SEARCH_INSTRUCTIONS,
};
use crate::reasoning::{InputItem, ReasoningRequest, ReasoningService, ToolCall, ToolCallPayload};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tool-call round trips allowed per pass before giving up
    pub max_tool_rounds: usize,
    pub temperature: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 4,
            temperature: Some(0.2),
        }
    }
}

/// Pass 1 response
#[derive(Debug, Deserialize)]
struct Findings {
    #[serde(default)]
    facts: Vec<Fact>,
    #[serde(default)]
    sources: Vec<Source>,
}

/// Pass 3 response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Verdict {
    outcome_id: i64,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    facts: Option<Vec<Fact>>,
}

pub struct DecisionPipeline {
    reasoner: Arc<dyn ReasoningService>,
    registry: Arc<ToolRegistry>,
    config: PipelineConfig,
}

impl DecisionPipeline {
    pub fn new(reasoner: Arc<dyn ReasoningService>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            reasoner,
            registry,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve one market. Any hard failure aborts the run with the failing stage attached.
    #[instrument(skip(self, question, cancel), fields(market = %question.id))]
    pub async fn run(&self, question: &MarketQuestion, cancel: &CancellationToken) -> OracleResult<Decision> {
        question.validate()?;
        info!("Resolving: {}", question.question);

        let findings = self
            .search(question, cancel)
            .await
            .map_err(|e| e.in_stage(Stage::Search))?;
        info!(facts = findings.facts.len(), sources = findings.sources.len(), "Search pass complete");

        let facts = self
            .check_contradictions(question, findings.facts, cancel)
            .await
            .map_err(|e| e.in_stage(Stage::Contradictions))?;

        let verdict = self
            .decide(question, facts, cancel)
            .await
            .map_err(|e| e.in_stage(Stage::Decide))?;
        info!(outcome = verdict.outcome_id, confidence = verdict.confidence, "Decision pass complete");

        if cancel.is_cancelled() {
            return Err(OracleError::cancelled("run cancelled before citations were built").in_stage(Stage::Citations));
        }
        let citations = build_citations(&verdict.facts, &findings.sources);
        info!(citations = citations.len(), "Citations built");

        Ok(Decision {
            outcome_id: verdict.outcome_id,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            facts: verdict.facts,
            citations,
            decided_at: Utc::now(),
        })
    }

    #[instrument(skip_all)]
    async fn search(&self, question: &MarketQuestion, cancel: &CancellationToken) -> OracleResult<Findings> {
        // Live retrieval is requested whether or not the registry carries a hosted tool
        let mut tools = self.registry.definitions(false);
        tools.push(ToolDefinition::WebSearchPreview);
        let text = self
            .converse(SEARCH_INSTRUCTIONS, search_prompt(question), tools, cancel)
            .await?;
        parse_object(&text, "search findings")
    }

    /// Pass 2 never fails on a malformed answer; it keeps the facts it was given
    #[instrument(skip_all, fields(facts = facts.len()))]
    async fn check_contradictions(
        &self,
        question: &MarketQuestion,
        facts: Vec<Fact>,
        cancel: &CancellationToken,
    ) -> OracleResult<Vec<Fact>> {
        if facts.is_empty() {
            debug!("No facts to cross-check, skipping contradiction pass");
            return Ok(facts);
        }

        let text = self
            .converse(
                CONTRADICTION_INSTRUCTIONS,
                contradiction_prompt(question, &facts),
                self.registry.definitions(false),
                cancel,
            )
            .await?;

        match parse_array::<Fact>(&text, "annotated facts") {
            Ok(annotated) => {
                let contested = annotated.iter().filter(|f| f.contradicts).count();
                info!(contested, "Contradiction pass complete");
                Ok(annotated)
            }
            Err(e) => {
                warn!("Contradiction check unparseable, keeping original facts: {}", e);
                Ok(facts)
            }
        }
    }

    #[instrument(skip_all, fields(facts = facts.len()))]
    async fn decide(&self, question: &MarketQuestion, facts: Vec<Fact>, cancel: &CancellationToken) -> OracleResult<CheckedVerdict> {
        let text = self
            .converse(
                DECISION_INSTRUCTIONS,
                decision_prompt(question, &facts),
                self.registry.definitions(false),
                cancel,
            )
            .await?;

        let verdict: Verdict = parse_object(&text, "decision")?;
        let outcome_id = validate_outcome(verdict.outcome_id, verdict.confidence)?;

        Ok(CheckedVerdict {
            outcome_id,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            facts: match verdict.facts {
                Some(decided) if !decided.is_empty() => decided,
                _ => facts,
            },
        })
    }

    /// Ask the reasoning service, running any tools it calls, until it answers with text
    async fn converse(
        &self,
        instructions: &str,
        prompt: String,
        tools: Vec<ToolDefinition>,
        cancel: &CancellationToken,
    ) -> OracleResult<String> {
        let mut request = ReasoningRequest {
            instructions: instructions.to_string(),
            input: vec![InputItem::user(prompt)],
            tools,
            temperature: self.config.temperature,
        };

        for round in 0..=self.config.max_tool_rounds {
            if cancel.is_cancelled() {
                return Err(OracleError::cancelled("run cancelled"));
            }

            let response = self.reasoner.respond(&request, cancel).await?;
            if response.tool_calls.is_empty() {
                debug!(chars = response.text.len(), "Reasoning service answered");
                return Ok(response.text);
            }
            if round == self.config.max_tool_rounds {
                break;
            }

            debug!(round, calls = response.tool_calls.len(), "Running requested tools");
            for call in &response.tool_calls {
                let output = self.run_tool(call, cancel).await?;
                request.input.push(call.to_input_item());
                request.input.push(call.output_item(output));
            }
        }

        Err(OracleError::execution(format!(
            "reasoning service still calling tools after {} rounds",
            self.config.max_tool_rounds
        )))
    }

    /// Output fed back to the model. Tool failures become error payloads; only
    /// cancellation of the run itself propagates.
    async fn run_tool(&self, call: &ToolCall, cancel: &CancellationToken) -> OracleResult<String> {
        let invocation = match &call.payload {
            ToolCallPayload::Input(text) => Invocation::with_input(text.clone()),
            ToolCallPayload::Arguments(raw) => match parse_arguments(raw) {
                Ok(args) => Invocation::with_args(args),
                Err(e) => return Ok(error_output(&e)),
            },
        }
        .with_call_id(call.call_id.clone());

        let result = match self.registry.execute(&call.name, invocation, cancel.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, "Model called an unknown tool");
                return Ok(error_output(&e));
            }
        };

        match result.into_result() {
            Ok(data) => Ok(data.to_string()),
            Err(e) if e.is_cancelled() && cancel.is_cancelled() => Err(e),
            Err(e) => {
                warn!(tool = %call.name, "Tool call failed: {}", e);
                Ok(error_output(&e))
            }
        }
    }
}

#[derive(Debug)]
struct CheckedVerdict {
    outcome_id: u8,
    confidence: f64,
    reasoning: String,
    facts: Vec<Fact>,
}

fn parse_arguments(raw: &str) -> OracleResult<oracle_tools::Arguments> {
    if raw.trim().is_empty() {
        return Ok(Default::default());
    }
    let json: serde_json::Value = serde_json::from_str(raw)?;
    arguments_from_json(&json).ok_or_else(|| OracleError::validation("arguments", "tool arguments must be a JSON object"))
}

fn error_output(error: &OracleError) -> String {
    serde_json::json!({ "error": error.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let args = parse_arguments(r#"{"operation": "mean", "values": [1, 2], "unit": null}"#).unwrap();
        assert_eq!(args.len(), 2);
        assert!(parse_arguments("").unwrap().is_empty());
        assert!(parse_arguments("[1, 2]").unwrap_err().is_validation());
        assert!(matches!(parse_arguments("{oops"), Err(OracleError::Parse(_))));
    }

    #[test]
    fn test_error_output_is_json() {
        let output = error_output(&OracleError::not_found("tool 'x' is not registered"));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["error"].as_str().unwrap().contains("not registered"));
    }
}
