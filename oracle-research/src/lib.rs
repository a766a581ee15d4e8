//! Decision Pipeline for Prediction Market Resolution
//!
//! This crate turns a market question into an evidence-backed decision by
//! consulting an external reasoning service over four sequential passes:
//! search and fact extraction, contradiction check, outcome decision and
//! citation weighting. Tools from an `oracle-tools` registry are offered to
//! the reasoning service along the way.

pub mod citations;
pub mod json;
pub mod openai;
pub mod pipeline;
pub mod prompts;
pub mod reasoning;

pub use citations::{build_citations, NEUTRAL_WEIGHT};
pub use json::{extract_array, extract_object};
pub use openai::OpenAIReasoner;
pub use pipeline::{DecisionPipeline, PipelineConfig};
pub use reasoning::{
    InputItem, ReasoningRequest, ReasoningResponse, ReasoningService, Role, ToolCall,
    ToolCallPayload,
};
