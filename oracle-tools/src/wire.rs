//! Tool definitions in the reasoning service's tool-calling format

use serde::{Deserialize, Serialize};

use crate::tool::{Tool, ToolKind};

/// A tool as advertised to the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// Typed function tool with a JSON Schema for its parameters
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strict: Option<bool>,
    },
    /// Free-form tool receiving raw text
    Custom { name: String, description: String },
    /// Hosted web search run by the reasoning service itself
    WebSearchPreview,
}

impl ToolDefinition {
    pub fn from_tool(tool: &Tool) -> Self {
        match tool.kind() {
            ToolKind::Function => {
                let schema = tool.schema().cloned().unwrap_or_default();
                let strict = schema.all_required();
                ToolDefinition::Function {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: schema.to_json_schema(strict),
                    strict: strict.then_some(true),
                }
            }
            ToolKind::FreeText => ToolDefinition::Custom {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            },
            ToolKind::Delegated => ToolDefinition::WebSearchPreview,
        }
    }

    /// Name of a locally executed tool; `None` for hosted tools
    pub fn name(&self) -> Option<&str> {
        match self {
            ToolDefinition::Function { name, .. } | ToolDefinition::Custom { name, .. } => Some(name),
            ToolDefinition::WebSearchPreview => None,
        }
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self, ToolDefinition::WebSearchPreview)
    }
}
