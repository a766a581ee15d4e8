//! Evidence and decision structures produced by a resolution run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OracleResult, ValidationError};

/// A factual claim extracted from retrieved evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub statement: String,

    /// URLs backing this statement
    #[serde(default)]
    pub sources: Vec<String>,

    /// Confidence in [0, 1]; out-of-range values are clamped on parse
    #[serde(default, deserialize_with = "deserialize_confidence")]
    pub confidence: f64,

    /// Whether this fact conflicts with another extracted fact
    #[serde(default, deserialize_with = "deserialize_contradicts")]
    pub contradicts: bool,

    #[serde(default)]
    pub supporting_evidence: String,
}

/// Clamp into [0, 1]; NaN counts as no confidence
fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(0.0, clamp_confidence))
}

/// Reasoning services report contradictions either as a flag or as the list of
/// conflicting statements; a non-empty list counts as a contradiction.
fn deserialize_contradicts<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        List(Vec<serde_json::Value>),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::List(items)) => !items.is_empty(),
        Some(Flag::Text(s)) => !s.trim().is_empty(),
        None => false,
    })
}

impl Fact {
    pub fn new(statement: impl Into<String>, confidence: f64) -> Self {
        Self {
            statement: statement.into(),
            sources: Vec::new(),
            confidence: clamp_confidence(confidence),
            contradicts: false,
            supporting_evidence: String::new(),
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.sources.push(url.into());
        self
    }
}

/// A source discovered while searching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
        }
    }
}

/// A source weighted by how much the decision's facts lean on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub weight: f64,
}

impl Citation {
    pub fn from_source(source: &Source, weight: f64) -> Self {
        Self {
            url: source.url.clone(),
            title: source.title.clone(),
            snippet: source.snippet.clone(),
            weight,
        }
    }
}

/// Final outcome of a resolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Chosen outcome index (0 or 1 for binary markets)
    pub outcome_id: u8,
    pub confidence: f64,
    pub reasoning: String,
    pub facts: Vec<Fact>,
    pub citations: Vec<Citation>,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    /// Evidence URIs in citation order
    pub fn evidence_uris(&self) -> Vec<String> {
        self.citations.iter().map(|c| c.url.clone()).collect()
    }
}

/// Check an outcome/confidence pair returned by the reasoning service
pub fn validate_outcome(outcome_id: i64, confidence: f64) -> OracleResult<u8> {
    if outcome_id != 0 && outcome_id != 1 {
        return Err(ValidationError::new("outcomeId", "outcome must be 0 or 1")
            .with_value(outcome_id)
            .into());
    }
    if !(0.0..=1.0).contains(&confidence) {
        let err = ValidationError::new("confidence", "confidence must lie in [0, 1]");
        // NaN has no JSON representation
        let err = match serde_json::Number::from_f64(confidence) {
            Some(n) => err.with_value(n),
            None => err,
        };
        return Err(err.into());
    }
    Ok(outcome_id as u8)
}
