//! Market question structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};

/// Outcome cardinality of a binary (YES/NO) market
pub const BINARY_OUTCOMES: u8 = 2;

/// A prediction market question awaiting resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuestion {
    /// Market identifier, decimal or 0x-prefixed hex (e.g. a condition id)
    pub id: String,

    /// Natural-language question being resolved
    pub question: String,

    /// Longer description, often containing resolution criteria
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Category (e.g., "Politics", "Crypto", "Sports")
    #[serde(default)]
    pub category: String,

    /// When the market closes for trading
    pub close_time: DateTime<Utc>,

    /// Number of outcomes; 2 for binary markets
    #[serde(default = "default_outcome_count")]
    pub outcome_count: u8,
}

fn default_outcome_count() -> u8 {
    BINARY_OUTCOMES
}

impl MarketQuestion {
    pub fn new(id: impl Into<String>, question: impl Into<String>, close_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            description: None,
            category: String::new(),
            close_time,
            outcome_count: BINARY_OUTCOMES,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn is_binary(&self) -> bool {
        self.outcome_count == BINARY_OUTCOMES
    }

    /// Reject questions the pipeline cannot resolve
    pub fn validate(&self) -> OracleResult<()> {
        if self.id.trim().is_empty() {
            return Err(OracleError::validation("id", "market id must not be empty"));
        }
        if self.question.trim().is_empty() {
            return Err(OracleError::validation(
                "question",
                "question text must not be empty",
            ));
        }
        if !self.is_binary() {
            return Err(OracleError::Validation(
                crate::ValidationError::new("outcomeCount", "only binary markets are supported")
                    .with_value(self.outcome_count),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn close() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_deserialize_defaults_to_binary() {
        let json = r#"{
            "id": "0x01",
            "question": "Will it rain in London on Nov 3?",
            "closeTime": "2026-11-03T00:00:00Z"
        }"#;
        let q: MarketQuestion = serde_json::from_str(json).unwrap();
        assert!(q.is_binary());
        assert_eq!(q.close_time, close());
        assert!(q.description.is_none());
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_multi_outcome() {
        let mut q = MarketQuestion::new("1", "Who wins?", close());
        q.outcome_count = 4;
        let err = q.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_rejects_blank_question() {
        let q = MarketQuestion::new("1", "   ", close());
        assert!(q.validate().is_err());
    }
}
