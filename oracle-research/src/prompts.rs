//! Instructions and prompt builders for each pipeline pass

use oracle_core::{Fact, MarketQuestion};

pub const SEARCH_INSTRUCTIONS: &str = r#"You are a meticulous research analyst resolving a prediction market. Use web search to find authoritative, recent, citable evidence about whether the market's event occurred.

Prefer primary sources (official records, government data, company filings, major wire services) over commentary. Every fact must be backed by at least one URL you actually retrieved.

You may use the available tools for arithmetic, date math and statistics when a fact depends on a computation.

Respond with valid JSON in this exact format:
{
  "facts": [
    {
      "statement": "A single verifiable claim",
      "sources": ["https://..."],
      "confidence": 0.0,
      "supportingEvidence": "Quote or paraphrase from the source"
    }
  ],
  "sources": [
    { "url": "https://...", "title": "Page title", "snippet": "Relevant excerpt" }
  ]
}

Confidence is a number between 0 and 1 reflecting how well the sources establish the claim."#;

pub const CONTRADICTION_INSTRUCTIONS: &str = r#"You are a fact checker. You will receive a list of facts extracted from web sources. Identify facts that contradict one another.

Return the SAME facts, in the same order, with every field preserved, adding "contradicts": true to each fact that conflicts with at least one other fact and "contradicts": false otherwise. Lower the confidence of contradicted facts when one side is clearly weaker.

Respond with a JSON array of facts only:
[
  {
    "statement": "...",
    "sources": ["https://..."],
    "confidence": 0.0,
    "contradicts": false,
    "supportingEvidence": "..."
  }
]"#;

pub const DECISION_INSTRUCTIONS: &str = r#"You are the resolver for a binary prediction market. Decide the outcome strictly from the supplied facts.

Outcome 1 means the event described by the question happened (YES); outcome 0 means it did not (NO). Weigh contradicted facts less. If the evidence is thin, still choose the better-supported outcome and express the uncertainty through a lower confidence.

Respond with valid JSON in this exact format:
{
  "outcomeId": 0,
  "confidence": 0.0,
  "reasoning": "Step-by-step justification referencing the facts",
  "facts": [
    {
      "statement": "...",
      "sources": ["https://..."],
      "confidence": 0.0,
      "contradicts": false,
      "supportingEvidence": "..."
    }
  ]
}

outcomeId must be 0 or 1. confidence must be between 0 and 1 inclusive. Include in "facts" only the facts your decision relies on."#;

/// Search query: the question, plus its description when present
pub fn search_query(question: &MarketQuestion) -> String {
    match question.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => format!("{}\n\n{}", question.question.trim(), description),
        _ => question.question.trim().to_string(),
    }
}

fn market_header(question: &MarketQuestion) -> String {
    format!(
        "## Market\nID: {}\nQuestion: {}\nCategory: {}\nCloses: {}",
        question.id,
        question.question,
        if question.category.is_empty() { "uncategorised" } else { question.category.as_str() },
        question.close_time.to_rfc3339(),
    )
}

fn facts_json(facts: &[Fact]) -> String {
    serde_json::to_string_pretty(facts).unwrap_or_else(|_| "[]".to_string())
}

pub fn search_prompt(question: &MarketQuestion) -> String {
    format!(
        "{}\n\n## Research Query\n{}\n\nFind the evidence needed to resolve this market.",
        market_header(question),
        search_query(question),
    )
}

pub fn contradiction_prompt(question: &MarketQuestion, facts: &[Fact]) -> String {
    format!(
        "{}\n\n## Facts\n{}\n\nFlag the facts that contradict each other.",
        market_header(question),
        facts_json(facts),
    )
}

pub fn decision_prompt(question: &MarketQuestion, facts: &[Fact]) -> String {
    let contested = facts.iter().filter(|f| f.contradicts).count();
    format!(
        "{}\n\n## Facts ({} total, {} contested)\n{}\n\nResolve the market.",
        market_header(question),
        facts.len(),
        contested,
        facts_json(facts),
    )
}
