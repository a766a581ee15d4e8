//! Weighting discovered sources by the facts that lean on them

use indexmap::IndexMap;
use oracle_core::{Citation, Fact, Source};
use url::Url;

/// Weight given to every source when no fact cites anything usable
pub const NEUTRAL_WEIGHT: f64 = 0.5;

/// Comparison key for a URL; unparseable strings are compared verbatim
fn url_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Build citations from the decision's facts and the sources found while searching.
///
/// Each fact's confidence is split equally across its source URLs. Only
/// discovered sources are cited, and only those with positive weight. URLs that
/// search never returned are dropped. Without any positive weight every
/// discovered source is cited at [`NEUTRAL_WEIGHT`]. The result is sorted by
/// descending weight, ties keeping discovery order.
pub fn build_citations(facts: &[Fact], sources: &[Source]) -> Vec<Citation> {
    let mut weights: IndexMap<String, f64> = IndexMap::new();
    for fact in facts {
        let urls: Vec<&String> = fact.sources.iter().filter(|u| !u.trim().is_empty()).collect();
        if urls.is_empty() {
            continue;
        }
        let share = fact.confidence / urls.len() as f64;
        for url in urls {
            *weights.entry(url_key(url)).or_insert(0.0) += share;
        }
    }

    let mut discovered: IndexMap<String, &Source> = IndexMap::new();
    for source in sources {
        discovered.entry(url_key(&source.url)).or_insert(source);
    }

    let mut citations: Vec<Citation> = discovered
        .iter()
        .filter_map(|(key, source)| {
            let weight = weights.get(key).copied().unwrap_or(0.0);
            (weight > 0.0).then(|| Citation::from_source(source, weight))
        })
        .collect();

    if citations.is_empty() {
        tracing::warn!(
            sources = discovered.len(),
            "No fact cites a usable source, falling back to neutral weights"
        );
        citations = discovered
            .values()
            .map(|source| Citation::from_source(source, NEUTRAL_WEIGHT))
            .collect();
    }

    // Stable: equal weights keep discovery order
    citations.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    citations
}
