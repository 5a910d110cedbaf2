//! Research stage
//!
//! Turns one topic into ranked, scored web sources plus key findings:
//! - Sub-query decomposition via LLM
//! - Sequential web search per sub-query
//! - Credibility scoring and stable ranking
//! - Findings extraction and a confidence estimate

mod credibility;
mod decomposer;
mod engine;
mod ranker;

pub use credibility::{classify_domain, content_score, CredibilityScorer, DomainTier};
pub use decomposer::QueryDecomposer;
pub use engine::{ResearchEngine, ResearchOptions, FINDINGS_FALLBACK};
pub use ranker::SourceRanker;

pub(crate) use credibility::round2;

use crate::search::SearchResult;
use serde::{Deserialize, Serialize};

/// A search result with its credibility score attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSource {
    #[serde(flatten)]
    pub source: SearchResult,

    /// Credibility in [0, 1]
    #[serde(default = "neutral_score")]
    pub credibility_score: f64,
}

fn neutral_score() -> f64 {
    0.5
}

/// Output of one research invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchResult {
    pub topic: String,

    /// Sub-queries in the order they were searched
    pub sub_queries: Vec<String>,

    /// Top sources, non-increasing by credibility
    pub sources: Vec<ScoredSource>,

    pub key_findings: Vec<String>,

    /// Overall research quality in [0, 1]
    pub confidence_score: f64,

    /// Raw results pooled across all sub-queries, before truncation
    pub total_sources_analyzed: usize,
}

/// Clamp into [0, 1]; NaN becomes 0
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl ResearchResult {
    /// Restore score bounds and source order on data from outside the engine
    pub fn normalized(mut self) -> Self {
        for source in &mut self.sources {
            source.credibility_score = unit(source.credibility_score);
        }
        SourceRanker::sort(&mut self.sources);
        self.confidence_score = unit(self.confidence_score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_and_orders() {
        let scored = |url: &str, score: f64| ScoredSource {
            source: SearchResult::new(url, "t", ""),
            credibility_score: score,
        };
        let result = ResearchResult {
            sources: vec![scored("https://a.com", 0.4), scored("https://b.com", 1.7), scored("https://c.com", -0.2)],
            confidence_score: 3.0,
            ..ResearchResult::default()
        }
        .normalized();

        let urls: Vec<&str> = result.sources.iter().map(|s| s.source.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com", "https://a.com", "https://c.com"]);
        assert_eq!(result.sources[0].credibility_score, 1.0);
        assert_eq!(result.sources[2].credibility_score, 0.0);
        assert_eq!(result.confidence_score, 1.0);
    }

    #[test]
    fn test_scored_source_wire_shape() {
        let scored = ScoredSource {
            source: SearchResult::new("https://a.org", "A", "s"),
            credibility_score: 0.8,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["url"], "https://a.org");
        assert_eq!(json["credibility_score"], 0.8);
    }

    #[test]
    fn test_lenient_research_data() {
        let data: ResearchResult = serde_json::from_str(
            r#"{"sources": [{"link": "https://b.com", "title": "B"}], "key_findings": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(data.sources[0].source.url, "https://b.com");
        assert_eq!(data.sources[0].credibility_score, 0.5);
        assert!(data.sub_queries.is_empty());
    }
}
