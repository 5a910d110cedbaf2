//! Research Engine - decomposition, search, ranking and findings in one call

use super::{round2, QueryDecomposer, ResearchResult, ScoredSource, SourceRanker};
use crate::llm::parse::{parse_list, ListSource};
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use crate::search::WebSearchClient;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Placeholder finding used when extraction yields nothing usable
pub const FINDINGS_FALLBACK: &str = "Analysis pending";

/// Tunables for one research engine
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    /// Sub-queries generated per topic
    pub max_queries: usize,
    /// Results requested per sub-query
    pub results_per_query: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            max_queries: 3,
            results_per_query: 10,
        }
    }
}

/// Composes decomposition, search, ranking and findings extraction
pub struct ResearchEngine {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn WebSearchClient>,
    decomposer: QueryDecomposer,
    ranker: SourceRanker,
    options: ResearchOptions,
}

impl ResearchEngine {
    pub fn new(llm: Arc<dyn LlmClient>, search: Arc<dyn WebSearchClient>) -> Self {
        Self {
            decomposer: QueryDecomposer::new(llm.clone()),
            llm,
            search,
            ranker: SourceRanker::default(),
            options: ResearchOptions::default(),
        }
    }

    pub fn with_ranker(mut self, ranker: SourceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_options(mut self, options: ResearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Research a topic; search failures degrade to zero results per sub-query
    #[instrument(skip(self))]
    pub async fn research(&self, topic: &str, max_sources: usize) -> ResearchResult {
        info!("Starting research");

        let sub_queries = self
            .decomposer
            .decompose(topic, self.options.max_queries)
            .await;
        debug!(count = sub_queries.len(), "Generated sub-queries");

        // Sequential on purpose: the provider key is rate limited
        let mut pool = Vec::new();
        for query in &sub_queries {
            match self
                .search
                .search(query, self.options.results_per_query)
                .await
            {
                Ok(results) => {
                    debug!(sub_query = %query, found = results.len(), "Search complete");
                    pool.extend(results);
                }
                Err(e) => {
                    warn!(sub_query = %query, error = %e, "Search failed, treating as no results");
                }
            }
        }

        let total_sources_analyzed = pool.len();
        let mut sources = self.ranker.rank(pool);
        sources.truncate(max_sources);

        let key_findings = self.extract_findings(topic, &sources).await;
        let confidence_score = confidence(&sources);

        info!(
            sources = sources.len(),
            total_sources_analyzed,
            confidence = confidence_score,
            "Research complete"
        );

        ResearchResult {
            topic: topic.to_string(),
            sub_queries,
            sources,
            key_findings,
            confidence_score,
            total_sources_analyzed,
        }
    }

    async fn extract_findings(&self, topic: &str, sources: &[ScoredSource]) -> Vec<String> {
        let request = CompletionRequest::new(findings_prompt(topic, sources), 0.3, 300);

        let reply = match self.llm.complete(&request).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!(error = %e, "Findings extraction failed");
                metrics::record_fallback("findings_extractor");
                return vec![FINDINGS_FALLBACK.to_string()];
            }
        };

        let parsed = parse_list(&reply);
        let mut findings: Vec<String> = match parsed.source {
            ListSource::Json => parsed.items,
            // Short plain-text lines are preamble noise, not findings
            ListSource::Lines => parsed
                .items
                .into_iter()
                .filter(|line| line.chars().count() > 20)
                .collect(),
        };
        findings.truncate(5);

        if findings.is_empty() {
            metrics::record_fallback("findings_extractor");
            return vec![FINDINGS_FALLBACK.to_string()];
        }
        findings
    }
}

fn findings_prompt(topic: &str, sources: &[ScoredSource]) -> String {
    let source_text = sources
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, s)| format!("Source {}: {}\n{}", i + 1, s.source.title, s.source.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Based on these research sources about "{topic}", identify 3-5 key findings or insights.

Sources:
{source_text}

Requirements:
- Each finding should be a clear, factual statement
- Focus on the most important or recurring themes
- Be concise (1-2 sentences per finding)
- Return ONLY a JSON array of strings, no explanation

Example format: ["Finding 1", "Finding 2", "Finding 3"]

Your response:"#
    )
}

/// Mean credibility plus a small coverage bonus, clamped and rounded
pub(crate) fn confidence(sources: &[ScoredSource]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }

    let avg = sources.iter().map(|s| s.credibility_score).sum::<f64>() / sources.len() as f64;
    let coverage_bonus = f64::min(0.2, sources.len() as f64 * 0.02);

    round2(f64::min(1.0, avg + coverage_bonus).clamp(0.0, 1.0))
}
