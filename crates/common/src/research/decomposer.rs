//! Query Decomposer - expands one topic into focused search queries

use crate::llm::{parse::parse_list, CompletionRequest, LlmClient};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

/// Expands a topic into sub-queries via LLM, falling back to the topic itself
#[derive(Clone)]
pub struct QueryDecomposer {
    llm: Arc<dyn LlmClient>,
}

impl QueryDecomposer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Break a topic into at most `max_queries` sub-queries; never empty
    pub async fn decompose(&self, topic: &str, max_queries: usize) -> Vec<String> {
        let max_queries = max_queries.max(1);
        let request = CompletionRequest::new(build_prompt(topic, max_queries), 0.3, 200);

        let reply = match self.llm.complete(&request).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!(error = %e, topic, "Query decomposition failed, using topic");
                metrics::record_fallback("query_decomposer");
                return vec![topic.to_string()];
            }
        };

        let mut queries = parse_list(&reply).items;
        queries.truncate(max_queries);

        if queries.is_empty() {
            debug!(topic, "Decomposition produced no queries, using topic");
            metrics::record_fallback("query_decomposer");
            return vec![topic.to_string()];
        }

        queries
    }
}

fn build_prompt(topic: &str, max_queries: usize) -> String {
    format!(
        r#"You are a research assistant. Break down this research topic into {max_queries} focused, specific search queries that will help gather comprehensive information.

Topic: {topic}

Requirements:
- Each query should be specific and searchable
- Queries should cover different aspects of the topic
- Use clear, concise language
- Return ONLY a JSON array of strings, no explanation

Example format: ["query 1", "query 2", "query 3"]

Your response:"#
    )
}
