//! Theme Extractor - short topic phrases from arbitrary text

use super::ThemeSet;
use crate::llm::parse::{parse_list, ListSource};
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use std::sync::Arc;
use tracing::warn;

/// Theme returned when extraction yields nothing usable
pub const THEME_FALLBACK: &str = "general topic";

/// Characters of input sent to the LLM
const SAMPLE_CHARS: usize = 3000;

#[derive(Clone)]
pub struct ThemeExtractor {
    llm: Arc<dyn LlmClient>,
}

impl ThemeExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Extract up to `max_themes` lowercase themes; never empty
    pub async fn extract(&self, text: &str, max_themes: usize) -> ThemeSet {
        let sample: String = text.chars().take(SAMPLE_CHARS).collect();
        let request = CompletionRequest::new(build_prompt(&sample, max_themes), 0.3, 200);

        let reply = match self.llm.complete(&request).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!(error = %e, "Theme extraction failed");
                metrics::record_fallback("theme_extractor");
                return vec![THEME_FALLBACK.to_string()];
            }
        };

        let parsed = parse_list(&reply);
        let mut themes: ThemeSet = match parsed.source {
            ListSource::Json => parsed.items.iter().map(|t| t.to_lowercase()).collect(),
            ListSource::Lines => parsed
                .items
                .iter()
                .filter(|line| (4..50).contains(&line.chars().count()))
                .map(|line| line.to_lowercase())
                .collect(),
        };
        themes.truncate(max_themes);

        if themes.is_empty() {
            metrics::record_fallback("theme_extractor");
            return vec![THEME_FALLBACK.to_string()];
        }
        themes
    }
}

fn build_prompt(sample: &str, max_themes: usize) -> String {
    format!(
        r#"Analyze this text and identify the main themes or topics discussed.

Text:
{sample}

Requirements:
- Identify {max_themes} main themes or topics
- Each theme should be a short phrase (2-5 words)
- Focus on substantive topics, not writing style
- Return ONLY a JSON array of strings, no explanation

Example format: ["artificial intelligence", "machine learning applications", "ethical considerations"]

Your response:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_json_themes_lowercased_and_capped() {
        let mock = Arc::new(MockLlmClient::new().with_reply(r#"["Layer 2", "Sharding", "Rollups"]"#));
        let themes = ThemeExtractor::new(mock).extract("text", 2).await;
        assert_eq!(themes, vec!["layer 2", "sharding"]);
    }

    #[tokio::test]
    async fn test_line_fallback_length_window() {
        let reply = "1. AI\n2. Consensus Mechanisms\n3. an extremely long line that goes on and on past fifty chars";
        let mock = Arc::new(MockLlmClient::new().with_reply(reply));
        let themes = ThemeExtractor::new(mock).extract("text", 5).await;
        assert_eq!(themes, vec!["consensus mechanisms"]);
    }

    #[tokio::test]
    async fn test_input_is_truncated() {
        let mock = Arc::new(MockLlmClient::new().with_reply("[\"a b\"]"));
        let long_text = "é".repeat(5000);
        ThemeExtractor::new(mock.clone()).extract(&long_text, 5).await;

        let prompt = &mock.requests()[0].prompt;
        assert_eq!(prompt.matches('é').count(), SAMPLE_CHARS);
    }

    #[tokio::test]
    async fn test_failure_and_empty_fall_back() {
        let failing = Arc::new(MockLlmClient::failing("rate limited"));
        assert_eq!(ThemeExtractor::new(failing).extract("t", 5).await, vec![THEME_FALLBACK]);

        let empty = Arc::new(MockLlmClient::new().with_reply("ok"));
        assert_eq!(ThemeExtractor::new(empty).extract("t", 5).await, vec![THEME_FALLBACK]);
    }
}
