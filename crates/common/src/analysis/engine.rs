//! Analyzer Engine - combines document and research into a report plan

use super::{compare, AnalysisResult, OutlineGenerator, ThemeExtractor};
use crate::llm::LlmClient;
use crate::research::ResearchResult;
use std::sync::Arc;
use tracing::{info, instrument};

/// Sources whose titles and snippets feed research theme extraction
const RESEARCH_TEXT_SOURCES: usize = 10;

pub struct AnalysisEngine {
    themes: ThemeExtractor,
    outline: OutlineGenerator,
    max_themes: usize,
}

impl AnalysisEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            themes: ThemeExtractor::new(llm.clone()),
            outline: OutlineGenerator::new(llm),
            max_themes: 5,
        }
    }

    pub fn with_max_themes(mut self, max_themes: usize) -> Self {
        self.max_themes = max_themes.max(1);
        self
    }

    #[instrument(skip(self, document_text, research), fields(document_chars = document_text.chars().count()))]
    pub async fn analyze(
        &self,
        topic: &str,
        document_text: &str,
        research: &ResearchResult,
    ) -> AnalysisResult {
        let document_themes = self.themes.extract(document_text, self.max_themes).await;
        let research_themes = self
            .themes
            .extract(&research_text(research), self.max_themes)
            .await;

        let split = compare(&document_themes, &research_themes);
        info!(
            gaps = split.gaps.len(),
            overlaps = split.overlaps.len(),
            "Themes compared"
        );

        let outline = self
            .outline
            .generate(
                topic,
                &document_themes,
                &research_themes,
                &split.gaps,
                &split.overlaps,
            )
            .await;
        info!(sections = outline.sections.len(), "Outline ready");

        AnalysisResult {
            topic: topic.to_string(),
            document_themes,
            research_themes,
            gaps: split.gaps,
            overlaps: split.overlaps,
            outline,
            document_length: document_text.chars().count(),
            research_sources: research.sources.len(),
        }
    }
}

/// Titles and snippets of the leading sources plus all findings, space-joined
pub fn research_text(research: &ResearchResult) -> String {
    research
        .sources
        .iter()
        .take(RESEARCH_TEXT_SOURCES)
        .flat_map(|s| [s.source.title.as_str(), s.source.snippet.as_str()])
        .chain(research.key_findings.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::research::ScoredSource;
    use crate::search::SearchResult;

    fn research() -> ResearchResult {
        ResearchResult {
            topic: "blockchain scalability".to_string(),
            sources: (0..12)
                .map(|i| ScoredSource {
                    source: SearchResult::new(format!("https://s{}.com", i), format!("T{}", i), format!("S{}", i)),
                    credibility_score: 0.5,
                })
                .collect(),
            key_findings: vec!["Sharding improves scalability".to_string()],
            ..ResearchResult::default()
        }
    }

    #[test]
    fn test_research_text_uses_first_ten_sources() {
        let text = research_text(&research());
        assert!(text.starts_with("T0 S0 T1 S1"));
        assert!(text.contains("T9 S9 Sharding improves scalability"));
        assert!(!text.contains("T10"));
    }

    #[tokio::test]
    async fn test_analyze_end_to_end() {
        let llm = MockLlmClient::new()
            .with_reply(r#"["Layer 2", "Consensus"]"#)
            .with_reply(r#"["layer 2 solutions", "zero-knowledge proofs"]"#)
            .with_reply(r#"{"sections": [{"title": "Overview", "topics": ["layer 2"], "priority": "high"}]}"#);
        let llm = Arc::new(llm);

        let result = AnalysisEngine::new(llm.clone())
            .analyze(
                "blockchain scalability",
                "Layer 2 solutions like Lightning Network show promise.",
                &research(),
            )
            .await;

        assert_eq!(result.document_themes, vec!["layer 2", "consensus"]);
        assert_eq!(result.overlaps, vec!["layer 2 solutions"]);
        assert_eq!(result.gaps, vec!["zero-knowledge proofs"]);
        assert_eq!(result.outline.sections[0].title, "Overview");
        assert_eq!(result.research_sources, 12);
        assert_eq!(result.document_length, 54);
        assert_eq!(llm.call_count(), 3);
    }
}
