//! Report assembly and the writer engine

use super::citations::CitationManager;
use super::html::render_page;
use super::section::{SectionContext, SectionGenerator};
use crate::analysis::Outline;
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use crate::research::ResearchResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Words asked of each generated section
pub const SECTION_WORD_TARGET: usize = 250;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub word_count: usize,
    pub section_count: usize,
    pub source_count: usize,
}

/// Final report in markdown plus a rendered HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub topic: String,
    pub executive_summary: String,
    /// Rendered markdown blocks, one per outline section
    pub sections: Vec<String>,
    pub references: String,
    pub markdown: String,
    pub html: String,
    pub metadata: ReportMetadata,
}

/// Joins the report parts into one markdown document
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(topic: &str, summary: &str, sections: &[String], references: &str) -> String {
        [
            format!("# {}\n", topic),
            "## Executive Summary\n".to_string(),
            format!("{}\n", summary),
            sections.join("\n"),
            format!("\n{}", references),
        ]
        .join("\n")
    }

    /// Whitespace-separated token count
    pub fn word_count(markdown: &str) -> usize {
        markdown.split_whitespace().count()
    }
}

/// Writes a full report from an outline and research data
pub struct ReportWriter {
    llm: Arc<dyn LlmClient>,
    sections: SectionGenerator,
    word_target: usize,
}

impl ReportWriter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            sections: SectionGenerator::new(llm.clone()),
            llm,
            word_target: SECTION_WORD_TARGET,
        }
    }

    /// Use a specific section generator (e.g. one with a virtual clock)
    pub fn with_section_generator(mut self, sections: SectionGenerator) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_word_target(mut self, word_target: usize) -> Self {
        self.word_target = word_target;
        self
    }

    #[instrument(skip(self, outline, research, document_text), fields(sections = outline.sections.len()))]
    pub async fn write_report(
        &self,
        topic: &str,
        outline: &Outline,
        research: &ResearchResult,
        document_text: &str,
    ) -> Report {
        let mut citations = CitationManager::new();
        citations.set_sources(research.sources.clone());

        let executive_summary = self.executive_summary(topic, &research.key_findings).await;

        let outline = if outline.sections.is_empty() {
            warn!("Outline has no sections, using writer default");
            Outline::writer_default()
        } else {
            outline.clone()
        };

        let context = SectionContext {
            topic,
            sources: &research.sources,
            document_text,
        };

        // One at a time; the generator spaces calls on a shared key
        let total = outline.sections.len();
        let mut sections = Vec::with_capacity(total);
        for (i, planned) in outline.sections.iter().enumerate() {
            let title = if planned.title.trim().is_empty() {
                format!("Section {}", i + 1)
            } else {
                planned.title.clone()
            };
            info!(section = %title, index = i + 1, total, "Writing section");
            let content = self
                .sections
                .generate_section(&title, &planned.topics, &context, self.word_target)
                .await;
            sections.push(content);
        }

        let references = citations.render();
        let markdown = ReportAssembler::assemble(topic, &executive_summary, &sections, &references);
        let html = render_page(&markdown);
        let word_count = ReportAssembler::word_count(&markdown);

        info!(word_count, sections = sections.len(), "Report complete");

        Report {
            topic: topic.to_string(),
            executive_summary,
            metadata: ReportMetadata {
                word_count,
                section_count: sections.len(),
                source_count: citations.source_count(),
            },
            sections,
            references,
            markdown,
            html,
        }
    }

    async fn executive_summary(&self, topic: &str, findings: &[String]) -> String {
        let findings_text = findings
            .iter()
            .take(5)
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Write a concise executive summary (150-200 words) for a professional report about "{topic}".

Key findings from research:
{findings_text}

Requirements:
- Summarize the main points and conclusions
- Professional tone
- 2-3 paragraphs
- No markdown headers
- Focus on insights and implications

Write the summary:"#
        );

        match self.llm.complete(&CompletionRequest::new(prompt, 0.5, 300)).await {
            Ok(completion) if !completion.text.trim().is_empty() => completion.text.trim().to_string(),
            Ok(_) | Err(_) => {
                warn!(topic, "Executive summary unavailable, using fallback");
                metrics::record_fallback("executive_summary");
                fallback_summary(topic)
            }
        }
    }
}

fn fallback_summary(topic: &str) -> String {
    format!(
        "This report examines {} based on recent research and analysis. The findings provide important insights into the current state and future directions of this field.",
        topic
    )
}
