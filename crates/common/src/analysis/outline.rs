//! Outline Generator - themes, gaps and overlaps into report sections

use super::Outline;
use crate::llm::parse::strip_code_fence;
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct OutlineGenerator {
    llm: Arc<dyn LlmClient>,
}

impl OutlineGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Generate a report outline; always at least one section
    pub async fn generate(
        &self,
        topic: &str,
        document_themes: &[String],
        research_themes: &[String],
        gaps: &[String],
        overlaps: &[String],
    ) -> Outline {
        let prompt = build_prompt(topic, document_themes, research_themes, gaps, overlaps);
        let request = CompletionRequest::new(prompt, 0.4, 600);

        let reply = match self.llm.complete(&request).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!(error = %e, topic, "Outline generation failed, using default outline");
                metrics::record_fallback("outline_generator");
                return Outline::fallback_for(topic);
            }
        };

        match parse_outline(&reply) {
            Some(outline) => outline,
            None => {
                debug!(topic, "Outline reply unusable, using default outline");
                metrics::record_fallback("outline_generator");
                Outline::fallback_for(topic)
            }
        }
    }
}

/// Parse an outline reply; `None` when malformed or without sections
fn parse_outline(reply: &str) -> Option<Outline> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(reply)).ok()?;
    Outline::from_value(&value).filter(|outline| !outline.sections.is_empty())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn build_prompt(
    topic: &str,
    document_themes: &[String],
    research_themes: &[String],
    gaps: &[String],
    overlaps: &[String],
) -> String {
    format!(
        r#"Create a structured outline for a comprehensive report on "{topic}".

Analysis Data:
- Document covers: {document}
- Research found: {research}
- Gaps to address: {gaps}
- Overlapping topics: {overlaps}

Requirements:
- Create 4-6 main sections for the report
- Each section should have a clear title
- Include 2-4 topics to cover in each section
- Mark priority as "high", "medium", or "low"
- Return ONLY valid JSON, no explanation

Format:
{{
  "sections": [
    {{
      "title": "Introduction",
      "topics": ["background", "scope"],
      "priority": "high"
    }}
  ]
}}

Your response:"#,
        document = document_themes.join(", "),
        research = research_themes.join(", "),
        gaps = join_or_none(gaps),
        overlaps = join_or_none(overlaps),
    )
}
