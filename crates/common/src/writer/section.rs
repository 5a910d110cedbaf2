//! Rate-limited section generation
//!
//! One generator instance owns one "last call" timestamp. Every call waits
//! until at least `min_delay` has passed since the previous call started,
//! then asks the LLM for prose. Any failure produces templated text that
//! still opens with a `## ` heading.

use super::clock::{Clock, TokioClock};
use crate::analysis::SectionTopic;
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics;
use crate::research::ScoredSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Word target when the caller has no preference
pub const DEFAULT_WORD_TARGET: usize = 300;

/// Default minimum spacing between LLM calls
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(5);

const RESEARCH_CONTEXT_CHARS: usize = 1500;
const DOCUMENT_EXCERPT_CHARS: usize = 800;

/// Material shared by every section of one report
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    pub topic: &'a str,
    pub sources: &'a [ScoredSource],
    pub document_text: &'a str,
}

pub struct SectionGenerator {
    llm: Arc<dyn LlmClient>,
    clock: Arc<dyn Clock>,
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl SectionGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_clock(llm, Arc::new(TokioClock), DEFAULT_MIN_DELAY)
    }

    pub fn with_clock(llm: Arc<dyn LlmClient>, clock: Arc<dyn Clock>, min_delay: Duration) -> Self {
        Self {
            llm,
            clock,
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Generate markdown for one section; never empty
    pub async fn generate_section(
        &self,
        title: &str,
        topics: &[SectionTopic],
        context: &SectionContext<'_>,
        word_target: usize,
    ) -> String {
        self.wait_turn().await;

        let labels: Vec<&str> = topics.iter().map(SectionTopic::as_str).collect();
        let prompt = build_prompt(title, &labels, context, word_target);
        let request = CompletionRequest::new(prompt, 0.7, 800);

        debug!(section = title, "Generating section");
        match self.llm.complete(&request).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                let content = completion.text.trim();
                let content = if content.starts_with('#') {
                    content.to_string()
                } else {
                    format!("## {}\n\n{}", title, content)
                };
                info!(
                    section = title,
                    words = content.split_whitespace().count(),
                    "Section generated"
                );
                content
            }
            Ok(_) => {
                warn!(section = title, "Empty section reply, using fallback");
                metrics::record_fallback("section_generator");
                fallback_section(title, &labels, context.topic)
            }
            Err(e) => {
                warn!(section = title, error = %e, "Section generation failed, using fallback");
                metrics::record_fallback("section_generator");
                fallback_section(title, &labels, context.topic)
            }
        }
    }

    /// Block until the minimum delay since the previous call has passed
    async fn wait_turn(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_delay {
                let delay = self.min_delay - elapsed;
                debug!(sleep_ms = delay.as_millis() as u64, "Rate limiting section generation");
                self.clock.sleep(delay).await;
            }
        }

        *last_call = Some(self.clock.now());
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn research_context(sources: &[ScoredSource]) -> String {
    if sources.is_empty() {
        return "No research sources available".to_string();
    }

    let lines = sources
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, s)| {
            let title = if s.source.title.is_empty() {
                "Untitled"
            } else {
                s.source.title.as_str()
            };
            format!("{}. {}: {}", i + 1, title, s.source.snippet)
        })
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&lines, RESEARCH_CONTEXT_CHARS)
}

fn build_prompt(title: &str, topics: &[&str], context: &SectionContext<'_>, word_target: usize) -> String {
    let document = if context.document_text.is_empty() {
        "No document provided".to_string()
    } else {
        truncate_chars(context.document_text, DOCUMENT_EXCERPT_CHARS)
    };

    format!(
        r#"Write a professional report section about {topic}.

Section: {title}
Topics to cover: {topics}

Context from research:
{research}

Document excerpt:
{document}

Write a clear, professional section of approximately {word_target} words. Use markdown formatting. Be specific and informative.

Section content:"#,
        topic = context.topic,
        topics = topics.join(", "),
        research = research_context(context.sources),
    )
}

/// Deterministic section text used when the LLM gives nothing usable
pub fn fallback_section(title: &str, topics: &[&str], topic: &str) -> String {
    let title = if title.trim().is_empty() { "Untitled Section" } else { title };
    let topic = if topic.trim().is_empty() { "this topic" } else { topic };
    let (topics_text, first_topic) = match topics.first() {
        Some(first) => (topics.join(", "), *first),
        None => ("these topics".to_string(), "these topics"),
    };

    format!(
        "## {title}\n\n\
         This section examines {lower} in relation to {topic}. Key areas of focus include {topics_text}.\n\n\
         Research in this area indicates several important considerations. The available evidence suggests that these factors play a significant role in understanding the broader implications of {topic}.\n\n\
         Further analysis of {first_topic} reveals important insights that contribute to our overall understanding. These findings have practical implications for stakeholders and decision-makers working in this domain.\n\n\
         Additional research would be beneficial to fully explore the relationships between these factors and their long-term impacts.",
        lower = title.to_lowercase(),
    )
}
