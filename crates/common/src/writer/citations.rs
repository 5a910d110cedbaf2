//! Citation Manager - numbered references for one report

use crate::research::ScoredSource;

/// Holds the sources of the report currently being written
#[derive(Debug, Clone, Default)]
pub struct CitationManager {
    sources: Vec<ScoredSource>,
}

impl CitationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current source list
    pub fn set_sources(&mut self, sources: Vec<ScoredSource>) {
        self.sources = sources;
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Render a markdown references section
    pub fn render(&self) -> String {
        if self.sources.is_empty() {
            return "## References\n\nNo sources cited.".to_string();
        }

        let mut lines = vec!["## References\n".to_string()];
        lines.extend(self.sources.iter().enumerate().map(|(i, s)| {
            let title = if s.source.title.is_empty() {
                "Untitled Source"
            } else {
                s.source.title.as_str()
            };
            let url = if s.source.url.is_empty() { "#" } else { s.source.url.as_str() };
            format!("{}. [{}]({})", i + 1, title, url)
        }));
        lines.join("\n")
    }
}
