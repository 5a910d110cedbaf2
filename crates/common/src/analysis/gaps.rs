//! Gap / overlap classification by word overlap

use super::ThemeSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum shared-word ratio for two themes to count as similar
const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Research themes split by whether the document covers them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub gaps: ThemeSet,
    pub overlaps: ThemeSet,
}

fn words(theme: &str) -> HashSet<String> {
    theme.split_whitespace().map(str::to_lowercase).collect()
}

/// Shared words over the shorter theme's word count, at least one half
pub fn is_similar(a: &str, b: &str) -> bool {
    let (wa, wb) = (words(a), words(b));
    if wa.is_empty() || wb.is_empty() {
        return false;
    }

    let shared = wa.intersection(&wb).count() as f64;
    shared / wa.len().min(wb.len()) as f64 >= SIMILARITY_THRESHOLD
}

/// Classify every research theme as a gap or an overlap, preserving order
pub fn compare(document_themes: &[String], research_themes: &[String]) -> GapAnalysis {
    let (overlaps, gaps) = research_themes
        .iter()
        .cloned()
        .partition(|theme| document_themes.iter().any(|doc| is_similar(theme, doc)));

    GapAnalysis { gaps, overlaps }
}
