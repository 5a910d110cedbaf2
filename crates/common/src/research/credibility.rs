//! Source credibility heuristics
//!
//! The score is a nested running average rather than a mean of three:
//!
//! ```text
//! base    = (0.5 + domain) / 2
//! score   = (base + content) / 2
//! score  += 0.1 if the snippet carries a recency marker (capped at 1.0)
//! ```
//!
//! rounded to two decimals. Scoring is total on any input and never panics.

use crate::search::SearchResult;
use chrono::Datelike;

const TRUSTED_DOMAINS: &[&str] = &[
    "reuters.com",
    "bbc.com",
    "apnews.com",
    "bloomberg.com",
    "wsj.com",
    "nytimes.com",
    "theguardian.com",
    "techcrunch.com",
    "wired.com",
    "arstechnica.com",
    "theverge.com",
    "arxiv.org",
    "ieee.org",
    "acm.org",
    "nature.com",
    "science.org",
    ".gov",
    ".edu",
    ".org",
];

const MEDIUM_DOMAINS: &[&str] = &[
    "medium.com",
    "substack.com",
    "hackernoon.com",
    "coindesk.com",
    "cointelegraph.com",
    "decrypt.co",
];

const LOW_DOMAINS: &[&str] = &[
    "reddit.com",
    "twitter.com",
    "facebook.com",
    "quora.com",
    "stackoverflow.com",
];

const POSITIVE_FAMILIES: &[&[&str]] = &[
    &["research", "study", "analysis", "report"],
    &["expert", "professor", "scientist", "researcher"],
    &["data", "statistics", "findings", "results"],
];

const NEGATIVE_FAMILY: &[&str] = &["opinion", "rumor", "allegedly", "claims"];

const RECENCY_PHRASES: &[&str] = &["today", "yesterday", "this week", "this month"];

/// Reputation tier of a source's domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainTier {
    Trusted,
    Medium,
    Low,
    Unknown,
}

impl DomainTier {
    pub fn score(self) -> f64 {
        match self {
            DomainTier::Trusted => 0.9,
            DomainTier::Medium => 0.6,
            DomainTier::Low => 0.3,
            DomainTier::Unknown => 0.5,
        }
    }
}

/// Scores a single search result for trustworthiness and content quality
#[derive(Debug, Clone)]
pub struct CredibilityScorer {
    reference_year: i32,
}

impl Default for CredibilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CredibilityScorer {
    /// Scorer whose recency window is anchored on the current UTC year
    pub fn new() -> Self {
        Self::with_reference_year(chrono::Utc::now().year())
    }

    /// Scorer with a fixed recency window
    pub fn with_reference_year(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Credibility in [0, 1], rounded to two decimals
    pub fn score(&self, source: &SearchResult) -> f64 {
        let domain = classify_domain(&source.url).score();
        let base = (0.5 + domain) / 2.0;

        let content = content_score(&source.title, &source.snippet);
        let mut score = (base + content) / 2.0;

        if self.has_recency_marker(&source.snippet) {
            score += 0.1;
        }

        round2(score.clamp(0.0, 1.0))
    }

    fn has_recency_marker(&self, snippet: &str) -> bool {
        let text = snippet.to_lowercase();
        let years = [self.reference_year, self.reference_year - 1];

        years.iter().any(|year| text.contains(&year.to_string()))
            || RECENCY_PHRASES.iter().any(|phrase| text.contains(phrase))
    }
}

/// Classify a URL against the static domain tiers, trusted first
pub fn classify_domain(url: &str) -> DomainTier {
    let lowered = url.trim().to_lowercase();
    let host = reqwest::Url::parse(&lowered)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string));

    let matches = |domain: &str| match &host {
        Some(host) if domain.starts_with('.') => host.ends_with(domain),
        Some(host) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => lowered.contains(domain),
    };

    if TRUSTED_DOMAINS.iter().any(|d| matches(d)) {
        DomainTier::Trusted
    } else if MEDIUM_DOMAINS.iter().any(|d| matches(d)) {
        DomainTier::Medium
    } else if LOW_DOMAINS.iter().any(|d| matches(d)) {
        DomainTier::Low
    } else {
        DomainTier::Unknown
    }
}

/// Keyword-driven content quality in [0, 1]
pub fn content_score(title: &str, snippet: &str) -> f64 {
    let text = format!("{} {}", title, snippet).to_lowercase();
    let mut score = 0.5;

    for family in POSITIVE_FAMILIES {
        if family.iter().any(|word| text.contains(word)) {
            score += 0.1;
        }
    }

    if NEGATIVE_FAMILY.iter().any(|word| text.contains(word)) {
        score -= 0.1;
    }

    if title.contains('?') || text.contains("clickbait") {
        score -= 0.1;
    }

    f64::clamp(score, 0.0, 1.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
