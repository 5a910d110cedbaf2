//! Source ranking

use super::{CredibilityScorer, ScoredSource};
use crate::search::SearchResult;
use std::cmp::Ordering;

/// Scores and orders search results, best first
#[derive(Debug, Clone, Default)]
pub struct SourceRanker {
    scorer: CredibilityScorer,
}

impl SourceRanker {
    pub fn new(scorer: CredibilityScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &CredibilityScorer {
        &self.scorer
    }

    /// Score every result and stable-sort descending; ties keep input order
    pub fn rank(&self, sources: Vec<SearchResult>) -> Vec<ScoredSource> {
        let mut scored: Vec<ScoredSource> = sources
            .into_iter()
            .map(|source| ScoredSource {
                credibility_score: self.scorer.score(&source),
                source,
            })
            .collect();

        Self::sort(&mut scored);
        scored
    }

    /// Stable sort, best first
    pub fn sort(sources: &mut [ScoredSource]) {
        sources.sort_by(|a, b| {
            b.credibility_score
                .partial_cmp(&a.credibility_score)
                .unwrap_or(Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker() -> SourceRanker {
        SourceRanker::new(CredibilityScorer::with_reference_year(2025))
    }

    #[test]
    fn test_rank_orders_by_tier() {
        let ranked = ranker().rank(vec![
            SearchResult::new("https://reddit.com/r/a", "thread", ""),
            SearchResult::new("https://reuters.com/a", "story", ""),
            SearchResult::new("https://medium.com/a", "post", ""),
        ]);

        let urls: Vec<&str> = ranked.iter().map(|s| s.source.url.as_str()).collect();
        assert_eq!(urls, vec!["https://reuters.com/a", "https://medium.com/a", "https://reddit.com/r/a"]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let ranked = ranker().rank(vec![
            SearchResult::new("https://one.example", "first", ""),
            SearchResult::new("https://two.example", "second", ""),
            SearchResult::new("https://three.example", "third", ""),
        ]);

        let titles: Vec<&str> = ranked.iter().map(|s| s.source.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_non_increasing() {
        let ranked = ranker().rank(vec![
            SearchResult::new("https://x.com", "Opinion?", "rumor"),
            SearchResult::new("https://nature.com/a", "Study data", "today"),
            SearchResult::new("https://quora.com/q", "answer", ""),
            SearchResult::new("https://mit.edu/a", "expert report", ""),
        ]);

        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].credibility_score >= pair[1].credibility_score));
    }

    #[test]
    fn test_rank_empty() {
        assert!(ranker().rank(Vec::new()).is_empty());
    }
}
