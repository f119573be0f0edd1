//! Picking the best suggestion.
//!
//! Scores are computed on the suggestion text:
//! `sentiment - error_flag - line_count / 10`, where `error_flag` is 1
//! unless the text mentions "print".

use crate::analysis::sentiment::{LexiconSentiment, SentimentAnalyzer};
use crate::error::RankError;
use crate::models::{RankedSelection, SuggestionCandidate};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct SuggestionRanker {
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl Default for SuggestionRanker {
    fn default() -> Self {
        Self::new(Arc::new(LexiconSentiment))
    }
}

impl SuggestionRanker {
    pub fn new(sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        Self { sentiment }
    }

    /// Compute the ranking metrics for one suggestion.
    pub fn candidate(&self, text: &str) -> SuggestionCandidate {
        SuggestionCandidate {
            text: text.to_string(),
            clarity_penalty: text.lines().count(),
            error_flag: u8::from(!text.contains("print")),
            sentiment: self.sentiment.polarity(text).clamp(-1.0, 1.0),
        }
    }

    /// Select the highest-scoring candidate.
    ///
    /// Ties keep the lexicographically first candidate.
    pub fn rank(&self, candidates: &BTreeSet<String>) -> Result<RankedSelection, RankError> {
        let scored: Vec<SuggestionCandidate> =
            candidates.iter().map(|text| self.candidate(text)).collect();

        let mut best: Option<&SuggestionCandidate> = None;
        for candidate in &scored {
            if best.map_or(true, |current| candidate.score() > current.score()) {
                best = Some(candidate);
            }
        }

        let best = best.cloned().ok_or(RankError::EmptyCandidateSet)?;
        Ok(RankedSelection {
            best,
            candidates: scored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fixed polarities for exact score checks.
    struct FixedSentiment(HashMap<String, f64>);

    impl SentimentAnalyzer for FixedSentiment {
        fn polarity(&self, text: &str) -> f64 {
            self.0.get(text).copied().unwrap_or(0.0)
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixed(pairs: &[(&str, f64)]) -> SuggestionRanker {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        SuggestionRanker::new(Arc::new(FixedSentiment(map)))
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let ranker = SuggestionRanker::default();
        assert_eq!(
            ranker.rank(&BTreeSet::new()),
            Err(RankError::EmptyCandidateSet)
        );
    }

    #[test]
    fn test_singleton_always_selected() {
        let ranker = SuggestionRanker::default();
        let only = "fix style violations flagged by the style checker";

        let selection = ranker.rank(&set(&[only])).unwrap();
        assert_eq!(selection.best.text, only);
        assert_eq!(selection.candidates.len(), 1);
    }

    #[test]
    fn test_shorter_candidate_wins_on_equal_sentiment() {
        let ranker = fixed(&[("A", 0.5), ("B\nB\nB", 0.5)]);

        let selection = ranker.rank(&set(&["A", "B\nB\nB"])).unwrap();
        assert_eq!(selection.best.text, "A");

        let scores: Vec<f64> = selection.candidates.iter().map(|c| c.score()).collect();
        assert!((scores[0] - (-0.6)).abs() < 1e-9);
        assert!((scores[1] - (-0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_print_clears_error_flag() {
        let ranker = fixed(&[]);

        let candidate = ranker.candidate("remove the debug print call");
        assert_eq!(candidate.error_flag, 0);
        assert_eq!(candidate.clarity_penalty, 1);

        let selection = ranker
            .rank(&set(&["address security findings", "remove the debug print call"]))
            .unwrap();
        assert_eq!(selection.best.text, "remove the debug print call");
    }

    #[test]
    fn test_ties_go_to_lexicographic_first() {
        let ranker = fixed(&[]);

        let selection = ranker.rank(&set(&["zeta", "alpha", "mid"])).unwrap();
        assert_eq!(selection.best.text, "alpha");
        let order: Vec<_> = selection.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let ranker = SuggestionRanker::default();
        let candidates = set(&[
            "update vulnerable dependencies",
            "address security findings",
            "reduce cyclomatic complexity in flagged functions",
        ]);

        let first = ranker.rank(&candidates).unwrap();
        let second = ranker.rank(&candidates.iter().rev().cloned().collect()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sentiment_is_clamped() {
        let ranker = fixed(&[("loud", 5.0)]);
        assert_eq!(ranker.candidate("loud").sentiment, 1.0);
    }
}
