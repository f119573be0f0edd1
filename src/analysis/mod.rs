//! Analysis modules.
//!
//! Per artifact: run the tools, derive suggestions from their output,
//! then rank the suggestions.

pub mod aggregator;
pub mod deriver;
pub mod ranker;
pub mod sentiment;

pub use aggregator::{failure_counts, suggestion_frequency, ResultAggregator};
pub use deriver::{default_marker_rules, MarkerRule, SuggestionDeriver};
pub use ranker::SuggestionRanker;

use crate::models::{Artifact, ArtifactReport, Tool};
use tracing::{debug, info};

/// The full per-artifact pipeline.
pub struct Analyzer {
    tools: Vec<Tool>,
    aggregator: ResultAggregator,
    deriver: SuggestionDeriver,
    ranker: SuggestionRanker,
}

impl Analyzer {
    pub fn new(
        tools: Vec<Tool>,
        aggregator: ResultAggregator,
        rules: Vec<MarkerRule>,
        ranker: SuggestionRanker,
    ) -> Self {
        let deriver = SuggestionDeriver::new(rules).with_tools(&tools);
        Self {
            tools,
            aggregator,
            deriver,
            ranker,
        }
    }

    /// Run, derive, and rank for one artifact.
    ///
    /// Ranking is skipped when nothing was derived.
    pub async fn analyze_artifact(&self, artifact: &Artifact) -> ArtifactReport {
        debug!("Analyzing {}", artifact.id);

        let results = self.aggregator.run_all(&self.tools, &artifact.path).await;
        let derived = self.deriver.derive(&results);
        let selection = self.ranker.rank(&derived).ok();

        if let Some(ref selection) = selection {
            info!(
                "{}: {} suggestion(s), best: {}",
                artifact.id,
                derived.len(),
                selection.best.text
            );
        }

        ArtifactReport {
            artifact_id: artifact.id.clone(),
            results,
            candidates: derived.into_iter().collect(),
            selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ToolInvoker;
    use crate::models::Outcome;
    use tempfile::TempDir;

    fn analyzer(tools: Vec<Tool>) -> Analyzer {
        Analyzer::new(
            tools,
            ResultAggregator::new(ToolInvoker::default(), 1),
            default_marker_rules(),
            SuggestionRanker::default(),
        )
    }

    fn artifact(dir: &TempDir, content: &str) -> Artifact {
        let path = dir.path().join("sample.py");
        std::fs::write(&path, content).unwrap();
        Artifact {
            id: "sample.py".to_string(),
            path,
        }
    }

    #[tokio::test]
    async fn test_markers_produce_a_selection() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact(&dir, "app.py:1:80: E501 line too long\n");
        let tools = vec![
            Tool::new("flake8", ["cat"]).with_family("style-checker"),
            Tool::new("mypy", ["toolrank-not-installed-xyz"]).with_family("type-checker"),
        ];

        let report = analyzer(tools).analyze_artifact(&artifact).await;

        assert_eq!(report.artifact_id, "sample.py");
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results.get("mypy"), Some(&Outcome::ToolNotFound));
        assert_eq!(
            report.candidates,
            vec!["fix style violations flagged by the style checker"]
        );
        let selection = report.selection.unwrap();
        assert_eq!(
            selection.best.text,
            "fix style violations flagged by the style checker"
        );
    }

    #[tokio::test]
    async fn test_clean_output_has_no_selection() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact(&dir, "all clean\n");
        let tools = vec![Tool::new("flake8", ["cat"]).with_family("style-checker")];

        let report = analyzer(tools).analyze_artifact(&artifact).await;

        assert!(report.results.get("flake8").unwrap().is_success());
        assert!(report.candidates.is_empty());
        assert!(report.selection.is_none());
    }

    #[test]
    fn test_unmarked_output_cannot_be_ranked() {
        let mut results = crate::models::ResultSet::new();
        results.insert(
            "style-checker",
            Outcome::Success {
                stdout: "no findings".to_string(),
            },
        );

        let derived = SuggestionDeriver::default().derive(&results);
        assert!(derived.is_empty());
        assert_eq!(
            SuggestionRanker::default().rank(&derived),
            Err(crate::error::RankError::EmptyCandidateSet)
        );
    }

    #[tokio::test]
    async fn test_all_tools_missing() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact(&dir, "E501\n");
        let tools = vec![
            Tool::new("a", ["toolrank-missing-a"]),
            Tool::new("b", ["toolrank-missing-b"]),
        ];

        let report = analyzer(tools).analyze_artifact(&artifact).await;

        assert!(report
            .results
            .iter()
            .all(|(_, outcome)| *outcome == Outcome::ToolNotFound));
        assert!(report.selection.is_none());
    }
}
