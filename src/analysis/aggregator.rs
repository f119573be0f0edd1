//! Outcome aggregation and cross-artifact statistics.
//!
//! Runs every configured tool against one artifact and collects the
//! outcomes in configured order, then offers a few summaries over the
//! per-artifact reports.

use crate::invoker::ToolInvoker;
use crate::models::{ArtifactReport, Outcome, ResultSet, Tool};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Runs a tool battery and builds one [`ResultSet`] per artifact.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    invoker: ToolInvoker,
    concurrency: usize,
}

impl ResultAggregator {
    /// `concurrency` bounds how many tools run at once; 1 means sequential.
    pub fn new(invoker: ToolInvoker, concurrency: usize) -> Self {
        Self {
            invoker,
            concurrency: concurrency.max(1),
        }
    }

    /// Invoke each tool once. Failures never stop the loop.
    ///
    /// Entries follow the order of `tools`, not completion order.
    pub async fn run_all(&self, tools: &[Tool], artifact: &Path) -> ResultSet {
        let outcomes: Vec<Outcome> = stream::iter(tools)
            .map(|tool| self.invoker.invoke(tool, artifact))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut results = ResultSet::new();
        for (tool, outcome) in tools.iter().zip(outcomes) {
            if !results.insert(tool.name.clone(), outcome) {
                warn!("Ignoring second outcome for duplicate tool {}", tool.name);
            }
        }
        results
    }
}

/// Tools that did not succeed, per tool name, across all artifacts.
pub fn failure_counts(artifacts: &[ArtifactReport]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for artifact in artifacts {
        for (tool, outcome) in artifact.results.iter() {
            if !outcome.is_success() {
                *counts.entry(tool.to_string()).or_default() += 1;
            }
        }
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// How often each suggestion was derived, most frequent first.
pub fn suggestion_frequency(artifacts: &[ArtifactReport]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for artifact in artifacts {
        for suggestion in &artifact.candidates {
            *counts.entry(suggestion.clone()).or_default() += 1;
        }
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
