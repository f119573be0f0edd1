//! Data models for the tool runner.
//!
//! This module contains the core data structures shared across the
//! pipeline: configured tools, per-tool outcomes, result sets, ranked
//! suggestions, and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a tool produces its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    /// A local executable run against the artifact path.
    Command,
    /// An external scanner followed by a quality-gate HTTP poll.
    QualityGate(QualityGate),
}

/// Connection settings for the quality-gate bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityGate {
    /// Server the scanner uploads to.
    pub host_url: String,
    /// Endpoint returning the gate status as JSON.
    pub gate_url: String,
    /// Project key written into the scanner properties.
    pub project_key: String,
    /// Token used as the basic-auth user name.
    pub token: String,
}

/// A configured external analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Unique name within a run.
    pub name: String,
    /// Argument vector without the target path (appended at call time).
    pub args: Vec<String>,
    /// Marker-table family. Falls back to the tool name.
    pub family: Option<String>,
    /// Per-tool wall-clock limit. Falls back to the invoker default.
    pub timeout: Option<Duration>,
    pub kind: ToolKind,
}

impl Tool {
    /// Create a plain command tool.
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            family: None,
            timeout: None,
            kind: ToolKind::Command,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    /// The executable named by the argument vector.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Family used to look up markers.
    pub fn family(&self) -> &str {
        self.family.as_deref().unwrap_or(&self.name)
    }
}

/// Result of invoking one tool against one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Exit status zero.
    Success { stdout: String },
    /// The executable could not be located.
    ToolNotFound,
    /// Non-zero exit or a start failure other than "not found".
    ExecutionFailed { detail: String },
    /// The wall-clock limit was exceeded and the child was killed.
    TimedOut,
}

impl Outcome {
    /// Text that may carry markers, if any.
    ///
    /// Failed runs are scanned too: several analyzers report findings
    /// through a non-zero exit.
    pub fn scannable_text(&self) -> Option<&str> {
        match self {
            Outcome::Success { stdout } => Some(stdout),
            Outcome::ExecutionFailed { detail } => Some(detail),
            Outcome::ToolNotFound | Outcome::TimedOut => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Returns an emoji representation of the outcome.
    pub fn emoji(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "✅",
            Outcome::ToolNotFound => "❔",
            Outcome::ExecutionFailed { .. } => "❌",
            Outcome::TimedOut => "⏱️",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { .. } => write!(f, "Success"),
            Outcome::ToolNotFound => write!(f, "Tool not found"),
            Outcome::ExecutionFailed { .. } => write!(f, "Execution failed"),
            Outcome::TimedOut => write!(f, "Timed out"),
        }
    }
}

/// One entry of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Outcomes for one artifact, keyed by tool name, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: Vec<ToolResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome. Returns `false` and leaves the set untouched if
    /// the tool already has an entry.
    pub fn insert(&mut self, tool: impl Into<String>, outcome: Outcome) -> bool {
        let tool = tool.into();
        if self.get(&tool).is_some() {
            return false;
        }
        self.entries.push(ToolResult { tool, outcome });
        true
    }

    pub fn get(&self, tool: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|entry| entry.tool == tool)
            .map(|entry| &entry.outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.entries
            .iter()
            .map(|entry| (entry.tool.as_str(), &entry.outcome))
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.tool.as_str()).collect()
    }
}

/// A suggestion together with the metrics used to rank it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    pub text: String,
    /// Line count of the text.
    pub clarity_penalty: usize,
    /// 1 when the text does not mention "print", else 0.
    pub error_flag: u8,
    /// Polarity in [-1.0, 1.0].
    pub sentiment: f64,
}

impl SuggestionCandidate {
    /// `sentiment - error_flag - clarity_penalty / 10`
    pub fn score(&self) -> f64 {
        self.sentiment - f64::from(self.error_flag) - self.clarity_penalty as f64 / 10.0
    }
}

/// The winning candidate and the sorted candidates it was picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSelection {
    pub best: SuggestionCandidate,
    pub candidates: Vec<SuggestionCandidate>,
}

/// An input file handed to the tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Display identifier (relative path or URL).
    pub id: String,
    /// Path the tools are run against.
    pub path: std::path::PathBuf,
}

/// Everything produced for a single artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub artifact_id: String,
    pub results: ResultSet,
    /// Deduplicated, lexicographically sorted suggestions.
    pub candidates: Vec<String>,
    /// `None` when no suggestion was derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<RankedSelection>,
}

/// Outcome counts across all artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub artifacts_with_suggestions: usize,
}

impl OutcomeSummary {
    pub fn from_artifacts(artifacts: &[ArtifactReport]) -> Self {
        let mut summary = Self::default();

        for artifact in artifacts {
            if !artifact.candidates.is_empty() {
                summary.artifacts_with_suggestions += 1;
            }
            for (_, outcome) in artifact.results.iter() {
                summary.total += 1;
                match outcome {
                    Outcome::Success { .. } => summary.succeeded += 1,
                    Outcome::ToolNotFound => summary.not_found += 1,
                    Outcome::ExecutionFailed { .. } => summary.failed += 1,
                    Outcome::TimedOut => summary.timed_out += 1,
                }
            }
        }

        summary
    }
}

/// Metadata about the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Local path, URL, or repository the artifacts came from.
    pub source: String,
    pub analysis_date: DateTime<Utc>,
    /// Configured tool names, in order.
    pub tools: Vec<String>,
    pub artifacts_analyzed: usize,
    pub duration_seconds: f64,
}

/// The complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: OutcomeSummary,
    pub artifacts: Vec<ArtifactReport>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, artifacts: Vec<ArtifactReport>) -> Self {
        let summary = OutcomeSummary::from_artifacts(&artifacts);
        Self {
            metadata,
            summary,
            artifacts,
        }
    }
}
