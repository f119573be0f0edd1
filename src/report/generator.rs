//! Markdown, JSON, and prompt report generation.
//!
//! This module renders the per-artifact results of a run.

use crate::analysis::{failure_counts, suggestion_frequency};
use crate::models::{ArtifactReport, Outcome, OutcomeSummary, Report, ReportMetadata};
use anyhow::Result;

/// Tool output longer than this is cut in reports and prompts.
const MAX_OUTPUT_LINES: usize = 40;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# toolrank Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.summary, &report.artifacts));
    output.push_str(&generate_artifacts_section(&report.artifacts));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let tools: Vec<String> = metadata.tools.iter().map(|t| format!("`{}`", t)).collect();
    section.push_str(&format!("- **Tools:** {}\n", tools.join(", ")));
    section.push_str(&format!(
        "- **Artifacts Analyzed:** {}\n",
        metadata.artifacts_analyzed
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn anchor(id: &str) -> String {
    id.replace(['/', '.', ' ', ':'], "-").to_lowercase()
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Results by Artifact](#results-by-artifact)\n");

    for artifact in &report.artifacts {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            artifact.artifact_id,
            anchor(&artifact.artifact_id)
        ));
    }

    toc.push('\n');

    toc
}

/// Generate the summary section.
fn generate_summary_section(summary: &OutcomeSummary, artifacts: &[ArtifactReport]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    section.push_str("### Tool Outcomes\n\n");
    section.push_str("| ✅ Success | ❔ Not Found | ❌ Failed | ⏱️ Timed Out | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.succeeded, summary.not_found, summary.failed, summary.timed_out, summary.total
    ));

    section.push_str(&format!(
        "**Artifacts with suggestions:** {} of {}\n\n",
        summary.artifacts_with_suggestions,
        artifacts.len()
    ));

    let suggestions = suggestion_frequency(artifacts);
    if !suggestions.is_empty() {
        section.push_str("### Most Frequent Suggestions\n\n");
        section.push_str("| Suggestion | Artifacts |\n");
        section.push_str("|:---|:---:|\n");

        for (suggestion, count) in suggestions {
            section.push_str(&format!("| {} | {} |\n", suggestion, count));
        }
        section.push('\n');
    }

    let failures = failure_counts(artifacts);
    if !failures.is_empty() {
        section.push_str("### Tools Without Success\n\n");
        section.push_str("| Tool | Artifacts |\n");
        section.push_str("|:---|:---:|\n");

        for (tool, count) in failures {
            section.push_str(&format!("| `{}` | {} |\n", tool, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-artifact section.
fn generate_artifacts_section(artifacts: &[ArtifactReport]) -> String {
    let mut section = String::new();

    section.push_str("## Results by Artifact\n\n");

    if artifacts.is_empty() {
        section.push_str("No artifacts were analyzed.\n\n");
        return section;
    }

    for artifact in artifacts {
        section.push_str(&generate_artifact_block(artifact));
    }

    section
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let mut lines = text.lines();
    let kept: Vec<&str> = lines.by_ref().take(max_lines).collect();
    let rest = lines.count();

    let mut out = kept.join("\n");
    if rest > 0 {
        out.push_str(&format!("\n... ({} more lines)", rest));
    }
    out
}

/// Generate the block for one artifact.
fn generate_artifact_block(artifact: &ArtifactReport) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {} {{#{}}}\n\n",
        artifact.artifact_id,
        anchor(&artifact.artifact_id)
    ));

    block.push_str("| Tool | Outcome |\n");
    block.push_str("|:---|:---|\n");
    for (tool, outcome) in artifact.results.iter() {
        block.push_str(&format!("| `{}` | {} {} |\n", tool, outcome.emoji(), outcome));
    }
    block.push('\n');

    for (tool, outcome) in artifact.results.iter() {
        let Some(text) = outcome.scannable_text() else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        block.push_str(&format!(
            "<details>\n<summary>Output of {}</summary>\n\n```\n",
            tool
        ));
        block.push_str(&truncate_lines(text.trim_end(), MAX_OUTPUT_LINES));
        block.push_str("\n```\n</details>\n\n");
    }

    if artifact.candidates.is_empty() {
        block.push_str("No suggestions.\n\n");
    } else {
        block.push_str("**Suggestions:**\n\n");
        for suggestion in &artifact.candidates {
            block.push_str(&format!("- {}\n", suggestion));
        }
        block.push('\n');
    }

    if let Some(ref selection) = artifact.selection {
        let best = &selection.best;
        block.push_str(&format!("> 💡 **Best suggestion:** {}\n", best.text));
        block.push_str(&format!(
            "> score {:.3} (sentiment {:.3}, error flag {}, lines {})\n\n",
            best.score(),
            best.sentiment,
            best.error_flag,
            best.clarity_penalty
        ));
    }

    block.push_str("---\n\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!("*Report generated by toolrank v{}*\n", env!("CARGO_PKG_VERSION"))
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// One assistant prompt per artifact that has a selected suggestion.
pub fn generate_prompts(report: &Report) -> String {
    report
        .artifacts
        .iter()
        .filter_map(generate_prompt)
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

fn generate_prompt(artifact: &ArtifactReport) -> Option<String> {
    let selection = artifact.selection.as_ref()?;
    let mut prompt = String::new();

    prompt.push_str(&format!("## {}\n\n", artifact.artifact_id));
    prompt.push_str(&format!(
        "Improve the code in `{}`: {}.\n\n",
        artifact.artifact_id, selection.best.text
    ));

    let failing: Vec<(&str, &str)> = artifact
        .results
        .iter()
        .filter_map(|(tool, outcome)| match outcome {
            Outcome::ExecutionFailed { detail } if !detail.trim().is_empty() => {
                Some((tool, detail.as_str()))
            }
            _ => None,
        })
        .collect();

    if !failing.is_empty() {
        prompt.push_str("The following tools reported problems:\n\n");
        for (tool, detail) in failing {
            prompt.push_str(&format!(
                "{}:\n```\n{}\n```\n\n",
                tool,
                truncate_lines(detail.trim_end(), MAX_OUTPUT_LINES)
            ));
        }
    }

    if selection.candidates.len() > 1 {
        prompt.push_str("Other suggestions for this file:\n");
        for candidate in &selection.candidates {
            if candidate.text != selection.best.text {
                prompt.push_str(&format!("- {}\n", candidate.text));
            }
        }
        prompt.push('\n');
    }

    Some(prompt)
}
