//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::source::SourceSpec;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// toolrank - run code analyzers and rank their suggestions
///
/// Runs a configurable battery of analysis tools against every artifact,
/// derives improvement suggestions from their output, and picks the best
/// one per artifact.
///
/// Examples:
///   toolrank --local ./src
///   toolrank --url https://example.com/script.py
///   toolrank --repo https://github.com/owner/repo.git --format json
///   toolrank --local ./src --tools flake8,mypy --concurrency 2
///   toolrank --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(group(
    ArgGroup::new("source")
        .args(["local", "url", "repo"])
        .multiple(false)
))]
pub struct Args {
    /// Local file or directory to analyze
    #[arg(long, value_name = "PATH")]
    pub local: Option<PathBuf>,

    /// URL of a single file to download and analyze
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Git repository to clone and analyze
    ///
    /// Supports HTTPS URLs (e.g., https://github.com/owner/repo.git) and git@ remotes.
    #[arg(short, long, value_name = "URL")]
    pub repo: Option<String>,

    /// Specific branch to clone
    ///
    /// If not specified, uses the default branch
    #[arg(short, long, value_name = "BRANCH", requires = "repo")]
    pub branch: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .toolrank.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write one assistant prompt per artifact with a selected suggestion
    #[arg(long, value_name = "FILE")]
    pub prompts: Option<PathBuf>,

    /// Number of tools run at once for one artifact
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Per-tool timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run only these tools (comma-separated names)
    ///
    /// Example: --tools flake8,mypy,sonar
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub tools: Option<Vec<String>>,

    /// Enable the quality-gate pseudo-tool
    #[arg(long)]
    pub sonar: bool,

    /// Token for the quality-gate server
    #[arg(long, env = "SONAR_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub sonar_token: Option<String>,

    /// File extensions to include (comma-separated)
    ///
    /// Example: --extensions py,pyi
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Patterns to exclude from analysis (comma-separated)
    ///
    /// Example: --exclude "tests,migrations"
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Maximum number of files to analyze
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Exit with code 2 if any artifact received a suggestion
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_suggestions: bool,

    /// Dry run: acquire and list artifacts without running any tool
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .toolrank.toml configuration file
    #[arg(long, exclusive = true)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The selected source, if any.
    pub fn source_spec(&self) -> Option<SourceSpec> {
        if let Some(ref local) = self.local {
            return Some(SourceSpec::Local(local.clone()));
        }
        if let Some(ref url) = self.url {
            return Some(SourceSpec::Url(url.clone()));
        }
        self.repo.as_ref().map(|url| SourceSpec::Repository {
            url: url.clone(),
            branch: self.branch.clone(),
        })
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.source_spec().is_none() {
            return Err("One of --local, --url or --repo is required".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(ref tools) = self.tools {
            if tools.iter().all(|name| name.trim().is_empty()) {
                return Err("--tools needs at least one tool name".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("toolrank").chain(args.iter().copied()))
    }

    #[test]
    fn test_source_spec() {
        let args = parse(&["--local", "src"]);
        assert_eq!(
            args.source_spec(),
            Some(SourceSpec::Local(PathBuf::from("src")))
        );

        let args = parse(&["--repo", "https://github.com/o/r.git", "--branch", "dev"]);
        assert_eq!(
            args.source_spec(),
            Some(SourceSpec::Repository {
                url: "https://github.com/o/r.git".to_string(),
                branch: Some("dev".to_string()),
            })
        );
    }

    #[test]
    fn test_sources_are_exclusive() {
        let result = Args::try_parse_from([
            "toolrank",
            "--local",
            ".",
            "--url",
            "https://example.com/a.py",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_is_required() {
        assert!(parse(&[]).validate().is_err());
        assert!(parse(&["--init-config"]).validate().is_ok());
    }

    #[test]
    fn test_tool_list_is_comma_separated() {
        let args = parse(&["--local", ".", "--tools", "flake8,mypy"]);
        assert_eq!(
            args.tools,
            Some(vec!["flake8".to_string(), "mypy".to_string()])
        );
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["--local", ".", "-v", "-q"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        assert!(parse(&["--local", ".", "--concurrency", "0"])
            .validate()
            .is_err());
        assert!(parse(&["--local", ".", "--timeout", "0"]).validate().is_err());
        assert!(parse(&["--local", ".", "--timeout", "5"]).validate().is_ok());
    }
}
