//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.toolrank.toml` files.

use crate::analysis::{default_marker_rules, MarkerRule};
use crate::error::ConfigError;
use crate::models::{QualityGate, Tool, ToolKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".toolrank.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Tools run against every artifact, in order.
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolConfig>,

    /// Marker table used to derive suggestions.
    #[serde(default = "default_marker_rules")]
    pub markers: Vec<MarkerRule>,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Network settings for URL sources and the quality gate.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Quality-gate pseudo-tool.
    #[serde(default)]
    pub sonar: SonarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tools: default_tools(),
            markers: default_marker_rules(),
            scanner: ScannerConfig::default(),
            network: NetworkConfig::default(),
            sonar: SonarConfig::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of tools run at once for one artifact.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-tool timeout in seconds, unless the tool sets its own.
    #[serde(default = "default_tool_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
            timeout_seconds: default_tool_timeout(),
        }
    }
}

fn default_output() -> String {
    "toolrank_report.md".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_tool_timeout() -> u64 {
    120
}

/// One `[[tools]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,

    /// Program and leading arguments; the artifact path is appended.
    pub args: Vec<String>,

    /// Marker-table family. Defaults to the tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl ToolConfig {
    fn new(name: &str, args: &[&str], family: &str) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            family: Some(family.to_string()),
            timeout_seconds: None,
        }
    }

    pub fn to_tool(&self) -> Tool {
        let mut tool = Tool::new(self.name.clone(), self.args.iter().cloned());
        if let Some(ref family) = self.family {
            tool = tool.with_family(family.clone());
        }
        if let Some(seconds) = self.timeout_seconds {
            tool = tool.with_timeout(Duration::from_secs(seconds));
        }
        tool
    }
}

fn default_tools() -> Vec<ToolConfig> {
    vec![
        ToolConfig::new("flake8", &["flake8"], "style-checker"),
        ToolConfig::new("pylint", &["pylint"], "linter"),
        ToolConfig::new("bandit", &["bandit"], "security-scanner"),
        ToolConfig::new("mypy", &["mypy"], "type-checker"),
        ToolConfig::new("black", &["black", "--check"], "formatter"),
        ToolConfig::new("isort", &["isort", "--check-only", "--diff"], "import-sorter"),
        ToolConfig::new("pydocstyle", &["pydocstyle"], "docstring-checker"),
        ToolConfig::new("pip-audit", &["pip-audit"], "dependency-auditor"),
        ToolConfig::new("xenon", &["xenon"], "complexity-analyzer"),
    ]
}

/// File scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum files to analyze.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Patterns to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    100
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git",
        "node_modules",
        "dist",
        "build",
        "__pycache__",
        ".venv",
        "venv",
        ".tox",
        ".mypy_cache",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Timeout for downloads and quality-gate requests.
    #[serde(default = "default_network_timeout")]
    pub timeout_seconds: u64,

    /// Require a 200 response to HEAD before downloading a URL source.
    #[serde(default = "default_true")]
    pub verify_head: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_network_timeout(),
            verify_head: true,
        }
    }
}

fn default_network_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Quality-gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Tool name used in result sets.
    #[serde(default = "default_sonar_name")]
    pub name: String,

    /// Scanner program and arguments.
    #[serde(default = "default_scanner_args")]
    pub scanner_args: Vec<String>,

    #[serde(default = "default_host_url")]
    pub host_url: String,

    /// Endpoint returning the project status as JSON.
    #[serde(default = "default_gate_url")]
    pub gate_url: String,

    #[serde(default = "default_project_key")]
    pub project_key: String,

    /// Falls back to `SONAR_TOKEN`.
    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: default_sonar_name(),
            scanner_args: default_scanner_args(),
            host_url: default_host_url(),
            gate_url: default_gate_url(),
            project_key: default_project_key(),
            token: String::new(),
            timeout_seconds: None,
        }
    }
}

fn default_sonar_name() -> String {
    "sonar".to_string()
}

fn default_scanner_args() -> Vec<String> {
    vec!["sonar-scanner".to_string()]
}

fn default_host_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_gate_url() -> String {
    "http://localhost:9000/api/qualitygates/project_status?projectKey=toolrank".to_string()
}

fn default_project_key() -> String {
    "toolrank".to_string()
}

impl SonarConfig {
    fn to_tool(&self) -> Tool {
        let gate = QualityGate {
            host_url: self.host_url.clone(),
            gate_url: self.gate_url.clone(),
            project_key: self.project_key.clone(),
            token: self.token.clone(),
        };

        let mut tool = Tool::new(self.name.clone(), self.scanner_args.iter().cloned())
            .with_family("quality-gate")
            .with_kind(ToolKind::QualityGate(gate));
        if let Some(seconds) = self.timeout_seconds {
            tool = tool.with_timeout(Duration::from_secs(seconds));
        }
        tool
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }
        if let Some(max_files) = args.max_files {
            self.scanner.max_files = max_files;
        }

        if args.sonar {
            self.sonar.enabled = true;
        }
        if let Some(ref token) = args.sonar_token {
            self.sonar.token = token.clone();
        }

        if let Some(ref names) = args.tools {
            self.select_tools(names);
        }
    }

    /// Keep only the named tools, in configured order.
    fn select_tools(&mut self, names: &[String]) {
        let known: HashSet<&str> = self
            .tools
            .iter()
            .map(|tool| tool.name.as_str())
            .chain(std::iter::once(self.sonar.name.as_str()))
            .collect();
        for name in names.iter().filter(|name| !known.contains(name.as_str())) {
            warn!("Unknown tool '{}' in --tools, ignoring", name);
        }

        self.tools.retain(|tool| names.contains(&tool.name));
        if !names.contains(&self.sonar.name) {
            self.sonar.enabled = false;
        }
    }

    /// Reject configurations the invoker could not honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let mut seen = HashSet::new();
        let sonar = self
            .sonar
            .enabled
            .then(|| (&self.sonar.name, &self.sonar.scanner_args));
        let entries = self
            .tools
            .iter()
            .map(|tool| (&tool.name, &tool.args))
            .chain(sonar);

        for (name, args) in entries {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateTool(name.clone()));
            }
            if args.is_empty() {
                return Err(ConfigError::EmptyCommand(name.clone()));
            }
        }

        Ok(())
    }

    /// The configured tools, quality gate last when enabled.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(ToolConfig::to_tool).collect();
        if self.sonar.enabled {
            tools.push(self.sonar.to_tool());
        }
        tools
    }

    /// Log level: `--quiet` wins, then `--verbose` or `general.verbose`.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if args.quiet {
            tracing::Level::ERROR
        } else if args.verbose || self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.general.timeout_seconds)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_seconds)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
