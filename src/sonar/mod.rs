//! Quality-gate bridge.
//!
//! Runs an external scanner with a transient properties file, then polls
//! the quality-gate endpoint. The result is an ordinary [`Outcome`], so
//! the gate flows through derivation and ranking like any local tool.

use crate::invoker::ToolInvoker;
use crate::models::{Outcome, QualityGate, Tool};
use crate::source::validate_url;
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Name of the transient scanner configuration file.
const PROPERTIES_FILE: &str = "sonar-project.properties";

pub struct SonarBridge<'a> {
    gate: &'a QualityGate,
    network_timeout: Duration,
}

impl<'a> SonarBridge<'a> {
    pub fn new(gate: &'a QualityGate, network_timeout: Duration) -> Self {
        Self {
            gate,
            network_timeout,
        }
    }

    /// Scan `artifact` and report the gate status.
    pub async fn run(
        &self,
        invoker: &ToolInvoker,
        tool: &Tool,
        artifact: &Path,
        timeout: Duration,
    ) -> Outcome {
        // Reject a malformed endpoint before touching the network or a process.
        if let Err(e) = validate_url(&self.gate.gate_url) {
            warn!("{}: {}", tool.name, e);
            return Outcome::ExecutionFailed {
                detail: e.to_string(),
            };
        }

        let workspace = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                return Outcome::ExecutionFailed {
                    detail: format!("failed to create scanner workspace: {}", e),
                }
            }
        };

        let properties = workspace.path().join(PROPERTIES_FILE);
        if let Err(e) = std::fs::write(&properties, self.properties(artifact)) {
            return Outcome::ExecutionFailed {
                detail: format!("failed to write {}: {}", properties.display(), e),
            };
        }

        let mut argv = tool.args.clone();
        argv.push(format!("-Dproject.settings={}", properties.display()));

        match invoker.run_command(&tool.name, &argv, timeout).await {
            Outcome::Success { .. } => {}
            other => {
                debug!("{} scanner did not succeed: {}", tool.name, other);
                return other;
            }
        }

        self.poll_gate().await
    }

    /// Scanner configuration pointing at the artifact.
    fn properties(&self, artifact: &Path) -> String {
        let mut content = String::new();
        content.push_str(&format!("sonar.projectKey={}\n", self.gate.project_key));
        content.push_str(&format!("sonar.sources={}\n", artifact.display()));
        content.push_str(&format!("sonar.host.url={}\n", self.gate.host_url));
        if !self.gate.token.is_empty() {
            content.push_str(&format!("sonar.token={}\n", self.gate.token));
        }
        content
    }

    /// GET the gate endpoint with basic auth; 200 + JSON is the only success.
    async fn poll_gate(&self) -> Outcome {
        let client = match reqwest::Client::builder()
            .timeout(self.network_timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                return Outcome::ExecutionFailed {
                    detail: format!("failed to create HTTP client: {}", e),
                }
            }
        };

        info!("Polling quality gate: {}", self.gate.gate_url);

        let response = match client
            .get(&self.gate.gate_url)
            .basic_auth(&self.gate.token, Some(""))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!(
                        "quality gate timed out after {}s",
                        self.network_timeout.as_secs()
                    )
                } else if e.is_connect() {
                    format!("cannot connect to quality gate at {}", self.gate.gate_url)
                } else {
                    format!("quality gate request failed: {}", e)
                };
                return Outcome::ExecutionFailed { detail };
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Outcome::ExecutionFailed {
                detail: format!("quality gate returned HTTP {}: {}", status, body),
            };
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => Outcome::Success {
                stdout: serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
            },
            Err(e) => Outcome::ExecutionFailed {
                detail: format!("quality gate returned malformed JSON: {}", e),
            },
        }
    }
}
