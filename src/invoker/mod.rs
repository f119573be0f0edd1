//! Running a single external analyzer.
//!
//! Every expected failure mode (missing executable, non-zero exit, start
//! failure, timeout) comes back as an [`Outcome`] rather than an error.

use crate::models::{Outcome, Tool, ToolKind};
use crate::sonar::SonarBridge;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default wall-clock limit for one tool run.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Default limit for HTTP calls made by quality-gate tools.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of the `--version` availability probe.
#[derive(Debug)]
enum Probe {
    Available,
    Missing,
    Failed(String),
    TimedOut,
}

/// Runs tools against artifacts.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    default_timeout: Duration,
    network_timeout: Duration,
}

impl Default for ToolInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolInvoker {
    /// Create an invoker with the given default per-tool timeout.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Run `tool` against `artifact` and classify the result.
    pub async fn invoke(&self, tool: &Tool, artifact: &Path) -> Outcome {
        let timeout = tool.timeout.unwrap_or(self.default_timeout);
        debug!("Invoking {} on {}", tool.name, artifact.display());

        let outcome = match &tool.kind {
            ToolKind::Command if tool.program().is_none() => Outcome::ExecutionFailed {
                detail: format!("{}: empty command", tool.name),
            },
            ToolKind::Command => {
                let mut argv = tool.args.clone();
                argv.push(artifact.to_string_lossy().into_owned());
                self.run_command(&tool.name, &argv, timeout).await
            }
            ToolKind::QualityGate(gate) => {
                SonarBridge::new(gate, self.network_timeout)
                    .run(self, tool, artifact, timeout)
                    .await
            }
        };

        debug!("{} finished: {}", tool.name, outcome);
        outcome
    }

    /// Probe then execute a complete argument vector.
    ///
    /// `timeout` bounds the probe and the run together.
    pub(crate) async fn run_command(&self, name: &str, argv: &[String], timeout: Duration) -> Outcome {
        let deadline = Instant::now() + timeout;
        let Some((program, args)) = argv.split_first() else {
            return Outcome::ExecutionFailed {
                detail: format!("{}: empty command", name),
            };
        };

        match probe(program, deadline).await {
            Probe::Available => {}
            Probe::Missing => {
                debug!("{} is not installed or not on PATH", program);
                return Outcome::ToolNotFound;
            }
            Probe::Failed(detail) => return Outcome::ExecutionFailed { detail },
            Probe::TimedOut => {
                warn!("{} --version did not answer within {:?}", program, timeout);
                return Outcome::TimedOut;
            }
        }

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => return Outcome::ToolNotFound,
            Err(e) => {
                return Outcome::ExecutionFailed {
                    detail: format!("failed to start {}: {}", program, e),
                }
            }
        };

        let stdout = child.stdout.take().map(|out| tokio::spawn(read_stream(out)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(read_stream(err)));

        let waited = tokio::time::timeout_at(deadline, async {
            let status = child.wait().await;
            let stdout = join_stream(stdout).await;
            let stderr = join_stream(stderr).await;
            status.map(|status| (status, stdout, stderr))
        })
        .await;

        match waited {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    Outcome::Success { stdout }
                } else {
                    debug!("{} exited with {}", name, status);
                    Outcome::ExecutionFailed {
                        detail: combine_output(&stdout, &stderr),
                    }
                }
            }
            Ok(Err(e)) => Outcome::ExecutionFailed {
                detail: format!("failed to wait for {}: {}", program, e),
            },
            Err(_) => {
                warn!("{} timed out after {:?}, killing it", name, timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", program, e);
                }
                Outcome::TimedOut
            }
        }
    }
}

/// Lightweight availability check: `<program> --version`.
///
/// A probe that starts but exits non-zero still counts as available.
async fn probe(program: &str, deadline: Instant) -> Probe {
    let spawned = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => return Probe::Missing,
        Err(e) => return Probe::Failed(format!("failed to start {}: {}", program, e)),
    };

    let waited = tokio::time::timeout_at(deadline, child.wait()).await;
    match waited {
        Ok(_) => Probe::Available,
        Err(_) => {
            let _ = child.kill().await;
            Probe::TimedOut
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("Stopped reading child output: {}", e);
    }
    buf
}

async fn join_stream(handle: Option<tokio::task::JoinHandle<Vec<u8>>>) -> String {
    match handle {
        Some(handle) => {
            let bytes = handle.await.unwrap_or_default();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        None => String::new(),
    }
}

/// Stdout followed by stderr, separated by a newline when both are present.
fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, _) => stderr.to_string(),
        (false, true) => stdout.to_string(),
        (false, false) if stdout.ends_with('\n') => format!("{}{}", stdout, stderr),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("sample.py");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn shell(name: &str, script: &str) -> Tool {
        // `sh -c <script> sh <artifact>` keeps the appended path as $1.
        Tool::new(name, ["sh", "-c", script, "sh"])
    }

    #[tokio::test]
    async fn test_missing_executable_is_tool_not_found() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "x = 1\n");
        let tool = Tool::new("ghost", ["toolrank-definitely-not-installed-xyz"]);

        let outcome = ToolInvoker::default().invoke(&tool, &path).await;
        assert_eq!(outcome, Outcome::ToolNotFound);
    }

    #[tokio::test]
    async fn test_zero_exit_is_success_with_stdout() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "E501 line too long\n");
        let tool = Tool::new("style-checker", ["cat"]);

        let outcome = ToolInvoker::default().invoke(&tool, &path).await;
        assert_eq!(
            outcome,
            Outcome::Success {
                stdout: "E501 line too long\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_artifact_path_is_appended_last() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        let tool = shell("echo-arg", "printf '%s' \"$1\"");

        let outcome = ToolInvoker::default().invoke(&tool, &path).await;
        assert_eq!(
            outcome,
            Outcome::Success {
                stdout: path.to_string_lossy().into_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        let tool = shell("failing", "echo found issue; echo oops >&2; exit 3");

        let outcome = ToolInvoker::default().invoke(&tool, &path).await;
        assert_eq!(
            outcome,
            Outcome::ExecutionFailed {
                detail: "found issue\noops\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        let marker = dir.path().join("sample.py.done");
        let tool = shell("sleepy", "sleep 1; touch \"$1.done\"")
            .with_timeout(Duration::from_millis(300));

        let started = std::time::Instant::now();
        let outcome = ToolInvoker::default().invoke(&tool, &path).await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(1));

        // A surviving child would create the marker after its sleep.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_check_counts_against_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        // Every call, `--version` included, takes 0.7s: 1.4s in total.
        let script = dir.path().join("slow-tool");
        std::fs::write(&script, "#!/bin/sh\nsleep 0.7\necho done\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = Tool::new("slow", [script.to_string_lossy().into_owned()])
            .with_timeout(Duration::from_millis(1000));

        let started = std::time::Instant::now();
        let outcome = ToolInvoker::default().invoke(&tool, &path).await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert!(started.elapsed() < Duration::from_millis(1300));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_denied_is_execution_failed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        let script = dir.path().join("not-executable");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let tool = Tool::new("locked", [script.to_string_lossy().into_owned()]);
        let outcome = ToolInvoker::default().invoke(&tool, &path).await;

        assert!(matches!(outcome, Outcome::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_command_is_execution_failed() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "");
        let tool = Tool::new("empty", Vec::<String>::new());

        let outcome = ToolInvoker::default().invoke(&tool, &path).await;
        assert!(matches!(outcome, Outcome::ExecutionFailed { .. }));

        let outcome = ToolInvoker::default()
            .run_command("empty", &[], DEFAULT_TOOL_TIMEOUT)
            .await;
        assert!(matches!(outcome, Outcome::ExecutionFailed { .. }));
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output("", "err"), "err");
        assert_eq!(combine_output("out", ""), "out");
        assert_eq!(combine_output("out\n", "err"), "out\nerr");
        assert_eq!(combine_output("out", "err"), "out\nerr");
    }
}
