//! Resolving the artifacts a run operates on.
//!
//! A source is a local path, a single file URL, or a git repository. Remote
//! sources are materialized inside a temporary workspace that lives exactly
//! as long as the returned [`AcquiredSource`].

use crate::error::AcquireError;
use crate::models::Artifact;
use crate::repo::{self, CloneOptions};
use crate::scanner::{FileScanner, ScanConfig};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};
use url::Url;

/// File name used when a URL path has no usable last segment.
const FALLBACK_FILE_NAME: &str = "download.py";

/// Where the artifacts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Local(PathBuf),
    Url(String),
    Repository { url: String, branch: Option<String> },
}

impl SourceSpec {
    pub fn label(&self) -> String {
        match self {
            SourceSpec::Local(path) => path.display().to_string(),
            SourceSpec::Url(url) => url.clone(),
            SourceSpec::Repository { url, branch: None } => url.clone(),
            SourceSpec::Repository {
                url,
                branch: Some(branch),
            } => format!("{} ({})", url, branch),
        }
    }
}

/// Artifacts ready for analysis, plus the workspace holding them if remote.
#[derive(Debug)]
pub struct AcquiredSource {
    /// Human-readable origin, including the commit for clones.
    pub label: String,
    pub artifacts: Vec<Artifact>,
    /// Removed when this value drops.
    workspace: Option<TempDir>,
}

impl AcquiredSource {
    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_ref().map(|dir| dir.path())
    }
}

/// Check that `raw` parses and has both a scheme and a host.
pub fn validate_url(raw: &str) -> Result<Url, AcquireError> {
    let invalid = |reason: &str| AcquireError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme().is_empty() {
        return Err(invalid("missing scheme"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Resolves a [`SourceSpec`] into artifacts.
#[derive(Debug, Clone)]
pub struct SourceAcquirer {
    scan_config: ScanConfig,
    network_timeout: Duration,
    verify_head: bool,
    show_progress: bool,
}

impl SourceAcquirer {
    pub fn new(scan_config: ScanConfig, network_timeout: Duration) -> Self {
        Self {
            scan_config,
            network_timeout,
            verify_head: true,
            show_progress: false,
        }
    }

    /// Issue a HEAD request before downloading (on by default).
    pub fn with_head_check(mut self, verify_head: bool) -> Self {
        self.verify_head = verify_head;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn acquire(&self, spec: &SourceSpec) -> Result<AcquiredSource, AcquireError> {
        match spec {
            SourceSpec::Local(path) => self.acquire_local(path),
            SourceSpec::Url(url) => self.acquire_url(url).await,
            SourceSpec::Repository { url, branch } => {
                self.acquire_repository(url, branch.clone()).await
            }
        }
    }

    fn acquire_local(&self, path: &Path) -> Result<AcquiredSource, AcquireError> {
        if !path.exists() {
            return Err(AcquireError::NotFound(path.to_path_buf()));
        }

        let artifacts = if path.is_file() {
            vec![Artifact {
                id: path.display().to_string(),
                path: path.to_path_buf(),
            }]
        } else {
            self.scan_dir(path)?
        };

        info!("Found {} artifacts in {}", artifacts.len(), path.display());
        Ok(AcquiredSource {
            label: path.display().to_string(),
            artifacts,
            workspace: None,
        })
    }

    async fn acquire_url(&self, raw: &str) -> Result<AcquiredSource, AcquireError> {
        let url = validate_url(raw)?;

        let client = reqwest::Client::builder()
            .timeout(self.network_timeout)
            .build()
            .map_err(|e| request_error(raw, &e))?;

        if self.verify_head {
            debug!("Checking URL: {}", raw);
            let response = client
                .head(url.clone())
                .send()
                .await
                .map_err(|e| request_error(raw, &e))?;
            if response.status() != StatusCode::OK {
                return Err(AcquireError::Unreachable {
                    url: raw.to_string(),
                    reason: format!("HEAD returned HTTP {}", response.status()),
                });
            }
        }

        info!("Downloading {}", raw);
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(raw, &e))?;
        if response.status() != StatusCode::OK {
            return Err(AcquireError::HttpStatus {
                url: raw.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.text().await.map_err(|e| request_error(raw, &e))?;

        let workspace = TempDir::new()?;
        let path = workspace.path().join(file_name_from_url(&url));
        std::fs::write(&path, body)?;
        debug!("Saved download to {}", path.display());

        Ok(AcquiredSource {
            label: raw.to_string(),
            artifacts: vec![Artifact {
                id: raw.to_string(),
                path,
            }],
            workspace: Some(workspace),
        })
    }

    async fn acquire_repository(
        &self,
        raw: &str,
        branch: Option<String>,
    ) -> Result<AcquiredSource, AcquireError> {
        if !raw.starts_with("git@") {
            validate_url(raw)?;
        }
        if !repo::is_clone_url(raw) {
            return Err(AcquireError::InvalidUrl {
                url: raw.to_string(),
                reason: "repository URL must start with 'https://', 'http://' or 'git@'"
                    .to_string(),
            });
        }

        // Dropping the workspace on any early return removes the partial clone.
        let workspace = TempDir::new()?;
        let target = workspace.path().join("repo");

        let options = CloneOptions {
            branch,
            depth: Some(1),
            show_progress: self.show_progress,
        };
        let url = raw.to_string();
        let clone_target = target.clone();

        let commit = tokio::task::spawn_blocking(move || {
            repo::clone_into(&url, &clone_target, &options)
                .map(|repository| repo::current_commit(&repository))
        })
        .await
        .map_err(|e| AcquireError::Clone {
            url: raw.to_string(),
            reason: e.to_string(),
        })?
        .map_err(|e| AcquireError::Clone {
            url: raw.to_string(),
            reason: e.message().to_string(),
        })?;

        let artifacts = self.scan_dir(&target)?;
        let label = match commit {
            Some(commit) => format!("{}@{}", raw, commit),
            None => raw.to_string(),
        };

        info!("Found {} artifacts in {}", artifacts.len(), label);
        Ok(AcquiredSource {
            label,
            artifacts,
            workspace: Some(workspace),
        })
    }

    fn scan_dir(&self, root: &Path) -> Result<Vec<Artifact>, AcquireError> {
        let scanner = FileScanner::new(root.to_path_buf(), self.scan_config.clone());
        let files = scanner
            .scan()
            .map_err(|e| AcquireError::Io(std::io::Error::other(e.to_string())))?;

        Ok(files
            .into_iter()
            .map(|file| {
                debug!("Artifact {} ({} bytes)", file.path, file.size);
                Artifact {
                    id: file.path,
                    path: file.full_path,
                }
            })
            .collect())
    }
}

fn request_error(url: &str, e: &reqwest::Error) -> AcquireError {
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else {
        e.to_string()
    };
    AcquireError::Unreachable {
        url: url.to_string(),
        reason,
    }
}

/// Last non-empty path segment, or a fallback name.
fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|name| !name.contains(['/', '\\']) && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
