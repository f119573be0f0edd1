//! Error types for the fallible pipeline stages.
//!
//! Tool failures are not errors: they are ordinary `Outcome` values.
//! These types cover configuration, ranking, and source acquisition.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected tool configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate tool name in configuration: {0}")]
    DuplicateTool(String),

    #[error("tool '{0}' has an empty argument vector")]
    EmptyCommand(String),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Ranking was asked to choose from nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    #[error("cannot rank an empty candidate set")]
    EmptyCandidateSet,
}

/// Failure to obtain the artifacts for a run.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL is not reachable: {url} ({reason})")]
    Unreachable { url: String, reason: String },

    #[error("download of {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to clone {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
