//! Git repository cloning functionality.
//!
//! Clones a remote repository into a caller-owned directory using the
//! git2 library. The caller decides the directory's lifetime.

use git2::{FetchOptions, Progress, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info};

/// Options for cloning a repository.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch to checkout (None for default branch).
    pub branch: Option<String>,
    /// Depth for shallow clone (None for full clone).
    pub depth: Option<i32>,
    /// Whether to show progress.
    pub show_progress: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            branch: None,
            depth: Some(1),
            show_progress: true,
        }
    }
}

/// Whether `url` looks like something git can clone.
pub fn is_clone_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("git@")
}

/// Clone `url` into `target`, which must be empty or absent.
pub fn clone_into(url: &str, target: &Path, options: &CloneOptions) -> Result<Repository, git2::Error> {
    info!("Cloning repository: {}", url);
    debug!("Clone target: {}", target.display());

    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let mut callbacks = RemoteCallbacks::new();

    callbacks.transfer_progress(move |progress: Progress<'_>| {
        if let Some(ref pb) = pb_clone {
            pb.set_length(progress.total_objects() as u64);
            pb.set_position(progress.received_objects() as u64);
        }
        true
    });

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    if let Some(depth) = options.depth {
        fetch_opts.depth(depth);
    }

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);

    if let Some(ref branch) = options.branch {
        builder.branch(branch);
    }

    let result = builder.clone(url, target);

    if let Some(pb) = progress_bar {
        match result {
            Ok(_) => pb.finish_with_message("Clone complete"),
            Err(_) => pb.abandon(),
        }
    }

    let repo = result?;
    info!("Successfully cloned repository to: {}", target.display());
    Ok(repo)
}

/// Get the current commit hash (short form).
pub fn current_commit(repo: &Repository) -> Option<String> {
    repo.head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .map(|commit| commit.id().to_string()[..8].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_clone_url() {
        assert!(is_clone_url("https://github.com/psf/black.git"));
        assert!(is_clone_url("git@github.com:psf/black.git"));
        assert!(!is_clone_url("not-a-url"));
        assert!(!is_clone_url("ftp://example.com/repo"));
    }

    #[test]
    fn test_clone_options_default() {
        let opts = CloneOptions::default();
        assert!(opts.branch.is_none());
        assert_eq!(opts.depth, Some(1));
        assert!(opts.show_progress);
    }

    #[test]
    fn test_clone_local_repository() {
        let origin = TempDir::new().unwrap();
        let repo = Repository::init(origin.path()).unwrap();
        std::fs::write(origin.path().join("app.py"), "x = 1\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("app.py")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();

        let target = TempDir::new().unwrap();
        let dest = target.path().join("clone");
        let options = CloneOptions {
            depth: None,
            show_progress: false,
            ..CloneOptions::default()
        };
        let url = origin.path().to_string_lossy().into_owned();

        let cloned = clone_into(&url, &dest, &options).unwrap();
        assert!(dest.join("app.py").exists());
        assert_eq!(current_commit(&cloned).map(|c| c.len()), Some(8));
    }
}
