//! Minimal git context detection: is `dir` inside a git repository, and if
//! so, what's its `origin` remote and the path relative to the repo root?
//!
//! Invokes `git` as a subprocess and reads stdout, reduced to the two
//! read-only queries the scope matcher needs, each bounded by its own
//! short timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(5);

/// `(normalized_repo_url, repo_relative_path)` for `dir`, or `(None, None)`
/// if `dir` isn't inside a git repository or has no `origin` remote.
pub async fn current_repo_context(dir: &Path) -> (Option<String>, Option<String>) {
    let Some(toplevel) = run_git(dir, &["rev-parse", "--show-toplevel"]).await else {
        return (None, None);
    };
    let toplevel = PathBuf::from(toplevel.trim());
    let remote = run_git(dir, &["remote", "get-url", "origin"]).await;
    let repo_url = remote.map(|s| crate::scope::normalize_repo_url(s.trim()));
    let relative = dir
        .strip_prefix(&toplevel)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|s| !s.is_empty());
    (repo_url, relative)
}

async fn run_git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = timeout(SUBPROCESS_TIMEOUT, Command::new("git").arg("-C").arg(dir).args(args).output())
        .await
        .ok()?
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
