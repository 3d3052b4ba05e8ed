//! Remote operations
//!
//! Fetch and push shell out to the git CLI so the user's credential
//! helpers apply; identity detection reads the remote URL via git2.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use crate::process::run_git;
use crate::repository::{GitRepo, Result};
use gantry_core::error::GitError;

/// Matches `owner/name` out of SSH and HTTPS remote URLs
static REMOTE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[:/](?P<identity>[^/:]+/[^/:]+?)(?:\.git)?/?$").expect("Invalid regex")
});

impl GitRepo {
    /// Get the URL for a remote
    pub fn remote_url(&self, name: &str) -> Result<String> {
        match self.repo.find_remote(name) {
            Ok(remote) => remote
                .url()
                .map(|s| s.to_string())
                .ok_or_else(|| GitError::RemoteNotFound(name.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                Err(GitError::RemoteNotFound(name.to_string()))
            }
            Err(e) => Err(GitError::Git2(e)),
        }
    }

    /// Derive the `owner/name` identity of the repository from a
    /// remote URL
    pub fn repo_identity(&self, remote: &str) -> Result<String> {
        let url = self.remote_url(remote)?;
        parse_repo_identity(&url).ok_or_else(|| GitError::UnexpectedOutput {
            command: format!("git remote get-url {}", remote),
            reason: format!("could not derive owner/name from '{}'", url),
        })
    }
}

/// Extract `owner/name` from a remote URL
pub fn parse_repo_identity(url: &str) -> Option<String> {
    REMOTE_URL_REGEX
        .captures(url)
        .map(|caps| caps["identity"].to_string())
}

/// Fetch a branch from a remote (CLI, for proper auth handling)
#[instrument(fields(dir = %dir.display(), remote, branch))]
pub fn git_fetch(dir: &Path, remote: &str, branch: &str) -> Result<()> {
    let start = std::time::Instant::now();
    run_git(dir, &["fetch", remote, branch])?;
    info!(
        remote,
        branch,
        duration_ms = start.elapsed().as_millis(),
        "fetched from remote"
    );
    Ok(())
}

/// Push the current HEAD to a branch ref together with all tags, in a
/// single operation, so a commit cannot land without its tag from
/// this step alone.
#[instrument(fields(dir = %dir.display(), remote, branch))]
pub fn git_push_head_with_tags(dir: &Path, remote: &str, branch: &str) -> Result<()> {
    let start = std::time::Instant::now();
    let refspec = format!("HEAD:refs/heads/{}", branch);
    run_git(dir, &["push", remote, &refspec, "--tags"])?;
    info!(
        remote,
        branch,
        duration_ms = start.elapsed().as_millis(),
        "pushed head and tags"
    );
    Ok(())
}
