//! Ephemeral worktree management
//!
//! Release workspaces are linked worktrees created at a detached
//! checkout of the target revision and removed when the release
//! finishes, successfully or not.

use std::path::Path;

use tracing::{info, instrument};

use crate::process::run_git;
use crate::repository::Result;

/// Create a detached worktree of `revspec` at `path`
#[instrument(fields(repo_dir = %repo_dir.display(), path = %path.display(), revspec))]
pub fn worktree_add(repo_dir: &Path, path: &Path, revspec: &str) -> Result<()> {
    let path_str = path.to_string_lossy();
    run_git(
        repo_dir,
        &["worktree", "add", "--detach", &path_str, revspec],
    )?;
    info!(path = %path.display(), revspec, "created worktree");
    Ok(())
}

/// Remove a worktree and its checkout
#[instrument(fields(repo_dir = %repo_dir.display(), path = %path.display()))]
pub fn worktree_remove(repo_dir: &Path, path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy();
    run_git(repo_dir, &["worktree", "remove", "--force", &path_str])?;
    info!(path = %path.display(), "removed worktree");
    Ok(())
}
