//! The repository gateway
//!
//! A narrow interface over every external primitive the pipeline
//! touches: local git state, the remote, and the hosting platform.
//! The analyzer and executor only ever talk to this trait, which is
//! what makes the release state machine testable without a network or
//! a real repository.

use std::path::{Path, PathBuf};

use crate::repository::{GitRepo, Result};
use crate::types::{CiStatus, CommitInfo, TagInfo};
use crate::{hosting, remote, worktree};

/// Gateway to version control and the hosting platform
pub trait RepoGateway {
    /// The `owner/name` identity of the repository
    fn repo_identity(&self) -> Result<String>;

    /// Current branch of the caller's checkout; `None` when detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Whether the caller's checkout is a linked worktree
    fn is_worktree(&self) -> Result<bool>;

    /// The hosting platform's default branch
    fn default_branch(&self) -> Result<String>;

    /// Fetch a branch from the remote
    fn fetch(&self, branch: &str) -> Result<()>;

    /// Most recent release tag matching the tag prefix, if any
    fn latest_release_tag(&self, prefix: &str) -> Result<Option<TagInfo>>;

    /// Non-merge commits in `(since_tag, branch tip]`
    fn commits_since(&self, since_tag: Option<&str>, branch: &str) -> Result<Vec<CommitInfo>>;

    /// CI state of the branch's latest run
    fn ci_status(&self, branch: &str) -> Result<CiStatus>;

    /// Whether the working tree at `dir` has uncommitted changes
    fn is_dirty(&self, dir: &Path) -> Result<bool>;

    /// Whether `file` is excluded by ignore rules at `dir`
    fn is_ignored(&self, dir: &Path, file: &Path) -> Result<bool>;

    /// Create a detached worktree of the branch tip at `path`
    fn worktree_add(&self, path: &Path, branch: &str) -> Result<()>;

    /// Remove a worktree created by [`Self::worktree_add`]
    fn worktree_remove(&self, path: &Path) -> Result<()>;

    /// Stage and commit the given paths in `dir`
    fn commit_paths(&self, dir: &Path, paths: &[&Path], message: &str) -> Result<()>;

    /// Tag HEAD in `dir`; annotated when a message is given
    fn create_tag(&self, dir: &Path, name: &str, message: Option<&str>) -> Result<()>;

    /// Push `dir`'s HEAD to the branch ref along with all tags
    fn push(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Create a hosted release with notes read from a file
    fn create_release(&self, dir: &Path, tag: &str, title: &str, notes_file: &Path) -> Result<()>;
}

/// Live gateway backed by git2, the git CLI, and the gh CLI
pub struct LiveGateway {
    root: PathBuf,
    remote: String,
}

impl LiveGateway {
    /// Create a gateway rooted at the caller's repository
    pub fn new(root: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            remote: remote.into(),
        }
    }

    fn repo(&self) -> Result<GitRepo> {
        GitRepo::discover(&self.root)
    }

    /// Prefer the remote-tracking ref for a branch, falling back to
    /// the local branch when the remote ref is absent (e.g. no remote
    /// configured, or fetch was skipped).
    fn branch_revspec(&self, repo: &GitRepo, branch: &str) -> String {
        let remote_ref = format!("refs/remotes/{}/{}", self.remote, branch);
        if repo.rev_exists(&remote_ref) {
            remote_ref
        } else {
            branch.to_string()
        }
    }
}

impl RepoGateway for LiveGateway {
    fn repo_identity(&self) -> Result<String> {
        self.repo()?.repo_identity(&self.remote)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        self.repo()?.current_branch()
    }

    fn is_worktree(&self) -> Result<bool> {
        Ok(self.repo()?.is_worktree())
    }

    fn default_branch(&self) -> Result<String> {
        hosting::default_branch(&self.root)
    }

    fn fetch(&self, branch: &str) -> Result<()> {
        remote::git_fetch(&self.root, &self.remote, branch)
    }

    fn latest_release_tag(&self, prefix: &str) -> Result<Option<TagInfo>> {
        self.repo()?.latest_release_tag(prefix)
    }

    fn commits_since(&self, since_tag: Option<&str>, branch: &str) -> Result<Vec<CommitInfo>> {
        let repo = self.repo()?;
        let revspec = self.branch_revspec(&repo, branch);
        repo.commits_between(since_tag, &revspec)
    }

    fn ci_status(&self, branch: &str) -> Result<CiStatus> {
        hosting::ci_status(&self.root, branch)
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool> {
        Ok(!GitRepo::discover(dir)?.is_clean()?)
    }

    fn is_ignored(&self, dir: &Path, file: &Path) -> Result<bool> {
        GitRepo::discover(dir)?.is_path_ignored(file)
    }

    fn worktree_add(&self, path: &Path, branch: &str) -> Result<()> {
        let repo = self.repo()?;
        let revspec = self.branch_revspec(&repo, branch);
        worktree::worktree_add(&self.root, path, &revspec)
    }

    fn worktree_remove(&self, path: &Path) -> Result<()> {
        worktree::worktree_remove(&self.root, path)
    }

    fn commit_paths(&self, dir: &Path, paths: &[&Path], message: &str) -> Result<()> {
        GitRepo::discover(dir)?.commit_paths(paths, message)?;
        Ok(())
    }

    fn create_tag(&self, dir: &Path, name: &str, message: Option<&str>) -> Result<()> {
        GitRepo::discover(dir)?.create_tag(name, message)?;
        Ok(())
    }

    fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        remote::git_push_head_with_tags(dir, &self.remote, branch)
    }

    fn create_release(&self, dir: &Path, tag: &str, title: &str, notes_file: &Path) -> Result<()> {
        hosting::create_release(dir, tag, title, notes_file)
    }
}
