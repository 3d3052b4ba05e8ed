//! Git repository operations

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::{debug, info, instrument};

use gantry_core::error::GitError;

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Git repository wrapper
pub struct GitRepo {
    pub(crate) repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            repo,
        })
    }

    /// Discover and open a repository by searching parent directories
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        info!(start_path = %start_path.display(), "discovering git repository");
        let repo = Repository::discover(start_path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(start_path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this checkout is a linked worktree rather than the
    /// main working tree (the per-worktree and shared metadata
    /// directories differ).
    pub fn is_worktree(&self) -> bool {
        self.repo.is_worktree()
    }

    /// Whether a path is excluded by the repository's ignore rules
    pub fn is_path_ignored(&self, path: &Path) -> Result<bool> {
        self.repo.is_path_ignored(path).map_err(GitError::Git2)
    }

    /// Whether a revspec resolves in this repository
    pub fn rev_exists(&self, spec: &str) -> bool {
        self.repo.revparse_single(spec).is_ok()
    }

    /// Get the HEAD commit
    pub(crate) fn head_commit(&self) -> Result<git2::Commit<'_>> {
        let head = self.repo.head().map_err(GitError::Git2)?;
        head.peel_to_commit().map_err(GitError::Git2)
    }
}
