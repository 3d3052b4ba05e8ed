//! Commit history and commit creation

use std::path::Path;

use git2::{Oid, Sort};
use tracing::{debug, info, instrument};

use crate::repository::{GitRepo, Result};
use crate::types::CommitInfo;

impl GitRepo {
    /// Get the non-merge commits in `(since, tip]`.
    ///
    /// `tip` is any revspec (branch, remote-tracking ref, hash);
    /// `since` is an optional tag name that bounds the range from
    /// below. Merge commits are skipped.
    #[instrument(skip(self), fields(since, tip))]
    pub fn commits_between(&self, since: Option<&str>, tip: &str) -> Result<Vec<CommitInfo>> {
        let tip_oid = self.repo.revparse_single(tip)?.id();

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(tip_oid)?;

        if let Some(tag) = since {
            let tag_ref = format!("refs/tags/{}", tag);
            let reference = self.repo.find_reference(&tag_ref)?;
            let target = reference.peel_to_commit()?;
            revwalk.hide(target.id())?;
        }

        let mut commits = Vec::new();

        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            if commit.parent_count() > 1 {
                continue;
            }
            commits.push(commit_to_info(&commit));
        }

        debug!(count = commits.len(), "walked commit range");
        Ok(commits)
    }

    /// Stage the given paths and commit them on HEAD
    #[instrument(skip(self, paths), fields(message))]
    pub fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.repo.signature()?;
        let parent = self.head_commit()?;

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;

        info!(commit = %oid, "created commit");
        Ok(oid)
    }
}

/// Convert a git2 Commit to CommitInfo
fn commit_to_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let info = CommitInfo::new(
        commit.id().to_string(),
        commit.summary().unwrap_or("(no message)"),
    );

    match commit.body() {
        Some(body) => info.with_body(body),
        None => info,
    }
}
