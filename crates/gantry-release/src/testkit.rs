//! Scripted gateway for analyzer and executor tests
//!
//! Behaves like a healthy repository by default; individual methods
//! can be scripted to fail by name. Every call is recorded so tests
//! can assert ordering and the absence of mutations. Worktree
//! operations touch the real filesystem so changelog IO in the
//! executor works against the scripted workspace.

use std::cell::RefCell;
use std::path::Path;

use gantry_core::error::GitError;
use gantry_git::{CiStatus, CommitInfo, RepoGateway, Result, TagInfo};

pub struct ScriptedGateway {
    calls: RefCell<Vec<String>>,
    commits: Vec<CommitInfo>,
    last_tag: Option<TagInfo>,
    ci: CiStatus,
    default_branch: String,
    identity: String,
    current_branch: Option<String>,
    dirty: bool,
    ignored: bool,
    fail_on: Vec<String>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            commits: Vec::new(),
            last_tag: None,
            ci: CiStatus::Success,
            default_branch: "main".to_string(),
            identity: "acme/widget".to_string(),
            current_branch: Some("main".to_string()),
            dirty: false,
            ignored: false,
            fail_on: Vec::new(),
        }
    }

    pub fn with_commit_messages(mut self, messages: &[&str]) -> Self {
        self.commits = messages
            .iter()
            .enumerate()
            .map(|(i, m)| CommitInfo::new(format!("{:07x}deadbeef", i), *m))
            .collect();
        self
    }

    pub fn with_last_tag(mut self, tag: TagInfo) -> Self {
        self.last_tag = Some(tag);
        self
    }

    pub fn with_ci(mut self, ci: CiStatus) -> Self {
        self.ci = ci;
        self
    }

    pub fn with_current_branch(mut self, branch: &str) -> Self {
        self.current_branch = Some(branch.to_string());
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_ignored(mut self, ignored: bool) -> Self {
        self.ignored = ignored;
        self
    }

    /// Script the named trait methods to fail
    pub fn failing_on(mut self, names: &[&str]) -> Self {
        self.fail_on = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, name: &str, method: &str) -> Result<()> {
        self.calls.borrow_mut().push(name.to_string());
        if self.fail_on.iter().any(|f| f == method) {
            return Err(GitError::CommandFailed {
                command: method.to_string(),
                stderr: format!("scripted failure in {}", method),
            });
        }
        Ok(())
    }
}

impl RepoGateway for ScriptedGateway {
    fn repo_identity(&self) -> Result<String> {
        self.record("repo_identity", "repo_identity")?;
        Ok(self.identity.clone())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        self.record("current_branch", "current_branch")?;
        Ok(self.current_branch.clone())
    }

    fn is_worktree(&self) -> Result<bool> {
        self.record("is_worktree", "is_worktree")?;
        Ok(false)
    }

    fn default_branch(&self) -> Result<String> {
        self.record("default_branch", "default_branch")?;
        Ok(self.default_branch.clone())
    }

    fn fetch(&self, _branch: &str) -> Result<()> {
        self.record("fetch", "fetch")
    }

    fn latest_release_tag(&self, _prefix: &str) -> Result<Option<TagInfo>> {
        self.record("latest_release_tag", "latest_release_tag")?;
        Ok(self.last_tag.clone())
    }

    fn commits_since(&self, _since_tag: Option<&str>, _branch: &str) -> Result<Vec<CommitInfo>> {
        // Recorded as "log" so read-only assertions can match on the
        // mutating "commit" prefix without false positives.
        self.record("log", "commits_since")?;
        Ok(self.commits.clone())
    }

    fn ci_status(&self, _branch: &str) -> Result<CiStatus> {
        self.record("ci_status", "ci_status")?;
        Ok(self.ci)
    }

    fn is_dirty(&self, _dir: &Path) -> Result<bool> {
        self.record("is_dirty", "is_dirty")?;
        Ok(self.dirty)
    }

    fn is_ignored(&self, _dir: &Path, _file: &Path) -> Result<bool> {
        self.record("is_ignored", "is_ignored")?;
        Ok(self.ignored)
    }

    fn worktree_add(&self, path: &Path, _branch: &str) -> Result<()> {
        self.record("worktree_add", "worktree_add")?;
        std::fs::create_dir_all(path).expect("scripted worktree dir");
        Ok(())
    }

    fn worktree_remove(&self, path: &Path) -> Result<()> {
        self.record("worktree_remove", "worktree_remove")?;
        if path.exists() {
            std::fs::remove_dir_all(path).expect("scripted worktree removal");
        }
        Ok(())
    }

    fn commit_paths(&self, _dir: &Path, _paths: &[&Path], _message: &str) -> Result<()> {
        self.record("commit_paths", "commit_paths")
    }

    fn create_tag(&self, _dir: &Path, _name: &str, _message: Option<&str>) -> Result<()> {
        self.record("create_tag", "create_tag")
    }

    fn push(&self, _dir: &Path, _branch: &str) -> Result<()> {
        self.record("push", "push")
    }

    fn create_release(&self, _dir: &Path, _tag: &str, _title: &str, _notes_file: &Path) -> Result<()> {
        self.record("create_release", "create_release")
    }
}
