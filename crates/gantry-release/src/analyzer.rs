//! Repository analysis
//!
//! Produces a single [`AnalysisSnapshot`] describing where the
//! repository stands relative to its last release. Analysis is
//! read-only and idempotent: every step that talks to the outside
//! world degrades to a recorded warning on failure, except the commit
//! walk itself, and nothing here mutates shared state. The executor
//! relies on this by re-running analysis instead of trusting a stale
//! snapshot.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use gantry_core::changelog;
use gantry_core::commit::{classify, Commit};
use gantry_core::config::Config;
use gantry_core::error::Result;
use gantry_core::version::{next_version, Bump, Version};
use gantry_git::{CiStatus, RepoGateway};

/// Where the analysis ran
#[derive(Debug, Clone, Serialize)]
pub struct RepoContext {
    pub is_worktree: bool,
    pub current_branch: String,
    pub target_branch: String,
    pub repository: String,
}

/// The value object produced by one analysis pass
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSnapshot {
    pub context: RepoContext,
    pub last_tag: Option<Version>,
    pub commits: Vec<Commit>,
    pub suggested_version: Version,
    pub bump: Bump,
    pub changelog: String,
    pub ci_status: CiStatus,
    pub warnings: Vec<String>,
}

/// Read-only repository analyzer
pub struct RepoAnalyzer<'a> {
    gateway: &'a dyn RepoGateway,
    config: &'a Config,
    target_override: Option<String>,
}

impl<'a> RepoAnalyzer<'a> {
    /// Create an analyzer over a gateway and configuration
    pub fn new(gateway: &'a dyn RepoGateway, config: &'a Config) -> Self {
        Self {
            gateway,
            config,
            target_override: None,
        }
    }

    /// Analyze against an explicit target branch instead of the
    /// platform's default branch
    pub fn with_target_branch(mut self, branch: impl Into<String>) -> Self {
        self.target_override = Some(branch.into());
        self
    }

    /// Produce a fresh snapshot. Safe to call at arbitrary frequency.
    #[instrument(skip(self))]
    pub fn analyze(&self) -> Result<AnalysisSnapshot> {
        let mut warnings = Vec::new();

        let is_worktree = self.gateway.is_worktree().unwrap_or_else(|e| {
            warnings.push(format!("could not determine worktree state: {}", e));
            false
        });

        let current_branch = match self.gateway.current_branch() {
            Ok(Some(branch)) => branch,
            Ok(None) => {
                warnings.push("HEAD is detached".to_string());
                "HEAD".to_string()
            }
            Err(e) => {
                warnings.push(format!("could not determine current branch: {}", e));
                "HEAD".to_string()
            }
        };

        let repository = self.gateway.repo_identity().unwrap_or_else(|e| {
            warnings.push(format!("could not determine repository identity: {}", e));
            "unknown".to_string()
        });

        let target_branch = match &self.target_override {
            Some(branch) => branch.clone(),
            None => self.gateway.default_branch().unwrap_or_else(|e| {
                let fallback = self.config.git.fallback_branch.clone();
                warnings.push(format!(
                    "could not resolve default branch, assuming '{}': {}",
                    fallback, e
                ));
                fallback
            }),
        };

        if let Err(e) = self.gateway.fetch(&target_branch) {
            warnings.push(format!("fetch of '{}' failed: {}", target_branch, e));
        }

        let prefix = &self.config.git.tag_prefix;
        let last_tag_info = match self.gateway.latest_release_tag(prefix) {
            Ok(tag) => tag,
            Err(e) => {
                warnings.push(format!("could not resolve last release tag: {}", e));
                None
            }
        };

        let last_tag: Option<Version> = match &last_tag_info {
            Some(tag) => match tag.name.strip_prefix(prefix.as_str()).unwrap_or(&tag.name).parse()
            {
                Ok(version) => Some(version),
                Err(e) => {
                    warnings.push(format!("could not parse tag '{}': {}", tag.name, e));
                    None
                }
            },
            None => None,
        };

        // The commit walk is the one hard dependency of an analysis.
        let raw_commits = self
            .gateway
            .commits_since(last_tag_info.as_ref().map(|t| t.name.as_str()), &target_branch)?;

        let commits: Vec<Commit> = raw_commits
            .iter()
            .map(|c| classify(&c.short_hash, &c.full_message()))
            .collect();

        let suggestion = next_version(last_tag.as_ref(), &commits);
        let rendered = changelog::render(&commits);

        let ci_status = self.gateway.ci_status(&target_branch).unwrap_or_else(|e| {
            warnings.push(format!("could not determine CI status: {}", e));
            CiStatus::Unknown
        });

        debug!(
            commit_count = commits.len(),
            warning_count = warnings.len(),
            "analysis snapshot built"
        );
        info!(
            target_branch = %target_branch,
            suggested = %suggestion.version,
            bump = %suggestion.bump,
            ci = %ci_status,
            "analyzed repository"
        );

        if !warnings.is_empty() {
            warn!(count = warnings.len(), "analysis completed with warnings");
        }

        Ok(AnalysisSnapshot {
            context: RepoContext {
                is_worktree,
                current_branch,
                target_branch,
                repository,
            },
            last_tag,
            commits,
            suggested_version: suggestion.version,
            bump: suggestion.bump,
            changelog: rendered,
            ci_status,
            warnings,
        })
    }
}
