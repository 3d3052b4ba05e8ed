//! Release execution
//!
//! Drives the release as an explicit step machine:
//!
//! GateCheck -> ResolveVersion -> PrepareWorkspace -> WriteChangelog
//! -> Commit -> Tag -> Push -> Publish
//!
//! A failure in any step aborts the run; failures from Commit onward
//! additionally append a Failed record to the outcome ledger. The
//! ephemeral workspace is owned by a scope guard so its removal runs
//! on every exit path, success or not. Gate failures happen before
//! any mutation and leave the ledger untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use gantry_core::changelog;
use gantry_core::config::Config;
use gantry_core::error::{ChangelogError, GantryError, ReleaseError, Result};
use gantry_core::version::{apply_prerelease, Version};
use gantry_git::{CiStatus, RepoGateway};

use crate::analyzer::{AnalysisSnapshot, RepoAnalyzer};
use crate::ledger::{self, OutcomeRecord};

/// Options for a release
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    /// Stop after version resolution and report the plan
    pub dry_run: bool,
    /// Explicit version instead of the analyzer's suggestion
    pub version: Option<Version>,
    /// Pre-release channel to stamp onto the resolved version
    pub prerelease: Option<String>,
    /// Skip the changelog write and its commit
    pub skip_changelog: bool,
    /// Skip the CI gate entirely
    pub skip_ci_gate: bool,
    /// Release the current branch instead of the default branch
    pub release_current_branch: bool,
    /// Operate on the caller's checkout instead of an ephemeral worktree
    pub in_place: bool,
}

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    GateCheck,
    ResolveVersion,
    PrepareWorkspace,
    WriteChangelog,
    Commit,
    Tag,
    Push,
    Publish,
}

impl ReleaseStep {
    /// The transition function of the step machine
    fn next(self) -> Option<Self> {
        match self {
            Self::GateCheck => Some(Self::ResolveVersion),
            Self::ResolveVersion => Some(Self::PrepareWorkspace),
            Self::PrepareWorkspace => Some(Self::WriteChangelog),
            Self::WriteChangelog => Some(Self::Commit),
            Self::Commit => Some(Self::Tag),
            Self::Tag => Some(Self::Push),
            Self::Push => Some(Self::Publish),
            Self::Publish => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::GateCheck => "gate-check",
            Self::ResolveVersion => "resolve-version",
            Self::PrepareWorkspace => "prepare-workspace",
            Self::WriteChangelog => "write-changelog",
            Self::Commit => "commit",
            Self::Tag => "tag",
            Self::Push => "push",
            Self::Publish => "publish",
        }
    }

    /// Failures from Commit onward are release attempts that touched
    /// shared state and belong in the outcome ledger
    fn is_ledgered(self) -> bool {
        matches!(self, Self::Commit | Self::Tag | Self::Push | Self::Publish)
    }
}

/// What a release run produced
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub version: Version,
    pub tag: String,
    pub target_branch: String,
    pub dry_run: bool,
    pub published: bool,
}

/// Mutable state threaded through the steps
struct StepContext {
    snapshot: AnalysisSnapshot,
    version: Version,
    tag: String,
    workdir: Option<PathBuf>,
}

impl StepContext {
    fn new(snapshot: AnalysisSnapshot) -> Self {
        let version = snapshot.suggested_version.clone();
        Self {
            snapshot,
            version,
            tag: String::new(),
            workdir: None,
        }
    }

    fn workdir(&self) -> &Path {
        self.workdir
            .as_deref()
            .expect("workdir is set by PrepareWorkspace")
    }
}

/// Removes the ephemeral workspace on drop. Removal failures are
/// warnings: a leftover worktree is recoverable manually and must not
/// mask the release outcome.
struct WorkspaceGuard<'a> {
    gateway: &'a dyn RepoGateway,
    path: Option<PathBuf>,
}

impl<'a> WorkspaceGuard<'a> {
    fn new(gateway: &'a dyn RepoGateway) -> Self {
        Self {
            gateway,
            path: None,
        }
    }

    fn arm(&mut self, path: PathBuf) {
        self.path = Some(path);
    }
}

impl Drop for WorkspaceGuard<'_> {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = self.gateway.worktree_remove(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove release workspace");
            }
        }
    }
}

/// Executes a release against a gateway
pub struct ReleaseExecutor<'a> {
    gateway: &'a dyn RepoGateway,
    config: &'a Config,
    root: PathBuf,
    options: ReleaseOptions,
}

impl<'a> ReleaseExecutor<'a> {
    /// Create an executor rooted at the caller's checkout
    pub fn new(
        gateway: &'a dyn RepoGateway,
        config: &'a Config,
        root: impl Into<PathBuf>,
        options: ReleaseOptions,
    ) -> Self {
        Self {
            gateway,
            config,
            root: root.into(),
            options,
        }
    }

    /// Run the release pipeline to completion or first failure
    #[instrument(skip(self))]
    pub fn execute(&self) -> Result<ReleaseReport> {
        let snapshot = self.run_analysis()?;
        let mut ctx = StepContext::new(snapshot);
        let mut guard = WorkspaceGuard::new(self.gateway);

        let mut step = ReleaseStep::GateCheck;
        loop {
            if let Err(e) = self.run_step(step, &mut ctx, &mut guard) {
                return Err(self.fail(step, e, &ctx));
            }

            if step == ReleaseStep::ResolveVersion && self.options.dry_run {
                info!(version = %ctx.version, "dry run, stopping before any mutation");
                return Ok(self.report(&ctx, true, false));
            }

            match step.next() {
                Some(next) => step = next,
                None => break,
            }
        }

        self.record_outcome(OutcomeRecord::success(
            &ctx.snapshot.context.repository,
            ctx.version.clone(),
        ));
        info!(tag = %ctx.tag, "release published");
        Ok(self.report(&ctx, false, true))
    }

    /// The executor re-analyzes rather than trusting a caller-supplied
    /// snapshot; analysis is cheap and gates must see current state.
    fn run_analysis(&self) -> Result<AnalysisSnapshot> {
        let mut analyzer = RepoAnalyzer::new(self.gateway, self.config);
        if self.options.release_current_branch {
            if let Some(branch) = self.gateway.current_branch()? {
                analyzer = analyzer.with_target_branch(branch);
            }
        }
        analyzer.analyze()
    }

    fn run_step(
        &self,
        step: ReleaseStep,
        ctx: &mut StepContext,
        guard: &mut WorkspaceGuard<'_>,
    ) -> Result<()> {
        match step {
            ReleaseStep::GateCheck => self.gate_check(ctx),
            ReleaseStep::ResolveVersion => self.resolve_version(ctx),
            ReleaseStep::PrepareWorkspace => self.prepare_workspace(ctx, guard),
            ReleaseStep::WriteChangelog => self.write_changelog(ctx),
            ReleaseStep::Commit => self.commit(ctx),
            ReleaseStep::Tag => self.tag(ctx),
            ReleaseStep::Push => self.push(ctx),
            ReleaseStep::Publish => self.publish(ctx),
        }
    }

    fn fail(&self, step: ReleaseStep, error: GantryError, ctx: &StepContext) -> GantryError {
        if step.is_ledgered() {
            self.record_outcome(OutcomeRecord::failed(
                &ctx.snapshot.context.repository,
                ctx.version.clone(),
                error.to_string(),
            ));
            ReleaseError::StepFailed {
                step: step.name().to_string(),
                reason: error.to_string(),
            }
            .into()
        } else {
            error
        }
    }

    /// CI must be green (or the gate explicitly skipped) before
    /// anything mutates. Pending is retryable by re-invocation; the
    /// executor never polls.
    fn gate_check(&self, ctx: &StepContext) -> Result<()> {
        if self.options.skip_ci_gate {
            warn!("CI gate skipped by flag");
            return Ok(());
        }

        let branch = ctx.snapshot.context.target_branch.clone();
        match ctx.snapshot.ci_status {
            CiStatus::Failure => Err(ReleaseError::CiFailed { branch }.into()),
            CiStatus::Pending => Err(ReleaseError::CiPending { branch }.into()),
            CiStatus::Success | CiStatus::Unknown => Ok(()),
        }
    }

    fn resolve_version(&self, ctx: &mut StepContext) -> Result<()> {
        let mut version = self
            .options
            .version
            .clone()
            .unwrap_or_else(|| ctx.snapshot.suggested_version.clone());

        if let Some(channel) = &self.options.prerelease {
            version = apply_prerelease(&version, channel, ctx.snapshot.last_tag.as_ref());
        }

        ctx.tag = format!("{}{}", self.config.git.tag_prefix, version);
        ctx.version = version;
        info!(version = %ctx.version, tag = %ctx.tag, "resolved release version");
        Ok(())
    }

    fn prepare_workspace(&self, ctx: &mut StepContext, guard: &mut WorkspaceGuard<'_>) -> Result<()> {
        if self.options.in_place {
            if self.gateway.is_dirty(&self.root)? {
                return Err(ReleaseError::DirtyWorkingDirectory.into());
            }
            ctx.workdir = Some(self.root.clone());
            return Ok(());
        }

        let path = self.workspace_path(&ctx.snapshot.context.repository, &ctx.version);
        if path.exists() {
            // A deliberate conflict detector: the path doubles as the
            // mutual-exclusion marker for this repository/version pair.
            return Err(ReleaseError::WorkspaceConflict(path).into());
        }

        self.gateway
            .worktree_add(&path, &ctx.snapshot.context.target_branch)?;
        guard.arm(path.clone());
        ctx.workdir = Some(path);
        Ok(())
    }

    fn write_changelog(&self, ctx: &StepContext) -> Result<()> {
        if self.options.skip_changelog {
            return Ok(());
        }

        let dir = ctx.workdir();
        let file = &self.config.changelog.file;

        if self.gateway.is_ignored(dir, file)? {
            return Err(ChangelogError::Ignored(file.clone()).into());
        }

        let path = dir.join(file);
        let existing = if path.exists() {
            Some(std::fs::read_to_string(&path)?)
        } else {
            None
        };

        let updated = changelog::insert_entry(
            existing.as_deref(),
            &ctx.version,
            Utc::now().date_naive(),
            &ctx.snapshot.changelog,
        );
        std::fs::write(&path, updated)?;
        info!(path = %path.display(), "wrote changelog entry");
        Ok(())
    }

    fn commit(&self, ctx: &StepContext) -> Result<()> {
        // Nothing was staged when the changelog write was skipped.
        if self.options.skip_changelog {
            return Ok(());
        }

        let message = format!("chore(release): {}", ctx.tag);
        self.gateway
            .commit_paths(ctx.workdir(), &[&self.config.changelog.file], &message)?;
        Ok(())
    }

    fn tag(&self, ctx: &StepContext) -> Result<()> {
        let message = format!("Release {}", ctx.version);
        self.gateway
            .create_tag(ctx.workdir(), &ctx.tag, Some(&message))?;
        Ok(())
    }

    fn push(&self, ctx: &StepContext) -> Result<()> {
        self.gateway
            .push(ctx.workdir(), &ctx.snapshot.context.target_branch)?;
        Ok(())
    }

    fn publish(&self, ctx: &StepContext) -> Result<()> {
        // Notes travel through a temp file to dodge shell quoting of
        // arbitrary commit content; the file is deleted on drop no
        // matter how this step ends.
        let mut notes = NamedTempFile::new()?;
        notes.write_all(ctx.snapshot.changelog.as_bytes())?;
        notes.flush()?;

        self.gateway
            .create_release(ctx.workdir(), &ctx.tag, &ctx.tag, notes.path())?;
        Ok(())
    }

    /// Deterministic workspace path keyed by repository and version
    fn workspace_path(&self, repository: &str, version: &Version) -> PathBuf {
        let repo = repository.replace('/', "-");
        self.config
            .workspace_root()
            .join(format!("gantry-release-{}-{}", repo, version))
    }

    fn record_outcome(&self, record: OutcomeRecord) {
        let path = self.config.ledger_path();
        if let Err(e) = ledger::append_record(&path, &record) {
            warn!(path = %path.display(), error = %e, "failed to append outcome record");
        }
    }

    fn report(&self, ctx: &StepContext, dry_run: bool, published: bool) -> ReleaseReport {
        ReleaseReport {
            version: ctx.version.clone(),
            tag: ctx.tag.clone(),
            target_branch: ctx.snapshot.context.target_branch.clone(),
            dry_run,
            published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{read_records, Outcome};
    use crate::testkit::ScriptedGateway;
    use gantry_git::TagInfo;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.release.ledger_path = Some(temp.path().join("ledger").join("releases.jsonl"));
        config.release.workspace_root = Some(temp.path().join("ws"));
        config
    }

    fn executor<'a>(
        gateway: &'a ScriptedGateway,
        config: &'a Config,
        root: &Path,
        options: ReleaseOptions,
    ) -> ReleaseExecutor<'a> {
        ReleaseExecutor::new(gateway, config, root, options)
    }

    #[test]
    fn test_ci_failure_halts_before_any_mutation() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["feat: a"])
            .with_ci(CiStatus::Failure);

        let result = executor(&gateway, &config, temp.path(), ReleaseOptions::default()).execute();

        assert!(matches!(
            result,
            Err(GantryError::Release(ReleaseError::CiFailed { .. }))
        ));
        assert!(!gateway.calls().iter().any(|c| c == "worktree_add"));
        assert!(!config.ledger_path().exists());
    }

    #[test]
    fn test_ci_pending_halts() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["fix: b"])
            .with_ci(CiStatus::Pending);

        let result = executor(&gateway, &config, temp.path(), ReleaseOptions::default()).execute();

        assert!(matches!(
            result,
            Err(GantryError::Release(ReleaseError::CiPending { .. }))
        ));
    }

    #[test]
    fn test_skip_ci_gate_overrides_failure() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["feat: a"])
            .with_ci(CiStatus::Failure);

        let options = ReleaseOptions {
            skip_ci_gate: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert!(report.published);
    }

    #[test]
    fn test_dry_run_stops_after_version_resolution() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new().with_commit_messages(&["feat: a"]);

        let options = ReleaseOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert!(report.dry_run);
        assert!(!report.published);
        assert_eq!(report.version.to_string(), "0.1.0");
        assert_eq!(report.tag, "v0.1.0");
        assert!(!gateway.calls().iter().any(|c| c == "worktree_add"));
        assert!(!config.ledger_path().exists());
    }

    #[test]
    fn test_version_override_and_prerelease_channel() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_last_tag(TagInfo::new("v1.0.0-alpha.2", "abc"))
            .with_commit_messages(&["fix: c"]);

        let options = ReleaseOptions {
            version: Some("1.0.0".parse().unwrap()),
            prerelease: Some("alpha".to_string()),
            dry_run: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert_eq!(report.version.to_string(), "1.0.0-alpha.3");
        assert_eq!(report.tag, "v1.0.0-alpha.3");
    }

    #[test]
    fn test_workspace_collision_fails_fast() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new().with_commit_messages(&["feat: a"]);

        // Suggested version will be 0.1.0; occupy its workspace path.
        let ws = config
            .workspace_root()
            .join("gantry-release-acme-widget-0.1.0");
        std::fs::create_dir_all(&ws).unwrap();

        let result = executor(&gateway, &config, temp.path(), ReleaseOptions::default()).execute();

        assert!(matches!(
            result,
            Err(GantryError::Release(ReleaseError::WorkspaceConflict(_)))
        ));
        let calls = gateway.calls();
        assert!(!calls.iter().any(|c| c == "push" || c == "create_release"));
        assert!(!config.ledger_path().exists());
    }

    #[test]
    fn test_successful_release_runs_steps_in_order() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new().with_commit_messages(&["feat: a", "fix: b"]);

        let report = executor(&gateway, &config, temp.path(), ReleaseOptions::default())
            .execute()
            .unwrap();

        assert!(report.published);
        assert_eq!(report.tag, "v0.1.0");

        let calls = gateway.calls();
        let pos = |name: &str| calls.iter().position(|c| c == name).unwrap();
        assert!(pos("worktree_add") < pos("commit_paths"));
        assert!(pos("commit_paths") < pos("create_tag"));
        assert!(pos("create_tag") < pos("push"));
        assert!(pos("push") < pos("create_release"));
        assert!(pos("create_release") < pos("worktree_remove"));

        // Workspace is gone and exactly one success record exists.
        let ws = config
            .workspace_root()
            .join("gantry-release-acme-widget-0.1.0");
        assert!(!ws.exists());

        let records = read_records(&config.ledger_path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Success);
        assert_eq!(records[0].repository, "acme/widget");
    }

    #[test]
    fn test_publish_failure_after_push_records_once_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["feat: a"])
            .failing_on(&["create_release"]);

        let result = executor(&gateway, &config, temp.path(), ReleaseOptions::default()).execute();

        assert!(matches!(
            result,
            Err(GantryError::Release(ReleaseError::StepFailed { .. }))
        ));
        assert!(gateway.calls().iter().any(|c| c == "push"));

        let records = read_records(&config.ledger_path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Failed);
        assert!(records[0].error.as_ref().unwrap().contains("create_release"));

        let ws = config
            .workspace_root()
            .join("gantry-release-acme-widget-0.1.0");
        assert!(!ws.exists());
    }

    #[test]
    fn test_in_place_requires_clean_tree() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["fix: a"])
            .with_dirty(true);

        let options = ReleaseOptions {
            in_place: true,
            ..Default::default()
        };
        let result = executor(&gateway, &config, temp.path(), options).execute();

        assert!(matches!(
            result,
            Err(GantryError::Release(ReleaseError::DirtyWorkingDirectory))
        ));
    }

    #[test]
    fn test_in_place_writes_changelog_in_root() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new().with_commit_messages(&["feat: shiny"]);

        let options = ReleaseOptions {
            in_place: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert!(report.published);
        let doc = std::fs::read_to_string(temp.path().join("CHANGELOG.md")).unwrap();
        assert!(doc.starts_with("# Changelog"));
        assert!(doc.contains("## [0.1.0]"));
        assert!(doc.contains("- shiny"));

        // In-place mode never creates or removes worktrees.
        let calls = gateway.calls();
        assert!(!calls.iter().any(|c| c == "worktree_add" || c == "worktree_remove"));
    }

    #[test]
    fn test_changelog_entry_prepends_to_existing_document() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_last_tag(TagInfo::new("v0.1.0", "abc"))
            .with_commit_messages(&["fix: patch it"]);

        let prior = "# Changelog\n\nAll notable changes to this project are documented in this file.\n\n## [0.1.0] - 2025-01-01\n\n### Added\n\n- first\n";
        std::fs::write(temp.path().join("CHANGELOG.md"), prior).unwrap();

        let options = ReleaseOptions {
            in_place: true,
            ..Default::default()
        };
        executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        let doc = std::fs::read_to_string(temp.path().join("CHANGELOG.md")).unwrap();
        let new_entry = doc.find("## [0.1.1]").unwrap();
        let old_entry = doc.find("## [0.1.0]").unwrap();
        assert!(new_entry < old_entry);
        assert!(doc.contains("- first"));
    }

    #[test]
    fn test_skip_changelog_skips_commit_but_not_tag() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new().with_commit_messages(&["feat: a"]);

        let options = ReleaseOptions {
            skip_changelog: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert!(report.published);
        let calls = gateway.calls();
        assert!(!calls.iter().any(|c| c == "commit_paths"));
        assert!(calls.iter().any(|c| c == "create_tag"));
        assert!(calls.iter().any(|c| c == "push"));
        assert!(calls.iter().any(|c| c == "create_release"));
    }

    #[test]
    fn test_ignored_changelog_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_commit_messages(&["feat: a"])
            .with_ignored(true);

        let result = executor(&gateway, &config, temp.path(), ReleaseOptions::default()).execute();

        match result {
            Err(GantryError::Changelog(ChangelogError::Ignored(_))) => {}
            other => panic!("expected ignored-changelog error, got {:?}", other),
        }
        // Nothing was committed and the ledger is untouched.
        assert!(!gateway.calls().iter().any(|c| c == "commit_paths"));
        assert!(!config.ledger_path().exists());
    }

    #[test]
    fn test_release_current_branch_targets_it() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let gateway = ScriptedGateway::new()
            .with_current_branch("feature/x")
            .with_commit_messages(&["feat: a"]);

        let options = ReleaseOptions {
            release_current_branch: true,
            dry_run: true,
            ..Default::default()
        };
        let report = executor(&gateway, &config, temp.path(), options)
            .execute()
            .unwrap();

        assert_eq!(report.target_branch, "feature/x");
    }
}
