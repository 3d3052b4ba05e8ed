//! Hosting-platform queries via the `gh` CLI

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::process::run_gh;
use crate::repository::Result;
use crate::types::CiStatus;
use gantry_core::error::GitError;

#[derive(Debug, Deserialize)]
struct RepoView {
    #[serde(rename = "defaultBranchRef")]
    default_branch_ref: BranchRef,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    status: String,
    conclusion: Option<String>,
}

/// Look up the repository's default branch
#[instrument(fields(dir = %dir.display()))]
pub fn default_branch(dir: &Path) -> Result<String> {
    let command = "gh repo view --json defaultBranchRef";
    let output = run_gh(dir, &["repo", "view", "--json", "defaultBranchRef"])?;

    let view: RepoView = serde_json::from_str(&output).map_err(|e| GitError::UnexpectedOutput {
        command: command.to_string(),
        reason: e.to_string(),
    })?;

    debug!(branch = %view.default_branch_ref.name, "resolved default branch");
    Ok(view.default_branch_ref.name)
}

/// Classify the latest CI run on a branch.
///
/// No runs at all maps to `Unknown`, an unfinished run to `Pending`.
#[instrument(fields(dir = %dir.display(), branch))]
pub fn ci_status(dir: &Path, branch: &str) -> Result<CiStatus> {
    let command = "gh run list --json status,conclusion";
    let output = run_gh(
        dir,
        &[
            "run",
            "list",
            "--branch",
            branch,
            "--limit",
            "1",
            "--json",
            "status,conclusion",
        ],
    )?;

    let runs: Vec<WorkflowRun> =
        serde_json::from_str(&output).map_err(|e| GitError::UnexpectedOutput {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let status = match runs.first() {
        None => CiStatus::Unknown,
        Some(run) if run.status != "completed" => CiStatus::Pending,
        Some(run) => match run.conclusion.as_deref() {
            Some("success") => CiStatus::Success,
            Some("failure") | Some("timed_out") | Some("startup_failure") => CiStatus::Failure,
            _ => CiStatus::Unknown,
        },
    };

    debug!(branch, ?status, "classified CI status");
    Ok(status)
}

/// Create a hosted release for a tag, reading notes from a file.
///
/// Notes go through a file rather than an argument to avoid shell
/// quoting hazards with arbitrary commit message content.
#[instrument(fields(dir = %dir.display(), tag, title))]
pub fn create_release(dir: &Path, tag: &str, title: &str, notes_file: &Path) -> Result<()> {
    let notes = notes_file.to_string_lossy();
    run_gh(
        dir,
        &[
            "release", "create", tag, "--title", title, "--notes-file", &notes,
        ],
    )?;
    info!(tag, title, "created hosted release");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_runs(json: &str) -> CiStatus {
        let runs: Vec<WorkflowRun> = serde_json::from_str(json).unwrap();
        match runs.first() {
            None => CiStatus::Unknown,
            Some(run) if run.status != "completed" => CiStatus::Pending,
            Some(run) => match run.conclusion.as_deref() {
                Some("success") => CiStatus::Success,
                Some("failure") | Some("timed_out") | Some("startup_failure") => CiStatus::Failure,
                _ => CiStatus::Unknown,
            },
        }
    }

    #[test]
    fn test_classify_run_payloads() {
        assert_eq!(parse_runs("[]"), CiStatus::Unknown);
        assert_eq!(
            parse_runs(r#"[{"status":"in_progress","conclusion":null}]"#),
            CiStatus::Pending
        );
        assert_eq!(
            parse_runs(r#"[{"status":"completed","conclusion":"success"}]"#),
            CiStatus::Success
        );
        assert_eq!(
            parse_runs(r#"[{"status":"completed","conclusion":"failure"}]"#),
            CiStatus::Failure
        );
        assert_eq!(
            parse_runs(r#"[{"status":"completed","conclusion":"cancelled"}]"#),
            CiStatus::Unknown
        );
    }

    #[test]
    fn test_parse_repo_view() {
        let view: RepoView =
            serde_json::from_str(r#"{"defaultBranchRef":{"name":"main"}}"#).unwrap();
        assert_eq!(view.default_branch_ref.name, "main");
    }
}
