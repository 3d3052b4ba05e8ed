//! External command execution
//!
//! Network-facing git operations (fetch, push) and everything on the
//! hosting side go through the CLI tools rather than libgit2, so that
//! the user's existing authentication setup applies. Every command
//! runs under a time budget and is killed on expiry; a hung remote
//! must not hang the pipeline.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use gantry_core::error::GitError;

/// Time budget for one external command. Remote operations on large
/// repositories stay well under this; anything longer is a hang.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Run a command in `dir`, returning trimmed stdout on success
pub fn run(program: &str, dir: &Path, args: &[&str]) -> Result<String, GitError> {
    run_with_timeout(program, dir, args, COMMAND_TIMEOUT)
}

/// Run a command in `dir` under an explicit time budget.
///
/// Output is read only after the process exits, so a command that
/// fills the pipe buffer without exiting stalls until the deadline
/// kills it. The commands used here emit small output.
#[instrument(skip(args), fields(program, dir = %dir.display()))]
pub fn run_with_timeout(
    program: &str,
    dir: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<String, GitError> {
    let rendered = format!("{} {}", program, args.join(" "));
    debug!(command = %rendered, "running external command");

    let mut child = Command::new(program)
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GitError::CommandSpawn {
            command: rendered.clone(),
            source: e,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {}
            Err(e) => {
                return Err(GitError::CommandSpawn {
                    command: rendered,
                    source: e,
                })
            }
        }

        if Instant::now() >= deadline {
            warn!(command = %rendered, "command exceeded time budget, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(GitError::CommandTimeout {
                command: rendered,
                seconds: timeout.as_secs(),
            });
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    // The status is already reaped; this only drains the pipes.
    let output = child
        .wait_with_output()
        .map_err(|e| GitError::CommandSpawn {
            command: rendered.clone(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::CommandFailed {
            command: rendered,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run git in `dir`
pub fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    run("git", dir, args)
}

/// Run gh in `dir`
pub fn run_gh(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    run("gh", dir, args)
}
