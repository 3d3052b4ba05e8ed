//! Error types for gantry

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GantryError
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for gantry operations
#[derive(Debug, Error)]
pub enum GantryError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Version-related errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Changelog-related errors
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// Release pipeline errors
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Git and hosting-platform errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// Remote not found
    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    /// Tag already exists
    #[error("Tag already exists: {0}")]
    TagExists(String),

    /// An external command exited non-zero
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// An external command could not be spawned
    #[error("Failed to run `{command}`: {source}")]
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },

    /// An external command exceeded its time budget and was killed
    #[error("`{command}` timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    /// Unexpected output from the hosting platform CLI
    #[error("Unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Version-related errors
#[derive(Debug, Error)]
pub enum VersionError {
    /// Failed to parse version
    #[error("Failed to parse version '{0}': {1}")]
    ParseFailed(String, String),

    /// Semver error
    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

/// Changelog-related errors
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// Failed to write changelog
    #[error("Failed to write changelog at {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// Changelog path is excluded by the project's ignore rules
    #[error(
        "Changelog path {0} is ignored by git; committing it would do nothing. \
         Remove it from .gitignore or pass --no-changelog."
    )]
    Ignored(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Release pipeline errors
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// CI is red on the target branch
    #[error("CI is failing on '{branch}'. Fix the build or pass --skip-ci to override.")]
    CiFailed { branch: String },

    /// CI has not finished yet
    #[error("CI is still running on '{branch}'. Wait for it to finish and re-run.")]
    CiPending { branch: String },

    /// The deterministic workspace path already exists
    #[error(
        "Release workspace {0} already exists, which usually means a previous \
         release did not finish. Inspect it, then remove it manually and re-run."
    )]
    WorkspaceConflict(PathBuf),

    /// In-place release requires a clean tree
    #[error("Working directory has uncommitted changes. Commit or stash them first.")]
    DirtyWorkingDirectory,

    /// A pipeline step failed after mutation began
    #[error("Release step '{step}' failed: {reason}. See the troubleshooting notes for manual recovery.")]
    StepFailed { step: String, reason: String },
}

impl GantryError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
