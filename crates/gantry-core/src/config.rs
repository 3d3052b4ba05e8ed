//! Configuration types and loading
//!
//! All process-wide defaults (target branch fallback, ledger path,
//! workspace root) resolve here, once, at load time. The analyzer and
//! executor receive an explicit [`Config`] and never consult the
//! environment themselves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

type Result<T> = std::result::Result<T, ConfigError>;

/// Candidate configuration file names, in priority order
fn config_file_names() -> [&'static str; 3] {
    ["gantry.toml", "gantry.yaml", "gantry.yml"]
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub changelog: ChangelogConfig,
    pub release: ReleaseConfig,
}

/// Git and hosting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Remote to fetch from and push to
    pub remote: String,
    /// Branch to assume when the hosting platform cannot be queried
    pub fallback_branch: String,
    /// Prefix applied to release tags
    pub tag_prefix: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            fallback_branch: "main".to_string(),
            tag_prefix: "v".to_string(),
        }
    }
}

/// Changelog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Changelog path relative to the repository root
    pub file: PathBuf,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("CHANGELOG.md"),
        }
    }
}

/// Release executor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Outcome ledger path; defaults to `~/.gantry/releases.jsonl`
    pub ledger_path: Option<PathBuf>,
    /// Parent directory for ephemeral release workspaces; defaults to
    /// the OS temp dir
    pub workspace_root: Option<PathBuf>,
}

impl Config {
    /// Resolved outcome ledger path
    pub fn ledger_path(&self) -> PathBuf {
        self.release.ledger_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".gantry")
                .join("releases.jsonl")
        })
    }

    /// Resolved parent directory for ephemeral workspaces
    pub fn workspace_root(&self) -> PathBuf {
        self.release
            .workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let is_toml = path.extension().is_some_and(|e| e == "toml");
    info!(path = %path.display(), format = if is_toml { "TOML" } else { "YAML" }, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if is_toml {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Find a configuration file in `start_dir` or its parents.
///
/// At each level the search checks `<dir>/<name>` then
/// `<dir>/.github/<name>`; the first match wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration or fall back to defaults
pub fn load_config_or_default(dir: &Path) -> (Config, Option<PathBuf>) {
    match find_config(dir) {
        Some(path) => match load_config(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                (Config::default(), None)
            }
        },
        None => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            (Config::default(), None)
        }
    }
}
