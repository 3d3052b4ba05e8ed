//! Gantry Core - Core library for the release pipeline
//!
//! This crate provides the pure building blocks of the pipeline:
//! error types, configuration, commit classification, version
//! computation, and changelog rendering. Nothing in here touches git,
//! the network, or the filesystem beyond config loading.

pub mod changelog;
pub mod commit;
pub mod config;
pub mod error;
pub mod version;

pub use commit::{classify, Commit, CommitKind};
pub use config::{load_config_or_default, Config};
pub use error::{GantryError, Result};
pub use version::{apply_prerelease, next_version, Bump, Suggestion, Version};
