//! Gantry Git - Git and hosting operations for the release pipeline
//!
//! Local repository state goes through git2; network operations
//! (fetch, push) and the hosting platform go through the git and gh
//! CLIs so existing authentication applies. The [`RepoGateway`] trait
//! is the seam the analyzer and executor are tested against.

mod commits;
pub mod gateway;
pub mod hosting;
mod process;
mod remote;
mod repository;
mod status;
mod tags;
pub mod types;
pub mod worktree;

pub use gateway::{LiveGateway, RepoGateway};
pub use remote::{git_fetch, git_push_head_with_tags, parse_repo_identity};
pub use repository::{GitRepo, Result};
pub use types::{CiStatus, CommitInfo, TagInfo};
