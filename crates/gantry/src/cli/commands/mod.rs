//! CLI commands

mod analyze;
mod release;

pub use analyze::AnalyzeCommand;
pub use release::ReleaseCommand;
