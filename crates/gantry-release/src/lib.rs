//! Gantry Release - repository analysis and release execution
//!
//! Two entry points: [`RepoAnalyzer`] builds a read-only snapshot of
//! the repository's release state, and [`ReleaseExecutor`] drives the
//! release pipeline against a [`gantry_git::RepoGateway`]. Outcomes
//! land in the append-only ledger.

pub mod analyzer;
pub mod executor;
pub mod ledger;

#[cfg(test)]
pub(crate) mod testkit;

pub use analyzer::{AnalysisSnapshot, RepoAnalyzer, RepoContext};
pub use executor::{ReleaseExecutor, ReleaseOptions, ReleaseReport, ReleaseStep};
pub use ledger::{read_records, Outcome, OutcomeRecord};
