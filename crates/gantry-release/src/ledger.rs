//! Release outcome ledger
//!
//! An append-only JSONL file recording every release attempt and how
//! it ended. The ledger exists for post-hoc debugging; nothing in the
//! pipeline reads it back to make decisions.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gantry_core::error::Result;
use gantry_core::version::Version;

/// How a release attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

/// One ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub date: DateTime<Utc>,
    pub repository: String,
    pub version: Version,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeRecord {
    /// Create a success record
    pub fn success(repository: impl Into<String>, version: Version) -> Self {
        Self {
            date: Utc::now(),
            repository: repository.into(),
            version,
            outcome: Outcome::Success,
            error: None,
        }
    }

    /// Create a failure record with the captured error text
    pub fn failed(
        repository: impl Into<String>,
        version: Version,
        error: impl Into<String>,
    ) -> Self {
        Self {
            date: Utc::now(),
            repository: repository.into(),
            version,
            outcome: Outcome::Failed,
            error: Some(error.into()),
        }
    }
}

/// Append one record to the ledger, creating the file and its parent
/// directory as needed
pub fn append_record(path: &Path, record: &OutcomeRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;

    debug!(path = %path.display(), outcome = ?record.outcome, "appended outcome record");
    Ok(())
}

/// Read all parseable records from the ledger.
///
/// An interrupted write can leave a trailing partial line; malformed
/// lines are skipped with a warning rather than failing the read.
pub fn read_records(path: &Path) -> Result<Vec<OutcomeRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "skipping malformed ledger line"),
        }
    }

    Ok(records)
}
