//! Conventional commit classification
//!
//! Parses commit messages following the Conventional Commits grammar
//! `type(scope)!: description` into structured [`Commit`] records.
//! Classification is total: history is input the pipeline cannot
//! reject, so anything that does not match the grammar degrades to
//! [`CommitKind::Misc`] instead of erroring.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Regex for parsing conventional commit subject lines
static CONVENTIONAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<type>[a-zA-Z]+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?:\s*(?P<description>.+)$",
    )
    .expect("Invalid regex")
});

/// Regex for a breaking-change marker anywhere in the message body
static BREAKING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)breaking[ -]change").expect("Invalid regex"));

/// Closed vocabulary of commit kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    Feat,
    Fix,
    Refactor,
    Perf,
    Revert,
    Docs,
    Style,
    Test,
    Chore,
    Ci,
    Build,
    /// Anything that does not match the grammar or uses an unknown type
    Misc,
}

impl CommitKind {
    /// Map a (lowercased) type token to a kind. Unknown tokens fold
    /// into `Misc` so the classifier stays total.
    fn from_token(token: &str) -> Self {
        match token {
            "feat" => Self::Feat,
            "fix" => Self::Fix,
            "refactor" => Self::Refactor,
            "perf" => Self::Perf,
            "revert" => Self::Revert,
            "docs" => Self::Docs,
            "style" => Self::Style,
            "test" => Self::Test,
            "chore" => Self::Chore,
            "ci" => Self::Ci,
            "build" => Self::Build,
            _ => Self::Misc,
        }
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Revert => "revert",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Ci => "ci",
            Self::Build => "build",
            Self::Misc => "misc",
        };
        f.write_str(s)
    }
}

/// One classified commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Short commit identifier
    pub reference: String,
    /// Classified kind
    pub kind: CommitKind,
    /// Optional scope qualifier
    pub scope: Option<String>,
    /// First line of the message, trimmed
    pub description: String,
    /// Breaking-change marker (`!` or a body marker)
    pub breaking: bool,
}

/// Classify a full commit message into a [`Commit`].
///
/// `message` is the whole message; the first line is the subject,
/// everything after it the body. This never fails.
pub fn classify(reference: impl Into<String>, message: &str) -> Commit {
    let subject = message.lines().next().unwrap_or("").trim();
    let body_breaking = BREAKING_REGEX.is_match(message);

    match CONVENTIONAL_REGEX.captures(subject) {
        Some(caps) => {
            let token = caps["type"].to_lowercase();
            Commit {
                reference: reference.into(),
                kind: CommitKind::from_token(&token),
                scope: caps.name("scope").map(|m| m.as_str().to_string()),
                description: caps["description"].trim().to_string(),
                breaking: caps.name("breaking").is_some() || body_breaking,
            }
        }
        None => Commit {
            reference: reference.into(),
            kind: CommitKind::Misc,
            scope: None,
            description: subject.to_string(),
            breaking: body_breaking,
        },
    }
}
