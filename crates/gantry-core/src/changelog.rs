//! Changelog rendering and document maintenance
//!
//! Renders classified commits into Keep-a-Changelog style sections and
//! splices dated entries into the changelog document, newest first,
//! without touching prior entries.

use chrono::NaiveDate;
use tracing::debug;

use crate::commit::{Commit, CommitKind};
use crate::version::Version;

/// Fixed document header; new entries are inserted immediately after it.
pub const DOCUMENT_HEADER: &str =
    "# Changelog\n\nAll notable changes to this project are documented in this file.\n";

/// Rendered when a release has no user-facing changes. Downstream
/// consumers must never see an empty changelog.
pub const EMPTY_PLACEHOLDER: &str = "No notable changes.";

/// Section titles in their fixed render order
const SECTION_ORDER: [&str; 5] = ["Added", "Changed", "Fixed", "Removed", "Other"];

/// Map a commit kind to its section title. `None` means the kind is
/// not user-facing and is dropped from the changelog.
fn section_for(kind: CommitKind) -> Option<&'static str> {
    match kind {
        CommitKind::Feat => Some("Added"),
        CommitKind::Refactor | CommitKind::Perf => Some("Changed"),
        CommitKind::Fix => Some("Fixed"),
        CommitKind::Revert => Some("Removed"),
        CommitKind::Docs
        | CommitKind::Style
        | CommitKind::Test
        | CommitKind::Chore
        | CommitKind::Ci
        | CommitKind::Build => None,
        CommitKind::Misc => Some("Other"),
    }
}

/// Render commits into changelog sections.
///
/// Sections appear in a fixed order, empty sections are omitted, and
/// an all-empty result yields the placeholder line instead of an
/// empty string.
pub fn render(commits: &[Commit]) -> String {
    let mut output = String::new();

    for title in SECTION_ORDER {
        let entries: Vec<&Commit> = commits
            .iter()
            .filter(|c| section_for(c.kind) == Some(title))
            .collect();

        if entries.is_empty() {
            continue;
        }

        output.push_str(&format!("### {}\n\n", title));
        for commit in entries {
            match &commit.scope {
                Some(scope) => output.push_str(&format!("- {}: {}\n", scope, commit.description)),
                None => output.push_str(&format!("- {}\n", commit.description)),
            }
        }
        output.push('\n');
    }

    if output.is_empty() {
        output.push_str(EMPTY_PLACEHOLDER);
        output.push('\n');
    }

    let output = format!("{}\n", output.trim_end());
    debug!(output_len = output.len(), "changelog sections rendered");
    output
}

/// Insert a new dated entry into the changelog document.
///
/// The entry lands immediately after the document header, above any
/// prior entries, which are preserved verbatim. When `existing` is
/// `None` a fresh document is synthesized.
pub fn insert_entry(
    existing: Option<&str>,
    version: &Version,
    date: NaiveDate,
    body: &str,
) -> String {
    let entry = format!("## [{}] - {}\n\n{}", version, date.format("%Y-%m-%d"), body);

    match existing {
        Some(doc) => match doc.find("\n## ") {
            // Prior entries exist: splice in front of the first one.
            Some(idx) => {
                let head = doc[..idx].trim_end();
                let tail = &doc[idx..];
                format!("{}\n\n{}{}", head, entry, tail)
            }
            // Header-only document.
            None => format!("{}\n\n{}", doc.trim_end(), entry),
        },
        None => format!("{}\n{}", DOCUMENT_HEADER, entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::classify;

    fn commits(messages: &[&str]) -> Vec<Commit> {
        messages.iter().map(|m| classify("abc1234", m)).collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_render_sections_in_order() {
        let body = render(&commits(&[
            "fix: repair thing",
            "feat: add thing",
            "revert: drop thing",
            "perf: speed up thing",
        ]));

        let added = body.find("### Added").unwrap();
        let changed = body.find("### Changed").unwrap();
        let fixed = body.find("### Fixed").unwrap();
        let removed = body.find("### Removed").unwrap();
        assert!(added < changed && changed < fixed && fixed < removed);
    }

    #[test]
    fn test_render_scope_prefix() {
        let body = render(&commits(&["feat(auth): add login", "fix: crash"]));
        assert!(body.contains("- auth: add login"));
        assert!(body.contains("- crash"));
    }

    #[test]
    fn test_render_drops_non_user_facing() {
        let body = render(&commits(&["feat: keep me", "chore: drop me", "ci: and me"]));
        assert!(body.contains("keep me"));
        assert!(!body.contains("drop me"));
        assert!(!body.contains("and me"));
    }

    #[test]
    fn test_render_misc_goes_to_other() {
        let body = render(&commits(&["random commit message"]));
        assert!(body.contains("### Other"));
        assert!(body.contains("- random commit message"));
    }

    #[test]
    fn test_render_empty_uses_placeholder() {
        assert_eq!(render(&[]), format!("{}\n", EMPTY_PLACEHOLDER));
        // Only hidden kinds present renders the placeholder too.
        let body = render(&commits(&["chore: deps", "docs: readme"]));
        assert_eq!(body, format!("{}\n", EMPTY_PLACEHOLDER));
    }

    #[test]
    fn test_render_is_pure() {
        let cs = commits(&["feat: a", "fix: b"]);
        assert_eq!(render(&cs), render(&cs));
    }

    #[test]
    fn test_insert_into_fresh_document() {
        let version: Version = "0.1.0".parse().unwrap();
        let doc = insert_entry(None, &version, date(), "### Added\n\n- first\n");

        assert!(doc.starts_with("# Changelog"));
        assert!(doc.contains("## [0.1.0] - 2025-06-01"));
        assert!(doc.contains("- first"));
    }

    #[test]
    fn test_insert_preserves_prior_entries() {
        let v1: Version = "0.1.0".parse().unwrap();
        let v2: Version = "0.2.0".parse().unwrap();

        let doc1 = insert_entry(None, &v1, date(), "### Added\n\n- first\n");
        let doc2 = insert_entry(Some(&doc1), &v2, date(), "### Fixed\n\n- second\n");

        // New entry is the top-most dated entry.
        let first = doc2.find("## [0.2.0]").unwrap();
        let second = doc2.find("## [0.1.0]").unwrap();
        assert!(first < second);

        // The prior entry survives byte-identical.
        let old_entry = &doc1[doc1.find("## [0.1.0]").unwrap()..];
        assert!(doc2.ends_with(old_entry));
    }

    #[test]
    fn test_insert_after_header_only_document() {
        let version: Version = "1.0.0".parse().unwrap();
        let doc = insert_entry(Some(DOCUMENT_HEADER), &version, date(), "body\n");

        assert!(doc.starts_with("# Changelog"));
        assert!(doc.contains("## [1.0.0] - 2025-06-01\n\nbody"));
    }
}
