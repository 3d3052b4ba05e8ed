//! Tag operations

use tracing::{debug, info, instrument};

use crate::repository::{GitRepo, Result};
use crate::types::TagInfo;
use gantry_core::error::GitError;
use gantry_core::version::Version;

impl GitRepo {
    /// List tags whose names carry the given prefix followed by a
    /// parseable version
    pub fn release_tags(&self, prefix: &str) -> Result<Vec<(TagInfo, Version)>> {
        let mut tags = Vec::new();

        self.repo.tag_foreach(|oid, name| {
            let name = String::from_utf8_lossy(name)
                .trim_start_matches("refs/tags/")
                .to_string();

            if let Some(rest) = name.strip_prefix(prefix) {
                if let Ok(version) = rest.parse::<Version>() {
                    tags.push((TagInfo::new(&name, oid.to_string()), version));
                }
            }

            true
        })?;

        debug!(count = tags.len(), prefix, "listed release tags");
        Ok(tags)
    }

    /// Find the most recent release tag by semantic version order.
    /// Absence is valid: a repository before its first release has
    /// none.
    #[instrument(skip(self), fields(prefix))]
    pub fn latest_release_tag(&self, prefix: &str) -> Result<Option<TagInfo>> {
        let mut tags = self.release_tags(prefix)?;

        // A release outranks its own pre-releases; among pre-releases
        // of one base the highest counter wins.
        tags.sort_by(|a, b| {
            let key = |v: &Version| {
                (
                    v.major,
                    v.minor,
                    v.patch,
                    v.prerelease.is_none(),
                    v.prerelease.as_ref().map(|p| p.number).unwrap_or(0),
                )
            };
            key(&b.1).cmp(&key(&a.1))
        });

        let result = tags.into_iter().next().map(|(t, _)| t);
        debug!(latest = ?result.as_ref().map(|t| &t.name), "found latest release tag");
        Ok(result)
    }

    /// Create a tag on HEAD; annotated when a message is given
    #[instrument(skip(self), fields(name, annotated = message.is_some()))]
    pub fn create_tag(&self, name: &str, message: Option<&str>) -> Result<TagInfo> {
        let tag_ref = format!("refs/tags/{}", name);
        if self.repo.find_reference(&tag_ref).is_ok() {
            return Err(GitError::TagExists(name.to_string()));
        }

        let head = self.head_commit()?;

        if let Some(msg) = message {
            let sig = self.repo.signature()?;
            self.repo.tag(name, head.as_object(), &sig, msg, false)?;
        } else {
            self.repo.tag_lightweight(name, head.as_object(), false)?;
        }

        info!(name, annotated = message.is_some(), "created tag");
        Ok(TagInfo::new(name, head.id().to_string()))
    }
}
