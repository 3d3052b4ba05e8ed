//! Version representation and bump computation
//!
//! Implements the versioning rules the pipeline runs on: a strict
//! priority ladder (breaking > feature > patch) with one deliberate
//! deviation from strict SemVer — while the major version is still 0,
//! a breaking change bumps minor, not major. That convention is
//! intentional and must not be "fixed".

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::commit::{Commit, CommitKind};
use crate::error::VersionError;

/// A pre-release label: a named channel with a monotonically
/// increasing counter, e.g. `alpha.3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerelease {
    pub channel: String,
    pub number: u64,
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.number == 0 {
            write!(f, "{}", self.channel)
        } else {
            write!(f, "{}.{}", self.channel, self.number)
        }
    }
}

/// A semantic version triple plus optional pre-release label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<Prerelease>,
}

impl Version {
    /// Create a release version (no pre-release label)
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// The implicit baseline when no tag has ever been released
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// The version without its pre-release label
    pub fn base(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    /// Whether two versions share the same numeric triple
    pub fn same_base(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Parse a version string, tolerating a leading `v`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix('v').unwrap_or(s);
        let v = semver::Version::parse(raw)
            .map_err(|e| VersionError::ParseFailed(s.to_string(), e.to_string()))?;

        let prerelease = if v.pre.is_empty() {
            None
        } else {
            Some(parse_prerelease(v.pre.as_str()))
        };

        Ok(Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            prerelease,
        })
    }
}

/// Split a pre-release string into channel and counter. A label
/// without a numeric tail (e.g. `rc`) gets counter 0 so the next
/// increment yields `rc.1`.
fn parse_prerelease(pre: &str) -> Prerelease {
    if let Some(dot) = pre.rfind('.') {
        if let Ok(n) = pre[dot + 1..].parse::<u64>() {
            return Prerelease {
                channel: pre[..dot].to_string(),
                number: n,
            };
        }
    }
    Prerelease {
        channel: pre.to_string(),
        number: 0,
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Category of version increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => f.write_str("major"),
            Self::Minor => f.write_str("minor"),
            Self::Patch => f.write_str("patch"),
        }
    }
}

/// The computed next version and the bump that produced it
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub version: Version,
    pub bump: Bump,
}

/// Compute the next version from the last released tag and the
/// classified commits since it.
///
/// Priority ladder: any breaking commit dominates, then any feature,
/// then patch. Multiple commits in one category still yield exactly
/// one bump. The result never carries a pre-release label; apply one
/// with [`apply_prerelease`].
pub fn next_version(last: Option<&Version>, commits: &[Commit]) -> Suggestion {
    let base = last.map(Version::base).unwrap_or_else(Version::zero);

    let has_breaking = commits.iter().any(|c| c.breaking);
    let has_feature = commits.iter().any(|c| c.kind == CommitKind::Feat);

    let (version, bump) = if has_breaking {
        if base.major == 0 {
            // Pre-1.0 breaking changes bump minor by convention.
            (Version::new(0, base.minor + 1, 0), Bump::Minor)
        } else {
            (Version::new(base.major + 1, 0, 0), Bump::Major)
        }
    } else if has_feature {
        (Version::new(base.major, base.minor + 1, 0), Bump::Minor)
    } else {
        (
            Version::new(base.major, base.minor, base.patch + 1),
            Bump::Patch,
        )
    };

    Suggestion { version, bump }
}

/// Attach a pre-release label to `version` on the given channel.
///
/// The counter continues from `last` only when `last` is a
/// pre-release of the identical base version on the identical
/// channel; any mismatch (different base, different channel, or a
/// plain release) starts the channel at 1. Channels never share
/// counters.
pub fn apply_prerelease(version: &Version, channel: &str, last: Option<&Version>) -> Version {
    let number = match last.and_then(|l| l.prerelease.as_ref().map(|p| (l, p))) {
        Some((l, pre)) if l.same_base(version) && pre.channel == channel => pre.number + 1,
        _ => 1,
    };

    Version {
        prerelease: Some(Prerelease {
            channel: channel.to_string(),
            number,
        }),
        ..version.base()
    }
}
