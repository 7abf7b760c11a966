use crate::core::error::{NixpubError, NixpubResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic version of the release being packaged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semver {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release component without the leading `-` (e.g. "rc1").
    #[serde(default)]
    pub prerelease: String,
    /// Build metadata without the leading `+`.
    #[serde(default)]
    pub metadata: String,
}

impl Semver {
    pub fn new(major: u64, minor: u64, patch: u64, prerelease: &str) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: prerelease.to_string(),
            metadata: String::new(),
        }
    }

    /// Parse a tag or version string (e.g., "v1.2.3", "1.2.3-rc1+build.5")
    pub fn parse(s: &str) -> NixpubResult<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (rest, metadata) = match trimmed.split_once('+') {
            Some((rest, meta)) => (rest, meta.to_string()),
            None => (trimmed, String::new()),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, pre.to_string()),
            None => (rest, String::new()),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(NixpubError::Version(format!("Invalid version format: {}", s)));
        }

        let component = |idx: usize, what: &str| -> NixpubResult<u64> {
            parts[idx]
                .parse()
                .map_err(|_| NixpubError::Version(format!("Invalid {} version: {}", what, s)))
        };

        Ok(Self {
            major: component(0, "major")?,
            minor: component(1, "minor")?,
            patch: component(2, "patch")?,
            prerelease,
            metadata,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }
}

impl fmt::Display for Semver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease)?;
        }
        if !self.metadata.is_empty() {
            write!(f, "+{}", self.metadata)?;
        }
        Ok(())
    }
}

/// The version string of a tag: the tag without its leading `v`.
pub fn version_from_tag(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}
