//! Per-run release context: configuration, release metadata and artifacts.

use crate::artifact::ArtifactStore;
use nixpub_core::core::version::{version_from_tag, Semver};
use nixpub_core::{NixpubResult, ProjectConfig};
use std::collections::HashMap;
use std::path::Path;

/// Read-only facts about the release being packaged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub project_name: String,
    pub version: String,
    pub tag: String,
    pub previous_tag: String,
    pub semver: Semver,
    /// RFC 3339 timestamp of when the run started.
    pub date: String,
}

impl ReleaseMetadata {
    /// Derive the release metadata from the current (and previous) tag
    pub fn from_tag(project_name: &str, tag: &str, previous_tag: &str) -> NixpubResult<Self> {
        Ok(Self {
            project_name: project_name.to_string(),
            version: version_from_tag(tag),
            tag: tag.to_string(),
            previous_tag: previous_tag.to_string(),
            semver: Semver::parse(tag)?,
            date: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Pre-releases are where `skip_upload: auto` kicks in.
    pub fn is_prerelease(&self) -> bool {
        self.semver.is_prerelease()
    }
}

/// Everything a pipe needs for one run.
#[derive(Debug)]
pub struct Context {
    pub config: ProjectConfig,
    pub release: ReleaseMetadata,
    pub env: HashMap<String, String>,
    pub artifacts: ArtifactStore,
}

impl Context {
    /// Create a context that sees the process environment
    pub fn new(config: ProjectConfig, release: ReleaseMetadata, artifacts: ArtifactStore) -> Self {
        Self {
            config,
            release,
            env: std::env::vars().collect(),
            artifacts,
        }
    }

    /// Create a context with an explicit environment
    pub fn with_env(
        config: ProjectConfig,
        release: ReleaseMetadata,
        artifacts: ArtifactStore,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            config,
            release,
            env,
            artifacts,
        }
    }

    /// The scratch/distribution directory of this run
    pub fn dist(&self) -> &Path {
        &self.config.dist
    }
}
