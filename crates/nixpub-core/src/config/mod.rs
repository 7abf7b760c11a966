//! Declarative project configuration loaded from `.nixpub.yaml`.

use crate::core::{NixpubError, NixpubResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// amd64 micro-architecture level used when a package does not pick one.
pub const DEFAULT_GOAMD64: &str = "v1";

/// Commit message used for the publish commit and the pull request title.
pub const DEFAULT_COMMIT_MSG_TEMPLATE: &str = "{{ .ProjectName }}: {{ .PreviousTag }} -> {{ .Tag }}";

pub const DEFAULT_COMMIT_AUTHOR_NAME: &str = "nixpubbot";
pub const DEFAULT_COMMIT_AUTHOR_EMAIL: &str = "bot@nixpub.dev";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_name: String,

    /// Scratch/distribution directory holding archives and rendered manifests
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    #[serde(default)]
    pub release: ReleaseConfig,

    /// Configured nix packages
    #[serde(default)]
    pub nix: Vec<NixConfig>,
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

/// Where release archives are downloaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub github: Option<GithubRepo>,

    #[serde(default = "default_download_url")]
    pub download_url: String,
}

fn default_download_url() -> String {
    "https://github.com".to_string()
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            github: None,
            download_url: default_download_url(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
}

/// One configured nix package.
///
/// Most string fields are templates evaluated against the release context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NixConfig {
    pub name: String,
    /// Artifact IDs to pull archives from; empty means every archive.
    pub ids: Vec<String>,
    pub url_template: String,
    pub commit_msg_template: String,
    pub commit_author: CommitAuthor,
    /// Destination path inside the repository.
    pub path: String,
    pub homepage: String,
    pub description: String,
    pub license: String,
    /// `true`, `auto` or anything else (publish).
    pub skip_upload: String,
    pub install: String,
    pub extra_install: String,
    pub post_install: String,
    pub goamd64: String,
    pub dependencies: Vec<NixDependency>,
    pub repository: RepoRef,
}

impl NixConfig {
    /// Fill in fields left unset in the configuration file.
    pub fn apply_defaults(&mut self, project_name: &str) {
        if self.name.is_empty() {
            self.name = project_name.to_string();
        }
        if self.goamd64.is_empty() {
            self.goamd64 = DEFAULT_GOAMD64.to_string();
        }
        if self.commit_msg_template.is_empty() {
            self.commit_msg_template = DEFAULT_COMMIT_MSG_TEMPLATE.to_string();
        }
        if self.commit_author.name.is_empty() {
            self.commit_author.name = DEFAULT_COMMIT_AUTHOR_NAME.to_string();
        }
        if self.commit_author.email.is_empty() {
            self.commit_author.email = DEFAULT_COMMIT_AUTHOR_EMAIL.to_string();
        }
    }
}

/// A runtime dependency, optionally restricted to one OS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixDependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<DependencyOs>,
}

impl NixDependency {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            os: None,
        }
    }

    pub fn only_on(name: &str, os: DependencyOs) -> Self {
        Self {
            name: name.to_string(),
            os: Some(os),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyOs {
    Linux,
    Darwin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Repository the manifest is published to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    /// Branch template; empty means the default branch.
    pub branch: String,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub enabled: bool,
    pub draft: bool,
    /// Repository the pull request targets; defaults to the head repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PullRequestBase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestBase {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl ProjectConfig {
    /// Load the project config from a YAML file
    pub fn load(path: &Path) -> NixpubResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse the project config from YAML text
    pub fn parse(content: &str) -> NixpubResult<Self> {
        let config: ProjectConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> NixpubResult<()> {
        if self.project_name.is_empty() {
            return Err(NixpubError::Config(
                "project_name cannot be empty".to_string(),
            ));
        }

        for (idx, nix) in self.nix.iter().enumerate() {
            if nix.dependencies.iter().any(|dep| dep.name.is_empty()) {
                return Err(NixpubError::Config(format!(
                    "nix[{}]: dependency name cannot be empty",
                    idx
                )));
            }
        }

        Ok(())
    }
}
