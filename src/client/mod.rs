//! Repositories the rendered manifests are published to.

pub mod github;
#[cfg(test)]
pub mod mock;

use crate::context::Context;
use async_trait::async_trait;
use nixpub_core::config::CommitAuthor;
use nixpub_core::NixpubResult;
use std::fmt;

pub use github::GithubClient;

/// A repository and the branch to work on (empty for the default branch)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl Repo {
    pub fn new(owner: &str, name: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if !self.branch.is_empty() {
            write!(f, "@{}", self.branch)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Download URL template used when a package sets none
    fn release_url_template(&self, ctx: &Context) -> NixpubResult<String>;

    /// Create or update `path` in `repo` on `repo.branch`
    async fn create_file(
        &self,
        author: &CommitAuthor,
        repo: &Repo,
        content: &[u8],
        path: &str,
        message: &str,
    ) -> NixpubResult<()>;

    /// Open a pull request from `head` into `base`
    async fn open_pull_request(
        &self,
        base: &Repo,
        head: &Repo,
        title: &str,
        draft: bool,
    ) -> NixpubResult<()>;
}
