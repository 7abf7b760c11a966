use super::{Repo, RepositoryClient};
use crate::context::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nixpub_core::config::CommitAuthor;
use nixpub_core::{NixpubError, NixpubResult};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("nixpub/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RefInfo {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentInfo {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestInfo {
    html_url: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> NixpubResult<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Client for api.github.com, authenticated with `GITHUB_TOKEN` when set
    pub fn from_env() -> NixpubResult<Self> {
        let token = std::env::var("GITHUB_TOKEN").unwrap_or_default();
        let api_url = std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&api_url, &token)
    }

    fn repo_url(&self, repo: &Repo, rest: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            rest
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> NixpubResult<reqwest::RequestBuilder> {
        if self.token.is_empty() {
            return Err(NixpubError::Repository(
                "GITHUB_TOKEN is not set".to_string(),
            ));
        }
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json"))
    }

    async fn default_branch(&self, repo: &Repo) -> NixpubResult<String> {
        let url = self.repo_url(repo, "");
        let resp = check(self.request(reqwest::Method::GET, &url)?.send().await?).await?;
        let info: RepoInfo = resp.json().await?;
        Ok(info.default_branch)
    }

    /// Create `repo.branch` from the default branch when it does not exist yet
    async fn ensure_branch(&self, repo: &Repo) -> NixpubResult<()> {
        let url = self.repo_url(repo, &format!("/git/ref/heads/{}", encode_path(&repo.branch)));
        let resp = self.request(reqwest::Method::GET, &url)?.send().await?;
        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status() != StatusCode::NOT_FOUND {
            check(resp).await?;
        }

        let base = self.default_branch(repo).await?;
        let url = self.repo_url(repo, &format!("/git/ref/heads/{}", encode_path(&base)));
        let resp = check(self.request(reqwest::Method::GET, &url)?.send().await?).await?;
        let base_ref: RefInfo = resp.json().await?;

        debug!(repo = %repo, from = %base, "creating branch");
        let url = self.repo_url(repo, "/git/refs");
        let body = json!({
            "ref": format!("refs/heads/{}", repo.branch),
            "sha": base_ref.object.sha,
        });
        check(self.request(reqwest::Method::POST, &url)?.json(&body).send().await?).await?;
        Ok(())
    }

    /// Blob sha of `path`, if it already exists
    async fn file_sha(&self, repo: &Repo, path: &str) -> NixpubResult<Option<String>> {
        let url = self.repo_url(repo, &format!("/contents/{}", encode_path(path)));
        let mut req = self.request(reqwest::Method::GET, &url)?;
        if !repo.branch.is_empty() {
            req = req.query(&[("ref", repo.branch.as_str())]);
        }
        let resp = req.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let info: ContentInfo = check(resp).await?.json().await?;
        Ok(Some(info.sha))
    }
}

#[async_trait]
impl RepositoryClient for GithubClient {
    fn release_url_template(&self, ctx: &Context) -> NixpubResult<String> {
        let github = ctx.config.release.github.as_ref().ok_or_else(|| {
            NixpubError::Config(
                "release.github is not set, configure it or set nix[].url_template".to_string(),
            )
        })?;
        Ok(format!(
            "{}/{}/{}/releases/download/{{{{ .Tag }}}}/{{{{ .ArtifactName }}}}",
            ctx.config.release.download_url.trim_end_matches('/'),
            github.owner,
            github.name
        ))
    }

    async fn create_file(
        &self,
        author: &CommitAuthor,
        repo: &Repo,
        content: &[u8],
        path: &str,
        message: &str,
    ) -> NixpubResult<()> {
        if !repo.branch.is_empty() {
            self.ensure_branch(repo).await?;
        }

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content),
            "committer": { "name": author.name, "email": author.email },
        });
        if !repo.branch.is_empty() {
            body["branch"] = json!(repo.branch);
        }
        if let Some(sha) = self.file_sha(repo, path).await? {
            body["sha"] = json!(sha);
        }

        let url = self.repo_url(repo, &format!("/contents/{}", encode_path(path)));
        check(self.request(reqwest::Method::PUT, &url)?.json(&body).send().await?).await?;
        info!(repo = %repo, path, "pushed manifest");
        Ok(())
    }

    async fn open_pull_request(
        &self,
        base: &Repo,
        head: &Repo,
        title: &str,
        draft: bool,
    ) -> NixpubResult<()> {
        let base_branch = if base.branch.is_empty() {
            self.default_branch(base).await?
        } else {
            base.branch.clone()
        };
        let head_ref = if base.owner == head.owner && base.name == head.name {
            head.branch.clone()
        } else {
            format!("{}:{}", head.owner, head.branch)
        };

        let url = self.repo_url(base, "/pulls");
        let body = json!({
            "title": title,
            "head": head_ref,
            "base": base_branch,
            "draft": draft,
        });
        let resp = check(self.request(reqwest::Method::POST, &url)?.json(&body).send().await?).await?;
        let pr: PullRequestInfo = resp.json().await?;
        info!(url = %pr.html_url, "pull request opened");
        Ok(())
    }
}

/// Encode each segment of a repository path
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn check(resp: Response) -> NixpubResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(NixpubError::Repository(format!("HTTP {} - {}", status, body)))
}
