//! Evaluation of a configured nix package against the release.

use crate::client::Repo;
use crate::nix::matrix::MatrixOptions;
use crate::tmpl::Template;
use nixpub_core::config::{CommitAuthor, DEFAULT_GOAMD64};
use nixpub_core::{NixConfig, NixDependency, NixpubError, NixpubResult};
use std::path::{Component, Path};

/// Where a pull request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
    pub base: Repo,
    pub draft: bool,
}

/// A package config with every template evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNix {
    pub name: String,
    pub path: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub url_template: String,
    pub install: String,
    pub extra_install: String,
    pub post_install: String,
    pub skip_upload: String,
    pub commit_message: String,
    pub commit_author: CommitAuthor,
    pub goamd64: String,
    pub ids: Vec<String>,
    pub dependencies: Vec<NixDependency>,
    pub repository: Repo,
    pub pull_request: Option<PullRequestTarget>,
}

impl ResolvedNix {
    /// Evaluate `nix`. `default_url_template` is only asked for when the
    /// package sets no `url_template`.
    pub fn evaluate<F>(nix: &NixConfig, tpl: &Template<'_>, default_url_template: F) -> NixpubResult<Self>
    where
        F: FnOnce() -> NixpubResult<String>,
    {
        let release = tpl.release();

        let name = if nix.name.is_empty() {
            release.project_name.clone()
        } else {
            tpl.apply_field("name", &nix.name)?
        };

        let owner = tpl.apply_field("repository.owner", &nix.repository.owner)?;
        let repo_name = tpl.apply_field("repository.name", &nix.repository.name)?;
        if repo_name.is_empty() {
            return Err(NixpubError::MissingRepository("name"));
        }
        if owner.is_empty() {
            return Err(NixpubError::MissingRepository("owner"));
        }
        let mut branch = tpl.apply_field("repository.branch", &nix.repository.branch)?;

        let skip_upload = tpl.apply_field("skip_upload", &nix.skip_upload)?.trim().to_string();
        let homepage = tpl.apply_field("homepage", &nix.homepage)?;
        let description = tpl.apply_field("description", &nix.description)?;
        let license = tpl.apply_field("license", &nix.license)?;
        check_license(&license)?;
        let path = if nix.path.is_empty() {
            format!("pkgs/{}/default.nix", name)
        } else {
            tpl.apply_field("path", &nix.path)?
        };
        check_relative_path(&path)?;
        let install = tpl.apply_field("install", &nix.install)?;
        let extra_install = tpl.apply_field("extra_install", &nix.extra_install)?;
        let post_install = tpl.apply_field("post_install", &nix.post_install)?;
        let commit_message = tpl.apply_field("commit_msg_template", &nix.commit_msg_template)?;

        // artifact fields are filled in per archive by the matrix builder
        let url_template = if nix.url_template.is_empty() {
            default_url_template()?
        } else {
            nix.url_template.clone()
        };

        let pull_request = if nix.repository.pull_request.enabled {
            if branch.is_empty() {
                branch = format!("{}-{}", name, release.version);
            }
            let base = match &nix.repository.pull_request.base {
                Some(base) if !base.owner.is_empty() && !base.name.is_empty() => Repo {
                    owner: tpl.apply_field("repository.owner", &base.owner)?,
                    name: tpl.apply_field("repository.name", &base.name)?,
                    branch: tpl.apply_field("repository.branch", &base.branch)?,
                },
                _ => Repo::new(&owner, &repo_name, ""),
            };
            Some(PullRequestTarget {
                base,
                draft: nix.repository.pull_request.draft,
            })
        } else {
            None
        };

        Ok(Self {
            name,
            path,
            description,
            homepage,
            license,
            url_template,
            install,
            extra_install,
            post_install,
            skip_upload,
            commit_message,
            commit_author: nix.commit_author.clone(),
            goamd64: if nix.goamd64.is_empty() {
                DEFAULT_GOAMD64.to_string()
            } else {
                nix.goamd64.clone()
            },
            ids: nix.ids.clone(),
            dependencies: nix.dependencies.clone(),
            repository: Repo {
                owner,
                name: repo_name,
                branch,
            },
            pull_request,
        })
    }

    pub fn matrix_options(&self) -> MatrixOptions<'_> {
        MatrixOptions {
            ids: &self.ids,
            goamd64: &self.goamd64,
            url_template: &self.url_template,
            dependencies: &self.dependencies,
            install: &self.install,
            extra_install: &self.extra_install,
        }
    }
}

/// `license` becomes `lib.licenses.<license>`
fn check_license(license: &str) -> NixpubResult<()> {
    let valid = license
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(NixpubError::Config(format!(
            "license '{}' is not a nixpkgs license attribute",
            license
        )))
    }
}

/// The manifest lands at `<dist>/nix/<path>` and at `<path>` in the repository
fn check_relative_path(path: &str) -> NixpubResult<()> {
    let mut components = Path::new(path).components().peekable();
    let inside = components.peek().is_some()
        && components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if inside {
        Ok(())
    } else {
        Err(NixpubError::Config(format!(
            "path '{}' must be relative and stay inside the repository",
            path
        )))
    }
}
