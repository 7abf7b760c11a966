//! The nix pipe: build a derivation per configured package and publish it.

pub mod matrix;
pub mod package;
pub mod platform;
pub mod prefetch;
pub mod render;


use crate::artifact::{Artifact, ArtifactExtra, ArtifactKind};
use crate::client::RepositoryClient;
use crate::context::Context;
use crate::tmpl::Template;
use nixpub_core::core::path::{ensure_dir, manifest_dir};
use nixpub_core::{NixConfig, NixpubError, NixpubResult, SkipReason};
use package::ResolvedNix;
use prefetch::{BuildShaPrefetcher, PublishShaPrefetcher, ShaPrefetcher, NIX_PREFETCH_URL_BIN};
use render::{Manifest, ManifestKind, ManifestRenderer};
use std::fs;
use tracing::{debug, error, info};

/// Pipe for nix derivations
pub struct Pipe {
    prefetcher: Box<dyn ShaPrefetcher>,
}

impl Pipe {
    /// Pipe of the build phase, checksums are placeholders
    pub fn new_build() -> Self {
        Self::with_prefetcher(BuildShaPrefetcher)
    }

    /// Pipe of the publish phase, checksums come from `nix-prefetch-url`
    pub fn new_publish() -> Self {
        Self::with_prefetcher(PublishShaPrefetcher::default())
    }

    pub fn with_prefetcher(prefetcher: impl ShaPrefetcher + 'static) -> Self {
        Self {
            prefetcher: Box::new(prefetcher),
        }
    }

    pub fn name(&self) -> &'static str {
        "nixpkgs"
    }

    /// A failing package does not stop the others
    pub fn continue_on_error(&self) -> bool {
        true
    }

    /// External tools the publish phase needs
    pub fn dependencies(&self) -> &'static [&'static str] {
        &[NIX_PREFETCH_URL_BIN]
    }

    pub fn skip(&self, ctx: &Context) -> bool {
        ctx.config.nix.is_empty() || !self.prefetcher.available()
    }

    /// Fill in the unset fields of every configured package
    pub fn default(&self, ctx: &mut Context) {
        let project_name = ctx.config.project_name.clone();
        for nix in &mut ctx.config.nix {
            nix.apply_defaults(&project_name);
        }
    }

    /// Render every package locally into `<dist>/nix`
    pub fn run_all(&self, ctx: &Context, client: &dyn RepositoryClient) -> NixpubResult<()> {
        let mut first_err = None;
        for nix in &ctx.config.nix {
            if let Err(err) = self.run_one(ctx, nix, client) {
                error!(package = %nix.name, error = %err, "nix build failed");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn run_one(&self, ctx: &Context, nix: &NixConfig, client: &dyn RepositoryClient) -> NixpubResult<()> {
        let pkg = ResolvedNix::evaluate(nix, &Template::new(ctx), || client.release_url_template(ctx))?;
        let manifest = self.prepare(ctx, &pkg, ManifestKind::Build)?;

        let path = manifest_dir(ctx.dist()).join(&manifest.path);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        info!(path = %path.display(), "writing nix manifest");
        fs::write(&path, &manifest.content)?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        ctx.artifacts.add(Artifact {
            name,
            path,
            os: String::new(),
            arch: String::new(),
            arm: String::new(),
            amd64: String::new(),
            kind: ArtifactKind::Nixpkg,
            extra: ArtifactExtra {
                id: pkg.name.clone(),
                ..Default::default()
            },
        });
        Ok(())
    }

    /// Re-render every package with real checksums and push it
    pub async fn publish_all(&self, ctx: &Context, client: &dyn RepositoryClient) -> NixpubResult<()> {
        let mut skips = Vec::new();
        let mut first_err = None;
        for nix in &ctx.config.nix {
            match self.publish_one(ctx, nix, client).await {
                Ok(()) => {}
                Err(NixpubError::Skipped(reasons)) => {
                    info!(package = %nix.name, reasons = ?reasons, "skipping nix publish");
                    skips.extend(reasons);
                }
                Err(err) => {
                    error!(package = %nix.name, error = %err, "nix publish failed");
                    first_err.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }
        if !skips.is_empty() {
            return Err(NixpubError::Skipped(skips));
        }
        Ok(())
    }

    async fn publish_one(
        &self,
        ctx: &Context,
        nix: &NixConfig,
        client: &dyn RepositoryClient,
    ) -> NixpubResult<()> {
        let pkg = ResolvedNix::evaluate(nix, &Template::new(ctx), || client.release_url_template(ctx))?;

        match pkg.skip_upload.as_str() {
            "true" => return Err(NixpubError::Skipped(vec![SkipReason::SkipUpload])),
            "auto" if ctx.release.is_prerelease() => {
                return Err(NixpubError::Skipped(vec![SkipReason::SkipUploadAuto]))
            }
            _ => {}
        }

        let manifest = self.prepare(ctx, &pkg, ManifestKind::Publish)?;

        info!(repo = %pkg.repository, path = %manifest.path, "pushing nix manifest");
        client
            .create_file(
                &pkg.commit_author,
                &pkg.repository,
                manifest.content.as_bytes(),
                &manifest.path,
                &pkg.commit_message,
            )
            .await?;

        let Some(target) = &pkg.pull_request else {
            debug!("nix.pull_request disabled");
            return Ok(());
        };

        info!(base = %target.base, "nix.pull_request enabled, creating a PR");
        client
            .open_pull_request(&target.base, &pkg.repository, &pkg.commit_message, target.draft)
            .await
    }

    /// Group the archives, resolve checksums and render
    fn prepare(&self, ctx: &Context, pkg: &ResolvedNix, kind: ManifestKind) -> NixpubResult<Manifest> {
        let archives = ctx.artifacts.by_kind(&ArtifactKind::UploadableArchive);
        let matrix = matrix::build(&archives, &pkg.matrix_options(), &Template::new(ctx))?;
        let checksums = prefetch::prefetch_all(self.prefetcher.as_ref(), matrix.urls())?;
        ManifestRenderer::render(pkg, &matrix, &checksums, &ctx.release, kind)
    }
}
