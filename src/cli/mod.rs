pub mod build;
pub mod publish;
pub mod release;

use clap::Args;
use nixpub::artifact::ArtifactStore;
use nixpub::client::GithubClient;
use nixpub::context::{Context, ReleaseMetadata};
use nixpub::core::path::{artifacts_file, config_file_in, find_project_root};
use nixpub::nix::Pipe;
use nixpub::{NixpubError, NixpubResult, ProjectConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Arguments shared by every command
#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Tag being released, e.g. v1.2.1
    #[arg(long)]
    pub tag: String,
    /// Previous tag, used in the commit message
    #[arg(long, default_value = "")]
    pub previous_tag: String,
    /// Config file (default: .nixpub.yaml in the current directory or a parent)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Everything a command works with
pub struct Session {
    pub ctx: Context,
    pub artifacts_path: PathBuf,
    pub client: GithubClient,
}

pub fn load(args: &ReleaseArgs) -> NixpubResult<Session> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let current_dir = env::current_dir()
                .map_err(|e| NixpubError::Path(format!("Failed to get current directory: {}", e)))?;
            let root = find_project_root(&current_dir)?;
            config_file_in(&root).ok_or_else(|| {
                NixpubError::Path(format!("Could not find .nixpub.yaml in {}", root.display()))
            })?
        }
    };
    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut config = ProjectConfig::load(&config_path)?;
    if config.dist.is_relative() {
        config.dist = root.join(&config.dist);
    }

    let artifacts_path = artifacts_file(&config.dist);
    let artifacts = if artifacts_path.is_file() {
        ArtifactStore::load(&artifacts_path)?
    } else {
        ArtifactStore::default()
    };

    let release = ReleaseMetadata::from_tag(&config.project_name, &args.tag, &args.previous_tag)?;
    let mut ctx = Context::new(config, release, artifacts);
    Pipe::new_build().default(&mut ctx);

    Ok(Session {
        ctx,
        artifacts_path,
        client: GithubClient::from_env()?,
    })
}
