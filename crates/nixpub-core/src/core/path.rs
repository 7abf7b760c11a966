use crate::core::error::{NixpubError, NixpubResult};
use std::path::{Path, PathBuf};

/// Config file names, in lookup order
pub const CONFIG_FILE_NAMES: &[&str] = &[".nixpub.yaml", "nixpub.yaml"];

/// Name of the artifact list inside the dist directory
pub const ARTIFACTS_FILE_NAME: &str = "artifacts.json";

/// Find the config file in `dir`, if any
pub fn config_file_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Find the project root by looking for .nixpub.yaml (or nixpub.yaml)
pub fn find_project_root(start: &Path) -> NixpubResult<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if config_file_in(&current).is_some() {
            return Ok(current);
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            return Err(NixpubError::Path(
                "Could not find .nixpub.yaml in current directory or parents".to_string(),
            ));
        }
    }
}

/// Directory holding locally rendered manifests (<dist>/nix)
pub fn manifest_dir(dist: &Path) -> PathBuf {
    dist.join("nix")
}

/// Path of the artifact list (<dist>/artifacts.json)
pub fn artifacts_file(dist: &Path) -> PathBuf {
    dist.join(ARTIFACTS_FILE_NAME)
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> NixpubResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
