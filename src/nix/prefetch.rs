//! Resolution of download URLs to nix sha256 checksums.

use nixpub_core::PrefetchError;
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, warn};

/// Placeholder checksum used while only verifying the build
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000";

/// Tool used to compute real checksums
pub const NIX_PREFETCH_URL_BIN: &str = "nix-prefetch-url";

/// Download URL to checksum, ordered for stable output
pub type ChecksumMap = BTreeMap<String, String>;

pub trait ShaPrefetcher: Send + Sync {
    fn prefetch(&self, url: &str) -> Result<String, PrefetchError>;
    fn available(&self) -> bool;
}

/// Prefetcher of the build phase: never touches the network
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildShaPrefetcher;

impl ShaPrefetcher for BuildShaPrefetcher {
    fn prefetch(&self, _url: &str) -> Result<String, PrefetchError> {
        Ok(ZERO_HASH.to_string())
    }

    fn available(&self) -> bool {
        true
    }
}

/// Prefetcher of the publish phase: runs `nix-prefetch-url <url>`
#[derive(Debug, Clone)]
pub struct PublishShaPrefetcher {
    bin: String,
}

impl PublishShaPrefetcher {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }
}

impl Default for PublishShaPrefetcher {
    fn default() -> Self {
        Self::new(NIX_PREFETCH_URL_BIN)
    }
}

impl ShaPrefetcher for PublishShaPrefetcher {
    fn prefetch(&self, url: &str) -> Result<String, PrefetchError> {
        let bin = which::which(&self.bin).map_err(|_| PrefetchError::NotFound {
            bin: self.bin.clone(),
        })?;

        debug!(url, bin = %bin.display(), "prefetching");
        let output = Command::new(&bin)
            .arg(url)
            .output()
            .map_err(|source| PrefetchError::Io {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Err(PrefetchError::Failed {
                url: url.to_string(),
                status: output.status.to_string(),
                output: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn available(&self) -> bool {
        match which::which(&self.bin) {
            Ok(_) => true,
            Err(_) => {
                warn!(bin = %self.bin, "checksum tool not found in PATH");
                false
            }
        }
    }
}

/// Prefetch every URL once
pub fn prefetch_all<'a, I>(prefetcher: &dyn ShaPrefetcher, urls: I) -> Result<ChecksumMap, PrefetchError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut checksums = ChecksumMap::new();
    for url in urls {
        if checksums.contains_key(url) {
            continue;
        }
        let sha = prefetcher.prefetch(url)?;
        checksums.insert(url.to_string(), sha);
    }
    Ok(checksums)
}
