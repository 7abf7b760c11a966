//! Release artifacts produced upstream and the manifests this tool adds.

use nixpub_core::NixpubResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Classification of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactKind {
    /// An archive that gets uploaded to the release.
    UploadableArchive,
    /// A rendered nix derivation.
    Nixpkg,
    /// Anything else listed by the build pipeline (checksums, signatures, ...).
    Other(String),
}

impl From<String> for ArtifactKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Archive" => ArtifactKind::UploadableArchive,
            "Nixpkg" => ArtifactKind::Nixpkg,
            _ => ArtifactKind::Other(value),
        }
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::UploadableArchive => "Archive".to_string(),
            ArtifactKind::Nixpkg => "Nixpkg".to_string(),
            ArtifactKind::Other(value) => value,
        }
    }
}

/// Extra attributes recorded alongside an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactExtra {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Format", default)]
    pub format: String,
    /// Binaries contained in the archive.
    #[serde(rename = "Binaries", default)]
    pub binaries: Vec<String>,
    /// Subdirectory the archive payload lives in, if any.
    #[serde(rename = "WrappedIn", default)]
    pub wrapped_in: String,
    /// Universal binary that supersedes the per-architecture archives of its OS.
    #[serde(rename = "Replaces", default)]
    pub replaces: bool,
    /// Attributes this tool does not interpret, kept so saving is lossless.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// One build output, as listed in `dist/artifacts.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "goos", default)]
    pub os: String,
    #[serde(rename = "goarch", default)]
    pub arch: String,
    #[serde(rename = "goarm", default, skip_serializing_if = "String::is_empty")]
    pub arm: String,
    #[serde(rename = "goamd64", default, skip_serializing_if = "String::is_empty")]
    pub amd64: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    #[serde(default)]
    pub extra: ArtifactExtra,
}

impl Artifact {
    pub fn id(&self) -> &str {
        &self.extra.id
    }

    pub fn format(&self) -> &str {
        &self.extra.format
    }
}

/// Append-only artifact list shared by every package of a run.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    items: Mutex<Vec<Artifact>>,
}

impl ArtifactStore {
    pub fn new(items: Vec<Artifact>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Load the artifact list written by the build pipeline
    pub fn load(path: &Path) -> NixpubResult<Self> {
        let content = fs::read_to_string(path)?;
        let items: Vec<Artifact> = serde_json::from_str(&content)?;
        Ok(Self::new(items))
    }

    /// Write the artifact list back, including artifacts added by this run
    pub fn save(&self, path: &Path) -> NixpubResult<()> {
        let content = serde_json::to_string_pretty(&*self.lock())?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn add(&self, artifact: Artifact) {
        self.lock().push(artifact);
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<Artifact>
    where
        F: Fn(&Artifact) -> bool,
    {
        self.lock().iter().filter(|a| predicate(a)).cloned().collect()
    }

    pub fn by_kind(&self, kind: &ArtifactKind) -> Vec<Artifact> {
        self.filter(|a| &a.kind == kind)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Artifact>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
