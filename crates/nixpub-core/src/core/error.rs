use std::fmt;
use thiserror::Error;

pub type NixpubResult<T> = Result<T, NixpubError>;

#[derive(Error, Debug)]
pub enum NixpubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version error: {0}")]
    Version(String),

    /// The repository reference lacks an owner or a name after templating.
    #[error("repository {0} is not set")]
    MissingRepository(&'static str),

    /// A template-bearing field failed to evaluate. `field` names its role.
    #[error("failed to evaluate {field}: {source}")]
    Template {
        field: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    NoArchivesFound(#[from] NoArchivesFound),

    #[error("found archives with multiple formats or the same platform: {0}")]
    MultipleArchivesSamePlatform(String),

    #[error("no checksum resolved for {0}")]
    MissingChecksum(String),

    #[error("refusing to render a publishable manifest with the placeholder checksum for {0}")]
    PlaceholderChecksum(String),

    #[error(transparent)]
    Prefetch(#[from] PrefetchError),

    #[error("Repository error: {0}")]
    Repository(String),

    /// Expected early termination of the publish phase.
    #[error("skipped: {}", join_reasons(.0))]
    Skipped(Vec<SkipReason>),
}

impl NixpubError {
    /// Build a template error tagged with the role of the field that failed.
    pub fn template(field: &'static str, source: TemplateError) -> Self {
        NixpubError::Template { field, source }
    }

    /// Whether this error is a reported-but-expected skip rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, NixpubError::Skipped(_))
    }

    /// The skip reasons carried by this error, empty for real failures.
    pub fn skip_reasons(&self) -> &[SkipReason] {
        match self {
            NixpubError::Skipped(reasons) => reasons,
            _ => &[],
        }
    }
}

fn join_reasons(reasons: &[SkipReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why the publish phase of a package stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `skip_upload` evaluated to `true`.
    SkipUpload,
    /// `skip_upload` evaluated to `auto` and the release is a pre-release.
    SkipUploadAuto,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SkipUpload => write!(f, "nix.skip_upload is set"),
            SkipReason::SkipUploadAuto => write!(
                f,
                "nix.skip_upload is set to 'auto', and current version is a pre-release"
            ),
        }
    }
}

/// Failure of the template engine, before a field role is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("map has no entry for key \"{0}\"")]
    UnknownField(String),

    #[error("environment variable \"{0}\" is not set")]
    MissingEnv(String),

    #[error("unsupported action \"{{{{ {0} }}}}\"")]
    UnsupportedAction(String),

    #[error("unclosed action in \"{0}\"")]
    Unclosed(String),

    #[error("invalid template engine pattern: {0}")]
    Engine(String),
}

/// No archive survived the platform filter for a package.
///
/// The criteria are kept as fields so callers can report them without
/// parsing the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "no archives found matching goos=[{}] goarch=[{}] goarm=[{}] goamd64={goamd64} ids=[{}]",
    .goos.join(" "),
    .goarch.join(" "),
    .goarm.join(" "),
    .ids.join(" ")
)]
pub struct NoArchivesFound {
    pub goos: Vec<String>,
    pub goarch: Vec<String>,
    pub goarm: Vec<String>,
    pub goamd64: String,
    pub ids: Vec<String>,
}

/// Failures of the external checksum tool.
#[derive(Error, Debug)]
pub enum PrefetchError {
    /// The executable could not be resolved on the search path.
    #[error("{bin}: executable file not found in $PATH")]
    NotFound { bin: String },

    /// The executable ran and exited unsuccessfully.
    #[error("could not prefetch url: {url}: {status}: {output}")]
    Failed {
        url: String,
        status: String,
        output: String,
    },

    #[error("could not run {bin}: {source}")]
    Io {
        bin: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_archives_found_message() {
        let err = NoArchivesFound {
            goos: vec!["darwin".to_string(), "linux".to_string()],
            goarch: vec![
                "amd64".to_string(),
                "arm".to_string(),
                "arm64".to_string(),
                "386".to_string(),
            ],
            goarm: vec!["6".to_string(), "7".to_string()],
            goamd64: "v1".to_string(),
            ids: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no archives found matching goos=[darwin linux] goarch=[amd64 arm arm64 386] goarm=[6 7] goamd64=v1 ids=[foo bar]"
        );
    }

    #[test]
    fn test_skipped_lists_every_reason() {
        let err = NixpubError::Skipped(vec![SkipReason::SkipUpload, SkipReason::SkipUploadAuto]);
        assert!(err.is_skip());
        assert_eq!(err.skip_reasons().len(), 2);
        assert!(err.to_string().contains("nix.skip_upload is set,"));
    }

    #[test]
    fn test_template_error_names_field() {
        let err = NixpubError::template("homepage", TemplateError::UnknownField("Nope".to_string()));
        assert!(!err.is_skip());
        assert_eq!(
            err.to_string(),
            "failed to evaluate homepage: map has no entry for key \"Nope\""
        );
    }
}
