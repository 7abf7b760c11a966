use crate::core::{NixpubError, PrefetchError};

/// Provides helpful suggestions for common errors
pub trait ErrorHelp {
    fn help(&self) -> Option<String>;
}

impl ErrorHelp for NixpubError {
    fn help(&self) -> Option<String> {
        match self {
            NixpubError::MissingRepository(field) => Some(format!(
                "💡 Suggestion: Set nix[].repository.{} in your .nixpub.yaml",
                field
            )),
            NixpubError::Template { field, .. } => Some(format!(
                "💡 Suggestion: Check the '{}' field. Available fields: .ProjectName, .Version, .Tag, .PreviousTag, .Major, .Minor, .Patch, .Prerelease, .Env.NAME",
                field
            )),
            NixpubError::NoArchivesFound(_) => Some(
                "💡 Suggestion: Make sure 'ids' and 'goamd64' match archives listed in dist/artifacts.json (tar.gz or zip, linux or darwin)"
                    .to_string(),
            ),
            NixpubError::Prefetch(PrefetchError::NotFound { bin }) => Some(format!(
                "💡 Suggestion: Install Nix so that '{}' is available in PATH",
                bin
            )),
            NixpubError::Prefetch(PrefetchError::Failed { .. }) => Some(
                "💡 Suggestion: Check that the release assets are uploaded and publicly downloadable"
                    .to_string(),
            ),
            NixpubError::PlaceholderChecksum(_) => Some(
                "💡 Suggestion: Publish with the real checksum tool ('nixpub publish') instead of the build phase prefetcher"
                    .to_string(),
            ),
            NixpubError::Path(msg) => {
                if msg.contains("Could not find .nixpub.yaml") {
                    Some(
                        "💡 Suggestion: Create a .nixpub.yaml in your project root, or pass --config"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            NixpubError::Yaml(e) => {
                Some(format!(
                    "💡 Suggestion: Check your YAML syntax. Common issues:\n  - Missing colons after keys\n  - Incorrect indentation\n  - Unclosed quotes\n  - Unknown dependency os (only 'linux' and 'darwin')\n\nError details: {}",
                    e
                ))
            }
            NixpubError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    Some(
                        "💡 Suggestion: Check your internet connection and firewall settings"
                            .to_string(),
                    )
                } else {
                    Some(
                        "💡 Suggestion: Check that GITHUB_TOKEN is set and can write to the target repository"
                            .to_string(),
                    )
                }
            }
            NixpubError::Io(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    Some(
                        "💡 Suggestion: Check file permissions of the dist directory"
                            .to_string(),
                    )
                } else if e.kind() == std::io::ErrorKind::NotFound {
                    Some(
                        "💡 Suggestion: The file or directory may not exist. Did the archive build run first?"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Format an error with helpful suggestions
pub fn format_error_with_help(error: &NixpubError) -> String {
    let mut output = format!("❌ Error: {}", error);

    if let Some(help) = error.help() {
        output.push_str("\n\n");
        output.push_str(&help);
    }

    output
}
