// Core functionality
pub mod core;

// Project configuration
pub mod config;

// Re-export commonly used types
pub use config::{NixConfig, NixDependency, ProjectConfig, RepoRef};
pub use core::{
    format_error_with_help, ErrorHelp, NixpubError, NixpubResult, NoArchivesFound,
    PrefetchError, SkipReason, TemplateError,
};
