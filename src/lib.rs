//! nixpub: nix derivations for release archives
//!
//! This crate renders a `default.nix` per configured package from the archives
//! of a release, and publishes it to a nix package repository. The error
//! taxonomy, configuration model and path helpers live in `nixpub-core`.

pub use nixpub_core::{
    format_error_with_help, ErrorHelp, NixConfig, NixpubError, NixpubResult, ProjectConfig,
};

/// Core module re-exported from nixpub-core.
pub mod core {
    pub use nixpub_core::core::*;

    /// Path module re-exported from nixpub-core.
    pub mod path {
        pub use nixpub_core::core::path::*;
    }
}

/// Configuration model re-exported from nixpub-core.
pub mod config {
    pub use nixpub_core::config::*;
}

/// Release artifacts.
pub mod artifact;

/// Per-run release context.
pub mod context;

/// `{{ .Field }}` templates.
pub mod tmpl;

/// The nix pipe.
pub mod nix;

/// Package repositories.
pub mod client;
