use clap::{Parser, Subcommand};
use nixpub::NixpubError;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "nixpub")]
#[command(about = "Nix derivations for your release archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the nix derivations locally, with placeholder checksums
    Build(cli::ReleaseArgs),
    /// Render with real checksums and push to the nix repository
    Publish(cli::ReleaseArgs),
    /// Build, then publish
    Release(cli::ReleaseArgs),
}

#[tokio::main]
async fn main() -> Result<(), NixpubError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => cli::build::run(args),
        Commands::Publish(args) => cli::publish::run(args).await,
        Commands::Release(args) => cli::release::run(args).await,
    };

    // Display error with helpful suggestions
    if let Err(ref e) = result {
        eprintln!("\n{}", nixpub::format_error_with_help(e));
    }

    result
}
