use super::{build, load, publish, ReleaseArgs};
use nixpub::nix::Pipe;
use nixpub::NixpubResult;
use tracing::warn;

pub async fn run(args: ReleaseArgs) -> NixpubResult<()> {
    let session = load(&args)?;

    let built = build::build(&session);
    if let Err(err) = &built {
        if !Pipe::new_build().continue_on_error() {
            return built;
        }
        warn!(error = %err, "nix build failed, publishing the remaining packages");
    }

    let published = publish::publish(&session).await;
    built.and(published)
}
