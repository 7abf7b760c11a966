use super::{load, ReleaseArgs, Session};
use nixpub::nix::Pipe;
use nixpub::NixpubResult;

pub async fn run(args: ReleaseArgs) -> NixpubResult<()> {
    let session = load(&args)?;
    publish(&session).await
}

pub async fn publish(session: &Session) -> NixpubResult<()> {
    let pipe = Pipe::new_publish();
    if pipe.skip(&session.ctx) {
        println!(
            "⚠️  Skipping {}: no nix packages configured or {} not found in PATH",
            pipe.name(),
            pipe.dependencies().join(", ")
        );
        return Ok(());
    }

    match pipe.publish_all(&session.ctx, &session.client).await {
        Ok(()) => {
            println!("✓ Published {} nix package(s)", session.ctx.config.nix.len());
            Ok(())
        }
        Err(e) if e.is_skip() => {
            println!("⚠️  {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
