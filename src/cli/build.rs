use super::{load, ReleaseArgs, Session};
use nixpub::artifact::ArtifactKind;
use nixpub::core::path::ensure_dir;
use nixpub::nix::Pipe;
use nixpub::NixpubResult;

pub fn run(args: ReleaseArgs) -> NixpubResult<()> {
    let session = load(&args)?;
    build(&session)
}

pub fn build(session: &Session) -> NixpubResult<()> {
    let pipe = Pipe::new_build();
    if pipe.skip(&session.ctx) {
        println!("No nix packages configured, nothing to build");
        return Ok(());
    }

    let result = pipe.run_all(&session.ctx, &session.client);

    // keep what did get built so `publish` and later stages can find it
    ensure_dir(session.ctx.dist())?;
    session.ctx.artifacts.save(&session.artifacts_path)?;
    for manifest in session.ctx.artifacts.by_kind(&ArtifactKind::Nixpkg) {
        println!("✓ Wrote {}", manifest.path.display());
    }

    result
}
