//! Nix derivation text.

use crate::context::ReleaseMetadata;
use crate::nix::matrix::{InstallBranch, PlatformMatrix};
use crate::nix::package::ResolvedNix;
use crate::nix::prefetch::{ChecksumMap, ZERO_HASH};
use nixpub_core::{NixpubError, NixpubResult};
use std::collections::BTreeSet;

/// Whether a manifest may leave the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Local build verification, carries placeholder checksums
    Build,
    /// Pushed to the repository, carries real checksums
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ManifestKind,
    /// Destination path inside the repository
    pub path: String,
    pub content: String,
}

/// Generates `default.nix` files
pub struct ManifestRenderer;

impl ManifestRenderer {
    /// Render the derivation of `pkg`
    pub fn render(
        pkg: &ResolvedNix,
        matrix: &PlatformMatrix,
        checksums: &ChecksumMap,
        release: &ReleaseMetadata,
        kind: ManifestKind,
    ) -> NixpubResult<Manifest> {
        let mut systems = Vec::new();
        for (platform, desc) in matrix.systems() {
            let Some(system) = platform.nix_system() else {
                continue;
            };
            let sha = checksums
                .get(&desc.url)
                .ok_or_else(|| NixpubError::MissingChecksum(desc.url.clone()))?;
            if kind == ManifestKind::Publish && sha == ZERO_HASH {
                return Err(NixpubError::PlaceholderChecksum(desc.url.clone()));
            }
            systems.push((system, desc, sha));
        }

        let mut inputs = vec!["installShellFiles"];
        if !pkg.dependencies.is_empty() {
            inputs.push("makeWrapper");
        }
        if matrix.uses_zip() {
            inputs.push("unzip");
        }

        let mut args: Vec<&str> = vec![
            "system ? builtins.currentSystem",
            "lib",
            "fetchurl",
            "installShellFiles",
            "stdenvNoCC",
        ];
        let mut seen: BTreeSet<&str> = args.iter().copied().collect();
        let extra_args = inputs[1..]
            .iter()
            .copied()
            .chain(pkg.dependencies.iter().map(|dep| dep.name.as_str()));
        for arg in extra_args {
            if seen.insert(arg) {
                args.push(arg);
            }
        }

        let mut nix = String::new();

        // Header
        nix.push_str("# This file was generated by nixpub. DO NOT EDIT.\n");
        nix.push_str("# vim: set ft=nix ts=2 sw=2 sts=2 et sta\n");
        nix.push_str("{\n");
        for (idx, arg) in args.iter().enumerate() {
            if idx == 0 {
                nix.push_str(&format!("{}\n", arg));
            } else {
                nix.push_str(&format!(", {}\n", arg));
            }
        }
        nix.push_str("}:\n");

        // Per-system maps
        nix.push_str("let\n");
        push_map(&mut nix, "shaMap", systems.iter().map(|(s, _, sha)| (*s, sha.as_str())));
        nix.push('\n');
        push_map(&mut nix, "urlMap", systems.iter().map(|(s, d, _)| (*s, d.url.as_str())));
        nix.push('\n');
        push_map(
            &mut nix,
            "sourceRootMap",
            systems.iter().map(|(s, d, _)| (*s, d.source_root())),
        );
        nix.push_str("in\n");

        // Derivation
        nix.push_str("stdenvNoCC.mkDerivation {\n");
        nix.push_str(&format!("  pname = \"{}\";\n", escape_nix_string(&pkg.name)));
        nix.push_str(&format!("  version = \"{}\";\n", escape_nix_string(&release.version)));
        nix.push_str("  src = fetchurl {\n");
        nix.push_str("    url = urlMap.${system};\n");
        nix.push_str("    sha256 = shaMap.${system};\n");
        nix.push_str("  };\n");
        nix.push('\n');
        nix.push_str("  sourceRoot = sourceRootMap.${system};\n");
        nix.push('\n');
        nix.push_str(&format!("  nativeBuildInputs = [ {} ];\n", inputs.join(" ")));
        nix.push('\n');
        push_install_phase(&mut nix, &matrix.install);

        let post_install: Vec<&str> = pkg
            .post_install
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();
        if !post_install.is_empty() {
            nix.push('\n');
            nix.push_str("  postInstall = ''\n");
            for line in post_install {
                nix.push_str(&format!("    {}\n", line));
            }
            nix.push_str("  '';\n");
        }

        nix.push('\n');
        nix.push_str("  system = system;\n");
        nix.push('\n');

        // Meta
        nix.push_str("  meta = {\n");
        if !pkg.description.is_empty() {
            nix.push_str(&format!(
                "    description = \"{}\";\n",
                escape_nix_string(&pkg.description)
            ));
        }
        if !pkg.homepage.is_empty() {
            nix.push_str(&format!(
                "    homepage = \"{}\";\n",
                escape_nix_string(&pkg.homepage)
            ));
        }
        if !pkg.license.is_empty() {
            nix.push_str(&format!("    license = lib.licenses.{};\n", pkg.license));
        }
        nix.push('\n');
        nix.push_str("    sourceProvenance = [ lib.sourceTypes.binaryNativeCode ];\n");
        nix.push('\n');
        nix.push_str("    platforms = [\n");
        let platforms: BTreeSet<&str> = systems.iter().map(|(s, _, _)| *s).collect();
        for system in platforms {
            nix.push_str(&format!("      \"{}\"\n", system));
        }
        nix.push_str("    ];\n");
        nix.push_str("  };\n");
        nix.push_str("}\n");

        if kind == ManifestKind::Publish && nix.contains(ZERO_HASH) {
            return Err(NixpubError::PlaceholderChecksum(pkg.path.clone()));
        }

        Ok(Manifest {
            kind,
            path: pkg.path.clone(),
            content: nix,
        })
    }
}

fn push_map<'a>(nix: &mut String, name: &str, entries: impl Iterator<Item = (&'a str, &'a str)>) {
    nix.push_str(&format!("  {} = {{\n", name));
    for (system, value) in entries {
        nix.push_str(&format!("    {} = \"{}\";\n", system, escape_nix_string(value)));
    }
    nix.push_str("  };\n");
}

fn push_install_phase(nix: &mut String, branches: &[InstallBranch]) {
    if let [InstallBranch {
        condition: None,
        lines,
    }] = branches
    {
        nix.push_str("  installPhase = ''\n");
        for line in lines {
            nix.push_str(&format!("    {}\n", line));
        }
        nix.push_str("  '';\n");
        return;
    }

    nix.push_str("  installPhase =\n");
    for (idx, branch) in branches.iter().enumerate() {
        let keyword = if idx == 0 { "if" } else { "else if" };
        let condition = branch.condition.as_deref().unwrap_or("true");
        nix.push_str(&format!("    {} {} then ''\n", keyword, condition));
        for line in &branch.lines {
            nix.push_str(&format!("      {}\n", line));
        }
        nix.push_str("    ''\n");
    }
    nix.push_str("    else throw \"unsupported system: ${system}\";\n");
}

/// Escape text for a double-quoted nix string
fn escape_nix_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "\\${")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactExtra, ArtifactKind};
    use crate::client::Repo;
    use crate::nix::matrix::{self, MatrixOptions};
    use crate::tmpl::Template;
    use nixpub_core::config::CommitAuthor;
    use nixpub_core::core::version::Semver;
    use nixpub_core::NixDependency;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn release() -> ReleaseMetadata {
        ReleaseMetadata {
            project_name: "foo".to_string(),
            version: "1.2.1".to_string(),
            tag: "v1.2.1".to_string(),
            previous_tag: "v1.2.0".to_string(),
            semver: Semver::new(1, 2, 1, ""),
            date: String::new(),
        }
    }

    fn pkg() -> ResolvedNix {
        ResolvedNix {
            name: "foo".to_string(),
            path: "pkgs/foo/default.nix".to_string(),
            description: "my \"test\"".to_string(),
            homepage: "https://goreleaser.com".to_string(),
            license: "mit".to_string(),
            url_template: "https://dummyhost/download/{{ .Tag }}/{{ .ArtifactName }}".to_string(),
            install: String::new(),
            extra_install: String::new(),
            post_install: String::new(),
            skip_upload: String::new(),
            commit_message: "foo: v1.2.0 -> v1.2.1".to_string(),
            commit_author: CommitAuthor::default(),
            goamd64: "v1".to_string(),
            ids: Vec::new(),
            dependencies: Vec::new(),
            repository: Repo::new("foo", "bar", ""),
            pull_request: None,
        }
    }

    fn archive(os: &str, arch: &str, format: &str) -> Artifact {
        Artifact {
            name: format!("foo_{}_{}.{}", os, arch, format),
            path: PathBuf::from("dist/foo"),
            os: os.to_string(),
            arch: arch.to_string(),
            arm: String::new(),
            amd64: if arch == "amd64" { "v1".to_string() } else { String::new() },
            kind: ArtifactKind::UploadableArchive,
            extra: ArtifactExtra {
                id: "foo".to_string(),
                format: format.to_string(),
                binaries: vec!["foo".to_string()],
                ..Default::default()
            },
        }
    }

    fn matrix_for(pkg: &ResolvedNix, archives: &[Artifact]) -> PlatformMatrix {
        let release = release();
        let env = HashMap::new();
        let opts: MatrixOptions<'_> = pkg.matrix_options();
        matrix::build(archives, &opts, &Template::from_parts(&release, &env)).unwrap()
    }

    fn checksums(matrix: &PlatformMatrix, sha: &str) -> ChecksumMap {
        matrix
            .urls()
            .into_iter()
            .map(|url| (url.to_string(), sha.to_string()))
            .collect()
    }

    #[test]
    fn test_render_build_manifest() {
        let pkg = pkg();
        let archives = vec![archive("linux", "amd64", "tar.gz"), archive("darwin", "arm64", "tar.gz")];
        let matrix = matrix_for(&pkg, &archives);
        let manifest = ManifestRenderer::render(
            &pkg,
            &matrix,
            &checksums(&matrix, ZERO_HASH),
            &release(),
            ManifestKind::Build,
        )
        .unwrap();

        assert_eq!(manifest.path, "pkgs/foo/default.nix");
        assert_eq!(manifest.kind, ManifestKind::Build);
        let nix = &manifest.content;
        assert!(nix.contains(&format!("    x86_64-linux = \"{}\";", ZERO_HASH)));
        assert!(nix.contains(
            "    aarch64-darwin = \"https://dummyhost/download/v1.2.1/foo_darwin_arm64.tar.gz\";"
        ));
        assert!(nix.contains("  pname = \"foo\";"));
        assert!(nix.contains("  version = \"1.2.1\";"));
        assert!(nix.contains("  nativeBuildInputs = [ installShellFiles ];"));
        assert!(nix.contains("    description = \"my \\\"test\\\"\";"));
        assert!(nix.contains("    license = lib.licenses.mit;"));
        assert!(nix.contains("      \"aarch64-darwin\"\n      \"x86_64-linux\"\n"));
        assert!(nix.contains("  installPhase = ''\n    mkdir -p $out/bin\n    cp -vr ./foo $out/bin/foo\n  '';"));
        assert!(!nix.contains("postInstall"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let pkg = pkg();
        let archives = vec![archive("darwin", "amd64", "zip"), archive("linux", "arm64", "zip")];
        let matrix = matrix_for(&pkg, &archives);
        let sums = checksums(&matrix, "sha");
        let a = ManifestRenderer::render(&pkg, &matrix, &sums, &release(), ManifestKind::Publish).unwrap();
        let b = ManifestRenderer::render(&pkg, &matrix, &sums, &release(), ManifestKind::Publish).unwrap();
        assert_eq!(a, b);
        assert!(a.content.contains("  nativeBuildInputs = [ installShellFiles unzip ];"));
        assert!(a.content.contains(", unzip\n"));
    }

    #[test]
    fn test_publish_refuses_placeholder() {
        let pkg = pkg();
        let matrix = matrix_for(&pkg, &[archive("linux", "amd64", "tar.gz")]);
        let err = ManifestRenderer::render(
            &pkg,
            &matrix,
            &checksums(&matrix, ZERO_HASH),
            &release(),
            ManifestKind::Publish,
        )
        .unwrap_err();
        assert!(matches!(err, NixpubError::PlaceholderChecksum(_)));

        let err = ManifestRenderer::render(&pkg, &matrix, &ChecksumMap::new(), &release(), ManifestKind::Build)
            .unwrap_err();
        assert!(matches!(err, NixpubError::MissingChecksum(_)));
    }

    #[test]
    fn test_publish_text_never_carries_placeholder() {
        let mut pkg = pkg();
        pkg.post_install = format!("echo {}", ZERO_HASH);
        let matrix = matrix_for(&pkg, &[archive("linux", "amd64", "tar.gz")]);
        let sums = checksums(&matrix, "sha");

        let err = ManifestRenderer::render(&pkg, &matrix, &sums, &release(), ManifestKind::Publish)
            .unwrap_err();
        assert!(matches!(err, NixpubError::PlaceholderChecksum(path) if path == "pkgs/foo/default.nix"));

        let build = ManifestRenderer::render(&pkg, &matrix, &sums, &release(), ManifestKind::Build).unwrap();
        assert!(build.content.contains(ZERO_HASH));
    }

    #[test]
    fn test_dependencies_and_branches() {
        let mut pkg = pkg();
        pkg.dependencies = vec![
            NixDependency::new("fish"),
            NixDependency::only_on("ttyd", nixpub_core::config::DependencyOs::Linux),
        ];
        pkg.post_install = "installShellCompletion ./completions/*\n".to_string();
        let archives = vec![archive("linux", "amd64", "tar.gz"), archive("darwin", "amd64", "tar.gz")];
        let matrix = matrix_for(&pkg, &archives);
        let nix = ManifestRenderer::render(
            &pkg,
            &matrix,
            &checksums(&matrix, "sha"),
            &release(),
            ManifestKind::Publish,
        )
        .unwrap()
        .content;

        assert!(nix.contains(", makeWrapper\n, fish\n, ttyd\n}:"));
        assert!(nix.contains("  nativeBuildInputs = [ installShellFiles makeWrapper ];"));
        assert!(nix.contains("    if stdenvNoCC.isDarwin then ''\n"));
        assert!(nix.contains("    else if stdenvNoCC.isLinux then ''\n"));
        assert!(nix.contains("${lib.makeBinPath [ fish ttyd ]}"));
        assert!(nix.contains("    else throw \"unsupported system: ${system}\";\n"));
        assert!(nix.contains("  postInstall = ''\n    installShellCompletion ./completions/*\n  '';"));
    }

    #[test]
    fn test_escape_nix_string() {
        assert_eq!(escape_nix_string("a \"b\" ${c} \\"), "a \\\"b\\\" \\${c} \\\\");
    }
}
