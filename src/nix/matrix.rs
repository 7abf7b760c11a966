//! Grouping of release archives into the platforms of one nix package.

use crate::artifact::{Artifact, ArtifactKind};
use crate::nix::platform::{
    Arch, Os, Platform, SUPPORTED_FORMATS, SUPPORTED_GOARCH, SUPPORTED_GOARM, SUPPORTED_GOOS,
};
use crate::tmpl::Template;
use nixpub_core::config::DEFAULT_GOAMD64;
use nixpub_core::{NixDependency, NixpubError, NixpubResult, NoArchivesFound};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// What the matrix builder needs from an evaluated package
#[derive(Debug, Clone, Copy)]
pub struct MatrixOptions<'a> {
    pub ids: &'a [String],
    pub goamd64: &'a str,
    pub url_template: &'a str,
    pub dependencies: &'a [NixDependency],
    pub install: &'a str,
    pub extra_install: &'a str,
}

/// One retained archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: Os,
    pub arch: Arch,
    pub tag: String,
    pub url: String,
    pub format: String,
    pub binaries: Vec<String>,
    pub wrapped_in: Option<String>,
    pub replaces: bool,
}

impl PlatformDescriptor {
    /// Directory the binaries are copied from after unpacking
    pub fn source_root(&self) -> &str {
        self.wrapped_in.as_deref().unwrap_or(".")
    }

    pub fn is_universal(&self) -> bool {
        self.arch == Arch::Universal
    }
}

/// A conditional chunk of the install phase. `None` applies everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallBranch {
    pub condition: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformMatrix {
    /// Retained archives, sorted by OS then architecture
    pub descriptors: Vec<PlatformDescriptor>,
    /// Nix platform to the index of the descriptor serving it
    slots: BTreeMap<Platform, usize>,
    pub install: Vec<InstallBranch>,
}

impl PlatformMatrix {
    /// Served platforms with their archive, in manifest order
    pub fn systems(&self) -> impl Iterator<Item = (Platform, &PlatformDescriptor)> + '_ {
        self.slots
            .iter()
            .map(move |(platform, idx)| (*platform, &self.descriptors[*idx]))
    }

    pub fn descriptor_for(&self, platform: Platform) -> Option<&PlatformDescriptor> {
        self.slots.get(&platform).map(|idx| &self.descriptors[*idx])
    }

    /// Distinct download URLs that end up in the manifest
    pub fn urls(&self) -> Vec<&str> {
        self.systems()
            .map(|(_, desc)| desc.url.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `unzip` is needed to unpack the sources
    pub fn uses_zip(&self) -> bool {
        self.systems().any(|(_, desc)| desc.format == "zip")
    }
}

/// Group `archives` into the platforms of one package
pub fn build(
    archives: &[Artifact],
    opts: &MatrixOptions<'_>,
    tpl: &Template<'_>,
) -> NixpubResult<PlatformMatrix> {
    let goamd64 = if opts.goamd64.is_empty() {
        DEFAULT_GOAMD64
    } else {
        opts.goamd64
    };

    let retained: Vec<(Os, Arch, &Artifact)> = archives
        .iter()
        .filter_map(|art| retain(art, opts.ids, goamd64).map(|(os, arch)| (os, arch, art)))
        .collect();

    if retained.is_empty() {
        return Err(NoArchivesFound {
            goos: to_strings(SUPPORTED_GOOS),
            goarch: to_strings(SUPPORTED_GOARCH),
            goarm: to_strings(SUPPORTED_GOARM),
            goamd64: goamd64.to_string(),
            ids: opts.ids.to_vec(),
        }
        .into());
    }

    // A replacing universal archive hides the per-arch ones of its OS
    let replaced: BTreeSet<Os> = retained
        .iter()
        .filter(|(_, arch, art)| *arch == Arch::Universal && art.extra.replaces)
        .map(|(os, _, _)| *os)
        .collect();

    let mut descriptors = Vec::new();
    for (os, arch, art) in retained {
        if replaced.contains(&os) && arch != Arch::Universal {
            debug!(archive = %art.name, "replaced by universal binary");
            continue;
        }
        let url = tpl
            .with_artifact(art)
            .apply_field("url_template", opts.url_template)?;
        descriptors.push(PlatformDescriptor {
            os,
            arch,
            tag: Platform::new(os, arch).tag(goamd64),
            url,
            format: art.format().to_string(),
            binaries: art.extra.binaries.clone(),
            wrapped_in: Some(art.extra.wrapped_in.clone()).filter(|dir| !dir.is_empty()),
            replaces: art.extra.replaces,
        });
    }
    descriptors.sort_by(|a, b| (a.os, a.arch, &a.url).cmp(&(b.os, b.arch, &b.url)));

    for pair in descriptors.windows(2) {
        if pair[0].os == pair[1].os && pair[0].arch == pair[1].arch {
            return Err(NixpubError::MultipleArchivesSamePlatform(pair[0].tag.clone()));
        }
    }

    let slots = assign_slots(&descriptors);
    let install = install_branches(&descriptors, &slots, opts);

    Ok(PlatformMatrix {
        descriptors,
        slots,
        install,
    })
}

fn retain(art: &Artifact, ids: &[String], goamd64: &str) -> Option<(Os, Arch)> {
    if art.kind != ArtifactKind::UploadableArchive {
        return None;
    }
    if !SUPPORTED_FORMATS.contains(&art.format()) {
        return None;
    }
    if !ids.is_empty() && !ids.iter().any(|id| id == art.id()) {
        return None;
    }

    let os = Os::parse(&art.os).filter(|os| os.is_supported())?;
    let arch = Arch::parse(&art.arch, &art.arm)?;
    match arch {
        Arch::Amd64 => (art.amd64 == goamd64).then_some((os, arch)),
        Arch::Universal => Some((os, arch)),
        _ => Platform::ALL
            .contains(&Platform::new(os, arch))
            .then_some((os, arch)),
    }
}

/// Per-arch archives own their platform, a universal one fills the gaps
fn assign_slots(descriptors: &[PlatformDescriptor]) -> BTreeMap<Platform, usize> {
    let mut slots = BTreeMap::new();
    for (idx, desc) in descriptors.iter().enumerate() {
        if !desc.is_universal() {
            slots.insert(Platform::new(desc.os, desc.arch), idx);
        }
    }
    for (idx, desc) in descriptors.iter().enumerate() {
        if desc.is_universal() {
            for arch in desc.arch.covers() {
                slots.entry(Platform::new(desc.os, *arch)).or_insert(idx);
            }
        }
    }
    slots
}

/// Install lines for one binary on `os`
pub fn bin_install_lines(bin: &str, os: Os, dependencies: &[NixDependency]) -> Vec<String> {
    let mut lines = vec![format!("cp -vr ./{bin} $out/bin/{bin}")];
    let deps: Vec<&str> = dependencies
        .iter()
        .filter(|dep| os.accepts(dep.os))
        .map(|dep| dep.name.as_str())
        .collect();
    if !deps.is_empty() {
        lines.push(format!(
            "wrapProgram $out/bin/{bin} --prefix PATH : ${{lib.makeBinPath [ {} ]}}",
            deps.join(" ")
        ));
    }
    lines
}

fn split_lines(script: &str) -> impl Iterator<Item = String> + '_ {
    script
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
}

fn install_lines(desc: &PlatformDescriptor, opts: &MatrixOptions<'_>) -> Vec<String> {
    let mut lines: Vec<String> = if opts.install.trim().is_empty() {
        let mut lines = vec!["mkdir -p $out/bin".to_string()];
        for bin in &desc.binaries {
            lines.extend(bin_install_lines(bin, desc.os, opts.dependencies));
        }
        lines
    } else {
        split_lines(opts.install).collect()
    };
    lines.extend(split_lines(opts.extra_install));
    lines
}

fn install_branches(
    descriptors: &[PlatformDescriptor],
    slots: &BTreeMap<Platform, usize>,
    opts: &MatrixOptions<'_>,
) -> Vec<InstallBranch> {
    if opts.install.trim().is_empty() {
        info!("guessing install lines from archive binaries");
    }

    let mut per_os: BTreeMap<Os, Vec<(Platform, Vec<String>)>> = BTreeMap::new();
    for (platform, idx) in slots {
        per_os
            .entry(platform.os)
            .or_default()
            .push((*platform, install_lines(&descriptors[*idx], opts)));
    }

    let mut branches = Vec::new();
    for (os, entries) in per_os {
        let same = entries.windows(2).all(|pair| pair[0].1 == pair[1].1);
        if same {
            if let Some((_, lines)) = entries.into_iter().next() {
                branches.push(InstallBranch {
                    condition: Some(os.nix_predicate().to_string()),
                    lines,
                });
            }
            continue;
        }
        for (platform, lines) in entries {
            let system = platform.nix_system().unwrap_or_default();
            branches.push(InstallBranch {
                condition: Some(format!("system == \"{}\"", system)),
                lines,
            });
        }
    }

    let shared = branches.windows(2).all(|pair| pair[0].lines == pair[1].lines);
    if shared {
        if let Some(branch) = branches.into_iter().next() {
            return vec![InstallBranch {
                condition: None,
                lines: branch.lines,
            }];
        }
        return Vec::new();
    }
    branches
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
