use nixpub_core::config::DependencyOs;

/// OS families packaged for nix
pub const SUPPORTED_GOOS: &[&str] = &["darwin", "linux"];

/// Architectures packaged for nix
pub const SUPPORTED_GOARCH: &[&str] = &["amd64", "arm", "arm64", "386"];

/// ARM revisions packaged for nix
pub const SUPPORTED_GOARM: &[&str] = &["6", "7"];

/// Archive formats nix can unpack
pub const SUPPORTED_FORMATS: &[&str] = &["tar.gz", "zip"];

/// Operating system of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

impl Os {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "darwin" | "macos" => Some(Os::Darwin),
            "linux" => Some(Os::Linux),
            "windows" => Some(Os::Windows),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }

    /// Whether archives for this OS end up in a manifest at all
    pub fn is_supported(self) -> bool {
        match self {
            Os::Darwin | Os::Linux => true,
            Os::Windows => false,
        }
    }

    /// Nix expression that is true on this OS
    pub fn nix_predicate(self) -> &'static str {
        match self {
            Os::Darwin => "stdenvNoCC.isDarwin",
            Os::Linux => "stdenvNoCC.isLinux",
            Os::Windows => "stdenvNoCC.hostPlatform.isWindows",
        }
    }

    /// Whether a dependency restricted to `only` applies on this OS
    pub fn accepts(self, only: Option<DependencyOs>) -> bool {
        match (only, self) {
            (None, _) => true,
            (Some(DependencyOs::Darwin), Os::Darwin) => true,
            (Some(DependencyOs::Linux), Os::Linux) => true,
            (Some(_), _) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArmVersion {
    V6,
    V7,
}

impl ArmVersion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "6" => Some(ArmVersion::V6),
            "7" => Some(ArmVersion::V7),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArmVersion::V6 => "6",
            ArmVersion::V7 => "7",
        }
    }
}

/// CPU architecture of an archive.
///
/// Variant order is the order platforms appear in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    X86,
    Amd64,
    Arm(ArmVersion),
    Arm64,
    /// One binary for every architecture of its OS
    Universal,
}

impl Arch {
    /// Parse a `goarch`/`goarm` pair. ARM needs a known revision.
    pub fn parse(arch: &str, arm: &str) -> Option<Self> {
        match arch {
            "386" | "i386" | "x86" => Some(Arch::X86),
            "amd64" | "x86_64" => Some(Arch::Amd64),
            "arm" => ArmVersion::parse(arm).map(Arch::Arm),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            "all" | "universal" => Some(Arch::Universal),
            _ => None,
        }
    }

    /// Canonical tag fragment, `level` only applies to amd64
    pub fn tag(self, level: &str) -> String {
        match self {
            Arch::X86 => "386".to_string(),
            Arch::Amd64 => format!("amd64{}", level),
            Arch::Arm(version) => format!("armv{}", version.as_str()),
            Arch::Arm64 => "arm64".to_string(),
            Arch::Universal => "all".to_string(),
        }
    }

    /// Concrete architectures a universal archive stands in for
    pub fn covers(self) -> &'static [Arch] {
        match self {
            Arch::Universal => &[Arch::Amd64, Arch::Arm64],
            Arch::X86 => &[Arch::X86],
            Arch::Amd64 => &[Arch::Amd64],
            Arch::Arm(ArmVersion::V6) => &[Arch::Arm(ArmVersion::V6)],
            Arch::Arm(ArmVersion::V7) => &[Arch::Arm(ArmVersion::V7)],
            Arch::Arm64 => &[Arch::Arm64],
        }
    }
}

/// One installable nix system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Every platform a manifest can carry, sorted by OS name
    pub const ALL: [Platform; 7] = [
        Platform::new(Os::Darwin, Arch::Amd64),
        Platform::new(Os::Darwin, Arch::Arm64),
        Platform::new(Os::Linux, Arch::X86),
        Platform::new(Os::Linux, Arch::Amd64),
        Platform::new(Os::Linux, Arch::Arm(ArmVersion::V6)),
        Platform::new(Os::Linux, Arch::Arm(ArmVersion::V7)),
        Platform::new(Os::Linux, Arch::Arm64),
    ];

    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The nix `system` double, if nix has one for this platform
    pub fn nix_system(self) -> Option<&'static str> {
        match (self.os, self.arch) {
            (Os::Darwin, Arch::Amd64) => Some("x86_64-darwin"),
            (Os::Darwin, Arch::Arm64) => Some("aarch64-darwin"),
            (Os::Darwin, Arch::X86 | Arch::Arm(_)) => None,
            (Os::Linux, Arch::X86) => Some("i686-linux"),
            (Os::Linux, Arch::Amd64) => Some("x86_64-linux"),
            (Os::Linux, Arch::Arm(ArmVersion::V6)) => Some("armv6l-linux"),
            (Os::Linux, Arch::Arm(ArmVersion::V7)) => Some("armv7l-linux"),
            (Os::Linux, Arch::Arm64) => Some("aarch64-linux"),
            (_, Arch::Universal) => None,
            (Os::Windows, _) => None,
        }
    }

    /// Canonical tag, e.g. `linux_amd64v1` or `linux_armv7`
    pub fn tag(self, level: &str) -> String {
        format!("{}_{}", self.os.as_str(), self.arch.tag(level))
    }
}
