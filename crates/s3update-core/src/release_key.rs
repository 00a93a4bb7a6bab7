pub const OS_TOKEN: &str = "{{OS}}";
pub const ARCH_TOKEN: &str = "{{ARCH}}";

/// Operating system and architecture names substituted into release keys.
///
/// Names follow the Go toolchain convention (`darwin`, `amd64`, `arm64`) so
/// buckets laid out for existing release pipelines keep resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::from_rust_target(
            std::env::consts::OS,
            std::env::consts::ARCH,
            cfg!(target_endian = "little"),
        )
    }

    /// Maps Rust's `target_os`/`target_arch` names to release-key tokens.
    /// Rust names both byte orders of some architectures the same, so the
    /// endianness picks between e.g. `ppc64` and `ppc64le`.
    pub fn from_rust_target(os: &str, arch: &str, little_endian: bool) -> Self {
        Self::new(os_token(os), arch_token(arch, little_endian))
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }
}

fn os_token(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_token(arch: &str, little_endian: bool) -> &str {
    match (arch, little_endian) {
        ("x86_64", _) => "amd64",
        ("x86", _) => "386",
        ("aarch64", _) => "arm64",
        ("powerpc64", true) => "ppc64le",
        ("powerpc64", false) => "ppc64",
        ("mips64", true) => "mips64le",
        ("mips", true) => "mipsle",
        ("loongarch64", _) => "loong64",
        (other, _) => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseKey {
    template: String,
}

impl ReleaseKey {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn resolve(&self, platform: &Platform) -> String {
        self.template
            .replace(OS_TOKEN, platform.os())
            .replace(ARCH_TOKEN, platform.arch())
    }
}
