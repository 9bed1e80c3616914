//! Platform and target definitions.
//!
//! A [`KotlinTarget`] is one of the fixed set of platforms a module can be
//! compiled for. Each target knows which source-set directories apply to it
//! and whether the current machine is able to build it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KotlinTarget {
    Jvm,
    JsNode,
    JsBrowser,
    MacosArm64,
    MacosX64,
    WindowsX64,
    LinuxX64,
    LinuxArm64,
}

impl KotlinTarget {
    /// Every supported target, in declaration order.
    pub const ALL: [KotlinTarget; 8] = [
        KotlinTarget::Jvm,
        KotlinTarget::JsNode,
        KotlinTarget::JsBrowser,
        KotlinTarget::MacosArm64,
        KotlinTarget::MacosX64,
        KotlinTarget::WindowsX64,
        KotlinTarget::LinuxX64,
        KotlinTarget::LinuxArm64,
    ];

    /// The identifier used in manifests and output directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            KotlinTarget::Jvm => "jvm",
            KotlinTarget::JsNode => "js_node",
            KotlinTarget::JsBrowser => "js_browser",
            KotlinTarget::MacosArm64 => "macos_arm64",
            KotlinTarget::MacosX64 => "macos_x64",
            KotlinTarget::WindowsX64 => "windows_x64",
            KotlinTarget::LinuxX64 => "linux_x64",
            KotlinTarget::LinuxArm64 => "linux_arm64",
        }
    }

    /// Whether this target is compiled by Kotlin/Native.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            KotlinTarget::MacosArm64
                | KotlinTarget::MacosX64
                | KotlinTarget::WindowsX64
                | KotlinTarget::LinuxX64
                | KotlinTarget::LinuxArm64
        )
    }

    /// Whether this target is a JavaScript environment.
    pub fn is_js(&self) -> bool {
        matches!(self, KotlinTarget::JsNode | KotlinTarget::JsBrowser)
    }

    /// Whether this target compiles common code directly (no separate
    /// common compilation step).
    pub fn is_jvm(&self) -> bool {
        matches!(self, KotlinTarget::Jvm)
    }

    /// Source-set directory names that apply to this target, most general
    /// first. `common` is never included here.
    pub fn source_set_aliases(&self) -> &'static [&'static str] {
        match self {
            KotlinTarget::Jvm => &["jvm"],
            KotlinTarget::JsNode => &["js", "jsNode"],
            KotlinTarget::JsBrowser => &["js", "jsBrowser"],
            KotlinTarget::MacosArm64 => &["macos", "macosArm64", "native", "posix"],
            KotlinTarget::MacosX64 => &["macos", "macosX64", "native", "posix"],
            KotlinTarget::WindowsX64 => &["windows", "windowsX64", "mingwX64", "native"],
            KotlinTarget::LinuxX64 => &["linux", "linuxX64", "native", "posix"],
            KotlinTarget::LinuxArm64 => &["linux", "linuxArm64", "native", "posix"],
        }
    }

    /// The Kotlin/Native `-target` name, for native targets.
    pub fn konan_target(&self) -> Option<&'static str> {
        match self {
            KotlinTarget::MacosArm64 => Some("macos_arm64"),
            KotlinTarget::MacosX64 => Some("macos_x64"),
            KotlinTarget::WindowsX64 => Some("mingw_x64"),
            KotlinTarget::LinuxX64 => Some("linux_x64"),
            KotlinTarget::LinuxArm64 => Some("linux_arm64"),
            _ => None,
        }
    }

    /// Whether `host` can produce artifacts for this target.
    ///
    /// JVM and JS are portable. Apple targets need a macOS host and the
    /// Windows target needs a Windows host; Linux targets cross-compile
    /// from every host.
    pub fn is_host_compatible(&self, host: &HostPlatform) -> bool {
        match self {
            KotlinTarget::Jvm | KotlinTarget::JsNode | KotlinTarget::JsBrowser => true,
            KotlinTarget::MacosArm64 | KotlinTarget::MacosX64 => host.os == HostOs::MacOs,
            KotlinTarget::WindowsX64 => host.os == HostOs::Windows,
            KotlinTarget::LinuxX64 | KotlinTarget::LinuxArm64 => true,
        }
    }

    /// Expand a manifest alias (`common`, `js`, `linux`, ...) to targets.
    ///
    /// `common` expands to an empty list, meaning "every target".
    pub fn from_alias(alias: &str) -> Option<Vec<KotlinTarget>> {
        let targets = match alias {
            "common" => Vec::new(),
            "js" => vec![KotlinTarget::JsNode, KotlinTarget::JsBrowser],
            "native" => KotlinTarget::ALL.into_iter().filter(|t| t.is_native()).collect(),
            "posix" => KotlinTarget::ALL
                .into_iter()
                .filter(|t| t.source_set_aliases().contains(&"posix"))
                .collect(),
            "macos" => vec![KotlinTarget::MacosArm64, KotlinTarget::MacosX64],
            "windows" | "mingw" => vec![KotlinTarget::WindowsX64],
            "linux" => vec![KotlinTarget::LinuxX64, KotlinTarget::LinuxArm64],
            other => vec![other.parse().ok()?],
        };
        Some(targets)
    }
}

impl fmt::Display for KotlinTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KotlinTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        KotlinTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown target `{}`", s))
    }
}

/// Host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    MacOs,
    Windows,
    Linux,
}

/// Host CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostArch {
    X64,
    Arm64,
}

/// The machine ktpack is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        HostPlatform { os, arch }
    }

    /// Detect the current host. Unknown systems are treated as Linux x64.
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Linux,
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" => HostArch::Arm64,
            _ => HostArch::X64,
        };
        HostPlatform { os, arch }
    }

    /// The native target matching this host.
    pub fn native_target(&self) -> KotlinTarget {
        match (self.os, self.arch) {
            (HostOs::MacOs, HostArch::Arm64) => KotlinTarget::MacosArm64,
            (HostOs::MacOs, HostArch::X64) => KotlinTarget::MacosX64,
            (HostOs::Windows, _) => KotlinTarget::WindowsX64,
            (HostOs::Linux, HostArch::Arm64) => KotlinTarget::LinuxArm64,
            (HostOs::Linux, HostArch::X64) => KotlinTarget::LinuxX64,
        }
    }

    /// Executable file suffix on this host.
    pub fn exe_suffix(&self) -> &'static str {
        if self.os == HostOs::Windows {
            ".exe"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_aliases() {
        assert_eq!(
            KotlinTarget::LinuxX64.source_set_aliases(),
            &["linux", "linuxX64", "native", "posix"]
        );
        assert!(KotlinTarget::LinuxX64.is_native());
        assert!(!KotlinTarget::LinuxX64.is_js());
    }

    #[test]
    fn test_parse_target() {
        assert_eq!("linux_x64".parse::<KotlinTarget>().unwrap(), KotlinTarget::LinuxX64);
        assert_eq!("JS-Node".parse::<KotlinTarget>().unwrap(), KotlinTarget::JsNode);
        assert!("solaris".parse::<KotlinTarget>().is_err());
    }

    #[test]
    fn test_alias_expansion() {
        assert!(KotlinTarget::from_alias("common").unwrap().is_empty());
        assert_eq!(
            KotlinTarget::from_alias("js").unwrap(),
            vec![KotlinTarget::JsNode, KotlinTarget::JsBrowser]
        );
        let posix = KotlinTarget::from_alias("posix").unwrap();
        assert!(posix.contains(&KotlinTarget::MacosX64));
        assert!(!posix.contains(&KotlinTarget::WindowsX64));
        assert_eq!(KotlinTarget::from_alias("jvm").unwrap(), vec![KotlinTarget::Jvm]);
        assert!(KotlinTarget::from_alias("amiga").is_none());
    }

    #[test]
    fn test_host_compatibility() {
        let linux = HostPlatform::new(HostOs::Linux, HostArch::X64);
        let mac = HostPlatform::new(HostOs::MacOs, HostArch::Arm64);

        assert!(KotlinTarget::Jvm.is_host_compatible(&linux));
        assert!(KotlinTarget::LinuxArm64.is_host_compatible(&mac));
        assert!(!KotlinTarget::MacosArm64.is_host_compatible(&linux));
        assert!(KotlinTarget::MacosX64.is_host_compatible(&mac));
        assert!(!KotlinTarget::WindowsX64.is_host_compatible(&mac));
        assert_eq!(mac.native_target(), KotlinTarget::MacosArm64);
    }
}
