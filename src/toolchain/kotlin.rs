//! Kotlin compiler distributions.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{HostArch, HostOs, HostPlatform};
use crate::toolchain::{InstallDetails, ToolchainDistribution};

const RELEASES_URL: &str = "https://github.com/JetBrains/kotlin/releases/download";

static COMPILER_FOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^kotlin-compiler-(\d[\w.\-]*)$").ok());

static NATIVE_FOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^kotlin-native-(?:prebuilt-)?(?:linux|macos|windows)-(?:x86_64|aarch64)-(\d[\w.\-]*)$")
        .ok()
});

fn capture_version(regex: &LazyLock<Option<Regex>>, folder: &str) -> Option<String> {
    regex
        .as_ref()?
        .captures(folder)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The JVM and JS compiler (`kotlinc`, `kotlinc-js`).
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinCompiler;

impl ToolchainDistribution for KotlinCompiler {
    type Details = InstallDetails;

    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn download_url(&self, version: &str, _host: &HostPlatform) -> Option<String> {
        if version.is_empty() {
            return None;
        }
        Some(format!(
            "{}/v{}/kotlin-compiler-{}.zip",
            RELEASES_URL, version, version
        ))
    }

    fn archive_extension(&self, _host: &HostPlatform) -> &'static str {
        "zip"
    }

    // The zip unpacks to a generic `kotlinc/` directory.
    fn install_folder(&self, version: &str, _archive_root: Option<&str>) -> String {
        format!("kotlin-compiler-{}", version)
    }

    fn version_from_folder(&self, folder: &str) -> Option<String> {
        capture_version(&COMPILER_FOLDER, folder)
    }

    fn details(&self, install: InstallDetails, _host: &HostPlatform) -> InstallDetails {
        install
    }
}

/// The Kotlin/Native compiler (`konanc`), one prebuilt archive per host.
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinNative;

impl KotlinNative {
    fn host_classifier(host: &HostPlatform) -> Option<&'static str> {
        match (host.os, host.arch) {
            (HostOs::Linux, HostArch::X64) => Some("linux-x86_64"),
            (HostOs::MacOs, HostArch::X64) => Some("macos-x86_64"),
            (HostOs::MacOs, HostArch::Arm64) => Some("macos-aarch64"),
            (HostOs::Windows, HostArch::X64) => Some("windows-x86_64"),
            _ => None,
        }
    }
}

impl ToolchainDistribution for KotlinNative {
    type Details = InstallDetails;

    fn name(&self) -> &'static str {
        "kotlin-native"
    }

    fn download_url(&self, version: &str, host: &HostPlatform) -> Option<String> {
        if version.is_empty() {
            return None;
        }
        let classifier = Self::host_classifier(host)?;
        Some(format!(
            "{}/v{}/kotlin-native-prebuilt-{}-{}.{}",
            RELEASES_URL,
            version,
            classifier,
            version,
            self.archive_extension(host)
        ))
    }

    fn archive_extension(&self, host: &HostPlatform) -> &'static str {
        if host.os == HostOs::Windows {
            "zip"
        } else {
            "tar.gz"
        }
    }

    fn version_from_folder(&self, folder: &str) -> Option<String> {
        capture_version(&NATIVE_FOLDER, folder)
    }

    fn details(&self, install: InstallDetails, _host: &HostPlatform) -> InstallDetails {
        install
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX: HostPlatform = HostPlatform {
        os: HostOs::Linux,
        arch: HostArch::X64,
    };

    #[test]
    fn test_compiler_urls() {
        assert_eq!(
            KotlinCompiler.download_url("1.9.22", &LINUX).unwrap(),
            "https://github.com/JetBrains/kotlin/releases/download/v1.9.22/kotlin-compiler-1.9.22.zip"
        );
        assert_eq!(
            KotlinCompiler.install_folder("1.9.22", Some("kotlinc")),
            "kotlin-compiler-1.9.22"
        );
        assert_eq!(
            KotlinCompiler.version_from_folder("kotlin-compiler-2.0.0-RC1").as_deref(),
            Some("2.0.0-RC1")
        );
        assert_eq!(KotlinCompiler.version_from_folder("kotlinc"), None);
    }

    #[test]
    fn test_native_urls_per_host() {
        let mac = HostPlatform::new(HostOs::MacOs, HostArch::Arm64);
        let windows = HostPlatform::new(HostOs::Windows, HostArch::X64);
        let linux_arm = HostPlatform::new(HostOs::Linux, HostArch::Arm64);

        assert!(KotlinNative
            .download_url("1.9.22", &LINUX)
            .unwrap()
            .ends_with("/v1.9.22/kotlin-native-prebuilt-linux-x86_64-1.9.22.tar.gz"));
        assert!(KotlinNative
            .download_url("1.9.22", &mac)
            .unwrap()
            .ends_with("kotlin-native-prebuilt-macos-aarch64-1.9.22.tar.gz"));
        assert!(KotlinNative
            .download_url("1.9.22", &windows)
            .unwrap()
            .ends_with("kotlin-native-prebuilt-windows-x86_64-1.9.22.zip"));
        assert_eq!(KotlinNative.download_url("1.9.22", &linux_arm), None);
    }

    #[test]
    fn test_native_folder_from_archive_root() {
        let root = "kotlin-native-prebuilt-linux-x86_64-1.9.22";
        assert_eq!(KotlinNative.install_folder("1.9.22", Some(root)), root);
        assert_eq!(
            KotlinNative.version_from_folder(root).as_deref(),
            Some("1.9.22")
        );
        assert_eq!(
            KotlinNative.version_from_folder("kotlin-native-macos-aarch64-1.8.0").as_deref(),
            Some("1.8.0")
        );
    }
}
