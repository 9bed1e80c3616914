//! Eclipse Temurin JDKs from the Adoptium binary API.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::{HostArch, HostOs, HostPlatform};
use crate::toolchain::{InstallDetails, ToolchainDistribution};

const ADOPTIUM_API: &str = "https://api.adoptium.net/v3/binary";

static FOLDER_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^jdk-?(\d[\w.+\-]*)$").ok());

/// An installed JDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkInstallDetails {
    pub install: InstallDetails,
    /// Value for `JAVA_HOME`
    pub java_home: PathBuf,
}

impl JdkInstallDetails {
    pub fn java_executable(&self, host: &HostPlatform) -> PathBuf {
        self.java_home
            .join("bin")
            .join(format!("java{}", host.exe_suffix()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Jdk;

impl Jdk {
    fn os(host: &HostPlatform) -> &'static str {
        match host.os {
            HostOs::Linux => "linux",
            HostOs::MacOs => "mac",
            HostOs::Windows => "windows",
        }
    }

    fn arch(host: &HostPlatform) -> &'static str {
        match host.arch {
            HostArch::X64 => "x64",
            HostArch::Arm64 => "aarch64",
        }
    }
}

impl ToolchainDistribution for Jdk {
    type Details = JdkInstallDetails;

    fn name(&self) -> &'static str {
        "jdk"
    }

    /// `17` selects the latest GA build of that feature release; a full
    /// release such as `17.0.9+9` selects that build.
    fn download_url(&self, version: &str, host: &HostPlatform) -> Option<String> {
        let suffix = format!(
            "{}/{}/jdk/hotspot/normal/eclipse",
            Self::os(host),
            Self::arch(host)
        );
        if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) {
            Some(format!("{}/latest/{}/ga/{}", ADOPTIUM_API, version, suffix))
        } else if FOLDER_VERSION.as_ref()?.is_match(&format!("jdk-{}", version)) {
            let release = format!("jdk-{}", version).replace('+', "%2B");
            Some(format!("{}/version/{}/{}", ADOPTIUM_API, release, suffix))
        } else {
            None
        }
    }

    fn archive_extension(&self, host: &HostPlatform) -> &'static str {
        if host.os == HostOs::Windows {
            "zip"
        } else {
            "tar.gz"
        }
    }

    fn version_from_folder(&self, folder: &str) -> Option<String> {
        FOLDER_VERSION
            .as_ref()?
            .captures(folder)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn matches_version(&self, requested: &str, installed: &str) -> bool {
        requested == installed
            || installed.starts_with(&format!("{}.", requested))
            || installed.starts_with(&format!("{}+", requested))
    }

    fn details(&self, install: InstallDetails, host: &HostPlatform) -> JdkInstallDetails {
        let java_home = if host.os == HostOs::MacOs {
            install.path.join("Contents").join("Home")
        } else {
            install.path.clone()
        };
        JdkInstallDetails { install, java_home }
    }
}
