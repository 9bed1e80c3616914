//! Node.js distributions from nodejs.org.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{HostArch, HostOs, HostPlatform};
use crate::toolchain::{InstallDetails, ToolchainDistribution};

static FOLDER_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^node-v([\d.]+)-").ok());

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeJs;

impl NodeJs {
    fn platform(host: &HostPlatform) -> &'static str {
        match host.os {
            HostOs::Linux => "linux",
            HostOs::MacOs => "darwin",
            HostOs::Windows => "win",
        }
    }

    fn arch(host: &HostPlatform) -> &'static str {
        match host.arch {
            HostArch::X64 => "x64",
            HostArch::Arm64 => "arm64",
        }
    }
}

impl ToolchainDistribution for NodeJs {
    type Details = InstallDetails;

    fn name(&self) -> &'static str {
        "node"
    }

    fn download_url(&self, version: &str, host: &HostPlatform) -> Option<String> {
        let version = version.trim_start_matches('v');
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        Some(format!(
            "https://nodejs.org/dist/v{v}/node-v{v}-{}-{}.{}",
            Self::platform(host),
            Self::arch(host),
            self.archive_extension(host),
            v = version
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
        FOLDER_VERSION
            .as_ref()?
            .captures(folder)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn matches_version(&self, requested: &str, installed: &str) -> bool {
        requested.trim_start_matches('v') == installed
    }

    fn details(&self, install: InstallDetails, _host: &HostPlatform) -> InstallDetails {
        install
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_urls() {
        let linux = HostPlatform::new(HostOs::Linux, HostArch::X64);
        let mac = HostPlatform::new(HostOs::MacOs, HostArch::Arm64);
        let windows = HostPlatform::new(HostOs::Windows, HostArch::X64);

        assert_eq!(
            NodeJs.download_url("20.11.0", &linux).unwrap(),
            "https://nodejs.org/dist/v20.11.0/node-v20.11.0-linux-x64.tar.gz"
        );
        assert_eq!(
            NodeJs.download_url("v20.11.0", &mac).unwrap(),
            "https://nodejs.org/dist/v20.11.0/node-v20.11.0-darwin-arm64.tar.gz"
        );
        assert_eq!(
            NodeJs.download_url("20.11.0", &windows).unwrap(),
            "https://nodejs.org/dist/v20.11.0/node-v20.11.0-win-x64.zip"
        );
        assert_eq!(NodeJs.download_url("lts", &linux), None);
    }

    #[test]
    fn test_folder_versions() {
        assert_eq!(
            NodeJs.version_from_folder("node-v20.11.0-linux-x64").as_deref(),
            Some("20.11.0")
        );
        assert_eq!(NodeJs.version_from_folder("node"), None);
        assert!(NodeJs.matches_version("v20.11.0", "20.11.0"));
        assert!(!NodeJs.matches_version("20.11.1", "20.11.0"));
    }
}
