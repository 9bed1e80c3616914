//! Configuration file support for ktpack.
//!
//! The global configuration lives at `~/.ktpack/config.toml` (or the
//! platform cache directory) and selects toolchain versions and the
//! repositories dependencies are fetched from.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_KOTLIN_VERSION: &str = "1.9.22";
pub const DEFAULT_JDK_VERSION: &str = "17";
pub const DEFAULT_NODE_VERSION: &str = "20.11.0";
pub const MAVEN_CENTRAL_URL: &str = "https://repo1.maven.org/maven2";
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// ktpack configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kotlin: KotlinConfig,
    pub jdk: JdkConfig,
    pub nodejs: NodeConfig,
    pub maven: MavenConfig,
    pub npm: NpmConfig,
}

/// Kotlin compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KotlinConfig {
    /// Compiler version used for JVM, JS and native builds
    pub version: String,
}

impl Default for KotlinConfig {
    fn default() -> Self {
        KotlinConfig {
            version: DEFAULT_KOTLIN_VERSION.to_string(),
        }
    }
}

/// JDK settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JdkConfig {
    /// Feature release (`17`) or full version (`17.0.9+9`)
    pub version: String,
}

impl Default for JdkConfig {
    fn default() -> Self {
        JdkConfig {
            version: DEFAULT_JDK_VERSION.to_string(),
        }
    }
}

/// Node.js settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub version: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            version: DEFAULT_NODE_VERSION.to_string(),
        }
    }
}

/// Maven repositories, searched in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MavenConfig {
    pub repositories: Vec<String>,
}

impl Default for MavenConfig {
    fn default() -> Self {
        MavenConfig {
            repositories: vec![MAVEN_CENTRAL_URL.to_string()],
        }
    }
}

/// npm registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmConfig {
    pub registry: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        NpmConfig {
            registry: NPM_REGISTRY_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or can't be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

}
