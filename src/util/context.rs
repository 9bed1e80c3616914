//! Global context for ktpack operations.
//!
//! [`KtpackContext`] is built once per invocation and passed by reference
//! into every component. It snapshots everything that would otherwise be
//! read from the environment (install roots, `PATH`, host platform) so
//! components never consult ambient global state.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::platform::HostPlatform;
use crate::util::config::Config;

/// Project directories for ktpack
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("io", "ktpack", "ktpack"));

/// Immutable configuration and paths for one ktpack invocation.
#[derive(Debug, Clone)]
pub struct KtpackContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global ktpack data
    home: PathBuf,

    /// Directory holding script-evaluation cache entries
    script_cache_dir: PathBuf,

    /// Snapshot of the `PATH` environment variable
    path_env: String,

    /// The machine we are running on
    host: HostPlatform,

    /// Loaded configuration
    config: Config,
}

impl KtpackContext {
    /// Create a context from the environment.
    ///
    /// `KTPACK_HOME` overrides the default home directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = match std::env::var_os("KTPACK_HOME") {
            Some(home) => PathBuf::from(home),
            None => match PROJECT_DIRS.as_ref() {
                Some(dirs) => dirs.data_dir().to_path_buf(),
                None => cwd.join(".ktpack"),
            },
        };

        let mut ctx = KtpackContext {
            cwd,
            home,
            script_cache_dir: std::env::temp_dir(),
            path_env: std::env::var("PATH").unwrap_or_default(),
            host: HostPlatform::current(),
            config: Config::default(),
        };
        ctx.config = Config::load_or_default(&ctx.config_path());
        Ok(ctx)
    }

    /// Create a context rooted at an explicit home directory, with default
    /// configuration and an empty `PATH`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        KtpackContext {
            cwd: home.clone(),
            script_cache_dir: home.join("script-cache"),
            home,
            path_env: String::new(),
            host: HostPlatform::current(),
            config: Config::default(),
        }
    }

    /// Override the `PATH` snapshot.
    pub fn with_path_env(mut self, path_env: impl Into<String>) -> Self {
        self.path_env = path_env.into();
        self
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override the host platform.
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &HostPlatform {
        &self.host
    }

    pub fn path_env(&self) -> &str {
        &self.path_env
    }

    /// Config file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Kotlin JVM/JS compiler install root.
    pub fn kotlin_root(&self) -> PathBuf {
        self.home.join("kotlin")
    }

    /// Kotlin/Native compiler install root.
    pub fn kotlin_native_root(&self) -> PathBuf {
        self.home.join("kotlin-native")
    }

    /// JDK install root.
    pub fn jdk_root(&self) -> PathBuf {
        self.home.join("jdks")
    }

    /// Node.js install root.
    pub fn node_root(&self) -> PathBuf {
        self.home.join("nodejs")
    }

    /// Cache for fetched dependencies.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Directory holding manifest-script cache entries.
    pub fn script_cache_dir(&self) -> &Path {
        &self.script_cache_dir
    }
}
