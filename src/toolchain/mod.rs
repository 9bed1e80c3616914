//! Toolchain discovery and provisioning.
//!
//! Each toolchain (Kotlin compiler, Kotlin/Native, JDK, Node.js) is a
//! [`ToolchainDistribution`]: it knows where to download a version for a
//! host and how its install folders are named. [`ToolchainInstaller`] does
//! the rest generically:
//!
//! - `discover(root)` lists the installs under an install root.
//! - `find_and_install(root, version, ..)` reuses a matching install, or
//!   downloads the archive to a temp file, extracts it to a temp directory
//!   and moves the result to `<root>/<folder>`.
//!
//! An install that fails is abandoned. Temporary files live in the install
//! root and are removed when their handles drop, including when the install
//! future is cancelled.

pub mod compressor;
pub mod jdk;
pub mod kotlin;
pub mod node;

pub use compressor::{ArchiveCompressor, Compressor};
pub use jdk::{Jdk, JdkInstallDetails};
pub use kotlin::{KotlinCompiler, KotlinNative};
pub use node::NodeJs;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::HostPlatform;
use crate::sources::{DownloadError, Downloader};
use crate::util::fs::{is_non_empty_dir, move_dir, remove_dir_all_if_exists, single_child_dir};
use crate::util::KtpackContext;

/// A discovered or newly provisioned toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDetails {
    pub version: String,
    pub path: PathBuf,
    /// Whether the install is on the current `PATH`
    pub is_active: bool,
}

/// Outcome of [`ToolchainInstaller::find_and_install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult<D> {
    AlreadyInstalled(D),
    Success(D),
}

impl<D> InstallResult<D> {
    pub fn details(&self) -> &D {
        match self {
            InstallResult::AlreadyInstalled(d) | InstallResult::Success(d) => d,
        }
    }

    pub fn into_details(self) -> D {
        match self {
            InstallResult::AlreadyInstalled(d) | InstallResult::Success(d) => d,
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{0}")]
    FileIo(String),

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("no {toolchain} distribution for version `{version}` on this host")]
    NoMatchingVersion {
        toolchain: &'static str,
        version: String,
    },
}

impl InstallError {
    fn file_io(context: &str, error: impl std::fmt::Display) -> Self {
        InstallError::FileIo(format!("{}: {}", context, error))
    }
}

/// Progress of one install, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallProgress {
    Downloading(u8),
    Extracting(u8),
}

/// Reduces raw progress to whole multiples of 10 percent, each reported
/// at most once and in increasing order.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last: Option<u8>,
}

impl ProgressThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage to report for `done` of `total`, if any.
    pub fn update(&mut self, done: u64, total: u64) -> Option<u8> {
        if total == 0 {
            return None;
        }
        let percent = ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8;
        if percent % 10 != 0 || self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// Terminal progress bar for one install.
pub struct InstallProgressBar {
    bar: ProgressBar,
    label: String,
}

impl InstallProgressBar {
    pub fn new(toolchain: &str, version: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:24} [{bar:40.cyan/blue}] {pos:>3}%")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        InstallProgressBar {
            bar,
            label: format!("{} {}", toolchain, version),
        }
    }

    pub fn update(&self, progress: InstallProgress) {
        let (phase, percent) = match progress {
            InstallProgress::Downloading(p) => ("Downloading", p),
            InstallProgress::Extracting(p) => ("Extracting", p),
        };
        self.bar.set_message(format!("{} {}", phase, self.label));
        self.bar.set_position(percent as u64);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// A downloadable toolchain.
pub trait ToolchainDistribution: Send + Sync {
    /// Details handed back to callers, usually [`InstallDetails`] plus
    /// toolchain specific paths.
    type Details: Clone + Debug + Send;

    fn name(&self) -> &'static str;

    /// Archive URL for `version` on `host`; `None` if there is no such
    /// distribution.
    fn download_url(&self, version: &str, host: &HostPlatform) -> Option<String>;

    /// Archive extension for `host`, without the leading dot.
    fn archive_extension(&self, host: &HostPlatform) -> &'static str;

    /// Folder an install of `version` is moved to. `archive_root` is the
    /// single top-level directory of the archive, when there is one.
    fn install_folder(&self, version: &str, archive_root: Option<&str>) -> String {
        archive_root
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", self.name(), version))
    }

    /// Version of the install in `folder`.
    fn version_from_folder(&self, folder: &str) -> Option<String>;

    /// Whether an installed version satisfies a requested one.
    fn matches_version(&self, requested: &str, installed: &str) -> bool {
        requested == installed
    }

    fn details(&self, install: InstallDetails, host: &HostPlatform) -> Self::Details;
}

/// Generic installer over a distribution and the download and extraction
/// capabilities.
pub struct ToolchainInstaller<T, D, C> {
    distribution: T,
    downloader: D,
    compressor: C,
    host: HostPlatform,
    path_env: String,
}

impl<T, D, C> ToolchainInstaller<T, D, C>
where
    T: ToolchainDistribution,
    D: Downloader,
    C: Compressor + Clone,
{
    pub fn new(ctx: &KtpackContext, distribution: T, downloader: D, compressor: C) -> Self {
        ToolchainInstaller {
            distribution,
            downloader,
            compressor,
            host: *ctx.host(),
            path_env: ctx.path_env().to_string(),
        }
    }

    pub fn distribution(&self) -> &T {
        &self.distribution
    }

    /// Installs under `root`: every non-empty child directory.
    pub fn discover(&self, root: &Path) -> Vec<T::Details> {
        self.discover_installs(root)
            .into_iter()
            .map(|install| self.distribution.details(install, &self.host))
            .collect()
    }

    fn discover_installs(&self, root: &Path) -> Vec<InstallDetails> {
        let Ok(entries) = std::fs::read_dir(root) else {
            return Vec::new();
        };

        let mut installs: Vec<InstallDetails> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && is_non_empty_dir(path))
            .filter_map(|path| {
                let folder = path.file_name()?.to_string_lossy().into_owned();
                // Leftovers of an interrupted install
                if folder.starts_with('.') {
                    return None;
                }
                let version = self
                    .distribution
                    .version_from_folder(&folder)
                    .unwrap_or(folder);
                let is_active = self.path_env.contains(path.to_string_lossy().as_ref());
                Some(InstallDetails {
                    version,
                    path,
                    is_active,
                })
            })
            .collect();

        installs.sort_by(|a, b| a.path.cmp(&b.path));
        installs
    }

    /// Return the install of `version` under `root`, downloading it first
    /// if needed.
    pub async fn find_and_install(
        &self,
        root: &Path,
        version: &str,
        on_progress: &mut (dyn FnMut(InstallProgress) + Send),
    ) -> Result<InstallResult<T::Details>, InstallError> {
        if let Some(existing) = self
            .discover_installs(root)
            .into_iter()
            .find(|install| self.distribution.matches_version(version, &install.version))
        {
            tracing::debug!(
                "{} {} already installed at {}",
                self.distribution.name(),
                existing.version,
                existing.path.display()
            );
            return Ok(InstallResult::AlreadyInstalled(
                self.distribution.details(existing, &self.host),
            ));
        }

        let url = self
            .distribution
            .download_url(version, &self.host)
            .ok_or_else(|| InstallError::NoMatchingVersion {
                toolchain: self.distribution.name(),
                version: version.to_string(),
            })?;

        std::fs::create_dir_all(root)
            .map_err(|e| InstallError::file_io(&format!("failed to create {}", root.display()), e))?;

        // Downloading
        tracing::info!("Downloading {} {}", self.distribution.name(), version);
        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(&format!(".{}", self.distribution.archive_extension(&self.host)))
            .tempfile_in(root)
            .map_err(|e| InstallError::file_io("failed to create temporary file", e))?;
        {
            let std_file = archive
                .reopen()
                .map_err(|e| InstallError::file_io("failed to open temporary file", e))?;
            let mut sink = tokio::fs::File::from_std(std_file);
            let mut throttle = ProgressThrottle::new();
            self.downloader
                .download(&url, &mut sink, &mut |done, total| {
                    if let Some(percent) = total.and_then(|total| throttle.update(done, total)) {
                        on_progress(InstallProgress::Downloading(percent));
                    }
                })
                .await?;
        }

        // Extracting
        tracing::info!("Extracting {} {}", self.distribution.name(), version);
        let extract_dir = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(root)
            .map_err(|e| InstallError::file_io("failed to create temporary directory", e))?;
        self.extract(archive.path(), extract_dir.path(), on_progress)
            .await?;

        // Moving into place
        let (content, archive_root) = match single_child_dir(extract_dir.path()) {
            Some(child) => {
                let name = child
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                (child, name)
            }
            None => (extract_dir.path().to_path_buf(), None),
        };
        let folder = self
            .distribution
            .install_folder(version, archive_root.as_deref());
        let dest = root.join(&folder);

        remove_dir_all_if_exists(&dest)
            .and_then(|_| move_dir(&content, &dest))
            .map_err(|e| InstallError::file_io("failed to move install into place", format!("{:#}", e)))?;

        tracing::info!(
            "Installed {} {} to {}",
            self.distribution.name(),
            version,
            dest.display()
        );

        let install = InstallDetails {
            version: self
                .distribution
                .version_from_folder(&folder)
                .unwrap_or_else(|| version.to_string()),
            is_active: self.path_env.contains(dest.to_string_lossy().as_ref()),
            path: dest,
        };
        Ok(InstallResult::Success(
            self.distribution.details(install, &self.host),
        ))
    }

    /// Extract on the blocking pool, relaying entry progress back here.
    async fn extract(
        &self,
        archive: &Path,
        out_dir: &Path,
        on_progress: &mut (dyn FnMut(InstallProgress) + Send),
    ) -> Result<(), InstallError> {
        let compressor = self.compressor.clone();
        let archive = archive.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        let (tx, mut rx) = mpsc::unbounded_channel::<(u64, u64)>();

        let task = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let total = compressor.count_files(&archive)?;
            let mut done = 0u64;
            compressor.extract(&archive, &out_dir, &mut |_| {
                done += 1;
                let _ = tx.send((done, total));
            })
        });

        let mut throttle = ProgressThrottle::new();
        while let Some((done, total)) = rx.recv().await {
            if let Some(percent) = throttle.update(done, total) {
                on_progress(InstallProgress::Extracting(percent));
            }
        }

        task.await
            .map_err(|e| InstallError::file_io("extraction task failed", e))?
            .map_err(|e| InstallError::file_io("extraction failed", format!("{:#}", e)))
    }
}
