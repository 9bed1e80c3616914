//! Dependency sources.
//!
//! Sources fetch dependency metadata and artifacts from their locations:
//! local paths, git repositories, Maven repositories and the npm registry.
//! Network transport and git plumbing are reached only through the
//! [`Downloader`] and [`VersionControl`] capabilities so they can be
//! swapped out in tests.

pub mod git;
pub mod http;
pub mod maven;
pub mod npm;
pub mod path;

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::core::{DependencyConf, GitReference, KotlinTarget, MavenCoordinate};
use crate::resolver::ResolveError;

pub use git::GitVersionControl;
pub use http::HttpDownloader;
pub use maven::MavenRepositoryFetcher;
pub use npm::NpmRegistryFetcher;

/// Error from the download capability.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-level HTTP transport.
pub trait Downloader: Send + Sync {
    /// Stream `url` into `sink`, calling `on_progress(received, total)` as
    /// bytes arrive. Returns the number of bytes written.
    fn download<W>(
        &self,
        url: &str,
        sink: &mut W,
        on_progress: &mut (dyn FnMut(u64, Option<u64>) + Send),
    ) -> impl Future<Output = Result<u64, DownloadError>> + Send
    where
        W: AsyncWrite + Unpin + Send;

    /// Fetch a text document. `Ok(None)` means the server answered 404.
    fn fetch_text(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<String>, DownloadError>> + Send;
}

/// Version-control checkout capability.
pub trait VersionControl: Send + Sync {
    /// Clone `url` into `dest` (or update an existing clone) and check out
    /// `reference`.
    fn checkout(
        &self,
        url: &str,
        reference: &GitReference,
        dest: &Path,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Resolved metadata for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// The concrete version that was selected
    pub version: String,

    /// Dependencies declared by the artifact
    pub dependencies: Vec<DependencyConf>,

    /// Files downloaded for the artifact
    pub artifacts: Vec<PathBuf>,
}

/// Fetches artifact metadata from package repositories.
pub trait MetadataFetcher: Send + Sync {
    /// Metadata for a Maven coordinate, with files selected for `targets`.
    fn fetch_maven(
        &self,
        coordinate: &MavenCoordinate,
        targets: &[KotlinTarget],
    ) -> impl Future<Output = Result<ArtifactMetadata, ResolveError>> + Send;

    /// Metadata for the highest npm version matching `requirement`.
    fn fetch_npm(
        &self,
        name: &str,
        requirement: &str,
    ) -> impl Future<Output = Result<ArtifactMetadata, ResolveError>> + Send;
}

/// Maven repositories + npm registry behind one [`MetadataFetcher`].
pub struct RepositoryFetcher<D> {
    maven: MavenRepositoryFetcher<D>,
    npm: NpmRegistryFetcher<D>,
}

impl<D: Downloader + Clone> RepositoryFetcher<D> {
    pub fn new(ctx: &crate::util::KtpackContext, downloader: D) -> Self {
        RepositoryFetcher {
            maven: MavenRepositoryFetcher::new(
                downloader.clone(),
                ctx.config().maven.repositories.clone(),
                ctx.cache_dir().join("maven"),
            ),
            npm: NpmRegistryFetcher::new(downloader, ctx.config().npm.registry.clone()),
        }
    }
}

impl<D: Downloader> MetadataFetcher for RepositoryFetcher<D> {
    async fn fetch_maven(
        &self,
        coordinate: &MavenCoordinate,
        targets: &[KotlinTarget],
    ) -> Result<ArtifactMetadata, ResolveError> {
        self.maven.fetch(coordinate, targets).await
    }

    async fn fetch_npm(
        &self,
        name: &str,
        requirement: &str,
    ) -> Result<ArtifactMetadata, ResolveError> {
        self.npm.fetch(name, requirement).await
    }
}

