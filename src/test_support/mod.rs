//! Test utilities and mocks for ktpack unit tests.
//!
//! Mocks stand in for the network and version-control capabilities so the
//! resolver, sources and toolchain installer can be exercised without I/O
//! beyond a temporary directory.

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::{DependencyConf, DependencyScope, GitReference, KotlinTarget, MavenCoordinate};
use crate::resolver::ResolveError;
use crate::sources::{ArtifactMetadata, DownloadError, Downloader, MetadataFetcher, VersionControl};

pub use fixtures::*;

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Debug, Default)]
pub struct MockDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: AtomicUsize,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Number of requests served so far, including 404s.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Downloader for MockDownloader {
    async fn download<W>(
        &self,
        url: &str,
        sink: &mut W,
        on_progress: &mut (dyn FnMut(u64, Option<u64>) + Send),
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.get(url).ok_or_else(|| DownloadError::Status {
            url: url.to_string(),
            status: 404,
        })?;

        let total = body.len() as u64;
        let mut written = 0u64;
        on_progress(0, Some(total));
        for chunk in body.chunks(64) {
            sink.write_all(chunk).await?;
            written += chunk.len() as u64;
            on_progress(written, Some(total));
        }
        sink.flush().await?;
        Ok(written)
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>, DownloadError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .bodies
            .get(url)
            .map(|body| String::from_utf8_lossy(body).into_owned()))
    }
}

/// Serves a canned dependency graph.
///
/// Maven entries are keyed by `group:artifact:version`, npm entries by
/// `name@requirement`. Unknown coordinates fail with `NotFound`.
#[derive(Debug, Default)]
pub struct MockFetcher {
    maven: HashMap<String, Result<ArtifactMetadata, ResolveError>>,
    npm: HashMap<String, Result<ArtifactMetadata, ResolveError>>,
    requested_targets: Mutex<Vec<Vec<KotlinTarget>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `coordinate` with `dependencies` (each `group:artifact:version`).
    pub fn maven(mut self, coordinate: &str, dependencies: &[&str]) -> Self {
        let parsed = parse_coordinate(coordinate);
        let metadata = ArtifactMetadata {
            version: parsed.version.clone(),
            dependencies: dependencies
                .iter()
                .map(|d| DependencyConf::maven(&parse_coordinate(d), DependencyScope::Implementation))
                .collect(),
            artifacts: vec![PathBuf::from(format!(
                "/repo/{}/{}-{}.jar",
                parsed.repository_path(),
                parsed.artifact_id,
                parsed.version
            ))],
        };
        self.maven.insert(coordinate.to_string(), Ok(metadata));
        self
    }

    /// Make fetching `coordinate` fail.
    pub fn maven_error(mut self, coordinate: &str, error: ResolveError) -> Self {
        self.maven.insert(coordinate.to_string(), Err(error));
        self
    }

    /// Register npm `name@requirement` resolving to `version`.
    pub fn npm(mut self, name: &str, requirement: &str, version: &str) -> Self {
        let metadata = ArtifactMetadata {
            version: version.to_string(),
            dependencies: Vec::new(),
            artifacts: Vec::new(),
        };
        self.npm
            .insert(format!("{}@{}", name, requirement), Ok(metadata));
        self
    }

    /// Target lists passed to each Maven fetch, in call order.
    pub fn requested_targets(&self) -> Vec<Vec<KotlinTarget>> {
        self.requested_targets
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

fn parse_coordinate(s: &str) -> MavenCoordinate {
    match MavenCoordinate::parse(s) {
        Ok(c) => c,
        Err(e) => panic!("bad test coordinate: {}", e),
    }
}

impl MetadataFetcher for MockFetcher {
    async fn fetch_maven(
        &self,
        coordinate: &MavenCoordinate,
        targets: &[KotlinTarget],
    ) -> Result<ArtifactMetadata, ResolveError> {
        if let Ok(mut requested) = self.requested_targets.lock() {
            requested.push(targets.to_vec());
        }
        self.maven
            .get(&coordinate.to_string())
            .cloned()
            .unwrap_or_else(|| {
                Err(ResolveError::NotFound {
                    dependency: coordinate.to_string(),
                })
            })
    }

    async fn fetch_npm(
        &self,
        name: &str,
        requirement: &str,
    ) -> Result<ArtifactMetadata, ResolveError> {
        self.npm
            .get(&format!("{}@{}", name, requirement))
            .cloned()
            .unwrap_or_else(|| {
                Err(ResolveError::NotFound {
                    dependency: name.to_string(),
                })
            })
    }
}

/// Records checkouts and materializes each as an empty directory.
#[derive(Debug, Default)]
pub struct MockVersionControl {
    fail: bool,
    checkouts: Mutex<Vec<(String, GitReference)>>,
}

impl MockVersionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        MockVersionControl {
            fail: true,
            ..Default::default()
        }
    }

    pub fn checkouts(&self) -> Vec<(String, GitReference)> {
        self.checkouts
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl VersionControl for MockVersionControl {
    async fn checkout(&self, url: &str, reference: &GitReference, dest: &Path) -> Result<()> {
        if self.fail {
            bail!("remote unreachable");
        }
        if let Ok(mut checkouts) = self.checkouts.lock() {
            checkouts.push((url.to_string(), reference.clone()));
        }
        std::fs::create_dir_all(dest)?;
        Ok(())
    }
}
