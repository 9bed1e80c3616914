//! Maven repository source.
//!
//! Artifacts are described by Gradle module metadata (`<artifact>-<version>.module`),
//! which lists one variant per platform. The variant matching each requested
//! target is selected, its files are downloaded into the local cache and its
//! dependencies become the node's children. Libraries published without
//! module metadata fall back to the plain jar with no transitive
//! dependencies.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::core::{DependencyConf, DependencyScope, KotlinTarget, MavenCoordinate};
use crate::resolver::ResolveError;
use crate::sources::http::download_to_file;
use crate::sources::{ArtifactMetadata, DownloadError, Downloader};
use crate::util::hash::verify_sha256;

const PLATFORM_TYPE: &str = "org.jetbrains.kotlin.platform.type";
const NATIVE_TARGET: &str = "org.jetbrains.kotlin.native.target";
const USAGE: &str = "org.gradle.usage";
const CATEGORY: &str = "org.gradle.category";

#[derive(Debug, Deserialize)]
struct GradleModule {
    #[serde(default)]
    variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    name: String,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "available-at")]
    available_at: Option<AvailableAt>,
    #[serde(default)]
    dependencies: Vec<VariantDependency>,
    #[serde(default)]
    files: Vec<VariantFile>,
}

#[derive(Debug, Deserialize)]
struct AvailableAt {
    group: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct VariantDependency {
    group: String,
    module: String,
    version: Option<VersionConstraint>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct VersionConstraint {
    strictly: Option<String>,
    requires: Option<String>,
    prefers: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VariantFile {
    name: String,
    url: String,
    sha256: Option<String>,
}

impl Variant {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    fn usage(&self) -> &str {
        self.attribute(USAGE).unwrap_or_default()
    }

    /// Whether this variant carries code for `target` (`None` = common).
    fn matches(&self, target: Option<KotlinTarget>) -> bool {
        if self.attribute(CATEGORY).is_some_and(|c| c != "library") {
            return false;
        }

        let platform = self.attribute(PLATFORM_TYPE);
        match target {
            None => platform == Some("common"),
            Some(t) if t.is_jvm() => {
                platform == Some("jvm")
                    || (platform.is_none() && self.usage().starts_with("java-"))
            }
            Some(t) if t.is_js() => platform == Some("js"),
            Some(t) => {
                platform == Some("native") && self.attribute(NATIVE_TARGET) == t.konan_target()
            }
        }
    }

    /// Lower ranks are preferred: runtime variants carry the full
    /// dependency set.
    fn usage_rank(&self) -> u8 {
        match self.usage() {
            "java-runtime" | "kotlin-runtime" => 0,
            "java-api" | "kotlin-api" => 1,
            "kotlin-metadata" => 2,
            _ => 3,
        }
    }

    fn dependency_scope(&self) -> DependencyScope {
        if self.usage().ends_with("-api") {
            DependencyScope::Api
        } else {
            DependencyScope::Implementation
        }
    }
}

impl VariantDependency {
    fn to_coordinate(&self) -> Option<MavenCoordinate> {
        // Platform (BOM) dependencies only constrain versions
        if self
            .attributes
            .get(CATEGORY)
            .and_then(|v| v.as_str())
            .is_some_and(|c| c.ends_with("platform"))
        {
            return None;
        }

        let constraint = self.version.as_ref()?;
        let version = constraint
            .strictly
            .as_ref()
            .or(constraint.requires.as_ref())
            .or(constraint.prefers.as_ref())?;

        Some(MavenCoordinate {
            group_id: self.group.clone(),
            artifact_id: self.module.clone(),
            version: version.clone(),
        })
    }
}

/// Fetches metadata and files from Maven repositories.
#[derive(Debug, Clone)]
pub struct MavenRepositoryFetcher<D> {
    downloader: D,
    repositories: Vec<String>,
    cache_dir: PathBuf,
}

impl<D: Downloader> MavenRepositoryFetcher<D> {
    pub fn new(downloader: D, repositories: Vec<String>, cache_dir: PathBuf) -> Self {
        MavenRepositoryFetcher {
            downloader,
            repositories: repositories
                .into_iter()
                .map(|r| r.trim_end_matches('/').to_string())
                .collect(),
            cache_dir,
        }
    }

    /// Resolve `coordinate` for `targets` (empty = common metadata).
    pub async fn fetch(
        &self,
        coordinate: &MavenCoordinate,
        targets: &[KotlinTarget],
    ) -> Result<ArtifactMetadata, ResolveError> {
        let module_name = format!("{}-{}.module", coordinate.artifact_id, coordinate.version);
        self.cache_path(coordinate, &module_name)?;
        let mut last_error = None;

        for repository in &self.repositories {
            let base = format!("{}/{}", repository, coordinate.repository_path());
            let url = format!("{}/{}", base, module_name);

            match self.downloader.fetch_text(&url).await {
                Ok(Some(text)) => {
                    tracing::debug!("Using module metadata from {}", url);
                    let module: GradleModule =
                        serde_json::from_str(&text).map_err(|e| ResolveError::InvalidMetadata {
                            dependency: coordinate.to_string(),
                            message: e.to_string(),
                        })?;
                    return self.from_module(coordinate, &base, &module, targets).await;
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("Failed to fetch {}: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            return Err(ResolveError::Fetch {
                dependency: coordinate.to_string(),
                message: e.to_string(),
            });
        }

        if targets.is_empty() || targets.iter().any(KotlinTarget::is_jvm) {
            return self.fetch_plain_jar(coordinate).await;
        }

        Err(ResolveError::NotFound {
            dependency: coordinate.to_string(),
        })
    }

    async fn from_module(
        &self,
        coordinate: &MavenCoordinate,
        base: &str,
        module: &GradleModule,
        targets: &[KotlinTarget],
    ) -> Result<ArtifactMetadata, ResolveError> {
        let wanted: Vec<Option<KotlinTarget>> = if targets.is_empty() {
            vec![None]
        } else {
            targets.iter().copied().map(Some).collect()
        };

        let mut metadata = ArtifactMetadata {
            version: coordinate.version.clone(),
            ..Default::default()
        };

        for target in wanted {
            let Some(variant) = module
                .variants
                .iter()
                .filter(|v| v.matches(target))
                .min_by_key(|v| v.usage_rank())
            else {
                tracing::debug!(
                    "{} has no variant for {}",
                    coordinate,
                    target.map_or("common", |t| t.as_str())
                );
                continue;
            };
            tracing::debug!("Selected variant `{}` of {}", variant.name, coordinate);

            let scope = variant.dependency_scope();
            let mut dependencies: Vec<DependencyConf> = Vec::new();

            if let Some(redirect) = &variant.available_at {
                dependencies.push(DependencyConf::maven(
                    &MavenCoordinate {
                        group_id: redirect.group.clone(),
                        artifact_id: redirect.module.clone(),
                        version: redirect.version.clone(),
                    },
                    DependencyScope::Api,
                ));
            } else {
                dependencies.extend(
                    variant
                        .dependencies
                        .iter()
                        .filter_map(VariantDependency::to_coordinate)
                        .map(|c| DependencyConf::maven(&c, scope)),
                );
                for file in &variant.files {
                    let path = self.download_file(coordinate, base, file).await?;
                    if !metadata.artifacts.contains(&path) {
                        metadata.artifacts.push(path);
                    }
                }
            }

            for dep in dependencies {
                if !metadata.dependencies.iter().any(|d| d.key() == dep.key()) {
                    metadata.dependencies.push(dep);
                }
            }
        }

        Ok(metadata)
    }

    async fn download_file(
        &self,
        coordinate: &MavenCoordinate,
        base: &str,
        file: &VariantFile,
    ) -> Result<PathBuf, ResolveError> {
        let dest = self.cache_path(coordinate, &file.name)?;
        if dest.exists() {
            tracing::debug!("Using cached {}", dest.display());
            return Ok(dest);
        }

        let url = format!("{}/{}", base, file.url);
        tracing::info!("Downloading {}", file.name);
        download_to_file(&self.downloader, &url, &dest)
            .await
            .map_err(|e| fetch_error(coordinate, e))?;

        if let Some(expected) = file.sha256.as_deref().filter(|s| !s.is_empty()) {
            check_checksum(coordinate, &dest, expected)?;
        }
        Ok(dest)
    }

    /// Where `file_name` of `coordinate` lives in the cache.
    ///
    /// Coordinates and file names come from remote metadata, so every path
    /// component must be a plain name.
    fn cache_path(
        &self,
        coordinate: &MavenCoordinate,
        file_name: &str,
    ) -> Result<PathBuf, ResolveError> {
        let relative = Path::new(&coordinate.repository_path()).join(file_name);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(ResolveError::InvalidMetadata {
                dependency: coordinate.to_string(),
                message: format!("refusing to cache outside the repository: {}", relative.display()),
            });
        }
        Ok(self.cache_dir.join(relative))
    }

    async fn fetch_plain_jar(
        &self,
        coordinate: &MavenCoordinate,
    ) -> Result<ArtifactMetadata, ResolveError> {
        let name = format!("{}-{}.jar", coordinate.artifact_id, coordinate.version);
        let dest = self.cache_path(coordinate, &name)?;

        if !dest.exists() {
            let mut found = false;
            for repository in &self.repositories {
                let url = format!("{}/{}/{}", repository, coordinate.repository_path(), name);
                match download_to_file(&self.downloader, &url, &dest).await {
                    Ok(()) => {
                        found = true;
                        break;
                    }
                    Err(DownloadError::Status { status: 404, .. }) => continue,
                    Err(e) => return Err(fetch_error(coordinate, e)),
                }
            }
            if !found {
                return Err(ResolveError::NotFound {
                    dependency: coordinate.to_string(),
                });
            }
        }

        Ok(ArtifactMetadata {
            version: coordinate.version.clone(),
            dependencies: Vec::new(),
            artifacts: vec![dest],
        })
    }
}

fn fetch_error(coordinate: &MavenCoordinate, error: DownloadError) -> ResolveError {
    ResolveError::Fetch {
        dependency: coordinate.to_string(),
        message: error.to_string(),
    }
}

fn check_checksum(
    coordinate: &MavenCoordinate,
    path: &Path,
    expected: &str,
) -> Result<(), ResolveError> {
    verify_sha256(path, expected).map_err(|e| {
        let _ = std::fs::remove_file(path);
        ResolveError::InvalidMetadata {
            dependency: coordinate.to_string(),
            message: e.to_string(),
        }
    })
}
