//! Dependency resolution.
//!
//! The resolver walks a module's declared dependencies for a set of targets
//! and builds a [`RootDependencyNode`] tree. Fetch failures are recorded on
//! the node they concern instead of aborting the walk; only a request for a
//! target the module does not declare fails the whole resolve.
//!
//! Conflicting versions are not an error. The tree keeps every path as it
//! was discovered and [`RootDependencyNode::filter_child_versions`] picks the
//! highest version of each dependency.

pub mod errors;
pub mod node;
pub mod version;

pub use errors::ResolveError;
pub use node::{ChildDependencyNode, RootDependencyNode};

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::core::{DependencyConf, KotlinTarget, ModuleConf};
use crate::sources::{git, path, ArtifactMetadata, MetadataFetcher, VersionControl};
use crate::util::KtpackContext;

type NodeFuture<'a> = Pin<Box<dyn Future<Output = ChildDependencyNode> + Send + 'a>>;

/// State for one resolve call.
#[derive(Default)]
struct Walk {
    /// (key, version) pairs from the root to the current node
    path: Vec<(String, Option<String>)>,

    /// Fetched metadata by coordinate, so repeated subtrees are fetched once
    metadata: HashMap<String, Result<ArtifactMetadata, ResolveError>>,
}

/// Resolves module dependencies through a metadata fetcher and a version
/// control capability.
pub struct DependencyResolver<F, V> {
    fetcher: F,
    vcs: V,
    cache_dir: PathBuf,
}

impl<F: MetadataFetcher, V: VersionControl> DependencyResolver<F, V> {
    pub fn new(ctx: &KtpackContext, fetcher: F, vcs: V) -> Self {
        DependencyResolver {
            fetcher,
            vcs,
            cache_dir: ctx.cache_dir(),
        }
    }

    /// Resolve `module` for `targets`; an empty slice means every target the
    /// module builds.
    pub async fn resolve(
        &self,
        module: &ModuleConf,
        targets: &[KotlinTarget],
    ) -> Result<RootDependencyNode, ResolveError> {
        if !module.targets.is_empty() {
            if let Some(target) = targets.iter().find(|t| !module.targets.contains(t)) {
                return Err(ResolveError::UnsupportedTarget {
                    module: module.name.clone(),
                    target: *target,
                });
            }
        }

        let targets = if targets.is_empty() {
            module.effective_targets()
        } else {
            targets.to_vec()
        };
        let include_npm = targets.iter().any(KotlinTarget::is_js);

        tracing::debug!(
            "Resolving {} for [{}]",
            module.name,
            targets
                .iter()
                .map(KotlinTarget::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut children = Vec::new();
        let mut walk = Walk::default();
        for container in module.dependencies.iter().filter(|c| c.applies_to(&targets)) {
            for dependency in &container.dependencies {
                if matches!(dependency, DependencyConf::Npm { .. }) && !include_npm {
                    continue;
                }
                children.push(
                    self.resolve_node(dependency.clone(), &targets, &mut walk)
                        .await,
                );
            }
        }

        let root = RootDependencyNode {
            module: module.clone(),
            targets,
            children,
        };
        for (dependency, error) in root.failures() {
            tracing::warn!("Could not resolve {}: {}", dependency, error);
        }
        Ok(root)
    }

    /// Resolve one dependency and, recursively, its transitive dependencies.
    ///
    fn resolve_node<'a>(
        &'a self,
        dependency: DependencyConf,
        targets: &'a [KotlinTarget],
        walk: &'a mut Walk,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let identity = (
                dependency.key(),
                dependency.version().map(str::to_string),
            );
            let mut node = ChildDependencyNode::new(dependency);

            if walk.path.contains(&identity) {
                tracing::debug!("Dependency cycle through {}", node.label());
                return node;
            }

            let transitive = match self.fetch(&mut node, targets, &mut walk.metadata).await {
                Ok(transitive) => transitive,
                Err(error) => {
                    node.error = Some(error);
                    return node;
                }
            };

            let parent_scope = node.scope();
            walk.path.push(identity);
            for child in transitive
                .into_iter()
                .filter(|d| d.scope().is_transitive())
            {
                // Test and compile-only subtrees stay out of regular builds
                let child = if parent_scope.is_transitive() {
                    child
                } else {
                    child.with_scope(parent_scope)
                };
                let resolved = self.resolve_node(child, targets, &mut *walk).await;
                node.children.push(resolved);
            }
            walk.path.pop();

            node
        })
    }

    /// Fill in `node`'s artifacts and return its declared dependencies.
    async fn fetch(
        &self,
        node: &mut ChildDependencyNode,
        targets: &[KotlinTarget],
        memo: &mut HashMap<String, Result<ArtifactMetadata, ResolveError>>,
    ) -> Result<Vec<DependencyConf>, ResolveError> {
        match &node.dependency {
            DependencyConf::Local { path: local, .. } => {
                node.artifacts.push(path::resolve_local(local)?);
                Ok(Vec::new())
            }
            DependencyConf::Git { url, .. } => {
                let reference = node.dependency.git_reference().unwrap_or_default();
                let dest = git::checkout_dir(&self.cache_dir, url, &reference);
                self.vcs
                    .checkout(url, &reference, &dest)
                    .await
                    .map_err(|e| ResolveError::Checkout {
                        url: url.clone(),
                        message: format!("{:#}", e),
                    })?;
                node.artifacts.push(dest);
                Ok(Vec::new())
            }
            DependencyConf::Maven { .. } => {
                let coordinate = match node.dependency.maven_coordinate() {
                    Some(coordinate) => coordinate,
                    None => return Ok(Vec::new()),
                };
                let key = format!("maven:{}", coordinate);
                let metadata = match memo.get(&key) {
                    Some(cached) => cached.clone()?,
                    None => {
                        let fetched = self.fetcher.fetch_maven(&coordinate, targets).await;
                        memo.insert(key, fetched.clone());
                        fetched?
                    }
                };
                if metadata.version != coordinate.version {
                    node.resolved_version = Some(metadata.version);
                }
                node.artifacts = metadata.artifacts;
                Ok(metadata.dependencies)
            }
            DependencyConf::Npm { name, version, .. } => {
                let key = format!("npm:{}@{}", name, version);
                let metadata = match memo.get(&key) {
                    Some(cached) => cached.clone()?,
                    None => {
                        let fetched = self.fetcher.fetch_npm(name, version).await;
                        memo.insert(key, fetched.clone());
                        fetched?
                    }
                };
                node.resolved_version = Some(metadata.version);
                node.artifacts = metadata.artifacts;
                Ok(metadata.dependencies)
            }
        }
    }
}
