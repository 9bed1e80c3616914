//! npm registry source.

use std::collections::BTreeMap;

use semver::{Version, VersionReq};
use serde::Deserialize;

use crate::core::{DependencyConf, DependencyScope};
use crate::resolver::ResolveError;
use crate::sources::{ArtifactMetadata, Downloader};

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: BTreeMap<String, PackageVersion>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Resolves npm packages against a registry.
#[derive(Debug, Clone)]
pub struct NpmRegistryFetcher<D> {
    downloader: D,
    registry: String,
}

impl<D: Downloader> NpmRegistryFetcher<D> {
    pub fn new(downloader: D, registry: String) -> Self {
        NpmRegistryFetcher {
            downloader,
            registry: registry.trim_end_matches('/').to_string(),
        }
    }

    /// Select the highest published version of `name` matching `requirement`.
    pub async fn fetch(
        &self,
        name: &str,
        requirement: &str,
    ) -> Result<ArtifactMetadata, ResolveError> {
        let url = format!("{}/{}", self.registry, name.replace('/', "%2F"));
        let text = self
            .downloader
            .fetch_text(&url)
            .await
            .map_err(|e| ResolveError::Fetch {
                dependency: name.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| ResolveError::NotFound {
                dependency: name.to_string(),
            })?;

        let packument: Packument =
            serde_json::from_str(&text).map_err(|e| ResolveError::InvalidMetadata {
                dependency: name.to_string(),
                message: e.to_string(),
            })?;

        let no_match = || ResolveError::NoMatchingVersion {
            package: name.to_string(),
            requirement: requirement.to_string(),
        };

        let selected = match packument.dist_tags.get(requirement.trim()) {
            Some(tagged) => tagged.clone(),
            None => max_satisfying(packument.versions.keys().map(String::as_str), requirement)
                .ok_or_else(no_match)?,
        };
        let package = packument.versions.get(&selected).ok_or_else(no_match)?;

        tracing::debug!("Selected {}@{} for `{}`", name, selected, requirement);

        Ok(ArtifactMetadata {
            version: selected,
            dependencies: package
                .dependencies
                .iter()
                .map(|(name, version)| DependencyConf::Npm {
                    name: name.clone(),
                    version: version.clone(),
                    is_dev: false,
                    scope: DependencyScope::Implementation,
                })
                .collect(),
            artifacts: Vec::new(),
        })
    }
}

/// Parse an npm range into alternatives, any of which may match.
///
/// Supports `||` alternatives, space-separated comparators, hyphen ranges
/// and bare versions (which match exactly).
pub fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| {
            let alternative = alternative.trim();
            if matches!(alternative, "" | "*" | "x" | "X" | "latest") {
                return Some(VersionReq::STAR);
            }

            let tokens: Vec<&str> = alternative.split_whitespace().collect();
            let comparators: Vec<String> = match tokens.as_slice() {
                [low, "-", high] => vec![
                    format!(">={}", low.trim_start_matches('v')),
                    format!("<={}", high.trim_start_matches('v')),
                ],
                _ => tokens.iter().map(|t| normalize_comparator(t)).collect(),
            };

            VersionReq::parse(&comparators.join(", ")).ok()
        })
        .collect()
}

fn normalize_comparator(token: &str) -> String {
    let token = token.trim_start_matches('v');
    if Version::parse(token).is_ok() {
        format!("={}", token)
    } else {
        token.to_string()
    }
}

/// The highest version in `versions` satisfying `range`.
pub fn max_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    range: &str,
) -> Option<String> {
    let alternatives = parse_range(range)?;
    versions
        .into_iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v)))
        .filter(|(parsed, _)| alternatives.iter().any(|req| req.matches(parsed)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.to_string())
}
