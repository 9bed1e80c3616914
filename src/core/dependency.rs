//! Dependency specification.
//!
//! A [`DependencyConf`] describes one declared dependency and where it comes
//! from. Dependencies are grouped into [`DependencyContainer`]s, each of
//! which applies to a subset of targets.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::platform::KotlinTarget;

/// How a dependency is visible to the module and its dependents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    /// Runtime + compile, not exported to dependents' compile classpath
    #[default]
    Implementation,
    /// Exported to dependents
    Api,
    /// Only for test builds
    Test,
    /// Compile-only (Maven `provided`)
    Compile,
}

impl DependencyScope {
    /// Whether dependencies with this scope propagate transitively.
    ///
    /// Test and compile-only dependencies must be declared directly.
    pub fn is_transitive(&self) -> bool {
        matches!(self, DependencyScope::Implementation | DependencyScope::Api)
    }
}

/// A git reference to check out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitReference {
    #[default]
    DefaultBranch,
    Branch(String),
    Tag(String),
}

/// A parsed `group:artifact:version` coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl MavenCoordinate {
    /// Parse a `group:artifact:version` string.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if [group, artifact, version].iter().all(|p| is_plain_part(p)) =>
            {
                Ok(MavenCoordinate {
                    group_id: group.to_string(),
                    artifact_id: artifact.to_string(),
                    version: version.to_string(),
                })
            }
            _ => bail!("malformed maven coordinate `{}`, expected `group:artifact:version`", s),
        }
    }

    /// The repository-relative directory holding this version's files.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }
}

/// Coordinate parts become repository path segments.
fn is_plain_part(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencyConf {
    Local {
        path: PathBuf,
        #[serde(default)]
        scope: DependencyScope,
    },
    Git {
        url: String,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        scope: DependencyScope,
    },
    Maven {
        group_id: String,
        artifact_id: String,
        version: String,
        #[serde(default)]
        scope: DependencyScope,
    },
    Npm {
        name: String,
        version: String,
        #[serde(default)]
        is_dev: bool,
        #[serde(default)]
        scope: DependencyScope,
    },
}

impl DependencyConf {
    /// Create a Maven dependency from a coordinate.
    pub fn maven(coordinate: &MavenCoordinate, scope: DependencyScope) -> Self {
        DependencyConf::Maven {
            group_id: coordinate.group_id.clone(),
            artifact_id: coordinate.artifact_id.clone(),
            version: coordinate.version.clone(),
            scope,
        }
    }

    /// Identity of this dependency, independent of its version.
    pub fn key(&self) -> String {
        match self {
            DependencyConf::Local { path, .. } => format!("local:{}", path.display()),
            DependencyConf::Git { url, .. } => format!("git:{}", url.trim_end_matches(".git")),
            DependencyConf::Maven {
                group_id,
                artifact_id,
                ..
            } => format!("maven:{}:{}", group_id, artifact_id),
            DependencyConf::Npm { name, .. } => format!("npm:{}", name),
        }
    }

    /// The declared version, if this kind of dependency has one.
    pub fn version(&self) -> Option<&str> {
        match self {
            DependencyConf::Local { .. } => None,
            DependencyConf::Git { version, .. } => version.as_deref(),
            DependencyConf::Maven { version, .. } | DependencyConf::Npm { version, .. } => {
                Some(version)
            }
        }
    }

    pub fn scope(&self) -> DependencyScope {
        match self {
            DependencyConf::Local { scope, .. }
            | DependencyConf::Git { scope, .. }
            | DependencyConf::Maven { scope, .. }
            | DependencyConf::Npm { scope, .. } => *scope,
        }
    }

    /// Return a copy with a different scope.
    pub fn with_scope(mut self, new_scope: DependencyScope) -> Self {
        match &mut self {
            DependencyConf::Local { scope, .. }
            | DependencyConf::Git { scope, .. }
            | DependencyConf::Maven { scope, .. }
            | DependencyConf::Npm { scope, .. } => *scope = new_scope,
        }
        self
    }

    /// The git reference to check out, for git dependencies.
    ///
    /// Tag wins over branch; a bare version is checked out as tag `v<version>`.
    pub fn git_reference(&self) -> Option<GitReference> {
        match self {
            DependencyConf::Git {
                tag,
                branch,
                version,
                ..
            } => Some(if let Some(tag) = tag {
                GitReference::Tag(tag.clone())
            } else if let Some(branch) = branch {
                GitReference::Branch(branch.clone())
            } else if let Some(version) = version {
                GitReference::Tag(format!("v{}", version))
            } else {
                GitReference::DefaultBranch
            }),
            _ => None,
        }
    }

    /// The Maven coordinate, for Maven dependencies.
    pub fn maven_coordinate(&self) -> Option<MavenCoordinate> {
        match self {
            DependencyConf::Maven {
                group_id,
                artifact_id,
                version,
                ..
            } => Some(MavenCoordinate {
                group_id: group_id.clone(),
                artifact_id: artifact_id.clone(),
                version: version.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyConf::Local { path, .. } => write!(f, "{}", path.display()),
            DependencyConf::Git { url, .. } => {
                write!(f, "{}", url)?;
                if let Some(v) = self.version() {
                    write!(f, " v{}", v)?;
                }
                Ok(())
            }
            DependencyConf::Maven {
                group_id,
                artifact_id,
                version,
                ..
            } => write!(f, "{}:{}:{}", group_id, artifact_id, version),
            DependencyConf::Npm { name, version, .. } => write!(f, "{}@{}", name, version),
        }
    }
}

/// A group of dependencies applying to a subset of targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyContainer {
    /// Targets this container applies to; empty means every target.
    #[serde(default)]
    pub targets: Vec<KotlinTarget>,

    pub dependencies: Vec<DependencyConf>,
}

impl DependencyContainer {
    pub fn new(targets: Vec<KotlinTarget>, dependencies: Vec<DependencyConf>) -> Self {
        DependencyContainer {
            targets,
            dependencies,
        }
    }

    /// Whether this container contributes to a resolve for `requested`.
    pub fn applies_to(&self, requested: &[KotlinTarget]) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| requested.contains(t))
    }
}

/// Dependency specification as it appears in pack.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Maven shorthand: `foo = "group:artifact:version"`
    Simple(String),

    /// Detailed specification
    Detailed(DetailedDependencySpec),
}

/// Detailed dependency specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedDependencySpec {
    /// Path to a local module
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Git repository URL
    #[serde(default)]
    pub git: Option<String>,

    /// Git tag
    #[serde(default)]
    pub tag: Option<String>,

    /// Git branch
    #[serde(default)]
    pub branch: Option<String>,

    /// Version (git tag `v<version>`)
    #[serde(default)]
    pub version: Option<String>,

    /// Maven coordinate
    #[serde(default)]
    pub maven: Option<String>,

    /// npm version requirement
    #[serde(default)]
    pub npm: Option<String>,

    /// npm devDependency
    #[serde(default)]
    pub dev: Option<bool>,

    /// Dependency scope
    #[serde(default)]
    pub scope: Option<DependencyScope>,
}

impl DependencySpec {
    /// Convert to a DependencyConf given the entry name and manifest directory.
    pub fn to_dependency(&self, name: &str, manifest_dir: &Path) -> Result<DependencyConf> {
        match self {
            DependencySpec::Simple(coordinate) => {
                let coordinate = MavenCoordinate::parse(coordinate)
                    .with_context(|| format!("invalid dependency `{}`", name))?;
                Ok(DependencyConf::maven(&coordinate, DependencyScope::default()))
            }
            DependencySpec::Detailed(spec) => spec.to_dependency(name, manifest_dir),
        }
    }
}

impl DetailedDependencySpec {
    /// Convert to a DependencyConf.
    pub fn to_dependency(&self, name: &str, manifest_dir: &Path) -> Result<DependencyConf> {
        let scope = self.scope.unwrap_or_default();
        let sources = [
            self.path.is_some(),
            self.git.is_some(),
            self.maven.is_some(),
            self.npm.is_some(),
        ];
        if sources.iter().filter(|s| **s).count() > 1 {
            bail!(
                "dependency `{}` must specify only one of `path`, `git`, `maven`, or `npm`",
                name
            );
        }

        if let Some(ref path) = self.path {
            let full_path = if path.is_absolute() {
                path.clone()
            } else {
                manifest_dir.join(path)
            };
            Ok(DependencyConf::Local {
                path: full_path,
                scope,
            })
        } else if let Some(ref url) = self.git {
            url::Url::parse(url)
                .with_context(|| format!("dependency `{}` has an invalid git url", name))?;
            Ok(DependencyConf::Git {
                url: url.clone(),
                tag: self.tag.clone(),
                branch: self.branch.clone(),
                version: self.version.clone(),
                scope,
            })
        } else if let Some(ref coordinate) = self.maven {
            let coordinate = MavenCoordinate::parse(coordinate)
                .with_context(|| format!("invalid dependency `{}`", name))?;
            Ok(DependencyConf::maven(&coordinate, scope))
        } else if let Some(ref version) = self.npm {
            Ok(DependencyConf::Npm {
                name: name.to_string(),
                version: version.clone(),
                is_dev: self.dev.unwrap_or(false),
                scope,
            })
        } else {
            bail!(
                "dependency `{}` must specify `path`, `git`, `maven`, or `npm`",
                name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_maven_shorthand() {
        let tmp = TempDir::new().unwrap();
        let spec = DependencySpec::Simple("io.ktor:ktor-client-core:2.1.0".to_string());
        let dep = spec.to_dependency("ktor", tmp.path()).unwrap();

        assert_eq!(dep.key(), "maven:io.ktor:ktor-client-core");
        assert_eq!(dep.version(), Some("2.1.0"));
        assert_eq!(dep.scope(), DependencyScope::Implementation);
    }

    #[test]
    fn test_malformed_coordinate() {
        let tmp = TempDir::new().unwrap();
        let spec = DependencySpec::Simple("io.ktor:ktor-client-core".to_string());
        let err = spec.to_dependency("ktor", tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("malformed maven coordinate"));
    }

    #[test]
    fn test_coordinate_parts_must_be_path_segments() {
        assert!(MavenCoordinate::parse("org.sample:..:1.0.0").is_err());
        assert!(MavenCoordinate::parse("org.sample:lib:../1.0.0").is_err());
        assert!(MavenCoordinate::parse("..:lib:1.0.0").is_err());
        assert!(MavenCoordinate::parse("org.sample:lib:1.0.0-RC").is_ok());
    }

    #[test]
    fn test_key_ignores_version() {
        let a = DependencyConf::Maven {
            group_id: "g".into(),
            artifact_id: "a".into(),
            version: "1.0.0".into(),
            scope: DependencyScope::Api,
        };
        let b = DependencyConf::Maven {
            group_id: "g".into(),
            artifact_id: "a".into(),
            version: "2.0.0".into(),
            scope: DependencyScope::Implementation,
        };
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_git_reference_precedence() {
        let tmp = TempDir::new().unwrap();
        let spec = DetailedDependencySpec {
            git: Some("https://github.com/user/repo".to_string()),
            branch: Some("main".to_string()),
            version: Some("1.0.0".to_string()),
            ..Default::default()
        };
        let dep = spec.to_dependency("repo", tmp.path()).unwrap();
        assert_eq!(dep.git_reference(), Some(GitReference::Branch("main".into())));
        assert_eq!(dep.version(), Some("1.0.0"));

        let spec = DetailedDependencySpec {
            git: Some("https://github.com/user/repo".to_string()),
            version: Some("1.0.0".to_string()),
            ..Default::default()
        };
        let dep = spec.to_dependency("repo", tmp.path()).unwrap();
        assert_eq!(dep.git_reference(), Some(GitReference::Tag("v1.0.0".into())));
    }

    #[test]
    fn test_path_is_relative_to_manifest() {
        let tmp = TempDir::new().unwrap();
        let spec = DetailedDependencySpec {
            path: Some(PathBuf::from("../other")),
            scope: Some(DependencyScope::Api),
            ..Default::default()
        };
        let dep = spec.to_dependency("other", tmp.path()).unwrap();
        assert_eq!(
            dep,
            DependencyConf::Local {
                path: tmp.path().join("../other"),
                scope: DependencyScope::Api,
            }
        );
    }

    #[test]
    fn test_multiple_sources_rejected() {
        let tmp = TempDir::new().unwrap();
        let spec = DetailedDependencySpec {
            path: Some(PathBuf::from("../other")),
            npm: Some("1.0.0".into()),
            ..Default::default()
        };
        assert!(spec.to_dependency("other", tmp.path()).is_err());
    }

    #[test]
    fn test_container_applies_to() {
        let common = DependencyContainer::new(vec![], vec![]);
        let jvm = DependencyContainer::new(vec![KotlinTarget::Jvm], vec![]);

        assert!(common.applies_to(&[KotlinTarget::LinuxX64]));
        assert!(jvm.applies_to(&[KotlinTarget::LinuxX64, KotlinTarget::Jvm]));
        assert!(!jvm.applies_to(&[KotlinTarget::JsNode]));
    }
}
