//! pack.toml manifest parsing and schema.
//!
//! The manifest describes one module: its metadata, the targets it builds
//! for, and its dependencies partitioned by target alias.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::{DependencyContainer, DependencySpec};
use crate::core::platform::KotlinTarget;

/// Declarative manifest file name.
pub const MANIFEST_NAME: &str = "pack.toml";

/// Script manifest file name.
pub const SCRIPT_MANIFEST_NAME: &str = "pack.kts";

/// A resolved module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConf {
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    /// Discover extra binaries under `<source root>/bin/`
    #[serde(default = "default_true")]
    pub autobin: bool,

    /// Declared targets; empty means every supported target
    #[serde(default)]
    pub targets: Vec<KotlinTarget>,

    #[serde(default)]
    pub dependencies: Vec<DependencyContainer>,
}

fn default_true() -> bool {
    true
}

impl ModuleConf {
    /// Create a module with no dependencies that targets everything.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ModuleConf {
            name: name.into(),
            version: version.into(),
            authors: Vec::new(),
            description: None,
            license: None,
            homepage: None,
            autobin: true,
            targets: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Load a module from a pack.toml file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let manifest_dir = path.parent().unwrap_or(Path::new("."));

        Self::parse(&contents, manifest_dir)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest contents. Relative dependency paths resolve against
    /// `manifest_dir`.
    pub fn parse(contents: &str, manifest_dir: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(contents)?;
        raw.into_module(manifest_dir)
    }

    /// Targets this module can build: the declared list, or every target.
    pub fn effective_targets(&self) -> Vec<KotlinTarget> {
        if self.targets.is_empty() {
            KotlinTarget::ALL.to_vec()
        } else {
            self.targets.clone()
        }
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("module name cannot be empty");
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!(
                "module name `{}` may only contain letters, digits, `-` and `_`",
                self.name
            );
        }
        semver::Version::parse(&self.version)
            .with_context(|| format!("invalid module version `{}`", self.version))?;
        Ok(())
    }
}

/// The on-disk shape of pack.toml.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    module: RawModule,

    /// Alias -> (entry name -> spec)
    #[serde(default)]
    dependencies: BTreeMap<String, BTreeMap<String, DependencySpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModule {
    name: String,
    version: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default = "default_true")]
    autobin: bool,
    #[serde(default)]
    targets: Vec<String>,
}

impl RawManifest {
    fn into_module(self, manifest_dir: &Path) -> Result<ModuleConf> {
        let mut targets = Vec::new();
        for name in &self.module.targets {
            let target = name
                .parse::<KotlinTarget>()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        // `common` first so universal dependencies are resolved before
        // target-specific ones.
        let mut aliases: Vec<_> = self.dependencies.into_iter().collect();
        aliases.sort_by_key(|(alias, _)| alias != "common");

        let mut dependencies = Vec::new();
        for (alias, entries) in aliases {
            let container_targets = KotlinTarget::from_alias(&alias)
                .with_context(|| format!("unknown dependency target `{}`", alias))?;

            let mut confs = Vec::new();
            for (name, spec) in &entries {
                confs.push(spec.to_dependency(name, manifest_dir)?);
            }
            dependencies.push(DependencyContainer::new(container_targets, confs));
        }

        let module = ModuleConf {
            name: self.module.name,
            version: self.module.version,
            authors: self.module.authors,
            description: self.module.description,
            license: self.module.license,
            homepage: self.module.homepage,
            autobin: self.module.autobin,
            targets,
            dependencies,
        };
        module.validate()?;
        Ok(module)
    }
}

/// Which kind of manifest a module directory holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestPath {
    Toml(PathBuf),
    Script(PathBuf),
}

/// Find the manifest in `dir`, preferring pack.toml over pack.kts.
pub fn find_manifest(dir: &Path) -> Result<ManifestPath> {
    let toml = dir.join(MANIFEST_NAME);
    if toml.is_file() {
        return Ok(ManifestPath::Toml(toml));
    }
    let script = dir.join(SCRIPT_MANIFEST_NAME);
    if script.is_file() {
        return Ok(ManifestPath::Script(script));
    }
    bail!(
        "could not find `{}` or `{}` in {}",
        MANIFEST_NAME,
        SCRIPT_MANIFEST_NAME,
        dir.display()
    )
}
