//! Script manifests (`pack.kts`).
//!
//! A script manifest is evaluated by an external `kotlinc -script` process
//! that prints the resolved modules as one JSON line. Results are cached
//! under the script cache directory, keyed by the SHA-256 of the script
//! bytes, so an unchanged script is only evaluated once.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{find_manifest, ManifestPath, ModuleConf};
use crate::util::hash::sha256_bytes;
use crate::util::{KtpackContext, ProcessBuilder};

/// Suffix separating the script file name from its content hash.
pub const CACHE_SUFFIX: &str = ".ktpack-script-cache-";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run script evaluator: {0}")]
    Spawn(String),

    #[error("script evaluation failed with exit code {exit_code}\n{message}")]
    Process { exit_code: i32, message: String },

    #[error("script produced no module configuration: {0}")]
    InvalidOutput(String),

    #[error("script {path} declares no modules")]
    NoModules { path: PathBuf },
}

/// What a manifest script prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub modules: Vec<ModuleConf>,
}

/// Evaluates a manifest script.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &Path) -> impl Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

/// Runs scripts with `kotlinc -script`.
#[derive(Debug, Clone)]
pub struct KotlincScriptRunner {
    kotlinc: PathBuf,
    java_home: Option<PathBuf>,
}

impl KotlincScriptRunner {
    pub fn new(kotlinc: impl Into<PathBuf>) -> Self {
        KotlincScriptRunner {
            kotlinc: kotlinc.into(),
            java_home: None,
        }
    }

    /// Run `kotlinc` with this `JAVA_HOME`.
    pub fn java_home(mut self, java_home: impl Into<PathBuf>) -> Self {
        self.java_home = Some(java_home.into());
        self
    }
}

impl ScriptRunner for KotlincScriptRunner {
    async fn run(&self, script: &Path) -> Result<ScriptOutput, ScriptError> {
        let cwd = script.parent().unwrap_or(Path::new("."));
        let mut process = ProcessBuilder::new(&self.kotlinc)
            .arg("-script")
            .arg(script)
            .cwd(cwd);
        if let Some(java_home) = &self.java_home {
            process = process.env("JAVA_HOME", java_home.to_string_lossy());
        }
        let output = process
            .exec()
            .await
            .map_err(|e| ScriptError::Spawn(format!("{:#}", e)))?;

        if !output.success() {
            return Err(ScriptError::Process {
                exit_code: output.exit_code,
                message: output.stderr_text(),
            });
        }

        parse_script_output(&output.stdout)
    }
}

/// Find the module JSON among the lines a script printed. The last line
/// that parses wins.
pub fn parse_script_output(lines: &[String]) -> Result<ScriptOutput, ScriptError> {
    let mut last_error = None;
    for line in lines.iter().rev() {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }
        match serde_json::from_str::<ScriptOutput>(line) {
            Ok(output) => return Ok(output),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(ScriptError::InvalidOutput(
        last_error.unwrap_or_else(|| "no JSON line in script output".to_string()),
    ))
}

/// Loads script manifests through a content-addressed cache.
pub struct ScriptExecutor<R> {
    runner: R,
    cache_dir: PathBuf,
}

impl<R: ScriptRunner> ScriptExecutor<R> {
    pub fn new(ctx: &KtpackContext, runner: R) -> Self {
        ScriptExecutor {
            runner,
            cache_dir: ctx.script_cache_dir().to_path_buf(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Cache entry for a script with the given name and contents.
    pub fn cache_path(&self, script: &Path, contents: &[u8]) -> PathBuf {
        let file_name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        self.cache_dir
            .join(format!("{}{}{}", file_name, CACHE_SUFFIX, sha256_bytes(contents)))
    }

    /// Evaluate `script`, reusing a cached result unless `rebuild` is set.
    ///
    /// With `rebuild` the existing cache entry is always deleted first.
    pub async fn load(&self, script: &Path, rebuild: bool) -> Result<Vec<ModuleConf>, ScriptError> {
        let contents = tokio::fs::read(script)
            .await
            .map_err(|source| ScriptError::Read {
                path: script.to_path_buf(),
                source,
            })?;
        let cache_path = self.cache_path(script, &contents);

        if rebuild {
            match tokio::fs::remove_file(&cache_path).await {
                Ok(()) => tracing::debug!("Removed script cache {}", cache_path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to remove script cache {}: {}",
                    cache_path.display(),
                    e
                ),
            }
        } else if let Some(modules) = read_cache(&cache_path).await {
            tracing::debug!("Using cached script result {}", cache_path.display());
            return Ok(modules);
        }

        tracing::info!("Evaluating {}", script.display());
        let output = self.runner.run(script).await?;
        if output.modules.is_empty() {
            return Err(ScriptError::NoModules {
                path: script.to_path_buf(),
            });
        }

        if let Err(e) = write_cache(&cache_path, &output).await {
            tracing::warn!(
                "Failed to write script cache {}: {:#}",
                cache_path.display(),
                e
            );
        }
        Ok(output.modules)
    }

    /// Load the module in `dir` from `pack.toml`, or from `pack.kts` through
    /// this executor.
    pub async fn load_module(&self, dir: &Path, rebuild: bool) -> anyhow::Result<ModuleConf> {
        match find_manifest(dir)? {
            ManifestPath::Toml(path) => ModuleConf::load(&path),
            ManifestPath::Script(path) => {
                let module = self
                    .load(&path, rebuild)
                    .await
                    .with_context(|| format!("failed to load manifest: {}", path.display()))?
                    .into_iter()
                    .next()
                    .with_context(|| format!("no module in {}", path.display()))?;
                module
                    .validate()
                    .with_context(|| format!("invalid manifest: {}", path.display()))?;
                Ok(module)
            }
        }
    }
}

async fn read_cache(path: &Path) -> Option<Vec<ModuleConf>> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str::<ScriptOutput>(&contents) {
        Ok(output) if !output.modules.is_empty() => Some(output.modules),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Ignoring corrupt script cache {}: {}", path.display(), e);
            None
        }
    }
}

async fn write_cache(path: &Path, output: &ScriptOutput) -> anyhow::Result<()> {
    let json = serde_json::to_string(output)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}
