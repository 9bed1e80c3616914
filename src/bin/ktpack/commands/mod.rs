//! Command implementations

pub mod build;
pub mod completions;
pub mod toolchain;
pub mod tree;

use std::path::Path;

use anyhow::{Context, Result};

use ktpack::builder::{ManagedToolchains, ToolchainProvider};
use ktpack::core::{find_manifest, ManifestPath, ModuleConf};
use ktpack::script::{KotlincScriptRunner, ScriptExecutor};
use ktpack::sources::HttpDownloader;
use ktpack::{KotlinTarget, KtpackContext};

/// Load the module in the current directory.
///
/// A `pack.kts` is evaluated with the managed Kotlin compiler, installing
/// it first if needed.
pub async fn load_module(
    ctx: &KtpackContext,
    downloader: &HttpDownloader,
    rebuild: bool,
) -> Result<ModuleConf> {
    let dir = ctx.cwd();
    match find_manifest(dir)? {
        ManifestPath::Toml(path) => ModuleConf::load(&path),
        ManifestPath::Script(_) => {
            let toolchains = ManagedToolchains::new(ctx, downloader.clone())
                .show_progress(true)
                .toolchains_for(KotlinTarget::Jvm)
                .await?;
            let kotlin = toolchains
                .kotlin
                .context("no Kotlin compiler to evaluate pack.kts")?;
            let kotlinc = kotlin
                .join("bin")
                .join(format!("kotlinc{}", script_suffix(ctx)));

            let mut runner = KotlincScriptRunner::new(kotlinc);
            if let Some(java_home) = toolchains.java_home {
                runner = runner.java_home(java_home);
            }
            ScriptExecutor::new(ctx, runner).load_module(dir, rebuild).await
        }
    }
}

fn script_suffix(ctx: &KtpackContext) -> &'static str {
    if ctx.host().exe_suffix().is_empty() {
        ""
    } else {
        ".bat"
    }
}

/// Parse `--target` values, falling back to `default`.
pub fn parse_targets(values: &[String], default: Vec<KotlinTarget>) -> Result<Vec<KotlinTarget>> {
    if values.is_empty() {
        return Ok(default);
    }
    values
        .iter()
        .map(|v| v.parse::<KotlinTarget>().map_err(|e| anyhow::anyhow!("{}", e)))
        .collect()
}

/// Display a path relative to the working directory.
pub fn display_path(ctx: &KtpackContext, path: &Path) -> String {
    ktpack::util::fs::relative_path(ctx.cwd(), path)
        .display()
        .to_string()
}
