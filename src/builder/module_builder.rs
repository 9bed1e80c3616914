//! Module compilation.
//!
//! [`ModuleBuilder`] ties the pieces together for one module: resolve the
//! dependency tree, collect sources, provision a compiler and run it.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::builder::compiler::{compiler_invocation, library_extension, CompileRequest};
use crate::builder::sources::{BuildType, SourceCollector};
use crate::builder::task::{TaskBuilder, TaskRunner};
use crate::core::{HostPlatform, KotlinTarget, ModuleConf};
use crate::resolver::{DependencyResolver, ResolveError};
use crate::sources::{Downloader, MetadataFetcher, VersionControl};
use crate::toolchain::{
    ArchiveCompressor, InstallError, InstallProgressBar, Jdk, KotlinCompiler, KotlinNative,
    ToolchainDistribution, ToolchainInstaller,
};
use crate::util::KtpackContext;

/// Outcome of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactResult {
    Success {
        artifact_path: PathBuf,
        duration: Duration,
        compiler_output: String,
        target: KotlinTarget,
        dependency_artifact_paths: Vec<PathBuf>,
    },
    /// The compiler exited non-zero; `message` is its stderr.
    ProcessError { exit_code: i32, message: String },
    /// The compiler succeeded but the expected artifact is missing.
    NoArtifactFound,
    NoSourceFiles,
}

impl ArtifactResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ArtifactResult::Success { .. })
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        match self {
            ArtifactResult::Success { artifact_path, .. } => Some(artifact_path),
            _ => None,
        }
    }
}

/// Failures that stop a build before the compiler produces a result.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("module `{module}` does not declare target `{target}`")]
    UnsupportedTarget { module: String, target: KotlinTarget },

    #[error("target `{target}` cannot be built on this host")]
    IncompatibleHost { target: KotlinTarget },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to resolve dependencies:\n  {}", .failures.join("\n  "))]
    UnresolvedDependencies { failures: Vec<String> },

    #[error("no {toolchain} toolchain available")]
    MissingToolchain { toolchain: &'static str },

    #[error("failed to install toolchain: {0}")]
    Toolchain(#[from] InstallError),

    #[error("failed to create {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to run compiler: {0}")]
    Spawn(String),
}

/// Toolchain homes a compilation may use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledToolchains {
    /// Kotlin JVM/JS compiler install
    pub kotlin: Option<PathBuf>,
    /// Kotlin/Native install
    pub kotlin_native: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
}

/// Supplies compiler installs for a target.
pub trait ToolchainProvider: Send + Sync {
    fn toolchains_for(
        &self,
        target: KotlinTarget,
    ) -> impl Future<Output = Result<InstalledToolchains, BuildError>> + Send;
}

/// Fixed installs.
impl ToolchainProvider for InstalledToolchains {
    async fn toolchains_for(&self, _target: KotlinTarget) -> Result<InstalledToolchains, BuildError> {
        Ok(self.clone())
    }
}

/// Installs the configured toolchain versions on demand.
pub struct ManagedToolchains<D> {
    ctx: KtpackContext,
    downloader: D,
    show_progress: bool,
}

impl<D: Downloader + Clone> ManagedToolchains<D> {
    pub fn new(ctx: &KtpackContext, downloader: D) -> Self {
        ManagedToolchains {
            ctx: ctx.clone(),
            downloader,
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    async fn install<T: ToolchainDistribution>(
        &self,
        distribution: T,
        root: &Path,
        version: &str,
    ) -> Result<T::Details, BuildError> {
        let installer = ToolchainInstaller::new(
            &self.ctx,
            distribution,
            self.downloader.clone(),
            ArchiveCompressor::new(),
        );
        let bar = InstallProgressBar::new(installer.distribution().name(), version, self.show_progress);
        let result = installer
            .find_and_install(root, version, &mut |p| bar.update(p))
            .await;
        bar.finish();
        Ok(result?.into_details())
    }
}

impl<D: Downloader + Clone> ToolchainProvider for ManagedToolchains<D> {
    async fn toolchains_for(&self, target: KotlinTarget) -> Result<InstalledToolchains, BuildError> {
        let config = self.ctx.config();
        let jdk = self
            .install(Jdk, &self.ctx.jdk_root(), &config.jdk.version)
            .await?;

        let mut toolchains = InstalledToolchains {
            java_home: Some(jdk.java_home),
            ..Default::default()
        };
        if target.is_native() {
            let install = self
                .install(KotlinNative, &self.ctx.kotlin_native_root(), &config.kotlin.version)
                .await?;
            toolchains.kotlin_native = Some(install.path);
        } else {
            let install = self
                .install(KotlinCompiler, &self.ctx.kotlin_root(), &config.kotlin.version)
                .await?;
            toolchains.kotlin = Some(install.path);
        }
        Ok(toolchains)
    }
}

/// Builds one module.
pub struct ModuleBuilder<F, V, P> {
    module: ModuleConf,
    module_dir: PathBuf,
    resolver: DependencyResolver<F, V>,
    toolchains: P,
    host: HostPlatform,
}

impl<F, V, P> ModuleBuilder<F, V, P>
where
    F: MetadataFetcher,
    V: VersionControl,
    P: ToolchainProvider,
{
    pub fn new(
        ctx: &KtpackContext,
        module: ModuleConf,
        module_dir: impl Into<PathBuf>,
        resolver: DependencyResolver<F, V>,
        toolchains: P,
    ) -> Self {
        ModuleBuilder {
            module,
            module_dir: module_dir.into(),
            resolver,
            toolchains,
            host: *ctx.host(),
        }
    }

    pub fn module(&self) -> &ModuleConf {
        &self.module
    }

    /// `<module>/out/<target>/<debug|release>/<bin|lib|test>`
    pub fn output_dir(&self, target: KotlinTarget, build_type: BuildType, release: bool) -> PathBuf {
        self.module_dir
            .join("out")
            .join(target.as_str())
            .join(if release { "release" } else { "debug" })
            .join(build_type.as_str())
    }

    fn collector(&self) -> SourceCollector {
        SourceCollector::new(&self.module_dir, self.module.autobin)
    }

    fn check_target(&self, target: KotlinTarget) -> Result<(), BuildError> {
        if !self.module.targets.is_empty() && !self.module.targets.contains(&target) {
            return Err(BuildError::UnsupportedTarget {
                module: self.module.name.clone(),
                target,
            });
        }
        if !target.is_host_compatible(&self.host) {
            return Err(BuildError::IncompatibleHost { target });
        }
        Ok(())
    }

    /// Artifact paths of the resolved dependencies for one target.
    async fn dependency_artifacts(
        &self,
        target: KotlinTarget,
        build_type: BuildType,
    ) -> Result<Vec<PathBuf>, BuildError> {
        let root = self.resolver.resolve(&self.module, &[target]).await?;
        let failures: Vec<String> = root
            .failures()
            .into_iter()
            .map(|(dep, err)| format!("{}: {}", dep, err))
            .collect();
        if !failures.is_empty() {
            return Err(BuildError::UnresolvedDependencies { failures });
        }
        Ok(root.artifacts_for(build_type == BuildType::Test))
    }

    /// Build the module for `target`.
    pub async fn build(
        &self,
        target: KotlinTarget,
        build_type: BuildType,
        release: bool,
    ) -> Result<ArtifactResult, BuildError> {
        self.check_target(target)?;
        let dependencies = self.dependency_artifacts(target, build_type).await?;

        let collector = self.collector();
        let collected = collector.collect_for_build(target, build_type);
        if collected.is_empty() {
            tracing::info!("No sources to compile for {} {}", target, build_type);
            return Ok(ArtifactResult::NoSourceFiles);
        }

        let files = collected.compile_files();
        let common = self.common_files(&collector, target, build_type);
        self.compile(target, build_type, release, &self.module.name, files, common, dependencies)
            .await
    }

    /// Build the main binary and every binary under `bin/`.
    pub async fn build_bins(
        &self,
        target: KotlinTarget,
        release: bool,
    ) -> Result<Vec<ArtifactResult>, BuildError> {
        self.check_target(target)?;
        let dependencies = self.dependency_artifacts(target, BuildType::Bin).await?;

        let collector = self.collector();
        let collected = collector.collect_for_build(target, BuildType::Bin);
        if collected.main_file.is_none() && collected.bin_files.is_empty() {
            return Ok(vec![ArtifactResult::NoSourceFiles]);
        }
        let common = self.common_files(&collector, target, BuildType::Bin);

        let mut results = Vec::new();
        if collected.main_file.is_some() {
            let files = collected.compile_files();
            results.push(
                self.compile(
                    target,
                    BuildType::Bin,
                    release,
                    &self.module.name,
                    files,
                    common.clone(),
                    dependencies.clone(),
                )
                .await?,
            );
        }

        for bin in &collected.bin_files {
            let name = bin
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.module.name.clone());
            let mut files = collected.source_files.clone();
            files.push(bin.clone());
            results.push(
                self.compile(
                    target,
                    BuildType::Bin,
                    release,
                    &name,
                    files,
                    common.clone(),
                    dependencies.clone(),
                )
                .await?,
            );
        }
        Ok(results)
    }

    /// Build every target in order, one task per target. A target that
    /// fails does not stop the others.
    pub async fn build_all(
        &self,
        targets: &[KotlinTarget],
        build_type: BuildType,
        release: bool,
    ) -> anyhow::Result<Vec<(KotlinTarget, Result<ArtifactResult, BuildError>)>> {
        let results = Mutex::new(Vec::new());

        let mut runner = TaskRunner::new();
        // Registration is LIFO; add in reverse to run in the given order.
        for &target in targets.iter().rev() {
            let results = &results;
            runner.add_task(
                TaskBuilder::new(format!("build-{}", target))
                    .description(format!("Compile {} for {}", self.module.name, target))
                    .do_last(move || async move {
                        let result = self.build(target, build_type, release).await;
                        results.lock().await.push((target, result));
                        Ok(())
                    })
                    .build(),
            );
        }
        runner.execute().await?;

        Ok(results.into_inner())
    }

    /// Common files to flag as such for non-JVM compilations.
    fn common_files(
        &self,
        collector: &SourceCollector,
        target: KotlinTarget,
        build_type: BuildType,
    ) -> Vec<PathBuf> {
        if target.is_jvm() {
            return Vec::new();
        }
        let common = collector.collect_kotlin(None, build_type);
        let mut files = common.compile_files();
        files.extend(common.bin_files);
        files
    }

    #[allow(clippy::too_many_arguments)]
    async fn compile(
        &self,
        target: KotlinTarget,
        build_type: BuildType,
        release: bool,
        name: &str,
        files: Vec<PathBuf>,
        common: Vec<PathBuf>,
        dependencies: Vec<PathBuf>,
    ) -> Result<ArtifactResult, BuildError> {
        let toolchains = self.toolchains.toolchains_for(target).await?;

        let output_dir = self.output_dir(target, build_type, release);
        std::fs::create_dir_all(&output_dir).map_err(|e| BuildError::Io {
            path: output_dir.clone(),
            message: e.to_string(),
        })?;

        let libraries = compiler_libraries(&dependencies, target);
        let common_files = common.into_iter().filter(|f| files.contains(f)).collect();

        let request = CompileRequest {
            target,
            build_type,
            release,
            name: name.to_string(),
            files,
            common_files,
            libraries,
            output_dir,
        };
        let invocation = compiler_invocation(&request, &toolchains, &self.host)?;

        tracing::info!(
            "Compiling {} ({}, {})",
            name,
            target,
            if release { "release" } else { "debug" }
        );
        let output = invocation
            .to_process(&self.module_dir)
            .exec()
            .await
            .map_err(|e| BuildError::Spawn(format!("{:#}", e)))?;

        if !output.success() {
            return Ok(ArtifactResult::ProcessError {
                exit_code: output.exit_code,
                message: output.stderr_text(),
            });
        }
        if !invocation.artifact.exists() {
            tracing::warn!(
                "Compiler finished but {} was not produced",
                invocation.artifact.display()
            );
            return Ok(ArtifactResult::NoArtifactFound);
        }

        let compiler_output = output
            .stdout
            .iter()
            .chain(output.stderr.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ArtifactResult::Success {
            artifact_path: invocation.artifact,
            duration: output.duration,
            compiler_output,
            target,
            dependency_artifact_paths: dependencies,
        })
    }
}

/// Dependency artifacts the compiler for `target` can link against.
///
/// Anything else (local and git checkouts, jars on native targets) is
/// reported and left off the command line.
fn compiler_libraries(dependencies: &[PathBuf], target: KotlinTarget) -> Vec<PathBuf> {
    let extension = library_extension(target);
    let (libraries, skipped): (Vec<PathBuf>, Vec<PathBuf>) = dependencies
        .iter()
        .cloned()
        .partition(|p| p.extension().is_some_and(|e| e == extension));
    for path in &skipped {
        tracing::warn!(
            "Skipping {} for {}: not a .{} library",
            path.display(),
            target,
            extension
        );
    }
    libraries
}
