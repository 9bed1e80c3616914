//! `ktpack toolchain` command

use std::path::Path;

use anyhow::Result;

use crate::cli::{ToolchainArgs, ToolchainCommands, ToolchainInstallArgs, ToolchainKind};
use ktpack::sources::HttpDownloader;
use ktpack::toolchain::{
    ArchiveCompressor, InstallDetails, InstallProgressBar, InstallResult, Jdk, JdkInstallDetails,
    KotlinCompiler, KotlinNative, NodeJs, ToolchainDistribution, ToolchainInstaller,
};
use ktpack::util::process::find_executable_in;
use ktpack::KtpackContext;

pub async fn execute(args: ToolchainArgs) -> Result<()> {
    let ctx = KtpackContext::new()?;
    let downloader = HttpDownloader::new()?;

    match args.command {
        ToolchainCommands::List => {
            list(&ctx, &downloader, KotlinCompiler, &ctx.kotlin_root(), "kotlinc", same);
            list(&ctx, &downloader, KotlinNative, &ctx.kotlin_native_root(), "kotlinc-native", same);
            list(&ctx, &downloader, Jdk, &ctx.jdk_root(), "java", jdk_install);
            list(&ctx, &downloader, NodeJs, &ctx.node_root(), "node", same);
            Ok(())
        }
        ToolchainCommands::Install(install_args) => install(&ctx, downloader, install_args).await,
    }
}

fn same(details: InstallDetails) -> InstallDetails {
    details
}

fn jdk_install(details: JdkInstallDetails) -> InstallDetails {
    details.install
}

fn list<T: ToolchainDistribution>(
    ctx: &KtpackContext,
    downloader: &HttpDownloader,
    distribution: T,
    root: &Path,
    executable: &str,
    to_install: fn(T::Details) -> InstallDetails,
) {
    let installer =
        ToolchainInstaller::new(ctx, distribution, downloader.clone(), ArchiveCompressor::new());
    let name = installer.distribution().name();
    let installs = installer.discover(root);

    let system = find_executable_in(executable, ctx.path_env(), ctx.cwd());

    println!("{}:", name);
    if installs.is_empty() && system.is_none() {
        println!("  (none)");
    }
    for details in installs {
        let install = to_install(details);
        println!(
            "  {:<16} {}{}",
            install.version,
            install.path.display(),
            if install.is_active { " (active)" } else { "" }
        );
    }
    if let Some(path) = system {
        println!("  {:<16} {}", "system", path.display());
    }
}

async fn install(
    ctx: &KtpackContext,
    downloader: HttpDownloader,
    args: ToolchainInstallArgs,
) -> Result<()> {
    let config = ctx.config();
    match args.kind {
        ToolchainKind::Kotlin => {
            let version = args.version.unwrap_or_else(|| config.kotlin.version.clone());
            install_one(ctx, downloader, KotlinCompiler, &ctx.kotlin_root(), &version, same).await
        }
        ToolchainKind::KotlinNative => {
            let version = args.version.unwrap_or_else(|| config.kotlin.version.clone());
            install_one(ctx, downloader, KotlinNative, &ctx.kotlin_native_root(), &version, same)
                .await
        }
        ToolchainKind::Jdk => {
            let version = args.version.unwrap_or_else(|| config.jdk.version.clone());
            install_one(ctx, downloader, Jdk, &ctx.jdk_root(), &version, jdk_install).await
        }
        ToolchainKind::Node => {
            let version = args.version.unwrap_or_else(|| config.nodejs.version.clone());
            install_one(ctx, downloader, NodeJs, &ctx.node_root(), &version, same).await
        }
    }
}

async fn install_one<T: ToolchainDistribution>(
    ctx: &KtpackContext,
    downloader: HttpDownloader,
    distribution: T,
    root: &Path,
    version: &str,
    to_install: fn(T::Details) -> InstallDetails,
) -> Result<()> {
    let installer = ToolchainInstaller::new(ctx, distribution, downloader, ArchiveCompressor::new());
    let name = installer.distribution().name();

    let bar = InstallProgressBar::new(name, version, true);
    let result = installer
        .find_and_install(root, version, &mut |p| bar.update(p))
        .await;
    bar.finish();

    match result? {
        InstallResult::AlreadyInstalled(details) => {
            let install = to_install(details);
            eprintln!(
                "     Skipped {} {} is already installed at {}",
                name,
                install.version,
                install.path.display()
            );
        }
        InstallResult::Success(details) => {
            let install = to_install(details);
            eprintln!(
                "   Installed {} {} to {}",
                name,
                install.version,
                install.path.display()
            );
        }
    }
    Ok(())
}
