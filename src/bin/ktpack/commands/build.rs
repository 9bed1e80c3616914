//! `ktpack build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::{display_path, load_module, parse_targets};
use ktpack::builder::{ArtifactResult, BuildType, ManagedToolchains, ModuleBuilder};
use ktpack::sources::{GitVersionControl, HttpDownloader, RepositoryFetcher};
use ktpack::{DependencyResolver, KotlinTarget, KtpackContext};

pub async fn execute(args: BuildArgs, rebuild: bool) -> Result<()> {
    let ctx = KtpackContext::new()?;
    let downloader = HttpDownloader::new()?;
    let module = load_module(&ctx, &downloader, rebuild).await?;

    let default_targets = if module.targets.is_empty() {
        vec![KotlinTarget::Jvm]
    } else {
        module
            .targets
            .iter()
            .copied()
            .filter(|t| t.is_host_compatible(ctx.host()))
            .collect()
    };
    let targets = parse_targets(&args.target, default_targets)?;
    if targets.is_empty() {
        bail!("none of the module's targets can be built on this host");
    }

    let build_type = if args.lib {
        BuildType::Lib
    } else if args.test {
        BuildType::Test
    } else {
        BuildType::Bin
    };

    let resolver = DependencyResolver::new(
        &ctx,
        RepositoryFetcher::new(&ctx, downloader.clone()),
        GitVersionControl::new(),
    );
    let toolchains = ManagedToolchains::new(&ctx, downloader).show_progress(true);
    let builder = ModuleBuilder::new(&ctx, module, ctx.cwd(), resolver, toolchains);

    let mut results = Vec::new();
    if args.bins {
        for &target in &targets {
            for result in builder.build_bins(target, args.release).await? {
                results.push((target, Ok(result)));
            }
        }
    } else {
        results = builder.build_all(&targets, build_type, args.release).await?;
    }

    let mut failed = 0;
    for (target, result) in results {
        match result {
            Ok(ArtifactResult::Success {
                artifact_path,
                duration,
                ..
            }) => eprintln!(
                "    Finished `{}` -> {} in {:.2}s",
                target,
                display_path(&ctx, &artifact_path),
                duration.as_secs_f64()
            ),
            Ok(ArtifactResult::NoSourceFiles) => {
                eprintln!("     Skipped `{}`: no source files", target)
            }
            Ok(ArtifactResult::NoArtifactFound) => {
                failed += 1;
                eprintln!("      Failed `{}`: compiler produced no artifact", target);
            }
            Ok(ArtifactResult::ProcessError { exit_code, message }) => {
                failed += 1;
                eprintln!("      Failed `{}` (exit code {})", target, exit_code);
                eprintln!("{}", message);
            }
            Err(e) => {
                failed += 1;
                eprintln!("      Failed `{}`: {}", target, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} build(s) failed", failed);
    }
    Ok(())
}
