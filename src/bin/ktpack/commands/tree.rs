//! `ktpack tree` command

use anyhow::Result;

use crate::cli::TreeArgs;
use crate::commands::{load_module, parse_targets};
use ktpack::sources::{GitVersionControl, HttpDownloader, RepositoryFetcher};
use ktpack::{DependencyResolver, KtpackContext};

pub async fn execute(args: TreeArgs, rebuild: bool) -> Result<()> {
    let ctx = KtpackContext::new()?;
    let downloader = HttpDownloader::new()?;
    let module = load_module(&ctx, &downloader, rebuild).await?;
    let targets = parse_targets(&args.target, module.effective_targets())?;

    let resolver = DependencyResolver::new(
        &ctx,
        RepositoryFetcher::new(&ctx, downloader),
        GitVersionControl::new(),
    );
    let root = resolver.resolve(&module, &targets).await?;

    print!("{}", root.render_tree());

    let failures = root.failures();
    if !failures.is_empty() {
        eprintln!();
        eprintln!("{} dependency(ies) could not be resolved", failures.len());
        for (dependency, error) in failures {
            eprintln!("  {}: {}", dependency, error);
            if let Some(hint) = error.hint() {
                eprintln!("    help: {}", hint);
            }
        }
    }
    Ok(())
}
