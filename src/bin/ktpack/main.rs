//! ktpack CLI - A Cargo-like build tool for Kotlin Multiplatform

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ktpack=debug")
    } else {
        EnvFilter::new("ktpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let rebuild = cli.rebuild;
    match cli.command {
        Commands::Completions(args) => commands::completions::execute(args),
        command => {
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(async move {
                match command {
                    Commands::Build(args) => commands::build::execute(args, rebuild).await,
                    Commands::Tree(args) => commands::tree::execute(args, rebuild).await,
                    Commands::Toolchain(args) => commands::toolchain::execute(args).await,
                    Commands::Completions(_) => Ok(()),
                }
            })
        }
    }
}
