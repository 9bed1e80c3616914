//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// ktpack - A Cargo-like build tool for Kotlin Multiplatform
#[derive(Parser)]
#[command(name = "ktpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Re-evaluate pack.kts instead of using its cached result
    #[arg(long, global = true)]
    pub rebuild: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the current module
    Build(BuildArgs),

    /// Display the dependency tree
    Tree(TreeArgs),

    /// Toolchain management
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Targets to build (defaults to the module's targets)
    #[arg(long)]
    pub target: Vec<String>,

    /// Build the library instead of the binary
    #[arg(long, conflicts_with = "test")]
    pub lib: bool,

    /// Build the tests
    #[arg(long)]
    pub test: bool,

    /// Build every binary under bin/ as well as the main one
    #[arg(long, conflicts_with_all = ["lib", "test"])]
    pub bins: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Targets to resolve for (defaults to every target of the module)
    #[arg(long)]
    pub target: Vec<String>,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(subcommand)]
    pub command: ToolchainCommands,
}

#[derive(Subcommand)]
pub enum ToolchainCommands {
    /// List installed toolchains
    List,

    /// Install a toolchain
    Install(ToolchainInstallArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ToolchainKind {
    Kotlin,
    KotlinNative,
    Jdk,
    Node,
}

#[derive(Args)]
pub struct ToolchainInstallArgs {
    /// Toolchain to install
    #[arg(value_enum)]
    pub kind: ToolchainKind,

    /// Version (defaults to the configured version)
    pub version: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
