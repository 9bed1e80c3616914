//! Kotlin build system.
//!
//! This module collects sources, schedules compilations as tasks and drives
//! the Kotlin compilers.

pub mod compiler;
pub mod module_builder;
pub mod sources;
pub mod task;

pub use compiler::{CompileRequest, CompilerInvocation};
pub use module_builder::{
    ArtifactResult, BuildError, InstalledToolchains, ManagedToolchains, ModuleBuilder,
    ToolchainProvider,
};
pub use sources::{BuildType, CollectedSource, SourceCollector};
pub use task::{Task, TaskBuilder, TaskRunner};
