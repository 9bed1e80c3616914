//! ktpack - A Cargo-like package manager and build tool for Kotlin Multiplatform
//!
//! This crate provides the core library functionality for ktpack,
//! including dependency resolution, toolchain provisioning, source
//! collection and compiler orchestration.

pub mod builder;
pub mod core;
pub mod resolver;
pub mod script;
pub mod sources;
pub mod toolchain;
pub mod util;

#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::DependencyConf, manifest::ModuleConf, platform::HostPlatform,
    platform::KotlinTarget,
};

pub use builder::{ArtifactResult, BuildType, ModuleBuilder};
pub use resolver::{DependencyResolver, RootDependencyNode};
pub use util::context::KtpackContext;
