//! Core data structures for ktpack.
//!
//! This module contains the foundational types used throughout ktpack:
//! - Build targets and the host platform
//! - Dependency declarations and their containers
//! - The module manifest

pub mod dependency;
pub mod manifest;
pub mod platform;

pub use dependency::{
    DependencyConf, DependencyContainer, DependencyScope, GitReference, MavenCoordinate,
};
pub use manifest::{find_manifest, ManifestPath, ModuleConf, MANIFEST_NAME, SCRIPT_MANIFEST_NAME};
pub use platform::{HostArch, HostOs, HostPlatform, KotlinTarget};
