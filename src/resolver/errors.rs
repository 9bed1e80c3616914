//! Resolution error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::platform::KotlinTarget;

/// Error during dependency resolution.
///
/// Only [`ResolveError::UnsupportedTarget`] aborts a whole resolve; every
/// other variant is recorded on the dependency node it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("module `{module}` does not declare target `{target}`")]
    UnsupportedTarget { module: String, target: KotlinTarget },

    #[error("`{dependency}` was not found in any repository")]
    NotFound { dependency: String },

    #[error("failed to fetch metadata for `{dependency}`: {message}")]
    Fetch { dependency: String, message: String },

    #[error("invalid metadata for `{dependency}`: {message}")]
    InvalidMetadata { dependency: String, message: String },

    #[error("no version of `{package}` matches `{requirement}`")]
    NoMatchingVersion { package: String, requirement: String },

    #[error("local dependency path does not exist: {}", path.display())]
    LocalPathMissing { path: PathBuf },

    #[error("failed to check out `{url}`: {message}")]
    Checkout { url: String, message: String },
}

impl ResolveError {
    /// Whether this error aborts the whole resolve.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::UnsupportedTarget { .. })
    }

    /// A one-line suggestion for the user.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ResolveError::UnsupportedTarget { .. } => {
                Some("add the target to `targets` in pack.toml")
            }
            ResolveError::NotFound { .. } => {
                Some("check the coordinate and the configured maven repositories")
            }
            ResolveError::Fetch { .. } | ResolveError::Checkout { .. } => {
                Some("check your network connection")
            }
            ResolveError::NoMatchingVersion { .. } => {
                Some("loosen the version requirement")
            }
            ResolveError::LocalPathMissing { .. } => {
                Some("paths are relative to the directory containing pack.toml")
            }
            ResolveError::InvalidMetadata { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unsupported_target_is_fatal() {
        let fatal = ResolveError::UnsupportedTarget {
            module: "app".into(),
            target: KotlinTarget::MacosX64,
        };
        assert!(fatal.is_fatal());
        assert_eq!(
            fatal.to_string(),
            "module `app` does not declare target `macos_x64`"
        );

        let local = ResolveError::LocalPathMissing {
            path: PathBuf::from("../missing"),
        };
        assert!(!local.is_fatal());
        assert!(local.hint().is_some());
    }
}
