//! Local path dependencies.

use std::path::{Path, PathBuf};

use crate::core::MANIFEST_NAME;
use crate::resolver::ResolveError;

/// Resolve a local dependency to its canonical directory.
///
/// Local dependencies are used as-is: they are not fetched, and their own
/// dependencies are not walked.
pub fn resolve_local(path: &Path) -> Result<PathBuf, ResolveError> {
    let canonical = path
        .canonicalize()
        .map_err(|_| ResolveError::LocalPathMissing {
            path: path.to_path_buf(),
        })?;

    if canonical.is_dir() && !canonical.join(MANIFEST_NAME).exists() {
        tracing::debug!(
            "Local dependency {} has no {}, using it as a plain directory",
            canonical.display(),
            MANIFEST_NAME
        );
    }

    Ok(canonical)
}
