//! Git checkouts for git dependencies.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{Repository, ResetType};
use url::Url;

use crate::core::GitReference;
use crate::sources::VersionControl;
use crate::util::hash::sha256_str;

/// [`VersionControl`] backed by libgit2.
///
/// libgit2 is blocking, so every operation runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVersionControl;

impl GitVersionControl {
    pub fn new() -> Self {
        GitVersionControl
    }
}

impl VersionControl for GitVersionControl {
    async fn checkout(&self, url: &str, reference: &GitReference, dest: &Path) -> Result<()> {
        let url = url.to_string();
        let reference = reference.clone();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || checkout_blocking(&url, &reference, &dest))
            .await
            .context("git checkout task panicked")?
    }
}

fn checkout_blocking(url: &str, reference: &GitReference, dest: &Path) -> Result<()> {
    let repo = if dest.join(".git").exists() {
        tracing::info!("Updating {}", url);
        let repo = Repository::open(dest)
            .with_context(|| format!("failed to open git repository: {}", dest.display()))?;
        {
            let mut remote = repo.find_remote("origin")?;
            remote
                .fetch(
                    &["+refs/heads/*:refs/remotes/origin/*", "+refs/tags/*:refs/tags/*"],
                    None,
                    None,
                )
                .with_context(|| format!("failed to fetch {}", url))?;
        }
        repo
    } else {
        tracing::info!("Cloning {}", url);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Repository::clone(url, dest).with_context(|| format!("failed to clone {}", url))?
    };

    let commit = match reference {
        GitReference::DefaultBranch => repo.head()?.peel_to_commit()?,
        GitReference::Branch(branch) => repo
            .find_reference(&format!("refs/remotes/origin/{}", branch))
            .with_context(|| format!("branch `{}` not found in {}", branch, url))?
            .peel_to_commit()?,
        GitReference::Tag(tag) => repo
            .find_reference(&format!("refs/tags/{}", tag))
            .with_context(|| format!("tag `{}` not found in {}", tag, url))?
            .peel_to_commit()?,
    };

    tracing::debug!("Checking out {} at {}", url, commit.id());
    repo.reset(commit.as_object(), ResetType::Hard, None)?;
    Ok(())
}

/// Cache directory for a checkout of `url` at `reference`.
pub fn checkout_dir(cache_dir: &Path, url: &str, reference: &GitReference) -> PathBuf {
    let name = match Url::parse(url) {
        Ok(url) => sanitize_url_for_path(&url),
        Err(_) => url.replace(['/', ':', '\\'], "-"),
    };
    let hash = sha256_str(&format!("{}#{:?}", url, reference));
    cache_dir.join("git").join(format!("{}-{}", name, &hash[..8]))
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &Url) -> String {
    let mut name = url.host_str().unwrap_or_default().to_string();

    let path = url.path().trim_matches('/');
    if !path.is_empty() {
        name.push('-');
        name.push_str(&path.replace('/', "-"));
    }

    name.trim_end_matches(".git").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_url() {
        let url = Url::parse("https://github.com/user/repo.git").unwrap();
        assert_eq!(sanitize_url_for_path(&url), "github.com-user-repo");
    }

    #[test]
    fn test_checkout_dir_varies_by_reference() {
        let cache = Path::new("/cache");
        let url = "https://github.com/user/repo.git";
        let tag = checkout_dir(cache, url, &GitReference::Tag("v1.0.0".into()));
        let head = checkout_dir(cache, url, &GitReference::DefaultBranch);

        assert!(tag.starts_with("/cache/git"));
        assert!(tag
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("github.com-user-repo-"));
        assert_ne!(tag, head);
    }
}
