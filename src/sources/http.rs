//! HTTP transport.

use std::path::Path;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::sources::{DownloadError, Downloader};

const USER_AGENT: &str = concat!("ktpack/", env!("CARGO_PKG_VERSION"));

/// [`Downloader`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to create HTTP client")?;
        Ok(HttpDownloader { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        tracing::debug!(url = %url, "GET");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

impl Downloader for HttpDownloader {
    async fn download<W>(
        &self,
        url: &str,
        sink: &mut W,
        on_progress: &mut (dyn FnMut(u64, Option<u64>) + Send),
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut received = 0u64;
        on_progress(received, total);

        while let Some(chunk) = response.chunk().await.map_err(|e| DownloadError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            sink.write_all(&chunk).await?;
            received += chunk.len() as u64;
            on_progress(received, total);
        }
        sink.flush().await?;

        tracing::debug!(url = %url, bytes = received, "download complete");
        Ok(received)
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>, DownloadError> {
        let response = self.get(url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .text()
                .await
                .map(Some)
                .map_err(|e| DownloadError::Request {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
            status => Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Download `url` to `dest`, creating parent directories.
///
/// The bytes are staged in a temporary file next to `dest` that is only
/// persisted once the transfer completes; a failed or cancelled download
/// leaves nothing behind.
pub async fn download_to_file<D: Downloader>(
    downloader: &D,
    url: &str,
    dest: &Path,
) -> Result<(), DownloadError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await?;

    let staged = tempfile::NamedTempFile::new_in(parent)?;
    let mut file = tokio::fs::File::from_std(staged.reopen()?);
    downloader.download(url, &mut file, &mut |_, _| {}).await?;
    drop(file);

    staged
        .persist(dest)
        .map_err(|e| DownloadError::Io(e.error))?;
    Ok(())
}
