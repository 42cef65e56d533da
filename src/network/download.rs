// file: src/network/download.rs
// version: 1.0.0
// guid: cbb44e39-1b2e-4599-87e2-db857de54d0e

//! Network download utilities

use super::progress::{CountingWriter, DownloadProgress};
use crate::Result;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A concrete download resolved from a "latest" redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
    /// Final URL after following redirects
    pub url: String,
    /// Last path segment of the final URL
    pub file_name: String,
}

/// Network downloader with progress tracking
pub struct NetworkDownloader {
    client: reqwest::Client,
    show_progress: bool,
}

impl NetworkDownloader {
    /// Create a new network downloader
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            show_progress: true,
        }
    }

    /// Turn the terminal progress bar off (the counter is still maintained)
    pub fn without_progress_bar(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Follow redirects from `url` and report where they end up
    pub async fn resolve(&self, url: &str) -> Result<ResolvedDownload> {
        debug!("Resolving latest image from {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(crate::error::PrepperError::network(format!(
                "Resolving {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let final_url = response.url().clone();
        let file_name = file_name_from_url(&final_url)?;
        info!("Latest image: {}", final_url);

        Ok(ResolvedDownload {
            url: final_url.to_string(),
            file_name,
        })
    }

    /// Download file with progress bar
    ///
    /// Bytes go to `<dest>.part` first and are renamed into place once the
    /// transfer completes, so an interrupted download is never mistaken for a
    /// finished one.
    pub async fn download_with_progress<P: AsRef<Path>>(&self, url: &str, dest: P) -> Result<u64> {
        let dest = dest.as_ref();
        info!("Downloading: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(crate::error::PrepperError::network(format!(
                "Download failed with status: {}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let progress = if self.show_progress {
            DownloadProgress::new(total_size)
        } else {
            DownloadProgress::hidden(total_size)
        };

        let partial = partial_path(dest);
        let file = File::create(&partial).await?;
        let mut writer = CountingWriter::with_counter(file, progress.counter());
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            progress.refresh();
        }

        writer.flush().await?;
        let snapshot = progress.finish();
        debug!("{}", snapshot.describe());

        tokio::fs::rename(&partial, dest).await?;

        info!("Downloaded to: {}", dest.display());
        Ok(snapshot.downloaded)
    }
}

impl Default for NetworkDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the file name (last non-empty path segment) from a URL
pub fn file_name_from_url(url: &url::Url) -> Result<String> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| {
            crate::error::PrepperError::network(format!("Invalid URL: no file name in {}", url))
        })
}

/// Where an in-flight download is written before it is complete
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
