// file: src/image/mod.rs
// version: 1.0.1
// guid: 9979aee0-664c-45a6-9d55-31cb78ea571a

//! OS image acquisition
//!
//! Resolves the latest Raspberry Pi OS Lite image, downloads it into the
//! working directory unless it is already there, and decompresses it unless
//! the decompressed image is already there. Presence alone is trusted.

pub mod decompress;

use crate::network::{NetworkDownloader, ResolvedDownload};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Redirect endpoint that always points at the newest image
pub const LATEST_IMAGE_URL: &str = "https://downloads.raspberrypi.org/raspios_lite_arm64_latest";

/// Suffix of the compressed image format we know how to unpack
pub const COMPRESSED_SUFFIX: &str = ".xz";

/// An image resolved for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
    /// Local path of the downloaded (possibly compressed) file
    pub download_path: PathBuf,
    /// Local path of the raw image that gets written to the card
    pub image_path: PathBuf,
}

impl ImageReference {
    pub fn new(resolved: ResolvedDownload, work_dir: &Path) -> Self {
        let image_name = decompressed_name(&resolved.file_name);
        Self {
            download_path: work_dir.join(&resolved.file_name),
            image_path: work_dir.join(image_name),
            url: resolved.url,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.download_path != self.image_path
    }
}

/// Name of the image once `.xz` is stripped; other names are already raw images
pub fn decompressed_name(file_name: &str) -> &str {
    file_name
        .strip_suffix(COMPRESSED_SUFFIX)
        .filter(|name| !name.is_empty())
        .unwrap_or(file_name)
}

/// Which parts of acquisition still need doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePlan {
    pub download: bool,
    pub decompress: bool,
}

impl AcquirePlan {
    /// Decide from what is already on disk
    pub fn for_reference(reference: &ImageReference) -> Self {
        if reference.image_path.exists() {
            return Self {
                download: false,
                decompress: false,
            };
        }

        Self {
            download: !reference.download_path.exists(),
            decompress: reference.is_compressed(),
        }
    }
}

/// Downloads and unpacks the OS image
pub struct ImageAcquirer {
    downloader: NetworkDownloader,
    latest_url: String,
    work_dir: PathBuf,
}

impl ImageAcquirer {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_source(NetworkDownloader::new(), LATEST_IMAGE_URL, work_dir)
    }

    pub fn with_source(
        downloader: NetworkDownloader,
        latest_url: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            latest_url: latest_url.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Resolve the latest image without touching the local cache
    pub async fn resolve(&self) -> Result<ImageReference> {
        let resolved = self.downloader.resolve(&self.latest_url).await?;
        Ok(ImageReference::new(resolved, &self.work_dir))
    }

    /// Make sure the raw image is present locally and return its path
    pub async fn acquire(&self) -> Result<PathBuf> {
        let reference = self.resolve().await?;
        let plan = AcquirePlan::for_reference(&reference);

        if !plan.download && !plan.decompress {
            info!("Image file already exists: {}", reference.image_path.display());
            return Ok(reference.image_path);
        }

        if plan.download {
            self.downloader
                .download_with_progress(&reference.url, &reference.download_path)
                .await?;
        } else {
            info!("Using existing download {}", reference.download_path.display());
        }

        if plan.decompress {
            decompress::decompress_xz(&reference.download_path).await?;
        }

        Ok(reference.image_path)
    }
}
