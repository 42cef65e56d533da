// file: src/disk/mod.rs
// version: 1.0.0
// guid: 08e10e0a-2001-4ff0-bac4-2d765c0943fc

//! Removable media handling
//!
//! Platform commands (listing, unmounting, raw copy, mounting the boot
//! partition, indexing control) live behind [`DiskBackend`] so the
//! orchestration never names `diskutil` or `lsblk` directly.

pub mod linux;
pub mod macos;

pub use linux::LinuxDisks;
pub use macos::MacOsDisks;

use crate::Result;
use std::path::{Path, PathBuf};

/// A candidate device and the metadata shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Whole-disk device node, e.g. `/dev/disk4` or `/dev/sdb`
    pub path: String,
    /// Human readable `Label: value` lines
    pub details: Vec<String>,
}

impl DeviceDescriptor {
    pub fn new(path: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            path: path.into(),
            details,
        }
    }
}

/// Platform-specific disk operations
#[async_trait::async_trait]
pub trait DiskBackend: Send + Sync {
    /// Short platform name for logs
    fn name(&self) -> &'static str;

    /// External programs this backend shells out to
    fn required_commands(&self) -> Vec<&'static str>;

    /// Removable whole-disk devices, in the order the platform lists them
    async fn list_removable_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Unmount every volume on the device
    async fn unmount_disk(&self, device: &str) -> Result<()>;

    /// Raw-copy the image onto the device
    async fn write_image(&self, image: &Path, device: &str) -> Result<()>;

    /// Mount the first partition of the device and return where it is mounted
    async fn mount_boot_partition(&self, device: &str) -> Result<PathBuf>;

    /// Unmount a partition mounted by [`DiskBackend::mount_boot_partition`]
    async fn unmount_partition(&self, mount_point: &Path) -> Result<()>;

    /// Turn filesystem indexing over the mount on or off
    async fn set_indexing(&self, mount_point: &Path, enabled: bool) -> Result<()>;
}

/// Backend for the platform we were built for
pub fn default_backend() -> Box<dyn DiskBackend> {
    if cfg!(target_os = "macos") {
        Box::new(MacOsDisks::new())
    } else {
        Box::new(LinuxDisks::new())
    }
}

/// Turn the operator's 1-based answer into an index into `count` candidates
pub fn parse_selection(input: &str, count: usize) -> Result<usize> {
    let trimmed = input.trim();
    let choice: usize = trimmed.parse().map_err(|_| {
        crate::error::PrepperError::InvalidSelection(format!(
            "'{}' is not a number between 1 and {}",
            trimmed, count
        ))
    })?;

    if choice == 0 || choice > count {
        return Err(crate::error::PrepperError::InvalidSelection(format!(
            "{} is out of range, expected 1 to {}",
            choice, count
        )));
    }

    Ok(choice - 1)
}

/// Lines printed for the device menu
pub fn format_device_menu(devices: &[DeviceDescriptor]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, device) in devices.iter().enumerate() {
        lines.push(format!("{}) {}", i + 1, device.path));
        lines.extend(device.details.iter().cloned());
        lines.push(String::new());
    }
    lines
}
