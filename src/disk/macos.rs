// file: src/disk/macos.rs
// version: 1.0.1
// guid: 317068fe-6112-47e5-93db-e0392afe9291

//! macOS backend built on `diskutil`, `dd` and `mdutil`

use super::{DeviceDescriptor, DiskBackend};
use crate::utils::system::{describe, SystemUtils};
use crate::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Where macOS mounts the Raspberry Pi OS boot partition
pub const BOOT_MOUNT_POINT: &str = "/Volumes/bootfs";

/// `diskutil info` fields shown in the device menu
const DETAIL_FIELDS: &str = "Device Identifier|Device Node|Device Location|Removable Media|Disk Size";

fn disk_identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/dev/disk\d+").expect("valid disk identifier pattern"))
}

fn detail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^[ \t]*((?:{}):.*?)[ \t]*$", DETAIL_FIELDS)).expect("valid detail pattern")
    })
}

fn removable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*Removable Media:[ \t]*(\S.*?)[ \t]*$").expect("valid removable pattern"))
}

/// Whole-disk identifiers from `diskutil list`, first occurrence order
pub fn parse_disk_list(output: &str) -> Vec<String> {
    let mut disks: Vec<String> = Vec::new();
    for m in disk_identifier_re().find_iter(output) {
        let disk = m.as_str().to_string();
        if !disks.contains(&disk) {
            disks.push(disk);
        }
    }
    disks
}

/// Non-removable media reports `No` on older releases and `Fixed` on newer ones
pub fn is_removable(info: &str) -> bool {
    match removable_re().captures(info) {
        Some(caps) => !matches!(&caps[1], "No" | "Fixed"),
        None => true,
    }
}

/// The `diskutil info` lines worth showing the operator
pub fn extract_details(info: &str) -> Vec<String> {
    detail_re()
        .captures_iter(info)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// `/dev/diskN` → `/dev/rdiskN`; the raw node skips the buffer cache and writes much faster
pub fn raw_device_path(device: &str) -> String {
    match device.strip_prefix("/dev/") {
        Some(name) if name.starts_with("disk") => format!("/dev/r{}", name),
        _ => device.to_string(),
    }
}

/// Arguments for writing `image` to the raw node of `device`.
///
/// `status=progress` needs the dd shipped with macOS 13 or later.
pub fn dd_args(image: &Path, device: &str) -> Vec<String> {
    vec![
        format!("if={}", image.display()),
        format!("of={}", raw_device_path(device)),
        "bs=4m".to_string(),
        "status=progress".to_string(),
    ]
}

/// First slice of a whole disk
pub fn boot_partition(device: &str) -> String {
    format!("{}s1", device)
}

/// Disk operations through `diskutil`
#[derive(Debug, Default)]
pub struct MacOsDisks;

impl MacOsDisks {
    pub fn new() -> Self {
        Self
    }

    async fn diskutil(&self, args: &[&str]) -> Result<String> {
        SystemUtils::run("diskutil", args).await
    }
}

#[async_trait::async_trait]
impl DiskBackend for MacOsDisks {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn required_commands(&self) -> Vec<&'static str> {
        vec!["diskutil", "mdutil"]
    }

    async fn list_removable_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let list = self.diskutil(&["list"]).await?;

        let mut devices = Vec::new();
        for disk in parse_disk_list(&list) {
            let info = self.diskutil(&["info", &disk]).await?;
            if is_removable(&info) {
                devices.push(DeviceDescriptor::new(disk, extract_details(&info)));
            } else {
                debug!("Skipping non-removable disk {}", disk);
            }
        }

        Ok(devices)
    }

    async fn unmount_disk(&self, device: &str) -> Result<()> {
        info!("Unmounting {}", device);
        self.diskutil(&["unmountDisk", device]).await?;
        Ok(())
    }

    async fn write_image(&self, image: &Path, device: &str) -> Result<()> {
        let args = dd_args(image, device);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let mut cmd = SystemUtils::privileged("dd");
        cmd.args(&args);
        SystemUtils::run_attached(cmd, &describe("dd", &arg_refs)).await
    }

    async fn mount_boot_partition(&self, device: &str) -> Result<PathBuf> {
        let partition = boot_partition(device);
        info!("Mounting boot partition {}", partition);
        self.diskutil(&["mount", &partition]).await?;
        Ok(PathBuf::from(BOOT_MOUNT_POINT))
    }

    async fn unmount_partition(&self, mount_point: &Path) -> Result<()> {
        let mount = mount_point.to_string_lossy();
        self.diskutil(&["unmount", mount.as_ref()]).await?;
        Ok(())
    }

    async fn set_indexing(&self, mount_point: &Path, enabled: bool) -> Result<()> {
        let mount = mount_point.to_string_lossy();
        let state = if enabled { "on" } else { "off" };
        SystemUtils::run("mdutil", &["-i", state, mount.as_ref()]).await?;
        Ok(())
    }
}
