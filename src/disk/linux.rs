// file: src/disk/linux.rs
// version: 1.0.0
// guid: c54b01c2-d43e-41d6-bbcd-92b017861d97

//! Linux backend built on `lsblk`, `mount`, `umount` and `dd`

use super::{DeviceDescriptor, DiskBackend};
use crate::utils::system::{describe, SystemUtils};
use crate::Result;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name (under the temp dir) where the boot partition is mounted
pub const BOOT_MOUNT_DIR: &str = "pi-prepper-bootfs";

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

/// One `lsblk -J` entry
#[derive(Debug, Clone, Deserialize)]
pub struct LsblkDevice {
    pub name: String,
    pub path: Option<String>,
    pub size: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub rm: bool,
    pub tran: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub children: Vec<LsblkDevice>,
}

impl LsblkDevice {
    pub fn device_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("/dev/{}", self.name))
    }

    fn details(&self) -> Vec<String> {
        let mut details = vec![format!("Device Node: {}", self.device_path())];
        if let Some(size) = &self.size {
            details.push(format!("Disk Size: {}", size));
        }
        if let Some(model) = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            details.push(format!("Model: {}", model));
        }
        if let Some(tran) = &self.tran {
            details.push(format!("Transport: {}", tran));
        }
        details.push("Removable Media: Removable".to_string());
        details
    }
}

/// Older `lsblk` prints `rm` as `"0"`/`"1"`, newer releases as a JSON bool
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_u64() == Some(1),
        serde_json::Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    })
}

/// Removable whole disks from `lsblk -J -d -o NAME,PATH,SIZE,RM,TRAN,MODEL,TYPE`
pub fn parse_removable_devices(json: &str) -> Result<Vec<DeviceDescriptor>> {
    let output: LsblkOutput = serde_json::from_str(json)?;

    Ok(output
        .blockdevices
        .iter()
        .filter(|dev| dev.rm && dev.device_type.as_deref() == Some("disk"))
        .map(|dev| DeviceDescriptor::new(dev.device_path(), dev.details()))
        .collect())
}

/// Mounted nodes of a device tree from `lsblk -J -o NAME,PATH,MOUNTPOINT <dev>`
pub fn parse_mounted_nodes(json: &str) -> Result<Vec<String>> {
    fn walk(dev: &LsblkDevice, out: &mut Vec<String>) {
        if dev.mountpoint.as_deref().is_some_and(|m| !m.is_empty()) {
            out.push(dev.device_path());
        }
        for child in &dev.children {
            walk(child, out);
        }
    }

    let output: LsblkOutput = serde_json::from_str(json)?;
    let mut mounted = Vec::new();
    for dev in &output.blockdevices {
        walk(dev, &mut mounted);
    }
    Ok(mounted)
}

/// First partition node: `/dev/sdb` → `/dev/sdb1`, `/dev/mmcblk0` → `/dev/mmcblk0p1`
pub fn boot_partition(device: &str) -> String {
    if device.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{}p1", device)
    } else {
        format!("{}1", device)
    }
}

/// Disk operations through util-linux
#[derive(Debug)]
pub struct LinuxDisks {
    mount_dir: PathBuf,
}

impl LinuxDisks {
    pub fn new() -> Self {
        Self::with_mount_dir(std::env::temp_dir().join(BOOT_MOUNT_DIR))
    }

    pub fn with_mount_dir(mount_dir: impl Into<PathBuf>) -> Self {
        Self {
            mount_dir: mount_dir.into(),
        }
    }

    async fn privileged(&self, program: &str, args: &[&str]) -> Result<String> {
        let mut cmd = SystemUtils::privileged(program);
        cmd.args(args);
        SystemUtils::output(cmd, &describe(program, args)).await
    }
}

impl Default for LinuxDisks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DiskBackend for LinuxDisks {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn required_commands(&self) -> Vec<&'static str> {
        vec!["lsblk", "mount", "umount"]
    }

    async fn list_removable_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let json = SystemUtils::run(
            "lsblk",
            &["-J", "-d", "-o", "NAME,PATH,SIZE,RM,TRAN,MODEL,TYPE"],
        )
        .await?;
        parse_removable_devices(&json)
    }

    async fn unmount_disk(&self, device: &str) -> Result<()> {
        info!("Unmounting {}", device);
        let json = SystemUtils::run("lsblk", &["-J", "-o", "NAME,PATH,MOUNTPOINT", device]).await?;

        for node in parse_mounted_nodes(&json)? {
            debug!("Unmounting {}", node);
            self.privileged("umount", &[&node]).await?;
        }
        Ok(())
    }

    async fn write_image(&self, image: &Path, device: &str) -> Result<()> {
        let input = format!("if={}", image.display());
        let output = format!("of={}", device);
        let args = [
            input.as_str(),
            output.as_str(),
            "bs=4M",
            "conv=fsync",
            "status=progress",
        ];

        let mut cmd = SystemUtils::privileged("dd");
        cmd.args(args);
        SystemUtils::run_attached(cmd, &describe("dd", &args)).await
    }

    async fn mount_boot_partition(&self, device: &str) -> Result<PathBuf> {
        let partition = boot_partition(device);
        tokio::fs::create_dir_all(&self.mount_dir).await?;
        let mount_dir = self.mount_dir.to_string_lossy().to_string();
        info!("Mounting boot partition {} at {}", partition, mount_dir);

        if SystemUtils::is_root() {
            self.privileged("mount", &[&partition, &mount_dir]).await?;
        } else {
            // FAT has no ownership; map it to us so the script can be copied without root.
            let (uid, gid) = SystemUtils::user_ids();
            let options = format!("uid={},gid={}", uid, gid);
            self.privileged("mount", &["-o", &options, &partition, &mount_dir])
                .await?;
        }

        Ok(self.mount_dir.clone())
    }

    async fn unmount_partition(&self, mount_point: &Path) -> Result<()> {
        let mount = mount_point.to_string_lossy().to_string();
        self.privileged("umount", &[&mount]).await?;
        Ok(())
    }

    async fn set_indexing(&self, mount_point: &Path, enabled: bool) -> Result<()> {
        debug!(
            "No indexer to {} on {}",
            if enabled { "resume" } else { "suspend" },
            mount_point.display()
        );
        Ok(())
    }
}
