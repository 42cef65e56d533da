// file: src/provision/installer.rs
// version: 1.0.0
// guid: ea3dac8c-1257-49d3-9ac8-a12e00415e62

//! Staging the rendered script on the freshly written boot partition

use super::firstrun::{invocation_path, splice_invocation};
use crate::disk::DiskBackend;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the rendered script, locally and on the boot partition
pub const SCRIPT_NAME: &str = "firstboot.sh";

/// The image's own first-boot hook on the boot partition
pub const FIRSTRUN_NAME: &str = "firstrun.sh";

/// Writes the provisioning script onto a device's boot partition
pub struct BootScriptInstaller<'a> {
    backend: &'a dyn DiskBackend,
    work_dir: PathBuf,
}

impl<'a> BootScriptInstaller<'a> {
    pub fn new(backend: &'a dyn DiskBackend, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            work_dir: work_dir.into(),
        }
    }

    /// Local path of the rendered script
    pub fn local_script_path(&self) -> PathBuf {
        self.work_dir.join(SCRIPT_NAME)
    }

    /// Stage `script` on the boot partition of `device` and hook it into `firstrun.sh`.
    ///
    /// Every step is fatal on failure and nothing is rolled back, so an error
    /// after mounting leaves the partition mounted.
    pub async fn install(&self, device: &str, script: &str) -> Result<PathBuf> {
        let local = self.local_script_path();
        write_executable(&local, script).await?;
        debug!("Rendered script written to {}", local.display());

        let mount_point = self.backend.mount_boot_partition(device).await?;
        self.backend.set_indexing(&mount_point, false).await?;

        let staged = mount_point.join(SCRIPT_NAME);
        tokio::fs::copy(&local, &staged).await.map_err(|e| {
            crate::error::PrepperError::device(format!(
                "Error copying the first boot script to {}: {}",
                staged.display(),
                e
            ))
        })?;
        info!("First boot script copied to {}", staged.display());

        self.hook_firstrun(&mount_point).await?;

        self.backend.set_indexing(&mount_point, true).await?;
        self.backend.unmount_partition(&mount_point).await?;

        // The boot partition copy is the one the device runs; the local one only holds secrets.
        tokio::fs::remove_file(&local).await?;

        Ok(staged)
    }

    async fn hook_firstrun(&self, mount_point: &Path) -> Result<()> {
        let firstrun_path = mount_point.join(FIRSTRUN_NAME);
        let firstrun = tokio::fs::read_to_string(&firstrun_path).await.map_err(|e| {
            crate::error::PrepperError::device(format!(
                "Error reading {}: {}",
                firstrun_path.display(),
                e
            ))
        })?;

        let invocation = invocation_path(&firstrun, SCRIPT_NAME);
        let spliced = splice_invocation(&firstrun, &invocation);
        if !spliced.before_exit {
            warn!(
                "{} has no 'exit 0'; appended {} at the end",
                firstrun_path.display(),
                invocation
            );
        }

        write_executable(&firstrun_path, &spliced.content).await?;
        info!("Hooked {} into {}", invocation, firstrun_path.display());
        Ok(())
    }
}

async fn write_executable(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // FAT mounts ignore modes; failing to set one there is not an error.
        if let Err(e) = tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await {
            debug!("Could not mark {} executable: {}", path.display(), e);
        }
    }

    Ok(())
}
