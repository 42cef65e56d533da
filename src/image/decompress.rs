// file: src/image/decompress.rs
// version: 1.0.0
// guid: 6d95fb8b-c9eb-41b0-940e-ab4841f43dfa

//! Image decompression through the external `xz` tool

use crate::utils::system::{describe, SystemUtils};
use crate::Result;
use std::path::Path;
use tracing::info;

/// Decompress `archive` in place with `xz -dv`, which replaces `name.xz` with `name`
pub async fn decompress_xz(archive: &Path) -> Result<()> {
    info!("Extracting the .img file from {}...", archive.display());

    let archive_arg = archive.to_string_lossy();
    let args = ["-dv", archive_arg.as_ref()];
    let mut cmd = tokio::process::Command::new("xz");
    cmd.args(args);

    SystemUtils::run_attached(cmd, &describe("xz", &args)).await
}
