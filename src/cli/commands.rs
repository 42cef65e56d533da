// file: src/cli/commands.rs
// version: 2.0.0
// guid: a7b8c9d0-e1f2-4345-8678-123456789abc

//! Command implementations for the CLI

use super::args::Cli;
use super::prompt::Console;
use crate::{
    disk::default_backend,
    preparer::{PrepareOptions, Preparer},
    Result,
};
use std::path::PathBuf;
use tracing::info;

/// Expand `~` and environment variables in a user supplied path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Build run options from the command line
pub fn prepare_options(cli: &Cli) -> PrepareOptions {
    PrepareOptions {
        env_file: expand_path(&cli.env_file),
        template: expand_path(&cli.template),
        work_dir: expand_path(&cli.workdir),
        show_progress: !cli.quiet,
        ..PrepareOptions::default()
    }
}

/// Prepare one SD card interactively on stdin/stdout
pub async fn prepare_command(cli: &Cli) -> Result<()> {
    let options = prepare_options(cli);
    let backend = default_backend();
    info!("Using {} disk backend", backend.name());

    let mut preparer = Preparer::new(options, backend, Console::stdio());
    let summary = preparer.run().await?;

    info!(
        "Done: {} {} with first boot script at {}",
        summary.device,
        if summary.flashed { "flashed" } else { "reused" },
        summary.script.display()
    );
    Ok(())
}
