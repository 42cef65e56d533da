// file: src/logging/logger.rs
// version: 1.0.0
// guid: 4b9f5a5f-9732-435a-90f5-26d7f52ca8e7

//! Logger initialization and configuration

use crate::Result;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the log level from the command line switches; quiet wins over verbose
pub fn level_for(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the logging system
///
/// Logs go to stderr so interactive prompts on stdout stay readable.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let filter = EnvFilter::new(level_for(verbose, quiet));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::error::PrepperError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Run an async step inside a named span
pub async fn with_step_span<F, Fut, R>(step: &str, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let span = tracing::info_span!("step", name = step);
    async move { f().await }.instrument(span).await
}
