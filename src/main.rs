// file: src/main.rs
// version: 2.0.0
// guid: b8c9d0e1-f2a3-4456-8789-23456789abcd

//! Pi Prepper - Main entry point

use clap::Parser;
use pi_prepper::{
    cli::{args::Cli, commands::prepare_command},
    logging::logger,
};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger(cli.verbose, cli.quiet) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match prepare_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancellation() => {
            println!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
