// file: src/cli/mod.rs
// version: 2.0.0
// guid: e5f6a7b8-c9d0-4123-8456-901234efabcd

//! Command line interface for Pi Prepper

pub mod args;
pub mod commands;
pub mod prompt;

pub use args::Cli;
pub use commands::*;
pub use prompt::Console;
