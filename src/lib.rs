// file: src/lib.rs
// version: 3.0.0
// guid: d82472d1-7f0f-4eb4-b0a3-6e1547103eb4

//! # Pi Prepper
//!
//! Prepares an SD card for a Raspberry Pi: downloads the latest Raspberry Pi
//! OS Lite image, writes it to removable media, and stages a first-boot
//! script that creates the local account, configures Wi-Fi and joins the Pi
//! to a Tailscale tailnet.

pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod image;
pub mod logging;
pub mod network;
pub mod preparer;
pub mod provision;
pub mod utils;

pub use error::{PrepperError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
