// file: src/network/mod.rs
// version: 1.0.0
// guid: dadf1b1a-1763-4cb9-acf2-4737921aece7

//! Network operations module

pub mod auth;
pub mod download;
pub mod progress;

pub use auth::{AuthKeyIssuer, JoinKey};
pub use download::{NetworkDownloader, ResolvedDownload};
pub use progress::{CountingWriter, DownloadProgress, ProgressSnapshot};
