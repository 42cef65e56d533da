// file: src/logging/mod.rs
// version: 1.0.0
// guid: 069b4123-036e-4e52-968d-1aeaff315389

//! Logging setup for Pi Prepper

pub mod logger;

pub use logger::{init_logger, with_step_span};
