// file: src/utils/mod.rs
// version: 1.0.0
// guid: 96e93a9f-a71c-453c-9dff-3c6f1463d27a

//! Utility modules for system operations

pub mod system;

pub use system::SystemUtils;
