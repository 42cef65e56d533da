// file: src/error.rs
// version: 1.0.0
// guid: f5d8e49a-01e6-47c0-bc02-e1fd9d70174f

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, PrepperError>;

/// Error types for Pi Prepper
#[derive(Error, Debug)]
pub enum PrepperError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Required commands are not installed: {}", .0.join(", "))]
    MissingCommands(Vec<String>),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Command '{command}' failed (exit code {exit_code:?}): {stderr}")]
    ProcessError {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    /// The operator declined a prompt; not a failure
    #[error("{0}")]
    Cancelled(String),
}

impl PrepperError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Create a new device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceError(msg.into())
    }

    /// Create a new authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    /// Create a new template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::TemplateError(msg.into())
    }

    /// True when the run stopped because the operator said no
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Process exit code for this error: cancellation is a clean exit
    pub fn exit_code(&self) -> i32 {
        if self.is_cancellation() {
            0
        } else {
            1
        }
    }
}
