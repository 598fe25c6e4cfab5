//! Application error types
//!
//! Errors that end the process rather than a single session.

use crate::config::ConfigError;
use std::io;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // The listening endpoint could not be acquired
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    // The configured host is not an IP address
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),

    // I/O errors outside of any single session
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// Create a bind error for an address
    pub fn bind(addr: impl ToString, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    /// Whether the process cannot continue after this error
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Bind { .. } | Self::InvalidAddress(_) => true,
            Self::Io(_) => false,
        }
    }

    /// Stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Bind { .. } => "BIND_FAILURE",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
