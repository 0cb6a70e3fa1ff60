//! Error types for botgate

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for botgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in botgate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error (config files, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    ConfigRead {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Error from botgate-auth
    #[error("Auth error: {0}")]
    Auth(#[from] botgate_auth::AuthError),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
