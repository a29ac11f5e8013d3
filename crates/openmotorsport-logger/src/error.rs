//! Logger error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        /// Configuration path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not well-formed XML
    #[error("Malformed configuration XML: {0}")]
    Xml(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
