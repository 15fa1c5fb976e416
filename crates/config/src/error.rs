//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A source entry is missing a required field
    #[error("source '{name}' is missing required field '{field}'")]
    MissingField {
        /// Name of the source ("?" when the name itself is missing)
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Two sources share a name
    #[error("duplicate source name '{name}'")]
    DuplicateSource {
        /// The conflicting name
        name: String,
    },

    /// The config declares no sources at all
    #[error("no sources configured - at least one source is required")]
    NoSources,
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(name: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            name: name.into(),
            field,
        }
    }

    /// Create a DuplicateSource error
    pub fn duplicate_source(name: impl Into<String>) -> Self {
        Self::DuplicateSource { name: name.into() }
    }
}
