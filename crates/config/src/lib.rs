//! Tailmux configuration
//!
//! TOML-based configuration loading. A config file declares the log sources
//! to follow; everything else has defaults.
//!
//! # Example
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [[sources]]
//! name = "api-prod"
//! file = "/var/log/api.log"
//!
//! [sources.host]
//! address = "10.0.0.12"
//! username = "deploy"
//! key = "/home/me/.ssh/id_ed25519"
//! ```

mod engine;
mod error;
mod logging;
mod sources;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use engine::EngineConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use sources::{HostConfig, SourceEntry};

/// Main configuration structure
///
/// Only `sources` carries required fields; the other sections default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Engine tuning
    pub engine: EngineConfig,

    /// Log sources to follow
    pub sources: Vec<SourceEntry>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Find a source entry by name
    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
