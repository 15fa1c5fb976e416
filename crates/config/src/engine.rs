//! Engine tuning
//!
//! Everything here has a default matching the engine's built-in constants;
//! a config file only names what it wants to change.

use std::time::Duration;

use serde::Deserialize;

/// Engine tuning section
///
/// ```toml
/// [engine]
/// poll_period = "500ms"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Time between size probes while a source is idle
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub poll_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(1),
        }
    }
}
