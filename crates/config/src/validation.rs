//! Configuration validation
//!
//! Checks what serde cannot: non-empty required strings, unique source
//! names, and that at least one source is declared.

use std::collections::HashSet;

use crate::error::{ConfigError, Result};
use crate::sources::HostConfig;
use crate::Config;

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<()> {
    if config.sources.is_empty() {
        return Err(ConfigError::NoSources);
    }

    let mut names: HashSet<&str> = HashSet::new();

    for entry in &config.sources {
        if entry.name.is_empty() {
            return Err(ConfigError::missing_field("?", "name"));
        }
        if !names.insert(&entry.name) {
            return Err(ConfigError::duplicate_source(&entry.name));
        }
        if entry.file.is_empty() {
            return Err(ConfigError::missing_field(&entry.name, "file"));
        }

        validate_host(&entry.name, &entry.host)?;
        if let Some(ref jump) = entry.jump_host {
            validate_host(&entry.name, jump)?;
        }
    }

    Ok(())
}

fn validate_host(source_name: &str, host: &HostConfig) -> Result<()> {
    if host.address.is_empty() {
        return Err(ConfigError::missing_field(source_name, "address"));
    }
    if host.username.is_empty() {
        return Err(ConfigError::missing_field(source_name, "username"));
    }
    Ok(())
}
