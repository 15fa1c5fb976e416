//! `tailmux list` - print the configured sources

use anyhow::Result;

use tailmux_config::Config;

pub fn run(config: &Config) -> Result<()> {
    for entry in &config.sources {
        let via = match &entry.jump_host {
            Some(jump) => format!(" via {}", jump.endpoint()),
            None => String::new(),
        };
        println!(
            "{}  {}@{}{}  {}",
            entry.name,
            entry.host.username,
            entry.host.endpoint(),
            via,
            entry.file
        );
    }
    Ok(())
}
