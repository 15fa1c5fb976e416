//! `tailmux tail` - follow sources and stream their bytes to stdout
//!
//! Attaches one stdout sink per requested source and runs until Ctrl-C.
//! Health transitions surface as log lines on stderr, so piping stdout
//! stays clean.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use tailmux_config::Config;
use tailmux_engine::{FollowerManager, Sink, SinkError};
use tailmux_protocol::{Health, SourceId};

#[derive(Args, Debug, Default)]
pub struct TailArgs {
    /// Source names to follow; all configured sources when empty
    pub names: Vec<String>,
}

/// Sink that forwards bytes to stdout and health changes to the log
struct StdoutSink {
    source_id: SourceId,
}

impl Sink for StdoutSink {
    fn write(&self, bytes: &[u8]) -> std::result::Result<(), SinkError> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(bytes)
            .and_then(|_| stdout.flush())
            .map_err(|e| SinkError::new(e.to_string()))
    }

    fn set_state(&self, health: Health, error: Option<&str>) -> std::result::Result<(), SinkError> {
        match error {
            Some(error) => {
                tracing::warn!(source_id = %self.source_id, %health, error, "source state")
            }
            None => tracing::info!(source_id = %self.source_id, %health, "source state"),
        }
        Ok(())
    }
}

pub async fn run(config: Config, args: TailArgs) -> Result<()> {
    let names: Vec<String> = if args.names.is_empty() {
        config.sources.iter().map(|s| s.name.clone()).collect()
    } else {
        for name in &args.names {
            if config.source(name).is_none() {
                bail!(
                    "unknown source '{}'; configured sources: {}",
                    name,
                    config
                        .sources
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        args.names
    };

    let manager = FollowerManager::new(config.sources, config.engine);

    for name in &names {
        let source_id = SourceId::new(name);
        let sink = Arc::new(StdoutSink {
            source_id: source_id.clone(),
        });
        manager.attach(&source_id, sink).await?;
        tracing::info!(source_id = %source_id, "following");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted, shutting down");
    manager.stop().await;

    Ok(())
}
