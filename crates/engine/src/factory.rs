//! Source materialisation
//!
//! The manager creates sources lazily, on first attach. This seam is a
//! trait so the follower/manager machinery never names the transport: the
//! production factory dials through the shell pool, tests script their own
//! sources.

use async_trait::async_trait;

use tailmux_config::SourceEntry;
use tailmux_source::{RemoteFileSource, SizedSource};
use tailmux_transport::ShellPool;

use crate::error::Result;

/// Creates a [`SizedSource`] for a configured entry
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Materialise the source behind `entry`
    async fn create(&self, entry: &SourceEntry) -> Result<Box<dyn SizedSource>>;

    /// Release anything the factory holds (pooled sessions)
    async fn shutdown(&self) {}
}

/// Production factory: pooled SSH sessions + remote file reads
#[derive(Debug, Default)]
pub struct PooledSourceFactory {
    pool: ShellPool,
}

impl PooledSourceFactory {
    /// Create a factory with an empty pool
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceFactory for PooledSourceFactory {
    async fn create(&self, entry: &SourceEntry) -> Result<Box<dyn SizedSource>> {
        let client = self.pool.connect(entry).await?;
        Ok(Box::new(RemoteFileSource::new(client, &entry.file)))
    }

    async fn shutdown(&self) {
        self.pool.disconnect_all().await;
    }
}
