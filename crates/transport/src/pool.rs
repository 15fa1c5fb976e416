//! Connection pool
//!
//! Deduplicates SSH sessions by host identity: sources that point at the
//! same login (endpoint, user, credential material) share one connection.
//! Entries are probed for liveness on every lookup and replaced lazily when
//! dead; the pool imposes no cap and owns nothing beyond the sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use tailmux_config::{HostConfig, SourceEntry};

use crate::client::ShellClient;
use crate::error::Result;

/// Connection-equivalence key for a host login
///
/// SHA-256 over endpoint, user and credential material, hex-encoded. The
/// digest keeps passwords out of log lines and map dumps.
pub fn connection_key(host: &HostConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(host.endpoint());
    hasher.update(&host.username);
    hasher.update(host.credential());
    hex::encode(hasher.finalize())
}

/// Pool of live SSH sessions, keyed by [`connection_key`]
#[derive(Debug, Default)]
pub struct ShellPool {
    clients: Mutex<HashMap<String, Arc<ShellClient>>>,
}

impl ShellPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live client for the entry's host, dialing if necessary
    ///
    /// An existing session is reused only if its liveness probe passes;
    /// a dead entry is evicted and replaced by a fresh dial. The jump host
    /// is part of how we dial, not of the equivalence key, matching the
    /// semantics that one login equals one session.
    pub async fn connect(&self, entry: &SourceEntry) -> Result<Arc<ShellClient>> {
        let key = connection_key(&entry.host);

        let existing = self.clients.lock().get(&key).cloned();
        if let Some(client) = existing {
            if client.is_alive().await {
                tracing::debug!(endpoint = %client.endpoint(), "reusing pooled session");
                return Ok(client);
            }
            tracing::info!(endpoint = %client.endpoint(), "pooled session dead, redialing");
            self.clients.lock().remove(&key);
        }

        let client = Arc::new(ShellClient::dial(&entry.host, entry.jump_host.as_ref()).await?);
        self.clients.lock().insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Number of pooled sessions (live or not)
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// True when no sessions are pooled
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Close and drop every pooled session
    pub async fn disconnect_all(&self) {
        let clients: Vec<Arc<ShellClient>> = self.clients.lock().drain().map(|(_, c)| c).collect();
        for client in clients {
            client.close().await;
        }
    }
}
