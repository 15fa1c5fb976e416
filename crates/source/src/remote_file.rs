//! Remote file source
//!
//! Reads a file over a pooled SSH session using two POSIX one-liners:
//!
//! - size probe: `stat --format %s <path>`
//! - range fetch: `tail -c+<offset+1> <path> | head -c<len>`
//!
//! `tail -c+N` is 1-based, hence the `offset + 1`. The pipe through `head`
//! bounds the transfer, so no per-command timeout is needed.
//!
//! Classification: a transport fault is fatal; anything the remote file
//! layer complains about on stderr (missing file, permissions) is
//! transient, as is an unparsable size.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use tailmux_transport::{ExecOutput, ShellClient};

use crate::error::SourceError;
use crate::sized::SizedSource;

/// A file on a remote host, read through a shared shell session
#[derive(Debug)]
pub struct RemoteFileSource {
    client: Arc<ShellClient>,
    path: String,
}

impl RemoteFileSource {
    /// Create a source for `path` on the host behind `client`
    pub fn new(client: Arc<ShellClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    /// The remote path this source reads
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl SizedSource for RemoteFileSource {
    async fn size(&self) -> Result<u64, SourceError> {
        let output = self.client.exec(&stat_command(&self.path)).await?;
        parse_size(&output)
    }

    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, SourceError> {
        let output = self
            .client
            .exec(&read_command(&self.path, offset, len))
            .await?;
        extract_data(output)
    }

    async fn close(&self) {
        // The session is pooled; nothing here is exclusively ours.
        tracing::debug!(path = %self.path, "source closed");
    }
}

/// Size probe command, bit-exact
fn stat_command(path: &str) -> String {
    format!("stat --format %s {}", path)
}

/// Range fetch command, bit-exact; `tail -c+` wants a 1-based index
fn read_command(path: &str, offset: u64, len: usize) -> String {
    format!("tail -c+{} {} | head -c{}", offset + 1, path, len)
}

/// Classify a size probe's output
fn parse_size(output: &ExecOutput) -> Result<u64, SourceError> {
    if !output.stderr.is_empty() {
        return Err(SourceError::read(output.stderr_string()));
    }

    let stdout = output.stdout_string();
    stdout
        .trim()
        .parse::<u64>()
        .map_err(|_| SourceError::read(format!("invalid size '{}'", stdout.trim())))
}

/// Classify a range fetch's output
fn extract_data(output: ExecOutput) -> Result<Bytes, SourceError> {
    if !output.stderr.is_empty() {
        return Err(SourceError::read(output.stderr_string()));
    }

    Ok(Bytes::from(output.stdout))
}

#[cfg(test)]
#[path = "remote_file_test.rs"]
mod tests;
