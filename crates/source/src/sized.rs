//! The sized-source capability

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// A log source with a cheap size probe and ranged reads
///
/// This is the entire contract the follower pipeline depends on. Short
/// reads are permitted only at the end of the source; anywhere else,
/// `read_at` returning `Ok` means the full requested range came back.
#[async_trait]
pub trait SizedSource: Send + Sync {
    /// Current size of the source in bytes
    async fn size(&self) -> Result<u64, SourceError>;

    /// Read `len` bytes starting at `offset` (0-based)
    ///
    /// Returns fewer than `len` bytes only when the source ends inside the
    /// requested range.
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, SourceError>;

    /// Release exclusive resources
    ///
    /// Pooled resources (the shared transport session) stay open; only
    /// state owned by this source alone is released.
    async fn close(&self) {}
}
