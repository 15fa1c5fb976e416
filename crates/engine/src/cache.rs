//! Rotating byte cache
//!
//! Each follower keeps the most recent bytes of its source in a bounded
//! window. Writes append at the tail; once the window is full, the oldest
//! bytes fall off the front. Readers see a zero-based view of whatever is
//! currently held.
//!
//! A single mutex serialises readers and writers. Reads are a plain copy,
//! so holding the lock across one is cheap.

use parking_lot::Mutex;
use thiserror::Error;

/// How much data we keep per source: 300 KiB
pub const CACHE_CAP: usize = 300 * 1024;

/// Outcome of a cache read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The buffer was filled completely
    Ok,
    /// The read ran into the end of the held bytes; fewer bytes (possibly
    /// zero) were copied
    EndOfData,
}

/// Cache read errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Negative read offset
    #[error("invalid offset: {0}")]
    InvalidOffset(i64),
}

/// Bounded append-only byte window
#[derive(Debug)]
pub struct RotatingCache {
    inner: Mutex<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    data: Vec<u8>,
    cap: usize,
}

impl RotatingCache {
    /// Create a cache with the default capacity of [`CACHE_CAP`]
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAP)
    }

    /// Create a cache with a specific capacity
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                data: Vec::new(),
                cap,
            }),
        }
    }

    /// Append bytes, rotating out the oldest to stay within capacity
    ///
    /// Always accepts the whole input and returns its length. An input at
    /// least as large as the capacity replaces the window with the input's
    /// trailing bytes.
    pub fn write(&self, bytes: &[u8]) -> usize {
        let mut inner = self.inner.lock();
        let cap = inner.cap;

        if bytes.len() >= cap {
            inner.data.clear();
            inner.data.extend_from_slice(&bytes[bytes.len() - cap..]);
        } else {
            let overflow = (inner.data.len() + bytes.len()).saturating_sub(cap);
            if overflow > 0 {
                inner.data.drain(..overflow);
            }
            inner.data.extend_from_slice(bytes);
        }

        bytes.len()
    }

    /// Copy held bytes starting at `offset` into `buf`
    ///
    /// Returns how many bytes were copied and whether the end of the held
    /// data was reached. An offset at or past the end yields
    /// `(0, EndOfData)`; a negative offset is an error.
    pub fn read_at(&self, offset: i64, buf: &mut [u8]) -> Result<(usize, ReadStatus), CacheError> {
        if offset < 0 {
            return Err(CacheError::InvalidOffset(offset));
        }
        let offset = offset as usize;

        let inner = self.inner.lock();
        let len = inner.data.len();

        if offset >= len {
            return Ok((0, ReadStatus::EndOfData));
        }

        let n = buf.len().min(len - offset);
        buf[..n].copy_from_slice(&inner.data[offset..offset + n]);

        let status = if n == buf.len() {
            ReadStatus::Ok
        } else {
            ReadStatus::EndOfData
        };
        Ok((n, status))
    }

    /// Drop all held bytes
    pub fn clear(&self) {
        self.inner.lock().data.clear();
    }

    /// Number of bytes currently held
    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().cap
    }
}

impl Default for RotatingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
