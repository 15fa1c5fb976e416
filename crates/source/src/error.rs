//! Source error classification
//!
//! Exactly two categories, because the follower's health lattice only
//! distinguishes two: a `Read` error is a file-layer fault on a working
//! session (keep polling, health Degraded), a `Transport` error means the
//! session itself is gone (stop, health Failed).

use thiserror::Error;

/// Error returned by a [`SizedSource`](crate::SizedSource) operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// File-layer fault: the session works but the read did not
    #[error("read error: {0}")]
    Read(String),

    /// Session-layer fault: the transport underneath is broken
    #[error("transport error: {0}")]
    Transport(String),
}

impl SourceError {
    /// Create a read (transient) error
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Create a transport (fatal) error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// True for the fatal category
    #[inline]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The carried error text
    pub fn message(&self) -> &str {
        match self {
            Self::Read(msg) | Self::Transport(msg) => msg,
        }
    }
}

impl From<tailmux_transport::TransportError> for SourceError {
    fn from(err: tailmux_transport::TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
