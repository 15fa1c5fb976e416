//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by the remote-shell layer
///
/// Every variant is a session-layer fault; file-layer problems (missing
/// file, unreadable path) never surface here - they come back as stderr in
/// an [`ExecOutput`](crate::ExecOutput) and are classified upstream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP/SSH dial failed
    #[error("failed to dial {endpoint}: {source}")]
    Dial {
        /// `address:port` of the host
        endpoint: String,
        /// Underlying SSH error
        #[source]
        source: russh::Error,
    },

    /// Dial did not complete within the connect timeout
    #[error("timed out dialing {endpoint}")]
    DialTimeout {
        /// `address:port` of the host
        endpoint: String,
    },

    /// The server rejected our credentials
    #[error("authentication failed for {username}@{endpoint}")]
    Auth {
        /// User we tried to authenticate as
        username: String,
        /// `address:port` of the host
        endpoint: String,
    },

    /// A private key file could not be read or decrypted
    #[error("cannot load key '{path}': {source}")]
    Key {
        /// Path of the key file
        path: String,
        /// Underlying key error
        #[source]
        source: russh_keys::Error,
    },

    /// The established session failed while running a command
    #[error("session error: {0}")]
    Session(#[from] russh::Error),
}
