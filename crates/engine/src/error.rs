//! Engine error types

use thiserror::Error;

use tailmux_protocol::SourceId;
use tailmux_transport::TransportError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the manager's public operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Attach named a source id with no configured descriptor
    #[error("unknown source '{0}'")]
    SourceNotFound(SourceId),

    /// The transport could not produce a session for the source's host
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The manager has been stopped
    #[error("manager is stopped")]
    Stopped,
}
