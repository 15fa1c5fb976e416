//! The sink boundary
//!
//! A sink is whatever consumes one source's byte deltas and health
//! transitions: a viewer pane, stdout, a test recorder. Sinks are passive;
//! routing is entirely the manager's job. Both methods are fallible so the
//! manager can detach a faulting sink without disturbing the others.

use thiserror::Error;

use tailmux_protocol::Health;

/// Failure reported by a sink
///
/// Any error detaches the sink; the text only feeds the log line.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    /// Create a sink error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Consumer of one source's bytes and health transitions
pub trait Sink: Send + Sync {
    /// Accept newly arrived bytes
    fn write(&self, bytes: &[u8]) -> Result<(), SinkError>;

    /// Accept a health transition
    fn set_state(&self, health: Health, error: Option<&str>) -> Result<(), SinkError>;
}

/// Identifies one registration of a sink with the manager
///
/// Returned by `attach`, consumed by `detach`. Attaching the same sink
/// object twice yields two subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
