//! Tailmux transport
//!
//! Remote-shell plumbing: an SSH client that runs one command per session
//! channel and returns captured stdout/stderr, and a pool that deduplicates
//! live sessions by host identity so every source on the same login shares
//! one connection.
//!
//! The rest of the engine never touches SSH directly; it sees `ShellClient`
//! (run a command, get output) and `ShellPool` (get me a client for this
//! descriptor).

mod client;
mod error;
mod pool;

pub use client::{ExecOutput, ShellClient};
pub use error::{Result, TransportError};
pub use pool::{connection_key, ShellPool};
