//! Tailmux sources
//!
//! The `SizedSource` capability is the only thing the follower pipeline
//! knows about a log source: a cheap size probe and a ranged byte read,
//! with errors split into the two categories that drive the health lattice.
//!
//! `RemoteFileSource` is the production implementation, reading a file over
//! a pooled SSH session with plain POSIX commands.

mod error;
mod remote_file;
mod sized;

pub use error::SourceError;
pub use remote_file::RemoteFileSource;
pub use sized::SizedSource;
