//! Tailmux engine
//!
//! The follower pipeline and the manager that owns it. Each configured
//! source gets at most one follower: a task that probes the remote file's
//! size, fetches new bytes in bounded chunks, and keeps the most recent
//! 300 KiB in a rotating cache. The manager materialises followers lazily
//! on subscription and multicasts byte deltas and health transitions to
//! every sink attached to a source.
//!
//! # Architecture
//!
//! ```text
//! attach/detach/stop ──► FollowerManager ──commands──► coordinator task
//!                                                        │        ▲
//!                                            read_cache  │        │ events (bounded,
//!                                            + fan-out   ▼        │  data coalesced)
//!                                                      Sinks   Follower task ──► RotatingCache
//!                                                                  │
//!                                                             SizedSource (SSH)
//! ```

mod cache;
mod error;
mod factory;
mod follower;
mod manager;
mod sink;

pub use cache::{CacheError, ReadStatus, RotatingCache, CACHE_CAP};
pub use error::{EngineError, Result};
pub use factory::{PooledSourceFactory, SourceFactory};
pub use follower::{Follower, FollowerConfig, FollowerState, CHUNK_MAX, SIZE_PERIOD};
pub use manager::{FollowerManager, REPLAY_MAX};
pub use sink::{Sink, SinkError, SubscriptionId};
