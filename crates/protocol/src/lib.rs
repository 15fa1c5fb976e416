//! Tailmux core types
//!
//! Types shared by every layer of the engine: source identity, the health
//! lattice with its error classification, and the events a follower emits
//! towards the manager.
//!
//! This crate is intentionally dependency-free; everything that needs to
//! name a source or a health state can depend on it without dragging in the
//! transport or the runtime.

mod event;
mod health;
mod source_id;

pub use event::FollowerEvent;
pub use health::{Health, StateTracker};
pub use source_id::SourceId;
