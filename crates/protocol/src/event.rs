//! Follower events
//!
//! A follower communicates with the manager exclusively through these
//! events. Data events carry only the delta range inside the follower's
//! cache; the manager reads the payload out of the cache when it delivers.

use crate::Health;

/// Event emitted by a follower towards the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowerEvent {
    /// New bytes were appended to the cache
    ///
    /// The range is cache-relative: `prev` is the cache length before the
    /// append (adjusted for rotation), `new` the length after. The manager
    /// reads `new - prev` bytes at offset `prev`.
    Data { prev: u64, new: u64 },

    /// The follower's health changed
    State {
        health: Health,
        error: Option<String>,
    },
}

impl FollowerEvent {
    /// Shorthand for a data event
    #[inline]
    pub fn data(prev: u64, new: u64) -> Self {
        Self::Data { prev, new }
    }

    /// Shorthand for a state event
    #[inline]
    pub fn state(health: Health, error: Option<String>) -> Self {
        Self::State { health, error }
    }

    /// Merge a newer data event into this one under backpressure
    ///
    /// Keeps the oldest `prev` and advances `new`. Only meaningful for two
    /// data events; anything else is a caller bug.
    pub fn coalesce_data(&mut self, other: &FollowerEvent) {
        if let (Self::Data { new, .. }, Self::Data { new: other_new, .. }) = (&mut *self, other) {
            *new = *other_new;
        }
    }
}
