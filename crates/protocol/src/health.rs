//! Health lattice and error classification
//!
//! A follower is always in exactly one health state. `Running` and
//! `Degraded` are liveness states (the poll loop is active); `Failed` and
//! `Stopped` are terminal. The classification of an observation is fixed:
//!
//! | read error | transport error | health   |
//! |------------|-----------------|----------|
//! | none       | none            | Running  |
//! | some       | none            | Degraded |
//! | any        | some            | Failed   |

use std::fmt;

/// Health of a follower, as observed by its subscribers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Health {
    /// Created but not yet started
    #[default]
    Idle,
    /// Poll loop active, last observation clean
    Running,
    /// Poll loop active, last observation hit a file-layer fault
    Degraded,
    /// Transport fault; the follower has stopped
    Failed,
    /// Clean shutdown
    Stopped,
}

impl Health {
    /// True for `Failed` and `Stopped`: the follower will emit no further
    /// events and cannot leave this state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }

    /// True while the poll loop is active
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Running | Self::Degraded)
    }

    /// Classify a pair of optional errors into a health state
    pub fn classify(read_err: Option<&str>, transport_err: Option<&str>) -> Self {
        match (read_err, transport_err) {
            (_, Some(_)) => Self::Failed,
            (Some(_), None) => Self::Degraded,
            (None, None) => Self::Running,
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Tracks a follower's health across observations
///
/// The follower feeds every pass through `observe` and emits a state event
/// only when it returns true: on a category change, or while `Degraded`
/// when the error text differs from the previously held one.
#[derive(Debug, Default)]
pub struct StateTracker {
    health: Health,
    error: Option<String>,
}

impl StateTracker {
    /// New tracker in `Idle` with no error
    pub fn new() -> Self {
        Self::default()
    }

    /// Current health
    #[inline]
    pub fn health(&self) -> Health {
        self.health
    }

    /// Error text held for `Degraded` and `Failed`
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record an observation; returns true if a transition must be emitted
    pub fn observe(&mut self, read_err: Option<&str>, transport_err: Option<&str>) -> bool {
        let next = Health::classify(read_err, transport_err);
        let next_err = match next {
            Health::Failed => transport_err.map(str::to_owned),
            Health::Degraded => read_err.map(str::to_owned),
            _ => None,
        };

        let changed = next != self.health
            || (next == Health::Degraded && next_err != self.error);

        self.health = next;
        self.error = next_err;
        changed
    }

    /// Force the health to a given state, keeping any held error.
    /// Returns true if the state actually changed.
    pub fn force(&mut self, health: Health) -> bool {
        let changed = self.health != health;
        self.health = health;
        if !matches!(health, Health::Degraded | Health::Failed) {
            self.error = None;
        }
        changed
    }
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
