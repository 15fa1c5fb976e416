//! Source identification
//!
//! `SourceId` names a configured log source. The manager keys followers and
//! subscriptions by it, and every event carries one.

use std::fmt;

/// Identifier of a configured log source
///
/// Matches the `name` field of a source entry in the configuration file.
///
/// # Example
///
/// ```
/// use tailmux_protocol::SourceId;
///
/// let source = SourceId::new("api-prod");
/// assert_eq!(source.as_str(), "api-prod");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the source ID as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
