//! Event kinds that trigger webhook notifications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The operation that fired a notification.
///
/// Stored and sent on the wire in upper case (`"REGISTER"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A dashboard configuration was created
    Register,
    /// A dashboard configuration was updated
    Change,
    /// A dashboard configuration was deleted
    Delete,
    /// A populated dashboard was read
    Invoke,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [Self::Register, Self::Change, Self::Delete, Self::Invoke];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Change => "CHANGE",
            Self::Delete => "DELETE",
            Self::Invoke => "INVOKE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive parse.
impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidEvent { value: s.to_string() })
    }
}
