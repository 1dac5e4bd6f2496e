//! Project-level versioning state.

use serde::{Deserialize, Serialize};

/// Versioning state owned by the surrounding tool and threaded through
/// the coordinator, never read from ambient globals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    /// Whether the project has been converted to the versioned model
    #[serde(default)]
    pub versioned_database: bool,
    /// Most recent chronological value observed, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<i64>,
}

impl ProjectState {
    /// State for a project that has not enabled versioning
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a project already converted to the versioned model
    #[must_use]
    pub fn versioned() -> Self {
        Self {
            versioned_database: true,
            last_timestamp: None,
        }
    }

    /// Advance the timestamp monotonically; later values win
    pub fn observe_timestamp(&mut self, millis: i64) {
        match self.last_timestamp {
            Some(current) if current >= millis => {}
            _ => self.last_timestamp = Some(millis),
        }
    }
}
