//! Saved query models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TimeRange;

/// A query saved to the user's local library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// The query text
    pub query: String,
    /// Log groups the query is meant for
    pub log_groups: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SavedQuery {
    /// Create a new saved query.
    pub fn new(name: impl Into<String>, query: impl Into<String>, log_groups: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            query: query.into(),
            log_groups,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive match against name, query text and log groups.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.name.to_lowercase().contains(&filter)
            || self.query.to_lowercase().contains(&filter)
            || self.log_groups.join(", ").to_lowercase().contains(&filter)
    }
}

/// Editor inputs of the most recent run, restored on the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastRun {
    /// The query text
    pub query: String,
    /// Selected log groups
    pub log_groups: Vec<String>,
    /// Selected time range
    pub time_range: TimeRange,
}
