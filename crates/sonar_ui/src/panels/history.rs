//! Query history drawer.
//!
//! Entries come from `DescribeQueries`. The service prefixes each query with
//! `SOURCE` stages naming its log groups; the drawer shows those separately
//! from the query text.

use chrono::{DateTime, Utc};
use sonar_core::QueryHistoryEntry;

/// One history row as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub query_id: String,
    /// Comma-joined log groups from the `SOURCE` stages.
    pub log_groups: String,
    /// Query text without `SOURCE` stages.
    pub query: String,
    pub status: String,
    pub succeeded: bool,
    /// Relative age, e.g. "5 minutes ago".
    pub age: String,
}

impl HistoryItem {
    pub fn from_entry(entry: &QueryHistoryEntry, now: DateTime<Utc>) -> Self {
        Self {
            query_id: entry.query_id.clone(),
            log_groups: entry.log_group_names(),
            query: entry.query_without_source(),
            status: entry.status.clone(),
            succeeded: entry.is_success(),
            age: relative_age(entry.created_at, now),
        }
    }
}

/// Loading status of the drawer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HistoryState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// History drawer contents, newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPanel {
    entries: Vec<QueryHistoryEntry>,
    state: HistoryState,
}

impl HistoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn set_loading(&mut self) {
        self.state = HistoryState::Loading;
    }

    pub fn set_entries(&mut self, mut entries: Vec<QueryHistoryEntry>) {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.entries = entries;
        self.state = HistoryState::Loaded;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state = HistoryState::Error(message.into());
    }

    pub fn entries(&self) -> &[QueryHistoryEntry] {
        &self.entries
    }

    pub fn items(&self, now: DateTime<Utc>) -> Vec<HistoryItem> {
        self.entries.iter().map(|e| HistoryItem::from_entry(e, now)).collect()
    }

    pub fn find(&self, query_id: &str) -> Option<&QueryHistoryEntry> {
        self.entries.iter().find(|e| e.query_id == query_id)
    }
}

/// Human-readable age of `then` relative to `now`.
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    const UNITS: [(i64, &str); 6] = [
        (365 * 24 * 3600, "year"),
        (30 * 24 * 3600, "month"),
        (24 * 3600, "day"),
        (3600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];

    if seconds < 10 {
        return "just now".to_string();
    }
    for (size, name) in UNITS {
        let count = seconds / size;
        if count >= 1 {
            let plural = if count == 1 { "" } else { "s" };
            return format!("{count} {name}{plural} ago");
        }
    }
    "just now".to_string()
}
