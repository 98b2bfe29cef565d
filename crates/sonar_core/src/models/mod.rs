//! Data models for Sonar.
//!
//! This module contains all core data structures:
//! - `query` - QueryState, QueryRequest, QueryResults, QueryHandle, QueryRunStatus
//! - `time_range` - TimeRange and its resolution to epoch milliseconds
//! - `history` - QueryHistoryEntry
//! - `saved_query` - SavedQuery

pub mod history;
pub mod query;
pub mod saved_query;
pub mod time_range;

pub use history::QueryHistoryEntry;
pub use query::{
    CancelOutcome, LogRecord, QueryHandle, QueryOutcome, QueryRequest, QueryResults,
    QueryRunStatus, QueryState, QueryStatistics, RawRow, ResultField, StatusKind,
    LOG_STREAM_FIELD, POINTER_FIELD, POLL_INTERVAL_SECS,
};
pub use saved_query::{LastRun, SavedQuery};
pub use time_range::{ResolvedTimeRange, TimeRange, TimeUnit};
