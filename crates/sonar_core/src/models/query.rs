//! Query execution models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::time_range::ResolvedTimeRange;
use crate::error::SonarError;

/// Seconds between two status polls of a running job. Fixed, not configurable per job.
pub const POLL_INTERVAL_SECS: u64 = 10;

/// Name of the reserved per-record pointer field.
pub const POINTER_FIELD: &str = "@ptr";

/// Name of the reserved log stream field.
pub const LOG_STREAM_FIELD: &str = "@logStream";

/// Lifecycle state of a query job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryState {
    /// No job has been submitted.
    #[default]
    Idle,
    /// Accepted by the service, not started yet.
    Scheduled,
    /// Executing on the service.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
    /// Stopped before completion.
    Cancelled,
    /// Exceeded the service-side time limit.
    Timeout,
    /// Status the client does not recognize.
    Unknown,
}

impl QueryState {
    /// Classify a status string reported by the service.
    ///
    /// Unrecognized strings map to `Unknown`.
    pub fn parse(status: &str) -> Self {
        match status {
            "Scheduled" => Self::Scheduled,
            "Running" => Self::Running,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Timeout" => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Scheduled => "Scheduled",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown",
        }
    }

    /// Check if polling should continue.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }

    /// Check if no further polling occurs from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Cancelled | Self::Timeout | Self::Unknown
        )
    }

    /// Check if this is a failing terminal state.
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution statistics reported by the status service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryStatistics {
    /// Records matching the query.
    pub records_matched: f64,
    /// Records scanned so far.
    pub records_scanned: f64,
    /// Bytes scanned so far.
    pub bytes_scanned: f64,
}

impl QueryStatistics {
    /// Statistics with every counter at zero.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// One named value of a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultField {
    /// Field name, e.g. `@timestamp`.
    pub field: String,
    /// Field value as text.
    pub value: String,
}

impl ResultField {
    /// Create a new field.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), value: value.into() }
    }
}

/// A result row as received: ordered (name, value) pairs.
pub type RawRow = Vec<ResultField>;

/// Full field set of one log record.
pub type LogRecord = BTreeMap<String, String>;

/// Validated input for StartQuery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Log groups to query, in selection order.
    pub log_group_names: Vec<String>,
    /// Start of the range, epoch milliseconds.
    pub start_time: i64,
    /// End of the range, epoch milliseconds.
    pub end_time: i64,
    /// Query text, passed through unvalidated.
    pub query_string: String,
}

impl QueryRequest {
    /// Validate the inputs of a run.
    ///
    /// The time range is checked first, then the log group selection.
    pub fn new(
        log_group_names: Vec<String>,
        range: ResolvedTimeRange,
        query_string: impl Into<String>,
    ) -> Result<Self, SonarError> {
        let (Some(start_time), Some(end_time)) = (range.start_time, range.end_time) else {
            return Err(SonarError::validation("Invalid date range."));
        };

        if log_group_names.is_empty() {
            return Err(SonarError::validation("Select at least one log group."));
        }

        Ok(Self { log_group_names, start_time, end_time, query_string: query_string.into() })
    }
}

/// Response of GetQueryResults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResults {
    /// Raw status string.
    pub status: String,
    /// Statistics, when reported.
    pub statistics: Option<QueryStatistics>,
    /// Result rows; populated once the job is complete.
    pub results: Vec<RawRow>,
}

impl QueryResults {
    /// Classified status.
    pub fn state(&self) -> QueryState {
        QueryState::parse(&self.status)
    }
}

/// Handle for tracking and cancelling one submitted job.
pub struct QueryHandle {
    /// Identifier assigned by the submission service.
    id: String,
    /// Log groups the job runs against.
    log_group_names: Vec<String>,
    /// The query text.
    query_string: String,
    /// Stops the poll loop for this job.
    cancel_token: CancellationToken,
    /// Cuts the current wait short without stopping the loop.
    wake: Notify,
    /// Submission time.
    started_at: DateTime<Utc>,
}

impl QueryHandle {
    /// Create a handle for a job the service accepted.
    pub fn new(id: impl Into<String>, request: &QueryRequest) -> Self {
        Self {
            id: id.into(),
            log_group_names: request.log_group_names.clone(),
            query_string: request.query_string.clone(),
            cancel_token: CancellationToken::new(),
            wake: Notify::new(),
            started_at: Utc::now(),
        }
    }

    /// Get the job identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the queried log groups.
    pub fn log_group_names(&self) -> &[String] {
        &self.log_group_names
    }

    /// Get the query text.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Get when the job was submitted.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Request cancellation of the poll loop.
    pub fn cancel(&self) {
        tracing::debug!(query_id = %self.id, "Cancellation requested");
        self.cancel_token.cancel();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Wait for cancellation.
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await
    }

    /// Get a clone of the cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// End the current wait early so the next status poll happens now.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Wait for a wake-up.
    pub async fn woken(&self) {
        self.wake.notified().await
    }
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("id", &self.id)
            .field("log_group_names", &self.log_group_names)
            .field("query_string", &self.query_string)
            .field("started_at", &self.started_at)
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

/// How the status banner should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    /// Still polling.
    InProgress,
    /// Finished with results.
    Success,
    /// Finished without results.
    Error,
}

/// Snapshot published by the poller for the status banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRunStatus {
    /// Raw status string.
    pub status: String,
    /// Banner styling.
    pub kind: StatusKind,
    /// Records matched.
    pub matches: f64,
    /// Records scanned.
    pub scanned: f64,
    /// Bytes scanned.
    pub bytes: f64,
    /// Seconds until the next poll; zero once terminal.
    pub time_left: u64,
}

impl QueryRunStatus {
    /// Snapshot of a job that is still running.
    pub fn in_progress(status: &str, statistics: QueryStatistics, time_left: u64) -> Self {
        Self::with_statistics(status, StatusKind::InProgress, statistics, time_left)
    }

    /// Snapshot of a completed job.
    pub fn complete(statistics: QueryStatistics) -> Self {
        Self::with_statistics(QueryState::Complete.as_str(), StatusKind::Success, statistics, 0)
    }

    /// Snapshot of a failed job; counters are reset to zero.
    pub fn failed(status: &str) -> Self {
        Self::with_statistics(status, StatusKind::Error, QueryStatistics::zero(), 0)
    }

    fn with_statistics(
        status: &str,
        kind: StatusKind,
        statistics: QueryStatistics,
        time_left: u64,
    ) -> Self {
        Self {
            status: status.to_string(),
            kind,
            matches: statistics.records_matched,
            scanned: statistics.records_scanned,
            bytes: statistics.bytes_scanned,
            time_left,
        }
    }

    /// Copy of this snapshot with a new countdown value.
    pub fn with_time_left(&self, time_left: u64) -> Self {
        Self { time_left, ..self.clone() }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The job completed; rows in arrival order.
    Complete {
        /// Job identifier.
        query_id: String,
        /// Final statistics.
        statistics: QueryStatistics,
        /// Result rows.
        rows: Vec<RawRow>,
    },
    /// The poll loop was stopped by a cancel request.
    Cancelled {
        /// Job identifier.
        query_id: String,
    },
    /// A job was already active; nothing was submitted.
    Rejected,
}

/// Result of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No job was active.
    NoActiveQuery,
    /// The service stopped the job.
    Stopped {
        /// Job identifier.
        query_id: String,
    },
    /// The job had already completed before the stop request arrived.
    AlreadyComplete {
        /// Job identifier.
        query_id: String,
        /// Service message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse() {
        assert_eq!(QueryState::parse("Scheduled"), QueryState::Scheduled);
        assert_eq!(QueryState::parse("Running"), QueryState::Running);
        assert_eq!(QueryState::parse("Complete"), QueryState::Complete);
        assert_eq!(QueryState::parse("Failed"), QueryState::Failed);
        assert_eq!(QueryState::parse("Cancelled"), QueryState::Cancelled);
        assert_eq!(QueryState::parse("Timeout"), QueryState::Timeout);
        assert_eq!(QueryState::parse("Unknown"), QueryState::Unknown);
        assert_eq!(QueryState::parse("complete"), QueryState::Unknown);
        assert_eq!(QueryState::parse(""), QueryState::Unknown);
    }

    #[test]
    fn test_state_classification() {
        assert!(QueryState::Running.is_in_progress());
        assert!(QueryState::Scheduled.is_in_progress());
        assert!(!QueryState::Idle.is_terminal());
        assert!(QueryState::Complete.is_terminal());
        assert!(!QueryState::Complete.is_failure());
        for state in [QueryState::Failed, QueryState::Cancelled, QueryState::Timeout, QueryState::Unknown] {
            assert!(state.is_failure(), "{state} should be a failure");
        }
    }

    #[test]
    fn test_request_validation() {
        let range = ResolvedTimeRange { start_time: Some(1_000), end_time: Some(2_000) };

        let err = QueryRequest::new(Vec::new(), range, "fields @message").unwrap_err();
        assert_eq!(err.to_string(), "Select at least one log group.");

        let missing = ResolvedTimeRange { start_time: None, end_time: Some(2_000) };
        let err = QueryRequest::new(vec!["/app/api".into()], missing, "x").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date range.");

        let request = QueryRequest::new(vec!["/app/api".into()], range, "x").unwrap();
        assert_eq!(request.start_time, 1_000);
        assert_eq!(request.end_time, 2_000);
    }

    #[test]
    fn test_failed_status_zeroes_counters() {
        let status = QueryRunStatus::failed("Timeout");
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.matches, 0.0);
        assert_eq!(status.scanned, 0.0);
        assert_eq!(status.bytes, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_cancel_and_wake() {
        let range = ResolvedTimeRange { start_time: Some(0), end_time: Some(1) };
        let request = QueryRequest::new(vec!["g".into()], range, "q").unwrap();
        let handle = QueryHandle::new("q1", &request);
        assert_eq!(handle.id(), "q1");

        // A wake sent before anyone waits is kept for the next wait.
        handle.wake();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.woken())
            .await
            .expect("stored wake should resolve immediately");
        assert!(tokio::time::timeout(std::time::Duration::from_secs(1), handle.woken()).await.is_err());
        assert!(!handle.is_cancelled());

        handle.cancel();
        assert!(handle.is_cancelled());
        handle.cancelled().await;
    }
}
