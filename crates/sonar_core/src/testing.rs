//! In-memory [`LogsInsightsService`] for tests.
//!
//! Responses are queued per operation and consumed in order. When a queue
//! is empty the mock answers with a harmless default: a fresh query id for
//! StartQuery, a `Running` status for GetQueryResults and success for
//! StopQuery.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SonarError;
use crate::models::{
    LogRecord, QueryHistoryEntry, QueryRequest, QueryResults, QueryStatistics, RawRow,
};
use crate::services::LogsInsightsService;

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    StartQuery(QueryRequest),
    GetQueryResults(String),
    StopQuery(String),
    GetLogRecord(String),
    ListLogGroups(Option<String>),
    DescribeQueries,
}

/// Scripted logs service.
#[derive(Default)]
pub struct MockLogsService {
    next_id: AtomicUsize,
    starts: Mutex<VecDeque<Result<String, String>>>,
    statuses: Mutex<VecDeque<Result<QueryResults, String>>>,
    stops: Mutex<VecDeque<Result<(), String>>>,
    status_delay: Mutex<Option<Duration>>,
    records: Mutex<HashMap<String, Result<LogRecord, String>>>,
    record_delays: Mutex<HashMap<String, Duration>>,
    log_groups: Mutex<Vec<String>>,
    log_groups_error: Mutex<Option<String>>,
    history: Mutex<Vec<QueryHistoryEntry>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLogsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_start_id(&self, id: impl Into<String>) {
        self.starts.lock().push_back(Ok(id.into()));
    }

    pub fn push_start_error(&self, message: impl Into<String>) {
        self.starts.lock().push_back(Err(message.into()));
    }

    pub fn push_status(&self, results: QueryResults) {
        self.statuses.lock().push_back(Ok(results));
    }

    pub fn push_status_error(&self, message: impl Into<String>) {
        self.statuses.lock().push_back(Err(message.into()));
    }

    pub fn push_stop_error(&self, message: impl Into<String>) {
        self.stops.lock().push_back(Err(message.into()));
    }

    /// Delay every GetQueryResults response.
    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock() = Some(delay);
    }

    pub fn set_record(&self, pointer: impl Into<String>, record: LogRecord) {
        self.records.lock().insert(pointer.into(), Ok(record));
    }

    pub fn set_record_error(&self, pointer: impl Into<String>, message: impl Into<String>) {
        self.records.lock().insert(pointer.into(), Err(message.into()));
    }

    pub fn set_record_delay(&self, pointer: impl Into<String>, delay: Duration) {
        self.record_delays.lock().insert(pointer.into(), delay);
    }

    pub fn set_log_groups(&self, groups: Vec<String>) {
        *self.log_groups.lock() = groups;
    }

    pub fn set_log_groups_error(&self, message: impl Into<String>) {
        *self.log_groups_error.lock() = Some(message.into());
    }

    pub fn set_history(&self, entries: Vec<QueryHistoryEntry>) {
        *self.history.lock() = entries;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn start_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::StartQuery(_)))
    }

    pub fn status_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::GetQueryResults(_)))
    }

    pub fn stop_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::StopQuery(_)))
    }

    pub fn record_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::GetLogRecord(_)))
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record_call(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl LogsInsightsService for MockLogsService {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, SonarError> {
        self.record_call(MockCall::StartQuery(request.clone()));
        let next = self.starts.lock().pop_front();
        match next {
            Some(Ok(id)) => Ok(id),
            Some(Err(message)) => Err(SonarError::service("StartQuery", message)),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("query-{n}"))
            }
        }
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults, SonarError> {
        self.record_call(MockCall::GetQueryResults(query_id.to_string()));
        let delay = *self.status_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.statuses.lock().pop_front();
        match next {
            Some(Ok(results)) => Ok(results),
            Some(Err(message)) => Err(SonarError::service("GetQueryResults", message)),
            None => Ok(status_results("Running")),
        }
    }

    async fn stop_query(&self, query_id: &str) -> Result<(), SonarError> {
        self.record_call(MockCall::StopQuery(query_id.to_string()));
        let next = self.stops.lock().pop_front();
        match next {
            Some(Err(message)) => Err(SonarError::service("StopQuery", message)),
            _ => Ok(()),
        }
    }

    async fn get_log_record(&self, pointer: &str) -> Result<LogRecord, SonarError> {
        self.record_call(MockCall::GetLogRecord(pointer.to_string()));
        let delay = self.record_delays.lock().get(pointer).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let record = self.records.lock().get(pointer).cloned();
        match record {
            Some(Ok(record)) => Ok(record),
            Some(Err(message)) => Err(SonarError::service("GetLogRecord", message)),
            None => Err(SonarError::service("GetLogRecord", format!("Log record not found: {pointer}"))),
        }
    }

    async fn list_log_groups(&self, prefix: Option<&str>) -> Result<Vec<String>, SonarError> {
        self.record_call(MockCall::ListLogGroups(prefix.map(String::from)));
        if let Some(message) = self.log_groups_error.lock().clone() {
            return Err(SonarError::service("DescribeLogGroups", message));
        }
        Ok(self
            .log_groups
            .lock()
            .iter()
            .filter(|g| prefix.map_or(true, |p| g.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn describe_queries(&self) -> Result<Vec<QueryHistoryEntry>, SonarError> {
        self.record_call(MockCall::DescribeQueries);
        Ok(self.history.lock().clone())
    }
}

/// A status response without statistics or rows.
pub fn status_results(status: &str) -> QueryResults {
    QueryResults { status: status.to_string(), statistics: None, results: Vec::new() }
}

/// A `Running` status response with statistics.
pub fn running_results(matched: f64, scanned: f64, bytes: f64) -> QueryResults {
    QueryResults {
        status: "Running".to_string(),
        statistics: Some(QueryStatistics {
            records_matched: matched,
            records_scanned: scanned,
            bytes_scanned: bytes,
        }),
        results: Vec::new(),
    }
}

/// A `Complete` status response.
pub fn complete_results(statistics: QueryStatistics, rows: Vec<RawRow>) -> QueryResults {
    QueryResults { status: "Complete".to_string(), statistics: Some(statistics), results: rows }
}
