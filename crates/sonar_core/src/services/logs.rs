//! The logs service seam consumed by the poller, the expansion coordinator
//! and the controller.

use async_trait::async_trait;

use crate::error::SonarError;
use crate::models::{LogRecord, QueryHistoryEntry, QueryRequest, QueryResults};

/// Asynchronous CloudWatch Logs Insights operations.
///
/// Errors carry the service-provided message so it can be shown verbatim.
#[async_trait]
pub trait LogsInsightsService: Send + Sync {
    /// StartQuery. Returns the identifier of the new job.
    async fn start_query(&self, request: &QueryRequest) -> Result<String, SonarError>;

    /// GetQueryResults for a job.
    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults, SonarError>;

    /// StopQuery for a job.
    async fn stop_query(&self, query_id: &str) -> Result<(), SonarError>;

    /// GetLogRecord for one `@ptr` value.
    async fn get_log_record(&self, pointer: &str) -> Result<LogRecord, SonarError>;

    /// DescribeLogGroups, all pages, optionally filtered by name prefix.
    async fn list_log_groups(&self, prefix: Option<&str>) -> Result<Vec<String>, SonarError>;

    /// DescribeQueries: recently run jobs.
    async fn describe_queries(&self) -> Result<Vec<QueryHistoryEntry>, SonarError>;
}
