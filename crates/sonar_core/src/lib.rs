//! Core types and services for Sonar, a CloudWatch Logs Insights client.
//!
//! This crate provides the backend layer:
//!
//! - **error**: Error handling with user-facing categories and hints
//! - **models**: Query lifecycle, time ranges, history and saved queries
//! - **services**: Logs service seam, AWS implementation, poller, storage
//! - **config**: TOML configuration and AWS profile resolution
//! - **state**: Application state and client cache
//! - **logging**: Structured logging setup

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(test)]
mod verification_tests;

pub use config::{ProfileConfig, ResolvedProfile, SonarConfig};
pub use error::{ErrorInfo, SonarError};
pub use models::{
    CancelOutcome, LastRun, LogRecord, QueryHandle, QueryHistoryEntry, QueryOutcome, QueryRequest,
    QueryResults, QueryRunStatus, QueryState, QueryStatistics, RawRow, ResolvedTimeRange,
    ResultField, SavedQuery, StatusKind, TimeRange, TimeUnit,
};
pub use services::{AwsLogsService, LocalStorage, LogsInsightsService, QueryPoller};
pub use state::SonarState;
