//! Backend services for Sonar.
//!
//! This module contains all service layer abstractions:
//! - `logs` - The Logs Insights service trait
//! - `aws` - CloudWatch Logs implementation on the AWS SDK
//! - `poller` - Query submission, status polling and cancellation
//! - `storage` - Local SQLite storage for saved queries and UI state

pub mod aws;
pub mod logs;
pub mod poller;
pub mod storage;

pub use aws::AwsLogsService;
pub use logs::LogsInsightsService;
pub use poller::QueryPoller;
pub use storage::LocalStorage;
