//! Error types for Sonar.
//!
//! Every failure in the query lifecycle maps to one variant here and is
//! reported to the user through the notifier, never as a panic.

use thiserror::Error;

/// Prefix of the StopQuery error returned when the job finished before the
/// stop request arrived.
pub const ALREADY_COMPLETE_PREFIX: &str = "Query is already ended with Complete";

/// Main error type for Sonar.
#[derive(Debug, Error)]
pub enum SonarError {
    /// Input rejected before any service call was made.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// StartQuery failed; no job was created.
    #[error("{message}")]
    Submission {
        /// Message reported by the query service.
        message: String,
    },

    /// GetQueryResults failed while a job was being polled.
    #[error("{message}")]
    Poll {
        /// Message reported by the query service.
        message: String,
        /// The job that was being polled.
        query_id: String,
    },

    /// The job reached a failing terminal state.
    #[error("Query status: {status}")]
    QueryFailed {
        /// Raw status string as reported by the service.
        status: String,
        /// The job that failed.
        query_id: String,
    },

    /// The job was cancelled by the user.
    #[error("Query cancelled")]
    QueryCancelled {
        /// ID of the cancelled job.
        query_id: String,
    },

    /// GetLogRecord failed for an expanded row.
    #[error("{message}")]
    DetailFetch {
        /// Message reported by the query service.
        message: String,
    },

    /// Raw error from a logs service call.
    #[error("{message}")]
    Service {
        /// Service operation name (e.g. "StartQuery").
        operation: &'static str,
        /// Message reported by the service.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local SQLite storage error.
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SonarError {
    // ========== Constructors ==========

    /// Create a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a new submission error.
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission { message: message.into() }
    }

    /// Create a new poll error.
    pub fn poll(message: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self::Poll { message: message.into(), query_id: query_id.into() }
    }

    /// Create a terminal failure error.
    pub fn query_failed(status: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self::QueryFailed { status: status.into(), query_id: query_id.into() }
    }

    /// Create a query cancelled error.
    pub fn query_cancelled(query_id: impl Into<String>) -> Self {
        Self::QueryCancelled { query_id: query_id.into() }
    }

    /// Create a detail fetch error.
    pub fn detail_fetch(message: impl Into<String>) -> Self {
        Self::DetailFetch { message: message.into() }
    }

    /// Create a new service error.
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service { operation, message: message.into(), source: None }
    }

    /// Create a new service error with source.
    pub fn service_with_source(
        operation: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Service { operation, message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new storage error.
    pub fn storage(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Storage { message: message.into(), hint: hint.map(String::from), source: None }
    }

    /// Create a new storage error with source.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage { message: message.into(), hint: None, source: Some(Box::new(source)) }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    // ========== Methods ==========

    /// The bare message, without any category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Storage { message, .. }
            | Self::Config { message }
            | Self::Internal { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if this error represents a cancelled query.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::QueryCancelled { .. })
    }

    /// Check if this is the benign StopQuery race where the job had already
    /// completed.
    pub fn is_already_complete(&self) -> bool {
        match self {
            Self::Service { message, .. } => message.starts_with(ALREADY_COMPLETE_PREFIX),
            _ => false,
        }
    }

    /// Query id this error belongs to, if any.
    pub fn query_id(&self) -> Option<&str> {
        match self {
            Self::Poll { query_id, .. }
            | Self::QueryFailed { query_id, .. }
            | Self::QueryCancelled { query_id } => Some(query_id),
            _ => None,
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Validation",
            Self::Submission { .. } => "Submission",
            Self::Poll { .. } => "Poll",
            Self::QueryFailed { .. } => "Query",
            Self::QueryCancelled { .. } => "Query",
            Self::DetailFetch { .. } => "Log Record",
            Self::Service { .. } => "Service",
            Self::Storage { .. } => "Storage",
            Self::Config { .. } => "Config",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => None,
            Self::Submission { .. } => Some("Check the query syntax and the selected log groups"),
            Self::Poll { .. } => Some("Run the query again"),
            Self::QueryFailed { .. } => Some("Narrow the time range or simplify the query"),
            Self::QueryCancelled { .. } => None,
            Self::DetailFetch { .. } => None,
            Self::Service { .. } => Some("Check the AWS profile and region"),
            Self::Storage { hint, .. } => hint.as_deref(),
            Self::Config { .. } => Some("Check the configuration file"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::Poll { query_id, .. } | Self::QueryFailed { query_id, .. } => {
                Some(format!("Query ID: {query_id}"))
            }
            Self::Service { operation, .. } => Some(format!("Operation: {operation}")),
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Category name (e.g., "Poll Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail for "Show Details" expansion.
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from rusqlite::Error to SonarError.
impl From<rusqlite::Error> for SonarError {
    fn from(err: rusqlite::Error) -> Self {
        SonarError::Storage {
            message: err.to_string(),
            hint: Some("The local database may be corrupted".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from std::io::Error to SonarError.
impl From<std::io::Error> for SonarError {
    fn from(err: std::io::Error) -> Self {
        SonarError::Storage {
            message: err.to_string(),
            hint: Some("Check file permissions and disk space".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from serde_json::Error to SonarError.
impl From<serde_json::Error> for SonarError {
    fn from(err: serde_json::Error) -> Self {
        SonarError::Storage {
            message: format!("JSON error: {err}"),
            hint: Some("Data may be corrupted".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from toml::de::Error to SonarError.
impl From<toml::de::Error> for SonarError {
    fn from(err: toml::de::Error) -> Self {
        SonarError::Config { message: err.to_string() }
    }
}
