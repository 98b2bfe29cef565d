//! Query history models.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::QueryState;

/// `SOURCE "<group>" START=<t> END=<t>` stage the service prepends to stored queries.
fn source_regex() -> Option<&'static Regex> {
    static SOURCE: OnceLock<Option<Regex>> = OnceLock::new();
    SOURCE
        .get_or_init(|| Regex::new(r#"SOURCE\s+"([^"]+)"\s+START=(\S+)\s+END=(\S+)"#).ok())
        .as_ref()
}

/// Record of a previously executed query, as reported by DescribeQueries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    /// Service-assigned job identifier
    pub query_id: String,
    /// The query text as stored by the service, including SOURCE stages
    pub query_string: String,
    /// Raw status string
    pub status: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Log group reported for the job, if any
    pub log_group_name: Option<String>,
}

impl QueryHistoryEntry {
    /// Classified status.
    pub fn state(&self) -> QueryState {
        QueryState::parse(&self.status)
    }

    /// Check if this entry represents a successful query.
    pub fn is_success(&self) -> bool {
        self.state() == QueryState::Complete
    }

    /// Log groups named by the SOURCE stages, comma-joined.
    pub fn log_group_names(&self) -> String {
        self.stages()
            .filter(|stage| stage.trim().starts_with("SOURCE"))
            .filter_map(|stage| {
                source_regex()?
                    .captures(stage)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The query text with SOURCE stages removed.
    pub fn query_without_source(&self) -> String {
        let stages: Vec<&str> = self.stages().collect();
        if stages.len() <= 1 {
            return self.query_string.clone();
        }
        stages
            .into_iter()
            .filter(|stage| !stage.trim().starts_with("SOURCE"))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn stages(&self) -> impl Iterator<Item = &str> {
        let empty = self.query_string.is_empty();
        self.query_string.split('|').filter(move |_| !empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str, status: &str) -> QueryHistoryEntry {
        QueryHistoryEntry {
            query_id: "q1".into(),
            query_string: query.into(),
            status: status.into(),
            created_at: Utc::now(),
            log_group_name: None,
        }
    }

    #[test]
    fn test_source_stages_are_parsed() {
        let e = entry(
            "SOURCE \"/app/api\" START=1700000000 END=1700000300| SOURCE \"/app/worker\" START=1 END=2| fields @message | limit 20",
            "Complete",
        );
        assert_eq!(e.log_group_names(), "/app/api, /app/worker");
        assert_eq!(e.query_without_source(), " fields @message | limit 20");
        assert!(e.is_success());
    }

    #[test]
    fn test_query_without_pipes_is_kept() {
        let e = entry("fields @message", "Failed");
        assert_eq!(e.log_group_names(), "");
        assert_eq!(e.query_without_source(), "fields @message");
        assert!(!e.is_success());
    }

    #[test]
    fn test_empty_query() {
        let e = entry("", "Running");
        assert_eq!(e.log_group_names(), "");
        assert_eq!(e.query_without_source(), "");
    }
}
