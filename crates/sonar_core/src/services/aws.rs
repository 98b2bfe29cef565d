//! CloudWatch Logs implementation of [`LogsInsightsService`] on the AWS SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatchlogs::config::Region;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatchlogs::Client;
use chrono::{DateTime, Utc};

use crate::config::ResolvedProfile;
use crate::error::SonarError;
use crate::models::{
    LogRecord, QueryHistoryEntry, QueryRequest, QueryResults, QueryStatistics, RawRow, ResultField,
};
use crate::services::LogsInsightsService;

/// Logs Insights client bound to one profile and region.
pub struct AwsLogsService {
    client: Client,
    profile: String,
    region: String,
}

impl AwsLogsService {
    /// Load credentials for the profile and build a client.
    pub async fn connect(profile: &ResolvedProfile) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&profile.name)
            .region(Region::new(profile.region.clone()));

        if let Some(endpoint) = &profile.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        tracing::debug!(
            profile = %profile.name,
            region = %profile.region,
            endpoint = ?profile.endpoint_url,
            "CloudWatch Logs client created"
        );

        Self {
            client: Client::new(&config),
            profile: profile.name.clone(),
            region: profile.region.clone(),
        }
    }

    /// Profile this client authenticates with.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Region this client talks to.
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// StartQuery takes epoch seconds; requests carry milliseconds.
fn epoch_seconds(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

fn service_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> SonarError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let context = DisplayErrorContext(&err).to_string();
    let message = err.message().map(String::from).unwrap_or_else(|| context.clone());
    tracing::warn!(operation, error = %context, "CloudWatch Logs call failed");
    SonarError::service(operation, message)
}

#[async_trait]
impl LogsInsightsService for AwsLogsService {
    async fn start_query(&self, request: &QueryRequest) -> Result<String, SonarError> {
        tracing::debug!(
            log_groups = ?request.log_group_names,
            start_time = request.start_time,
            end_time = request.end_time,
            "StartQuery"
        );

        let output = self
            .client
            .start_query()
            .set_log_group_names(Some(request.log_group_names.clone()))
            .start_time(epoch_seconds(request.start_time))
            .end_time(epoch_seconds(request.end_time))
            .query_string(request.query_string.as_str())
            .send()
            .await
            .map_err(|e| service_error("StartQuery", e))?;

        output
            .query_id()
            .map(String::from)
            .ok_or_else(|| SonarError::service("StartQuery", "StartQuery returned no query id"))
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults, SonarError> {
        let output = self
            .client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| service_error("GetQueryResults", e))?;

        let status = output.status().map(|s| s.as_str().to_string()).unwrap_or_default();

        let statistics = output.statistics().map(|s| QueryStatistics {
            records_matched: s.records_matched(),
            records_scanned: s.records_scanned(),
            bytes_scanned: s.bytes_scanned(),
        });

        let results: Vec<RawRow> = output
            .results()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|f| {
                        ResultField::new(
                            f.field().unwrap_or_default(),
                            f.value().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(query_id, %status, rows = results.len(), "GetQueryResults");

        Ok(QueryResults { status, statistics, results })
    }

    async fn stop_query(&self, query_id: &str) -> Result<(), SonarError> {
        tracing::debug!(query_id, "StopQuery");

        self.client
            .stop_query()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| service_error("StopQuery", e))?;

        Ok(())
    }

    async fn get_log_record(&self, pointer: &str) -> Result<LogRecord, SonarError> {
        let output = self
            .client
            .get_log_record()
            .log_record_pointer(pointer)
            .send()
            .await
            .map_err(|e| service_error("GetLogRecord", e))?;

        Ok(output
            .log_record()
            .map(|record| record.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn list_log_groups(&self, prefix: Option<&str>) -> Result<Vec<String>, SonarError> {
        let mut pages = self
            .client
            .describe_log_groups()
            .set_log_group_name_prefix(prefix.map(String::from))
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| service_error("DescribeLogGroups", e))?;
            names.extend(
                page.log_groups().iter().filter_map(|g| g.log_group_name().map(String::from)),
            );
        }

        tracing::debug!(count = names.len(), prefix = ?prefix, "DescribeLogGroups");
        Ok(names)
    }

    async fn describe_queries(&self) -> Result<Vec<QueryHistoryEntry>, SonarError> {
        let output = self
            .client
            .describe_queries()
            .send()
            .await
            .map_err(|e| service_error("DescribeQueries", e))?;

        let entries = output
            .queries()
            .iter()
            .map(|q| QueryHistoryEntry {
                query_id: q.query_id().unwrap_or_default().to_string(),
                query_string: q.query_string().unwrap_or_default().to_string(),
                status: q.status().map(|s| s.as_str().to_string()).unwrap_or_default(),
                created_at: q
                    .create_time()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .unwrap_or_else(Utc::now),
                log_group_name: q.log_group_name().map(String::from),
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = entries.len(), "DescribeQueries");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_seconds_truncates_millis() {
        assert_eq!(epoch_seconds(1_700_000_000_999), 1_700_000_000);
        assert_eq!(epoch_seconds(0), 0);
    }
}
