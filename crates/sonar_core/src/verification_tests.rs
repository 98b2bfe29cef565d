//! Verification tests for the query lifecycle.
//!
//! These tests drive a full run through the poller against the scripted
//! service and check the observable contract:
//! - Validation order and messages before any service call
//! - Poll cadence and call counts for a multi-poll job
//! - Banner snapshots for completion and failure
//! - Single active job, cancellation and the completion race
//! - Error categories and hints for every user-facing failure

#[cfg(test)]
mod tests {
    use crate::error::SonarError;
    use crate::models::{
        CancelOutcome, QueryOutcome, QueryRequest, QueryStatistics, ResolvedTimeRange,
        ResultField, StatusKind, TimeRange, TimeUnit, POLL_INTERVAL_SECS,
    };
    use crate::services::QueryPoller;
    use crate::testing::{complete_results, running_results, status_results, MockCall, MockLogsService};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn five_minutes() -> ResolvedTimeRange {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        TimeRange::Relative { amount: 5, unit: TimeUnit::Minute }.resolve(now)
    }

    // =========================================================================
    // Validation happens before submission
    // =========================================================================

    #[test]
    fn test_empty_log_groups_are_rejected_before_submission() {
        let err = QueryRequest::new(Vec::new(), five_minutes(), "fields @message").unwrap_err();
        assert!(matches!(err, SonarError::Validation { .. }));
        assert_eq!(err.to_string(), "Select at least one log group.");
    }

    #[test]
    fn test_date_range_is_checked_before_log_groups() {
        let incomplete = TimeRange::Absolute { start: None, end: None }.resolve(Utc::now());
        let err = QueryRequest::new(Vec::new(), incomplete, "fields @message").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date range.");
    }

    #[test]
    fn test_relative_range_resolves_to_milliseconds() {
        let range = five_minutes();
        let request = QueryRequest::new(vec!["/app/api".into()], range, "fields @message").unwrap();
        assert_eq!(request.end_time - request.start_time, 5 * 60 * 1000);
    }

    // =========================================================================
    // End-to-end run
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_full_run_polls_three_times() {
        let mock = Arc::new(MockLogsService::new());
        mock.push_start_id("q-42");
        mock.push_status(status_results("Scheduled"));
        mock.push_status(running_results(10.0, 1000.0, 51_200.0));
        mock.push_status(complete_results(
            QueryStatistics { records_matched: 2.0, records_scanned: 2000.0, bytes_scanned: 102_400.0 },
            vec![
                vec![ResultField::new("@timestamp", "2024-03-01 11:59:00"), ResultField::new("@message", "a")],
                vec![ResultField::new("@timestamp", "2024-03-01 11:58:00"), ResultField::new("@message", "b")],
            ],
        ));
        let poller = QueryPoller::new(mock.clone());

        let request = QueryRequest::new(vec!["/app/api".into()], five_minutes(), "fields @message").unwrap();
        let outcome = poller.run(request.clone()).await.unwrap();

        let QueryOutcome::Complete { query_id, rows, statistics } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(query_id, "q-42");
        assert_eq!(rows.len(), 2);
        assert_eq!(statistics.records_matched, 2.0);

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::StartQuery(request),
                MockCall::GetQueryResults("q-42".into()),
                MockCall::GetQueryResults("q-42".into()),
                MockCall::GetQueryResults("q-42".into()),
            ]
        );

        let banner = poller.status().unwrap();
        assert_eq!(banner.status, "Complete");
        assert_eq!(banner.kind, StatusKind::Success);
        assert_eq!(banner.bytes, 102_400.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_failure_status_ends_with_zeroed_banner() {
        for status in ["Failed", "Cancelled", "Timeout", "Unknown", "SomethingNew"] {
            let mock = Arc::new(MockLogsService::new());
            mock.push_status(running_results(7.0, 70.0, 700.0));
            mock.push_status(status_results(status));
            let poller = QueryPoller::new(mock.clone());

            let request =
                QueryRequest::new(vec!["/app/api".into()], five_minutes(), "fields @message").unwrap();
            let err = poller.run(request).await.unwrap_err();
            assert_eq!(err.to_string(), format!("Query status: {status}"));

            let banner = poller.status().unwrap();
            assert_eq!(banner.status, status);
            assert_eq!(banner.kind, StatusKind::Error);
            assert_eq!((banner.matches, banner.scanned, banner.bytes), (0.0, 0.0, 0.0));
            assert_eq!(poller.active_query_id(), None);
        }
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_within_one_tick() {
        let mock = Arc::new(MockLogsService::new());
        let poller = Arc::new(QueryPoller::new(mock.clone()));

        let request = QueryRequest::new(vec!["/app/api".into()], five_minutes(), "fields @message").unwrap();
        let task = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run(request).await }
        });

        tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS * 2 + 3)).await;
        assert_eq!(mock.status_calls(), 3);

        let stopped = poller.cancel().await.unwrap();
        assert!(matches!(stopped, CancelOutcome::Stopped { .. }));

        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, QueryOutcome::Cancelled { .. }));

        tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS * 3)).await;
        assert_eq!(mock.status_calls(), 3, "no polls after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_allowed_after_cancel() {
        let mock = Arc::new(MockLogsService::new());
        let poller = Arc::new(QueryPoller::new(mock.clone()));

        let request = QueryRequest::new(vec!["/app/api".into()], five_minutes(), "fields @message").unwrap();
        let first = tokio::spawn({
            let poller = poller.clone();
            let request = request.clone();
            async move { poller.run(request).await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        poller.cancel().await.unwrap();
        first.await.unwrap().unwrap();

        mock.push_status(complete_results(QueryStatistics::zero(), Vec::new()));
        let outcome = poller.run(request).await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Complete { .. }));
        assert_eq!(mock.start_calls(), 2);
    }

    // =========================================================================
    // Every user-facing error has a category and, where useful, a hint
    // =========================================================================

    #[test]
    fn test_error_scenarios_have_categories_and_hints() {
        let scenarios = vec![
            (SonarError::validation("Invalid date range."), "Validation", false),
            (SonarError::submission("MalformedQueryException"), "Submission", true),
            (SonarError::poll("Rate exceeded", "q1"), "Poll", true),
            (SonarError::query_failed("Timeout", "q1"), "Query", true),
            (SonarError::detail_fetch("Log record not found"), "Log Record", false),
            (SonarError::service("StopQuery", "Access denied"), "Service", true),
            (SonarError::config("bad file"), "Config", true),
            (SonarError::internal("oops"), "Internal", true),
        ];

        for (err, category, has_hint) in scenarios {
            assert_eq!(err.category(), category);
            assert_eq!(err.hint().is_some(), has_hint, "hint mismatch for {category}");
            let info = err.to_error_info();
            assert_eq!(info.error_type, format!("{category} Error"));
            assert!(!info.message.is_empty());
        }
    }
}
