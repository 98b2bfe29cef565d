//! The Logs Insights screen controller.
//!
//! Owns the editor text, log group selection, time range, results and
//! drawers, and drives runs through [`QueryPoller`]. Everything it needs from
//! the outside is injected: the logs service, a notifier, a drawer host and
//! local storage. Errors never escape as panics; each one becomes a toast at
//! the point it is detected.

use crate::drawer::{DrawerHost, DrawerId};
use crate::expansion::{DetailState, ExpansionCoordinator};
use crate::panels::{
    HistoryItem, HistoryPanel, LogGroupPicker, PickerStatus, ProjectedResults, ResultsState,
    SavedQueriesPanel, SavedQueryForm,
};
use crate::query_editor::{format_query, DEFAULT_QUERY};
use crate::status_bar::banner_text;
use crate::toast::{Notifier, Toast};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sonar_core::{
    CancelOutcome, LastRun, LocalStorage, LogsInsightsService, QueryOutcome, QueryPoller,
    QueryRequest, QueryRunStatus, SavedQuery, SonarError, TimeRange,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Drawers this screen contributes.
pub const INSIGHTS_DRAWERS: [DrawerId; 2] = [DrawerId::History, DrawerId::SavedQueries];

#[derive(Debug)]
struct ViewState {
    query: String,
    time_range: TimeRange,
    picker: LogGroupPicker,
    history: HistoryPanel,
    results: ProjectedResults,
    results_state: ResultsState,
    /// Log group of the run that produced `results`, when it had exactly one.
    results_log_group: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            time_range: TimeRange::default(),
            picker: LogGroupPicker::new(),
            history: HistoryPanel::new(),
            results: ProjectedResults::default(),
            results_state: ResultsState::Empty,
            results_log_group: None,
        }
    }
}

/// Root controller of the Logs Insights screen.
pub struct LogInsightsController {
    service: Arc<dyn LogsInsightsService>,
    poller: QueryPoller,
    notifier: Arc<dyn Notifier>,
    drawers: Arc<dyn DrawerHost>,
    storage: Arc<LocalStorage>,
    saved: Mutex<SavedQueriesPanel>,
    expansion: ExpansionCoordinator,
    view: Mutex<ViewState>,
}

impl LogInsightsController {
    /// Create the controller and register its drawers.
    pub fn new(
        service: Arc<dyn LogsInsightsService>,
        notifier: Arc<dyn Notifier>,
        drawers: Arc<dyn DrawerHost>,
        storage: Arc<LocalStorage>,
    ) -> Self {
        drawers.register(&INSIGHTS_DRAWERS);

        Self {
            poller: QueryPoller::new(service.clone()),
            expansion: ExpansionCoordinator::new(service.clone(), notifier.clone()),
            saved: Mutex::new(SavedQueriesPanel::new(storage.clone())),
            service,
            notifier,
            drawers,
            storage,
            view: Mutex::new(ViewState::default()),
        }
    }

    // ========== Editor ==========

    pub fn query(&self) -> String {
        self.view.lock().query.clone()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.view.lock().query = query.into();
    }

    /// Put every pipeline stage of the editor text on its own line.
    pub fn format_query(&self) {
        let mut view = self.view.lock();
        view.query = format_query(&view.query);
    }

    pub fn time_range(&self) -> TimeRange {
        self.view.lock().time_range.clone()
    }

    pub fn set_time_range(&self, range: TimeRange) {
        self.view.lock().time_range = range;
    }

    // ========== Log groups ==========

    /// Fetch the log group options.
    pub async fn load_log_groups(&self, prefix: Option<&str>) -> Result<Vec<String>, SonarError> {
        self.view.lock().picker.set_loading();

        match self.service.list_log_groups(prefix).await {
            Ok(groups) => {
                tracing::debug!(count = groups.len(), "Log groups loaded");
                self.view.lock().picker.set_options(groups.clone());
                Ok(groups)
            }
            Err(err) => {
                self.view.lock().picker.set_error(err.message());
                self.notifier.notify(Toast::from_error(&err));
                Err(err)
            }
        }
    }

    pub fn log_group_options(&self) -> Vec<String> {
        self.view.lock().picker.options().to_vec()
    }

    pub fn picker_status(&self) -> PickerStatus {
        self.view.lock().picker.status().clone()
    }

    pub fn selected_log_groups(&self) -> Vec<String> {
        self.view.lock().picker.selected().to_vec()
    }

    pub fn select_log_group(&self, name: impl Into<String>) -> bool {
        self.view.lock().picker.select(name)
    }

    pub fn deselect_log_group(&self, name: &str) -> bool {
        self.view.lock().picker.deselect(name)
    }

    pub fn set_log_groups(&self, names: Vec<String>) {
        self.view.lock().picker.set_selected(names);
    }

    pub fn clear_log_groups(&self) {
        self.view.lock().picker.clear_selection();
    }

    // ========== Run / cancel ==========

    /// Check if the run action is enabled.
    pub fn can_run(&self) -> bool {
        !self.poller.is_running()
    }

    /// Check if the cancel action is enabled.
    pub fn can_cancel(&self) -> bool {
        self.poller.active_query_id().is_some()
    }

    /// Id of the job being polled.
    pub fn active_query_id(&self) -> Option<String> {
        self.poller.active_query_id()
    }

    /// Run the editor query against the selected log groups.
    ///
    /// Returns [`QueryOutcome::Rejected`] while another run is active.
    /// Validation and service errors are shown as toasts and also returned.
    pub async fn run(&self) -> Result<QueryOutcome, SonarError> {
        if !self.can_run() {
            return Ok(QueryOutcome::Rejected);
        }

        let (query, log_groups, time_range) = {
            let view = self.view.lock();
            (view.query.clone(), view.picker.selected().to_vec(), view.time_range.clone())
        };

        let request = match QueryRequest::new(log_groups.clone(), time_range.resolve(Utc::now()), query.clone()) {
            Ok(request) => request,
            Err(err) => {
                self.notifier.notify(Toast::from_error(&err));
                return Err(err);
            }
        };

        let previous = {
            let mut view = self.view.lock();
            std::mem::replace(&mut view.results_state, ResultsState::Loading)
        };
        self.remember_last_run(LastRun { query, log_groups: log_groups.clone(), time_range });

        let started = tokio::time::Instant::now();
        let result = self.poller.run(request).await;
        let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        match &result {
            Ok(QueryOutcome::Complete { rows, .. }) => {
                let projected = ProjectedResults::project(rows);
                {
                    let mut view = self.view.lock();
                    view.results_state = ResultsState::Success { row_count: projected.rows.len(), elapsed_ms };
                    view.results_log_group = match log_groups.as_slice() {
                        [only] => Some(only.clone()),
                        _ => None,
                    };
                    view.results = projected.clone();
                }
                self.expansion.refresh(&projected);
            }
            Ok(QueryOutcome::Cancelled { .. }) | Ok(QueryOutcome::Rejected) => {
                self.view.lock().results_state = previous;
            }
            Err(err) => {
                self.notifier.notify(Toast::from_error(err));
                self.view.lock().results_state = ResultsState::Error { message: err.to_string() };
            }
        }

        result
    }

    /// Stop the active run.
    pub async fn cancel(&self) -> Result<CancelOutcome, SonarError> {
        let outcome = self.poller.cancel().await;
        match &outcome {
            Ok(CancelOutcome::AlreadyComplete { message, .. }) => {
                self.notifier.notify(Toast::info(message.clone()));
            }
            Ok(CancelOutcome::Stopped { query_id }) => {
                tracing::debug!(query_id = %query_id, "Run cancelled");
            }
            Ok(CancelOutcome::NoActiveQuery) => {}
            Err(err) => self.notifier.notify(Toast::from_error(err)),
        }
        outcome
    }

    /// Latest status snapshot.
    pub fn status(&self) -> Option<QueryRunStatus> {
        self.poller.status()
    }

    /// Banner text for the latest status snapshot.
    pub fn status_banner(&self) -> Option<String> {
        self.poller.status().as_ref().map(banner_text)
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Option<QueryRunStatus>> {
        self.poller.subscribe_status()
    }

    // ========== Results ==========

    pub fn results(&self) -> ProjectedResults {
        self.view.lock().results.clone()
    }

    pub fn results_state(&self) -> ResultsState {
        self.view.lock().results_state.clone()
    }

    /// Log group that stream links point into, if the last run had exactly one.
    pub fn results_log_group(&self) -> Option<String> {
        self.view.lock().results_log_group.clone()
    }

    /// Expand or collapse one row.
    pub fn toggle_row(&self, id: &str) -> Option<JoinHandle<()>> {
        let row = self.view.lock().results.row(id).cloned()?;
        self.expansion.toggle_row(&row)
    }

    /// Expand or collapse every row.
    pub fn toggle_all(&self) -> Vec<JoinHandle<()>> {
        let results = self.view.lock().results.clone();
        self.expansion.toggle_all(&results)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expansion.is_expanded(id)
    }

    pub fn detail(&self, id: &str) -> Option<DetailState> {
        self.expansion.detail(id)
    }

    /// Plain-text rendering of the results table.
    pub fn render_results(&self, max_width: usize) -> String {
        let results = self.view.lock().results.clone();
        results.render_text(max_width, |id| self.expansion.is_expanded(id))
    }

    // ========== Drawers ==========

    /// Open a drawer, or close it when it is already open.
    pub fn toggle_drawer(&self, drawer: DrawerId) -> Option<DrawerId> {
        let next = if self.drawers.active() == Some(drawer) { None } else { Some(drawer) };
        self.drawers.set_active(next);
        self.drawers.active()
    }

    /// Fetch recent queries for the history drawer.
    pub async fn load_history(&self) -> Result<Vec<HistoryItem>, SonarError> {
        self.view.lock().history.set_loading();

        match self.service.describe_queries().await {
            Ok(entries) => {
                let mut view = self.view.lock();
                view.history.set_entries(entries);
                Ok(view.history.items(Utc::now()))
            }
            Err(err) => {
                self.view.lock().history.set_error(err.message());
                self.notifier.notify(Toast::from_error(&err));
                Err(err)
            }
        }
    }

    pub fn history_items(&self, now: DateTime<Utc>) -> Vec<HistoryItem> {
        self.view.lock().history.items(now)
    }

    /// Load a history entry into the editor.
    pub fn apply_history(&self, query_id: &str) -> bool {
        let mut view = self.view.lock();
        let Some(entry) = view.history.find(query_id).cloned() else {
            return false;
        };
        view.query = entry.query_without_source().trim().to_string();
        let groups: Vec<String> = entry
            .log_group_names()
            .split(", ")
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect();
        if !groups.is_empty() {
            view.picker.set_selected(groups);
        }
        true
    }

    // ========== Saved queries ==========

    /// Saved queries matching `filter`. Storage errors are shown and yield
    /// an empty list.
    pub fn saved_queries(&self, filter: &str) -> Vec<SavedQuery> {
        let mut saved = self.saved.lock();
        saved.set_filter(filter);
        match saved.list() {
            Ok(list) => list,
            Err(err) => {
                self.notifier.notify(Toast::from_error(&err));
                Vec::new()
            }
        }
    }

    /// Save the editor text and selection under `name`.
    pub fn save_current_query(&self, name: &str, existing: Option<Uuid>) -> Result<SavedQuery, SonarError> {
        let form = {
            let view = self.view.lock();
            SavedQueryForm {
                name: name.to_string(),
                query: view.query.clone(),
                log_groups: view.picker.selected().to_vec(),
            }
        };

        match self.saved.lock().save(&form, existing) {
            Ok(saved) => {
                self.notifier.notify(Toast::success(format!("Saved query '{}'", saved.name)));
                Ok(saved)
            }
            Err(err) => {
                self.notifier.notify(Toast::from_error(&err));
                Err(err)
            }
        }
    }

    pub fn delete_saved_query(&self, id: Uuid) -> Result<bool, SonarError> {
        self.saved.lock().delete(id).inspect_err(|err| self.notifier.notify(Toast::from_error(err)))
    }

    /// Find a saved query by id or exact name.
    pub fn find_saved_query(&self, id_or_name: &str) -> Result<Option<SavedQuery>, SonarError> {
        self.saved.lock().resolve(id_or_name)
    }

    /// Set the editor text and selection from a saved query.
    pub fn apply_saved_query(&self, saved: &SavedQuery) {
        let mut view = self.view.lock();
        view.query = saved.query.clone();
        view.picker.set_selected(saved.log_groups.clone());
    }

    // ========== Session ==========

    fn remember_last_run(&self, last_run: LastRun) {
        if let Err(err) = self.storage.save_last_run(&last_run) {
            tracing::warn!(error = %err, "Failed to store last run");
        }
    }

    /// Restore the editor inputs of the previous run. Returns false when
    /// nothing was stored.
    pub fn restore_last_run(&self) -> bool {
        match self.storage.load_last_run() {
            Ok(Some(last)) => {
                let mut view = self.view.lock();
                view.query = last.query;
                view.picker.set_selected(last.log_groups);
                view.time_range = last.time_range;
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load last run");
                false
            }
        }
    }
}

impl Drop for LogInsightsController {
    fn drop(&mut self) {
        self.drawers.unregister(&INSIGHTS_DRAWERS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawer::DrawerDock;
    use crate::toast::{NotificationCenter, ToastSeverity};
    use sonar_core::testing::{complete_results, running_results, status_results, MockLogsService};
    use sonar_core::{LogRecord, QueryStatistics, ResultField, StatusKind, TimeUnit};
    use std::time::Duration;

    struct Harness {
        mock: Arc<MockLogsService>,
        center: Arc<NotificationCenter>,
        dock: Arc<DrawerDock>,
        controller: Arc<LogInsightsController>,
    }

    fn harness() -> Harness {
        let mock = Arc::new(MockLogsService::new());
        let center = Arc::new(NotificationCenter::new());
        let dock = Arc::new(DrawerDock::new());
        let storage = Arc::new(LocalStorage::open_in_memory().unwrap());
        let controller = Arc::new(LogInsightsController::new(
            mock.clone(),
            center.clone(),
            dock.clone(),
            storage,
        ));
        Harness { mock, center, dock, controller }
    }

    fn error_toasts(center: &NotificationCenter) -> Vec<String> {
        center
            .active()
            .into_iter()
            .filter(|t| t.toast.severity == ToastSeverity::Error)
            .map(|t| t.toast.message)
            .collect()
    }

    #[tokio::test]
    async fn test_run_without_log_groups_notifies_and_skips_service() {
        let h = harness();
        let err = h.controller.run().await.unwrap_err();
        assert!(matches!(err, SonarError::Validation { .. }));
        assert_eq!(error_toasts(&h.center), vec!["Select at least one log group."]);
        assert_eq!(h.mock.start_calls(), 0);
        assert_eq!(h.controller.results_state(), ResultsState::Empty);
    }

    #[tokio::test]
    async fn test_incomplete_absolute_range_is_rejected() {
        let h = harness();
        h.controller.select_log_group("/app/api");
        h.controller.set_time_range(TimeRange::Absolute { start: Some(Utc::now()), end: None });
        let err = h.controller.run().await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid date range.");
        assert_eq!(h.mock.start_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_run_projects_results() {
        let h = harness();
        h.mock.push_start_id("q1");
        h.mock.push_status(running_results(0.0, 120.0, 4096.0));
        h.mock.push_status(complete_results(
            QueryStatistics { records_matched: 2.0, records_scanned: 240.0, bytes_scanned: 8192.0 },
            vec![
                vec![
                    ResultField::new("@timestamp", "2024-01-01T00:00:00"),
                    ResultField::new("@message", "ok"),
                ],
                vec![
                    ResultField::new("@timestamp", "2024-01-01T00:00:01"),
                    ResultField::new("@message", "error"),
                ],
            ],
        ));

        h.controller.select_log_group("/app/api");
        h.controller.set_query("fields @timestamp, @message | limit 20");
        h.controller.set_time_range(TimeRange::Relative { amount: 5, unit: TimeUnit::Minute });

        let outcome = h.controller.run().await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Complete { ref query_id, .. } if query_id == "q1"));
        assert_eq!(h.mock.status_calls(), 2);

        let results = h.controller.results();
        let keys: Vec<_> = results.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["select", "@timestamp", "@message"]);
        assert_eq!(results.row_ids(), vec!["1", "2"]);

        let ResultsState::Success { row_count, elapsed_ms } = h.controller.results_state() else {
            panic!("expected success state");
        };
        assert_eq!(row_count, 2);
        assert!(elapsed_ms >= 10_000);

        let status = h.controller.status().unwrap();
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(
            h.controller.status_banner().unwrap(),
            "Query stats: status: Complete, matches: 2, scanned: 240, bytes: 8.00 KB."
        );
        assert_eq!(h.controller.results_log_group().as_deref(), Some("/app/api"));
        assert!(h.center.active().is_empty());

        // Row 2 has no pointer: expansion opens it without a fetch.
        assert!(h.controller.toggle_row("2").is_none());
        assert!(h.controller.is_expanded("2"));
        assert_eq!(h.controller.detail("2"), None);
        assert_eq!(h.mock.record_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_notifies_with_status() {
        let h = harness();
        h.mock.push_status(status_results("Failed"));
        h.controller.select_log_group("/app/api");

        let err = h.controller.run().await.unwrap_err();
        assert_eq!(err.to_string(), "Query status: Failed");
        assert_eq!(error_toasts(&h.center), vec!["Query status: Failed"]);
        assert_eq!(h.controller.active_query_id(), None);
        assert!(h.controller.can_run());

        let status = h.controller.status().unwrap();
        assert_eq!((status.matches, status.scanned, status.bytes), (0.0, 0.0, 0.0));
        assert_eq!(
            h.controller.results_state(),
            ResultsState::Error { message: "Query status: Failed".into() }
        );
    }

    #[tokio::test]
    async fn test_submission_error_is_shown() {
        let h = harness();
        h.mock.push_start_error("MalformedQueryException: unexpected symbol");
        h.controller.select_log_group("/app/api");

        let err = h.controller.run().await.unwrap_err();
        assert!(matches!(err, SonarError::Submission { .. }));
        assert_eq!(error_toasts(&h.center), vec!["MalformedQueryException: unexpected symbol"]);
        assert!(h.controller.can_run());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_rejected_and_cancel_restores() {
        let h = harness();
        h.controller.select_log_group("/app/api");

        let first = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.run().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!h.controller.can_run());
        assert!(h.controller.can_cancel());
        assert_eq!(h.controller.results_state(), ResultsState::Loading);
        assert_eq!(h.controller.run().await.unwrap(), QueryOutcome::Rejected);
        assert_eq!(h.mock.start_calls(), 1);

        let stopped = h.controller.cancel().await.unwrap();
        assert!(matches!(stopped, CancelOutcome::Stopped { .. }));
        assert!(matches!(first.await.unwrap().unwrap(), QueryOutcome::Cancelled { .. }));
        assert_eq!(h.controller.results_state(), ResultsState::Empty);
        assert!(h.center.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_race_is_informational() {
        let h = harness();
        h.controller.select_log_group("/app/api");
        h.mock.push_stop_error("Query is already ended with Complete at 2024-01-01T00:00:10Z");

        let run = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.run().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.mock.push_status(complete_results(
            QueryStatistics::zero(),
            vec![vec![ResultField::new("@message", "late")]],
        ));
        h.mock.set_status_delay(Duration::from_secs(3));

        let outcome = h.controller.cancel().await.unwrap();
        assert!(matches!(outcome, CancelOutcome::AlreadyComplete { .. }));
        assert_eq!(h.controller.active_query_id(), None);

        // Busy until the final poll lands; a new run cannot start a second loop.
        assert!(!h.controller.can_run());
        assert!(!h.controller.can_cancel());
        assert_eq!(h.controller.run().await.unwrap(), QueryOutcome::Rejected);
        assert_eq!(h.mock.start_calls(), 1);
        assert_eq!(h.controller.results_state(), ResultsState::Loading);

        assert!(error_toasts(&h.center).is_empty());
        let toasts = h.center.active();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].toast.severity, ToastSeverity::Info);

        assert!(matches!(run.await.unwrap().unwrap(), QueryOutcome::Complete { .. }));
        assert!(h.controller.can_run());
        assert!(matches!(h.controller.results_state(), ResultsState::Success { row_count: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancel_without_active_run_is_noop() {
        let h = harness();
        assert_eq!(h.controller.cancel().await.unwrap(), CancelOutcome::NoActiveQuery);
        assert_eq!(h.mock.stop_calls(), 0);
        assert!(h.center.active().is_empty());
    }

    #[tokio::test]
    async fn test_expand_row_with_pointer_fetches_record() {
        let h = harness();
        h.mock.push_status(complete_results(
            QueryStatistics::zero(),
            vec![vec![ResultField::new("@message", "boom"), ResultField::new("@ptr", "p1")]],
        ));
        let record = LogRecord::from([("@message".to_string(), "boom".to_string())]);
        h.mock.set_record("p1", record.clone());
        h.controller.select_log_group("/app/api");
        h.controller.run().await.unwrap();

        h.controller.toggle_row("1").unwrap().await.unwrap();
        assert_eq!(h.controller.detail("1"), Some(DetailState::Loaded(record)));
        assert!(h.controller.render_results(40).contains("v 1"));
        assert!(h.controller.toggle_row("99").is_none());
    }

    #[tokio::test]
    async fn test_log_groups_load_and_error() {
        let h = harness();
        h.mock.set_log_groups(vec!["/app/api".into(), "/aws/lambda/fn".into()]);
        let groups = h.controller.load_log_groups(Some("/app")).await.unwrap();
        assert_eq!(groups, vec!["/app/api"]);
        assert_eq!(h.controller.picker_status(), PickerStatus::Finished);

        h.mock.set_log_groups_error("Rate exceeded");
        assert!(h.controller.load_log_groups(None).await.is_err());
        assert_eq!(h.controller.picker_status(), PickerStatus::Error("Rate exceeded".into()));
        assert_eq!(error_toasts(&h.center), vec!["Rate exceeded"]);
        assert_eq!(h.controller.log_group_options(), vec!["/app/api"]);
    }

    #[test]
    fn test_drawers_registered_for_controller_lifetime() {
        let h = harness();
        assert_eq!(h.dock.registered(), INSIGHTS_DRAWERS.to_vec());

        assert_eq!(h.controller.toggle_drawer(DrawerId::History), Some(DrawerId::History));
        assert_eq!(h.controller.toggle_drawer(DrawerId::SavedQueries), Some(DrawerId::SavedQueries));
        assert_eq!(h.controller.toggle_drawer(DrawerId::SavedQueries), None);

        h.controller.toggle_drawer(DrawerId::History);
        let Harness { dock, controller, .. } = h;
        drop(controller);
        assert!(dock.registered().is_empty());
        assert_eq!(dock.active(), None);
    }

    #[test]
    fn test_format_and_saved_queries() {
        let h = harness();
        assert_eq!(h.controller.query(), DEFAULT_QUERY);

        h.controller.set_query("fields @message | filter @message like /x/ | limit 5");
        h.controller.format_query();
        assert_eq!(h.controller.query(), "fields @message\n| filter @message like /x/\n| limit 5");

        h.controller.select_log_group("/app/api");
        let saved = h.controller.save_current_query("Errors", None).unwrap();
        assert!(h.controller.save_current_query(" ", None).is_err());
        assert_eq!(error_toasts(&h.center), vec!["Name is required"]);

        h.controller.set_query("");
        h.controller.clear_log_groups();
        let found = h.controller.saved_queries("errors");
        assert_eq!(found.len(), 1);
        h.controller.apply_saved_query(&found[0]);
        assert_eq!(h.controller.query(), saved.query);
        assert_eq!(h.controller.selected_log_groups(), vec!["/app/api"]);

        assert!(h.controller.delete_saved_query(saved.id).unwrap());
        assert!(h.controller.find_saved_query("Errors").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_run_is_restored() {
        let h = harness();
        h.mock.push_status(complete_results(QueryStatistics::zero(), Vec::new()));
        h.controller.select_log_group("/app/worker");
        h.controller.set_query("fields @message | limit 1");
        h.controller.set_time_range(TimeRange::Relative { amount: 1, unit: TimeUnit::Hour });
        h.controller.run().await.unwrap();

        h.controller.set_query("");
        h.controller.clear_log_groups();
        h.controller.set_time_range(TimeRange::default());

        assert!(h.controller.restore_last_run());
        assert_eq!(h.controller.query(), "fields @message | limit 1");
        assert_eq!(h.controller.selected_log_groups(), vec!["/app/worker"]);
        assert_eq!(h.controller.time_range(), TimeRange::Relative { amount: 1, unit: TimeUnit::Hour });
    }

    #[tokio::test]
    async fn test_history_load_and_apply() {
        let h = harness();
        h.mock.set_history(vec![sonar_core::QueryHistoryEntry {
            query_id: "h1".into(),
            query_string: "SOURCE \"/app/api\" START=1 END=2| fields @message".into(),
            status: "Complete".into(),
            created_at: Utc::now(),
            log_group_name: None,
        }]);

        let items = h.controller.load_history().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].log_groups, "/app/api");

        assert!(h.controller.apply_history("h1"));
        assert_eq!(h.controller.query(), "fields @message");
        assert_eq!(h.controller.selected_log_groups(), vec!["/app/api"]);
        assert!(!h.controller.apply_history("missing"));
    }
}
