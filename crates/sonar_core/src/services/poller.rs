//! Query submission and status polling with cancellation support.
//!
//! At most one job is active per poller. A run submits the job, polls its
//! status every [`POLL_INTERVAL_SECS`] seconds while it is Scheduled or
//! Running, and publishes a [`QueryRunStatus`] snapshot for the status
//! banner on every poll and every countdown tick.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::select;
use tokio::sync::watch;

use crate::error::SonarError;
use crate::models::{
    CancelOutcome, QueryHandle, QueryOutcome, QueryRequest, QueryRunStatus, QueryState,
    POLL_INTERVAL_SECS,
};
use crate::services::LogsInsightsService;

/// Which job, if any, currently owns the poller.
#[derive(Debug, Clone, Default)]
enum ActiveSlot {
    #[default]
    Idle,
    /// StartQuery is in flight; no id yet.
    Submitting,
    Active(Arc<QueryHandle>),
    /// StopQuery reported the job already done; its final poll is pending.
    /// No longer cancellable, but still blocks new runs.
    Finishing(Arc<QueryHandle>),
}

/// Runs one Logs Insights job at a time and tracks its status.
pub struct QueryPoller {
    service: Arc<dyn LogsInsightsService>,
    slot: Mutex<ActiveSlot>,
    status: watch::Sender<Option<QueryRunStatus>>,
}

impl QueryPoller {
    /// Create a poller on top of a logs service.
    pub fn new(service: Arc<dyn LogsInsightsService>) -> Self {
        let (status, _) = watch::channel(None);
        Self { service, slot: Mutex::new(ActiveSlot::Idle), status }
    }

    /// Identifier of the active job, if one has been accepted.
    pub fn active_query_id(&self) -> Option<String> {
        self.active_handle().map(|h| h.id().to_string())
    }

    /// Check if a job is being submitted or polled.
    pub fn is_running(&self) -> bool {
        !matches!(*self.slot.lock(), ActiveSlot::Idle)
    }

    /// Latest status snapshot.
    pub fn status(&self) -> Option<QueryRunStatus> {
        self.status.borrow().clone()
    }

    /// Subscribe to status snapshots.
    pub fn subscribe_status(&self) -> watch::Receiver<Option<QueryRunStatus>> {
        self.status.subscribe()
    }

    /// Submit a job and poll it to a terminal state.
    ///
    /// Returns [`QueryOutcome::Rejected`] without calling the service when
    /// another job is active.
    pub async fn run(&self, request: QueryRequest) -> Result<QueryOutcome, SonarError> {
        let mut guard = {
            let mut slot = self.slot.lock();
            if !matches!(*slot, ActiveSlot::Idle) {
                tracing::debug!("Run ignored, a query is already active");
                return Ok(QueryOutcome::Rejected);
            }
            *slot = ActiveSlot::Submitting;
            SlotGuard { slot: &self.slot, handle: None }
        };

        self.publish(None);

        let query_id = match self.service.start_query(&request).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "StartQuery failed");
                return Err(SonarError::submission(err.message()));
            }
        };

        let handle = Arc::new(QueryHandle::new(query_id, &request));
        {
            let mut slot = self.slot.lock();
            if matches!(*slot, ActiveSlot::Submitting) {
                *slot = ActiveSlot::Active(handle.clone());
            }
        }
        guard.handle = Some(handle.clone());

        tracing::info!(
            query_id = %handle.id(),
            log_groups = ?handle.log_group_names(),
            "Query started"
        );

        let outcome = self.poll(&handle).await;

        tracing::debug!(
            query_id = %handle.id(),
            elapsed_ms = handle.elapsed_ms(),
            "Query run finished"
        );

        outcome
    }

    /// Request that the active job stop.
    ///
    /// A StopQuery failure saying the job already completed clears the
    /// active id and lets the run pick up the completed results right away.
    /// The poller stays busy until that run returns. Any other failure
    /// leaves the job active.
    pub async fn cancel(&self) -> Result<CancelOutcome, SonarError> {
        let Some(handle) = self.active_handle() else {
            return Ok(CancelOutcome::NoActiveQuery);
        };
        let query_id = handle.id().to_string();

        match self.service.stop_query(&query_id).await {
            Ok(()) => {
                self.release(&handle);
                handle.cancel();
                tracing::info!(query_id = %query_id, "Query stopped");
                Ok(CancelOutcome::Stopped { query_id })
            }
            Err(err) if err.is_already_complete() => {
                self.finish(&handle);
                handle.wake();
                tracing::debug!(query_id = %query_id, "Query completed before it could be stopped");
                Ok(CancelOutcome::AlreadyComplete { query_id, message: err.message() })
            }
            Err(err) => {
                tracing::warn!(query_id = %query_id, error = %err, "StopQuery failed");
                Err(err)
            }
        }
    }

    async fn poll(&self, handle: &QueryHandle) -> Result<QueryOutcome, SonarError> {
        loop {
            if handle.is_cancelled() {
                return Ok(cancelled(handle));
            }

            let response = self.service.get_query_results(handle.id()).await;

            // The request is not aborted on cancel; its late response is dropped here.
            if handle.is_cancelled() {
                return Ok(cancelled(handle));
            }

            let results = match response {
                Ok(results) => results,
                Err(err) => {
                    tracing::warn!(query_id = %handle.id(), error = %err, "GetQueryResults failed");
                    self.publish(Some(QueryRunStatus::failed(QueryState::Unknown.as_str())));
                    return Err(SonarError::poll(err.message(), handle.id()));
                }
            };

            let statistics = results.statistics.unwrap_or_default();
            let state = results.state();

            tracing::debug!(
                query_id = %handle.id(),
                status = %results.status,
                matched = statistics.records_matched,
                scanned = statistics.records_scanned,
                "Query status"
            );

            if state == QueryState::Complete {
                self.publish(Some(QueryRunStatus::complete(statistics)));
                return Ok(QueryOutcome::Complete {
                    query_id: handle.id().to_string(),
                    statistics,
                    rows: results.results,
                });
            }

            if !state.is_in_progress() {
                self.publish(Some(QueryRunStatus::failed(&results.status)));
                return Err(SonarError::query_failed(results.status, handle.id()));
            }

            // Still running after all; make it cancellable again.
            self.reactivate(handle);

            let snapshot =
                QueryRunStatus::in_progress(&results.status, statistics, POLL_INTERVAL_SECS);
            self.publish(Some(snapshot.clone()));

            if !self.wait(handle, &snapshot).await {
                return Ok(cancelled(handle));
            }
        }
    }

    /// Count down to the next poll in one second steps.
    ///
    /// Returns false when the job was cancelled during the wait.
    async fn wait(&self, handle: &QueryHandle, snapshot: &QueryRunStatus) -> bool {
        for remaining in (0..POLL_INTERVAL_SECS).rev() {
            select! {
                biased;
                _ = handle.cancelled() => return false,
                _ = handle.woken() => return true,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
            self.publish(Some(snapshot.with_time_left(remaining)));
        }
        true
    }

    fn active_handle(&self) -> Option<Arc<QueryHandle>> {
        match &*self.slot.lock() {
            ActiveSlot::Active(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Clear the slot if it still belongs to `handle`.
    fn release(&self, handle: &Arc<QueryHandle>) {
        let mut slot = self.slot.lock();
        if let ActiveSlot::Active(current) = &*slot {
            if Arc::ptr_eq(current, handle) {
                *slot = ActiveSlot::Idle;
            }
        }
    }

    /// Move `handle` from Active to Finishing.
    fn finish(&self, handle: &Arc<QueryHandle>) {
        let mut slot = self.slot.lock();
        if let ActiveSlot::Active(current) = &*slot {
            if Arc::ptr_eq(current, handle) {
                *slot = ActiveSlot::Finishing(handle.clone());
            }
        }
    }

    fn reactivate(&self, handle: &QueryHandle) {
        let mut slot = self.slot.lock();
        if let ActiveSlot::Finishing(current) = &*slot {
            if std::ptr::eq(Arc::as_ptr(current), handle) {
                *slot = ActiveSlot::Active(current.clone());
            }
        }
    }

    fn publish(&self, status: Option<QueryRunStatus>) {
        self.status.send_replace(status);
    }
}

fn cancelled(handle: &QueryHandle) -> QueryOutcome {
    tracing::debug!(query_id = %handle.id(), "Polling stopped");
    QueryOutcome::Cancelled { query_id: handle.id().to_string() }
}

/// Frees the slot when a run ends, including when its future is dropped.
struct SlotGuard<'a> {
    slot: &'a Mutex<ActiveSlot>,
    handle: Option<Arc<QueryHandle>>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        let owned = match (&*slot, &self.handle) {
            (ActiveSlot::Submitting, None) => true,
            (ActiveSlot::Active(current) | ActiveSlot::Finishing(current), Some(mine)) => {
                Arc::ptr_eq(current, mine)
            }
            _ => false,
        };
        if owned {
            *slot = ActiveSlot::Idle;
        }
    }
}
