//! Row expansion and on-demand record fetches.
//!
//! Expanding a row with a non-empty pointer issues exactly one
//! `GetLogRecord` call. Every fetch carries a ticket; a response whose
//! ticket no longer matches the row's current entry (the row collapsed, or
//! was re-expanded and fetched again) is dropped.

use crate::panels::results::{ProjectedResults, ProjectedRow};
use crate::toast::{Notifier, Toast};
use parking_lot::Mutex;
use sonar_core::{LogRecord, LogsInsightsService, SonarError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Detail panel content for an expanded row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Loaded(LogRecord),
    /// Shown in place of the field table.
    Failed(String),
}

#[derive(Debug)]
struct DetailEntry {
    ticket: u64,
    state: DetailState,
}

#[derive(Debug, Default)]
struct ExpansionInner {
    expanded: HashMap<String, bool>,
    /// Flipped by `toggle_all` only; not derived from `expanded`.
    all_expanded: bool,
    details: HashMap<String, DetailEntry>,
    next_ticket: u64,
}

impl ExpansionInner {
    fn is_expanded(&self, id: &str) -> bool {
        self.expanded.get(id).copied().unwrap_or(false)
    }

    fn begin_fetch(&mut self, id: &str) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.details.insert(id.to_string(), DetailEntry { ticket, state: DetailState::Loading });
        ticket
    }
}

/// Tracks expanded rows and owns their fetched records.
pub struct ExpansionCoordinator {
    service: Arc<dyn LogsInsightsService>,
    notifier: Arc<dyn Notifier>,
    inner: Arc<Mutex<ExpansionInner>>,
}

impl ExpansionCoordinator {
    pub fn new(service: Arc<dyn LogsInsightsService>, notifier: Arc<dyn Notifier>) -> Self {
        Self { service, notifier, inner: Arc::new(Mutex::new(ExpansionInner::default())) }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.inner.lock().is_expanded(id)
    }

    /// Value of the aggregate toggle.
    pub fn all_expanded(&self) -> bool {
        self.inner.lock().all_expanded
    }

    /// Expanded row ids, sorted numerically.
    pub fn expanded_ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut ids: Vec<String> =
            inner.expanded.iter().filter(|(_, open)| **open).map(|(id, _)| id.clone()).collect();
        ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
        ids
    }

    /// Detail content of a row; `None` when collapsed or without a pointer.
    pub fn detail(&self, id: &str) -> Option<DetailState> {
        self.inner.lock().details.get(id).map(|entry| entry.state.clone())
    }

    /// Flip one row. Returns the fetch task when the row opened with a pointer.
    pub fn toggle_row(&self, row: &ProjectedRow) -> Option<JoinHandle<()>> {
        let ticket = {
            let mut inner = self.inner.lock();
            let open = !inner.is_expanded(&row.id);
            inner.expanded.insert(row.id.clone(), open);
            if !open {
                inner.details.remove(&row.id);
                return None;
            }
            row.pointer()?;
            inner.begin_fetch(&row.id)
        };

        row.pointer().map(|pointer| self.spawn_fetch(row.id.clone(), pointer.to_string(), ticket))
    }

    /// Collapse everything if the aggregate toggle is on, otherwise expand
    /// every row of `results`.
    pub fn toggle_all(&self, results: &ProjectedResults) -> Vec<JoinHandle<()>> {
        let mut fetches = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.all_expanded {
                inner.expanded.clear();
                inner.details.clear();
                inner.all_expanded = false;
                return Vec::new();
            }

            for row in &results.rows {
                let was_open = inner.is_expanded(&row.id);
                inner.expanded.insert(row.id.clone(), true);
                if was_open {
                    continue;
                }
                if let Some(pointer) = row.pointer() {
                    let ticket = inner.begin_fetch(&row.id);
                    fetches.push((row.id.clone(), pointer.to_string(), ticket));
                }
            }
            inner.all_expanded = true;
        }

        fetches.into_iter().map(|(id, pointer, ticket)| self.spawn_fetch(id, pointer, ticket)).collect()
    }

    /// Re-fetch details for expanded rows after a new result set arrives.
    ///
    /// Expansion flags are kept; rows that no longer exist or have no
    /// pointer lose their detail.
    pub fn refresh(&self, results: &ProjectedResults) -> Vec<JoinHandle<()>> {
        let mut fetches = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.details.clear();
            let open: Vec<String> =
                inner.expanded.iter().filter(|(_, open)| **open).map(|(id, _)| id.clone()).collect();
            for id in open {
                if let Some(pointer) = results.row(&id).and_then(ProjectedRow::pointer) {
                    let ticket = inner.begin_fetch(&id);
                    fetches.push((id, pointer.to_string(), ticket));
                }
            }
        }

        fetches.into_iter().map(|(id, pointer, ticket)| self.spawn_fetch(id, pointer, ticket)).collect()
    }

    fn spawn_fetch(&self, id: String, pointer: String, ticket: u64) -> JoinHandle<()> {
        let service = self.service.clone();
        let notifier = self.notifier.clone();
        let inner = self.inner.clone();

        tracing::debug!(row_id = %id, "Fetching log record");
        tokio::spawn(async move {
            let result = service.get_log_record(&pointer).await;

            let mut guard = inner.lock();
            let current = guard.details.get(&id).is_some_and(|entry| entry.ticket == ticket)
                && guard.is_expanded(&id);
            if !current {
                tracing::trace!(row_id = %id, ticket, "Discarding stale log record");
                return;
            }

            let state = match result {
                Ok(record) => DetailState::Loaded(record),
                Err(err) => {
                    let err = SonarError::detail_fetch(err.message());
                    tracing::warn!(row_id = %id, error = %err, "Log record fetch failed");
                    notifier.notify(Toast::from_error(&err));
                    DetailState::Failed(err.to_string())
                }
            };
            guard.details.insert(id, DetailEntry { ticket, state });
        })
    }
}
