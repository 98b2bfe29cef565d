//! Status banner for the running query.
//!
//! The banner shows the job status, the statistics reported so far and the
//! countdown to the next poll. Failure banners omit the counters.

use sonar_core::{QueryRunStatus, StatusKind};

/// Connection shown at the left of the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionLabel {
    pub profile: String,
    pub region: String,
}

impl ConnectionLabel {
    pub fn new(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self { profile: profile.into(), region: region.into() }
    }

    pub fn text(&self) -> String {
        format!("{} ({})", self.profile, self.region)
    }
}

/// Banner text for a status snapshot.
pub fn banner_text(status: &QueryRunStatus) -> String {
    let mut text = format!("Query stats: status: {}", status.status);
    if status.kind != StatusKind::Error {
        text.push_str(&format!(
            ", matches: {}, scanned: {}, bytes: {:.2} KB.",
            status.matches,
            status.scanned,
            status.bytes / 1024.0
        ));
    }
    if status.time_left > 0 {
        text.push_str(&format!(" checking again in {}s", status.time_left));
    }
    text
}

/// Status bar view model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusBar {
    connection: ConnectionLabel,
    status: Option<QueryRunStatus>,
}

impl StatusBar {
    pub fn new(connection: ConnectionLabel) -> Self {
        Self { connection, status: None }
    }

    pub fn connection(&self) -> &ConnectionLabel {
        &self.connection
    }

    pub fn set_status(&mut self, status: Option<QueryRunStatus>) {
        self.status = status;
    }

    pub fn status(&self) -> Option<&QueryRunStatus> {
        self.status.as_ref()
    }

    /// Banner line, or `None` before the first snapshot.
    pub fn banner(&self) -> Option<String> {
        self.status.as_ref().map(banner_text)
    }

    /// Check if a job is still being polled.
    pub fn is_in_progress(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.kind == StatusKind::InProgress)
    }
}
