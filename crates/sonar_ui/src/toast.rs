//! Toast notifications: the shared channel every error and info message
//! reaches the user through.
//!
//! The controller never reads a global notifier; it receives an
//! `Arc<dyn Notifier>` at construction. [`NotificationCenter`] is the
//! in-memory implementation front ends render from.

use parking_lot::Mutex;
use sonar_core::SonarError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Toast severity levels for styling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToastSeverity {
    /// Informational message.
    #[default]
    Info,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
    /// Success message.
    Success,
}

impl ToastSeverity {
    /// Short label used by text front ends.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// A toast notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// The message to display.
    pub message: String,
    /// Optional hint or additional context.
    pub hint: Option<String>,
    /// Severity level for styling.
    pub severity: ToastSeverity,
}

impl Toast {
    /// Create an info toast.
    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), hint: None, severity: ToastSeverity::Info }
    }

    /// Create a warning toast.
    pub fn warning(message: impl Into<String>) -> Self {
        Self { message: message.into(), hint: None, severity: ToastSeverity::Warning }
    }

    /// Create an error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), hint: None, severity: ToastSeverity::Error }
    }

    /// Create a success toast.
    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), hint: None, severity: ToastSeverity::Success }
    }

    /// Error toast carrying the error's message and hint.
    pub fn from_error(err: &SonarError) -> Self {
        let info = err.to_error_info();
        Self { message: info.message, hint: info.hint, severity: ToastSeverity::Error }
    }

    /// Set the hint text.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Capability to show a notification to the user.
pub trait Notifier: Send + Sync {
    /// Show a toast.
    fn notify(&self, toast: Toast);
}

/// A toast that has been shown and not yet dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveToast {
    pub id: u64,
    pub toast: Toast,
}

/// In-memory notification list.
#[derive(Default)]
pub struct NotificationCenter {
    next_id: AtomicU64,
    toasts: Mutex<Vec<ActiveToast>>,
}

impl NotificationCenter {
    /// Create an empty notification center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts currently shown, oldest first.
    pub fn active(&self) -> Vec<ActiveToast> {
        self.toasts.lock().clone()
    }

    /// Dismiss a toast. Returns false if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut toasts = self.toasts.lock();
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }

    /// Remove and return every toast.
    pub fn drain(&self) -> Vec<ActiveToast> {
        std::mem::take(&mut *self.toasts.lock())
    }

    /// Check if any error toast is shown.
    pub fn has_errors(&self) -> bool {
        self.toasts.lock().iter().any(|t| t.toast.severity == ToastSeverity::Error)
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, toast: Toast) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        match toast.severity {
            ToastSeverity::Error => tracing::warn!(toast_id = id, message = %toast.message, "Error toast"),
            _ => tracing::debug!(toast_id = id, message = %toast.message, "Toast"),
        }
        self.toasts.lock().push(ActiveToast { id, toast });
    }
}
