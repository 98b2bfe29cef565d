//! View models for the Sonar Logs Insights screen.

pub mod drawer;
pub mod expansion;
pub mod insights;
pub mod panels;
pub mod query_editor;
pub mod status_bar;
pub mod toast;

pub use drawer::{DrawerDock, DrawerHost, DrawerId};
pub use expansion::{DetailState, ExpansionCoordinator};
pub use insights::LogInsightsController;
pub use panels::{ProjectedResults, ResultsState};
pub use status_bar::{banner_text, StatusBar};
pub use toast::{NotificationCenter, Notifier, Toast, ToastSeverity};
