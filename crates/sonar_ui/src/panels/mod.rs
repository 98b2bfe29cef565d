//! Panels of the Logs Insights screen:
//! - Results table
//! - Log group picker
//! - History and saved query drawers

pub mod history;
pub mod log_groups;
pub mod results;
pub mod saved_queries;

pub use history::{relative_age, HistoryItem, HistoryPanel, HistoryState};
pub use log_groups::{LogGroupPicker, PickerStatus};
pub use results::{
    console_url, stream_link, Cell, CellValue, ColumnDef, ColumnRole, ProjectedResults,
    ProjectedRow, ResultsState,
};
pub use saved_queries::{FieldError, FormField, SavedQueriesPanel, SavedQueryForm};
