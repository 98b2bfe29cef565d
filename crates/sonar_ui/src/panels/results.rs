//! Results panel: projection of raw result rows into a rectangular table.
//!
//! The column set is derived from the first row only, minus the pointer
//! field. Row ids are assigned here and nowhere else; the expansion map and
//! every rendered cell key off them.

use sonar_core::models::{LOG_STREAM_FIELD, POINTER_FIELD};
use sonar_core::RawRow;
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

/// Synthetic field holding the 1-based row index.
pub const ROW_ID_FIELD: &str = "id";

/// Key of the row index column.
pub const SELECT_COLUMN: &str = "select";

/// Header of the row index column.
pub const SELECT_HEADER: &str = "#";

/// State of the results panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultsState {
    /// No query has been executed yet.
    #[default]
    Empty,
    /// Query is currently executing.
    Loading,
    /// Query completed successfully with results.
    Success {
        /// Number of rows returned.
        row_count: usize,
        /// Execution time in milliseconds.
        elapsed_ms: i64,
    },
    /// Query failed with an error.
    Error {
        /// Error message.
        message: String,
    },
}

/// How a column renders its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Row index with the expand caret.
    RowIndexAndExpandToggle,
    /// First field column; carries the expand affordance.
    PrimaryExpandableField,
    /// Any other field.
    PlainField,
}

/// A derived column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field name, or [`SELECT_COLUMN`] for the index column.
    pub key: String,
    pub header: String,
    pub role: ColumnRole,
}

impl ColumnDef {
    /// Field this column reads from a row.
    pub fn field(&self) -> &str {
        match self.role {
            ColumnRole::RowIndexAndExpandToggle => ROW_ID_FIELD,
            _ => &self.key,
        }
    }
}

/// One display row: field name to value, including fields that have no
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    pub id: String,
    pub values: BTreeMap<String, String>,
}

impl ProjectedRow {
    /// Value of a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Record pointer, when present and non-empty.
    pub fn pointer(&self) -> Option<&str> {
        self.get(POINTER_FIELD).filter(|p| !p.is_empty())
    }
}

/// Rendered content of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    /// Cross-reference to the log stream viewer.
    Link { text: String, href: String },
}

impl CellValue {
    /// Visible text.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Link { text, .. } => text,
        }
    }
}

/// A cell with its role-specific affordances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Caret and row id.
    RowIndex { id: String, expanded: bool },
    /// Primary field with an expand toggle.
    Expandable { value: CellValue, expanded: bool },
    Plain(CellValue),
}

/// Columns and rows derived from one result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedResults {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<ProjectedRow>,
}

impl ProjectedResults {
    /// Project raw rows into columns and display rows.
    pub fn project(raw: &[RawRow]) -> Self {
        let Some(first) = raw.first() else {
            return Self::default();
        };

        let mut keys: Vec<&str> = vec![ROW_ID_FIELD];
        for field in first {
            let name = field.field.as_str();
            if name != POINTER_FIELD && !keys.contains(&name) {
                keys.push(name);
            }
        }

        let columns = keys
            .iter()
            .enumerate()
            .map(|(position, key)| match position {
                0 => ColumnDef {
                    key: SELECT_COLUMN.to_string(),
                    header: SELECT_HEADER.to_string(),
                    role: ColumnRole::RowIndexAndExpandToggle,
                },
                1 => ColumnDef {
                    key: key.to_string(),
                    header: key.to_string(),
                    role: ColumnRole::PrimaryExpandableField,
                },
                _ => ColumnDef {
                    key: key.to_string(),
                    header: key.to_string(),
                    role: ColumnRole::PlainField,
                },
            })
            .collect();

        let rows = raw
            .iter()
            .enumerate()
            .map(|(index, fields)| {
                let id = (index + 1).to_string();
                let mut values = BTreeMap::new();
                values.insert(ROW_ID_FIELD.to_string(), id.clone());
                for field in fields {
                    values.insert(field.field.clone(), field.value.clone());
                }
                ProjectedRow { id, values }
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a row by id.
    pub fn row(&self, id: &str) -> Option<&ProjectedRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Every row id in display order.
    pub fn row_ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    /// Render one cell.
    ///
    /// `log_group` is the query's log group when exactly one was selected;
    /// only then do stream cells become links.
    pub fn cell(
        &self,
        row: &ProjectedRow,
        column: &ColumnDef,
        log_group: Option<&str>,
        expanded: bool,
    ) -> Cell {
        match column.role {
            ColumnRole::RowIndexAndExpandToggle => Cell::RowIndex { id: row.id.clone(), expanded },
            ColumnRole::PrimaryExpandableField => {
                Cell::Expandable { value: cell_value(row, &column.key, log_group), expanded }
            }
            ColumnRole::PlainField => Cell::Plain(cell_value(row, &column.key, log_group)),
        }
    }

    /// Plain-text table, one line per row. Cells longer than `max_width`
    /// graphemes are truncated with an ellipsis.
    pub fn render_text(&self, max_width: usize, expanded: impl Fn(&str) -> bool) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let grid: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let is_expanded = expanded(&row.id);
                self.columns
                    .iter()
                    .map(|column| {
                        let text = match self.cell(row, column, None, is_expanded) {
                            Cell::RowIndex { id, expanded } => {
                                format!("{} {}", if expanded { "v" } else { ">" }, id)
                            }
                            Cell::Expandable { value, .. } | Cell::Plain(value) => value.text().to_string(),
                        };
                        truncate_cell(&text, max_width)
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                grid.iter()
                    .map(|cells| grapheme_len(&cells[i]))
                    .chain(std::iter::once(grapheme_len(&truncate_cell(&column.header, max_width))))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(grid.len() + 2);
        let headers: Vec<String> =
            self.columns.iter().map(|c| truncate_cell(&c.header, max_width)).collect();
        lines.push(join_padded(&headers, &widths));
        lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
        for cells in &grid {
            lines.push(join_padded(cells, &widths));
        }
        lines.join("\n")
    }
}

fn cell_value(row: &ProjectedRow, field: &str, log_group: Option<&str>) -> CellValue {
    let text = row.get(field).unwrap_or_default().to_string();
    match log_group.filter(|g| !g.is_empty()) {
        Some(group) if field == LOG_STREAM_FIELD => CellValue::Link { href: stream_link(group, &text), text },
        _ => CellValue::Text(text),
    }
}

/// In-app route to the log stream viewer.
pub fn stream_link(log_group: &str, log_stream: &str) -> String {
    format!("/cloudwatchlogs/{}/{}", urlencoding::encode(log_group), urlencoding::encode(log_stream))
}

/// AWS console deep link to a log stream.
pub fn console_url(region: &str, log_group: &str, log_stream: &str) -> String {
    fn console_encode(value: &str) -> String {
        urlencoding::encode(&urlencoding::encode(value)).replace('%', "$")
    }
    format!(
        "https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logsV2:log-groups/log-group/{}/log-events/{}",
        console_encode(log_group),
        console_encode(log_stream),
    )
}

/// Flatten whitespace and cut to `max_width` graphemes.
pub fn truncate_cell(value: &str, max_width: usize) -> String {
    let flat = value.replace(['\n', '\r', '\t'], " ");
    if max_width == 0 || grapheme_len(&flat) <= max_width {
        return flat;
    }
    let mut out: String = flat.graphemes(true).take(max_width - 1).collect();
    out.push('…');
    out
}

fn grapheme_len(value: &str) -> usize {
    value.graphemes(true).count()
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(grapheme_len(cell));
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_core::ResultField;

    fn row(fields: &[(&str, &str)]) -> RawRow {
        fields.iter().map(|(f, v)| ResultField::new(*f, *v)).collect()
    }

    #[test]
    fn test_empty_projection() {
        let projected = ProjectedResults::project(&[]);
        assert!(projected.columns.is_empty());
        assert!(projected.rows.is_empty());
        assert_eq!(projected.render_text(40, |_| false), "");
    }

    #[test]
    fn test_columns_come_from_first_row() {
        let base = vec![
            row(&[("@timestamp", "t0"), ("@message", "ok"), ("@ptr", "p0")]),
            row(&[("@timestamp", "t1"), ("@message", "error")]),
        ];
        let widened = vec![
            base[0].clone(),
            row(&[("@timestamp", "t1"), ("@message", "error"), ("@logStream", "s"), ("extra", "x")]),
        ];

        let a = ProjectedResults::project(&base);
        let b = ProjectedResults::project(&widened);
        assert_eq!(a.columns, b.columns);

        let keys: Vec<_> = a.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["select", "@timestamp", "@message"]);
        assert_eq!(a.columns[0].header, "#");
        assert_eq!(a.columns[0].role, ColumnRole::RowIndexAndExpandToggle);
        assert_eq!(a.columns[1].role, ColumnRole::PrimaryExpandableField);
        assert_eq!(a.columns[2].role, ColumnRole::PlainField);

        assert_eq!(b.rows[1].get("extra"), Some("x"));
    }

    #[test]
    fn test_rows_get_one_based_ids_and_last_write_wins() {
        let projected = ProjectedResults::project(&[
            row(&[("@message", "a"), ("@message", "b")]),
            row(&[("@message", "c"), ("@ptr", "")]),
        ]);
        assert_eq!(projected.row_ids(), vec!["1", "2"]);
        assert_eq!(projected.rows[0].get("@message"), Some("b"));
        assert_eq!(projected.rows[0].get(ROW_ID_FIELD), Some("1"));
        assert_eq!(projected.rows[0].pointer(), None);
        assert_eq!(projected.rows[1].pointer(), None);
    }

    #[test]
    fn test_log_stream_link_needs_single_group() {
        let projected = ProjectedResults::project(&[row(&[
            ("@logStream", "2024/01/01/[$LATEST]abc"),
            ("@message", "m"),
        ])]);
        let row = &projected.rows[0];
        let primary = &projected.columns[1];

        let linked = projected.cell(row, primary, Some("/aws/lambda/fn"), true);
        assert_eq!(
            linked,
            Cell::Expandable {
                value: CellValue::Link {
                    text: "2024/01/01/[$LATEST]abc".into(),
                    href: "/cloudwatchlogs/%2Faws%2Flambda%2Ffn/2024%2F01%2F01%2F%5B%24LATEST%5Dabc".into(),
                },
                expanded: true,
            }
        );

        let plain = projected.cell(row, primary, None, false);
        assert_eq!(
            plain,
            Cell::Expandable { value: CellValue::Text("2024/01/01/[$LATEST]abc".into()), expanded: false }
        );

        assert_eq!(
            projected.cell(row, &projected.columns[0], None, false),
            Cell::RowIndex { id: "1".into(), expanded: false }
        );
    }

    #[test]
    fn test_render_text_truncates_by_grapheme() {
        let projected = ProjectedResults::project(&[
            row(&[("@timestamp", "t0"), ("@message", "héllo wörld, this is long")]),
            row(&[("@timestamp", "t1"), ("@message", "short\nline")]),
        ]);
        let text = projected.render_text(10, |id| id == "2");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#"));
        assert!(lines[2].contains("héllo wör…"));
        assert!(lines[3].starts_with("v 2"));
        assert!(lines[3].contains("short line"));
    }

    #[test]
    fn test_console_url() {
        assert_eq!(
            console_url("eu-west-1", "/app/api", "s1"),
            "https://eu-west-1.console.aws.amazon.com/cloudwatch/home?region=eu-west-1#logsV2:log-groups/log-group/$252Fapp$252Fapi/log-events/s1"
        );
    }
}
