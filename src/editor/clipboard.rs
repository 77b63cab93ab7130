//! Clipboard snapshots and their TSV text encoding.
//!
//! Columns are tab-separated and rows newline-separated. Cells containing a
//! tab, newline or quote are quoted with internal quotes doubled, the way
//! spreadsheet applications exchange ranges.

use serde::Serialize;

use crate::field::{CellValue, DataType};
use crate::types::{ColumnId, RowId};

/// One copied cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardCell {
    /// Display text as it was shown at copy time.
    pub text: String,
    /// Raw value, present only for cells copied from this grid.
    pub raw: Option<CellValue>,
    /// Data type of the source field, present only for copied cells.
    pub data_type: Option<DataType>,
    pub source: Option<(RowId, ColumnId)>,
}

impl ClipboardCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// An immutable rectangular matrix of copied cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardSnapshot {
    /// Cells in row-major order.
    cells: Vec<ClipboardCell>,
    pub row_count: usize,
    pub column_count: usize,
}

impl ClipboardSnapshot {
    /// Build from rows of cells; short rows are padded with empty cells.
    pub fn from_rows(rows: Vec<Vec<ClipboardCell>>) -> Self {
        let row_count = rows.len();
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut cells = Vec::with_capacity(row_count * column_count);
        for mut row in rows {
            row.resize_with(column_count, ClipboardCell::default);
            cells.extend(row);
        }
        Self {
            cells,
            row_count,
            column_count,
        }
    }

    /// Parse clipboard text. Text without tabs or newlines is one cell.
    pub fn from_text(text: &str) -> Self {
        Self::from_rows(
            parse_tsv(text)
                .into_iter()
                .map(|row| row.into_iter().map(ClipboardCell::text).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.column_count == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&ClipboardCell> {
        if col >= self.column_count {
            return None;
        }
        self.cells.get(row * self.column_count + col)
    }

    /// Cell at a position tiled over the snapshot's extent.
    pub fn tiled(&self, row: usize, col: usize) -> Option<&ClipboardCell> {
        if self.is_empty() {
            return None;
        }
        self.get(row % self.row_count, col % self.column_count)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[ClipboardCell]> {
        self.cells.chunks(self.column_count.max(1))
    }

    pub fn to_text(&self) -> String {
        let rows: Vec<Vec<&str>> = self
            .rows()
            .map(|row| row.iter().map(|c| c.text.as_str()).collect())
            .collect();
        write_tsv(&rows)
    }
}

/// Escape a cell value for TSV/clipboard format
/// If the value contains tabs, newlines, or quotes, wrap in quotes and escape internal quotes
pub fn escape_cell_value(value: &str) -> String {
    let needs_quoting = value.contains(['\t', '\n', '\r', '"']);
    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join a text matrix with tabs and newlines.
pub fn write_tsv<S: AsRef<str>>(rows: &[Vec<S>]) -> String {
    let mut out = String::new();
    for (r, row) in rows.iter().enumerate() {
        if r > 0 {
            out.push('\n');
        }
        for (c, cell) in row.iter().enumerate() {
            if c > 0 {
                out.push('\t');
            }
            out.push_str(&escape_cell_value(cell.as_ref()));
        }
    }
    out
}

/// Split clipboard text into rows of cells, honoring quoted cells.
///
/// A single trailing newline (as appended by most spreadsheets) does not
/// produce an extra row.
pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    let text = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text);

    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut chars = text.chars().peekable();
    let mut at_cell_start = true;
    let mut quoted = false;

    while let Some(ch) = chars.next() {
        if quoted {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    quoted = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }
        match ch {
            '"' if at_cell_start => {
                quoted = true;
                at_cell_start = false;
            }
            '\t' => {
                row.push(std::mem::take(&mut cell));
                at_cell_start = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
                at_cell_start = true;
            }
            _ => {
                cell.push(ch);
                at_cell_start = false;
            }
        }
    }
    row.push(cell);
    rows.push(row);
    rows
}

/// The grid's own clipboard.
///
/// Remembers the last snapshot written so a paste of the same text keeps raw
/// values and source types; any other text is parsed as plain TSV.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    last: Option<(String, ClipboardSnapshot)>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot and return the text to push to the system clipboard.
    pub fn write(&mut self, snapshot: ClipboardSnapshot) -> String {
        let text = snapshot.to_text();
        self.last = Some((text.clone(), snapshot));
        text
    }

    /// Last parsed or written snapshot.
    pub fn read(&self) -> Option<&ClipboardSnapshot> {
        self.last.as_ref().map(|(_, s)| s)
    }

    /// Resolve text pasted from the system clipboard.
    pub fn parse(&mut self, text: &str) -> ClipboardSnapshot {
        if let Some((last_text, snapshot)) = &self.last {
            if last_text == text {
                return snapshot.clone();
            }
        }
        let snapshot = ClipboardSnapshot::from_text(text);
        self.last = Some((text.to_string(), snapshot.clone()));
        snapshot
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
