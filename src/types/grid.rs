use serde::{Deserialize, Serialize};

use super::{CellIndex, Column, ColumnId, Row, RowId};
use crate::error::{GridError, Result};
use crate::field::CellValue;

/// Rows and columns as the grid sees them.
///
/// `row_order` is the display order produced by the sort/group pipeline
/// (indexes into `rows`); `column_order` lists the visible columns
/// (indexes into `columns`). Display-space [`CellIndex`] values address
/// these two orders, never the raw vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    pub rows: Vec<Row>,
    pub columns: Vec<Column>,
    #[serde(skip)]
    row_order: Vec<usize>,
    #[serde(skip)]
    column_order: Vec<usize>,
}

impl GridData {
    pub fn new(rows: Vec<Row>, columns: Vec<Column>) -> Self {
        let mut data = Self {
            rows,
            columns,
            row_order: Vec::new(),
            column_order: Vec::new(),
        };
        data.coerce_values();
        data.reset_row_order();
        data.refresh_column_order();
        data
    }

    /// Run every stored value through its column's field coercion.
    pub fn coerce_values(&mut self) {
        for column in &self.columns {
            for row in &mut self.rows {
                if let Some(value) = row.data.remove(&column.id) {
                    row.data.insert(column.id.clone(), column.field.coerce(value));
                }
            }
        }
    }

    /// Append rows after the current display order without re-sorting.
    /// Returns the storage range of the new rows.
    pub fn append_rows(&mut self, rows: Vec<Row>) -> std::ops::Range<usize> {
        let start = self.rows.len();
        for mut row in rows {
            for column in &self.columns {
                if let Some(value) = row.data.remove(&column.id) {
                    row.data.insert(column.id.clone(), column.field.coerce(value));
                }
            }
            self.rows.push(row);
        }
        self.row_order.extend(start..self.rows.len());
        start..self.rows.len()
    }

    /// Display rows in storage order.
    pub fn reset_row_order(&mut self) {
        self.row_order = (0..self.rows.len()).collect();
    }

    pub fn set_row_order(&mut self, order: Vec<usize>) {
        self.row_order = order;
    }

    pub fn row_order(&self) -> &[usize] {
        &self.row_order
    }

    /// Recompute the visible column list after columns were shown, hidden,
    /// added or moved.
    pub fn refresh_column_order(&mut self) {
        self.column_order = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.hidden)
            .map(|(i, _)| i)
            .collect();
    }

    pub fn column_order(&self) -> &[usize] {
        &self.column_order
    }

    pub fn display_row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn visible_column_count(&self) -> usize {
        self.column_order.len()
    }

    /// Storage index of the row shown at display position `row`.
    pub fn row_index_at(&self, row: usize) -> Option<usize> {
        self.row_order.get(row).copied()
    }

    pub fn row_at(&self, row: usize) -> Option<&Row> {
        self.rows.get(self.row_index_at(row)?)
    }

    pub fn column_index_at(&self, col: usize) -> Option<usize> {
        self.column_order.get(col).copied()
    }

    pub fn column_at(&self, col: usize) -> Option<&Column> {
        self.columns.get(self.column_index_at(col)?)
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.column_order.iter().filter_map(|&i| self.columns.get(i))
    }

    pub fn value_at(&self, cell: CellIndex) -> Option<&CellValue> {
        let column = self.column_at(cell.col)?;
        self.row_at(cell.row)?.get(&column.id)
    }

    /// Identity of the cell at a display position.
    pub fn cell_identity(&self, cell: CellIndex) -> Option<(RowId, ColumnId)> {
        let column = self.column_at(cell.col)?;
        Some((self.row_at(cell.row)?.id, column.id.clone()))
    }

    /// Write a value at a display position, returning the previous value.
    pub fn set_value(&mut self, cell: CellIndex, value: Option<CellValue>) -> Result<Option<CellValue>> {
        let column_id = self
            .column_at(cell.col)
            .map(|c| c.id.clone())
            .ok_or_else(|| GridError::ColumnNotFound(format!("#{}", cell.col)))?;
        let row_idx = self
            .row_index_at(cell.row)
            .ok_or_else(|| GridError::RowNotFound(format!("#{}", cell.row)))?;
        let row = self
            .rows
            .get_mut(row_idx)
            .ok_or_else(|| GridError::RowNotFound(format!("#{}", cell.row)))?;
        Ok(row.set(&column_id, value))
    }

    pub fn find_row(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    pub fn find_column(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Write a value by identity, returning the previous one.
    pub fn set_value_by_id(
        &mut self,
        row: RowId,
        column: &ColumnId,
        value: Option<CellValue>,
    ) -> Result<Option<CellValue>> {
        if self.find_column(column).is_none() {
            return Err(GridError::ColumnNotFound(column.to_string()));
        }
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id == row)
            .ok_or_else(|| GridError::RowNotFound(row.to_string()))?;
        Ok(row.set(column, value))
    }

    /// Display position of a row identity, if it is currently displayed.
    pub fn display_position_of(&self, id: RowId) -> Option<usize> {
        let idx = self.find_row(id)?;
        self.row_order.iter().position(|&i| i == idx)
    }

    /// Display position of a column identity, if it is visible.
    pub fn visible_position_of(&self, id: &ColumnId) -> Option<usize> {
        let idx = self.find_column(id)?;
        self.column_order.iter().position(|&i| i == idx)
    }
}
