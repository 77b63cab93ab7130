//! Selection, editing and the cell matrix operations.
//!
//! [`CellEditor`] owns everything that changes cell values in response to
//! user input:
//! - the active [`SelectionRange`]
//! - the single pending-edit slot
//! - the grid's own clipboard
//!
//! It never touches layout. Callers turn the returned [`CellChange`]s into
//! outbound events and re-run sort/group/aggregate as needed.

pub mod clipboard;
pub mod fill;
pub mod matrix;
pub(crate) mod mutation;
mod paste;
pub mod pending;

use std::collections::HashMap;

use serde::Serialize;

use crate::config::CellConfig;
use crate::error::{GridError, Result};
use crate::field::{CellValue, ValidationErrors};
use crate::types::{step, CellIndex, ColumnId, Direction, GridData, RowId, SelectionRange};

pub use clipboard::{
    escape_cell_value, parse_tsv, write_tsv, Clipboard, ClipboardCell, ClipboardSnapshot,
};
pub use fill::FillSeries;
pub use matrix::{get_cells, CellMatrix, ExcludeFilter, MatrixCell, OperationSummary};
pub use mutation::CellChange;
pub use pending::{PendingEdit, PendingSlot};

use mutation::{apply_value, convert_for, typed_value};

/// Result of a multi-cell operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditOutcome {
    pub summary: OperationSummary,
    pub changes: Vec<CellChange>,
}

impl EditOutcome {
    fn record(&mut self, write: mutation::Write) {
        if write.is_applied() {
            self.summary.count += 1;
        }
        if let Some(change) = write.into_change() {
            self.changes.push(change);
        }
    }
}

/// Result of moving the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOutcome {
    pub range: SelectionRange,
    /// Change committed by flushing the edit the selection moved away from.
    pub flushed: Option<CellChange>,
}

#[derive(Debug, Clone)]
pub struct CellEditor {
    selection: Option<SelectionRange>,
    pending: PendingSlot,
    clipboard: Clipboard,
    editable: bool,
    fillable: bool,
}

impl CellEditor {
    pub fn new(config: &CellConfig) -> Self {
        Self {
            selection: None,
            pending: PendingSlot::new(),
            clipboard: Clipboard::new(),
            editable: config.editable,
            fillable: config.fillable,
        }
    }

    pub fn set_config(&mut self, config: &CellConfig) {
        self.editable = config.editable;
        self.fillable = config.fillable;
    }

    pub fn selection(&self) -> Option<&SelectionRange> {
        self.selection.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        self.pending.get()
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ---- Selection ----

    /// Select the range between two cells.
    ///
    /// With `extend`, the existing anchor stays primary and `end` becomes
    /// the opposite corner. A pending edit on a cell other than the new
    /// primary is flushed first; if it does not validate, the selection is
    /// left unchanged and the validation error returned.
    pub fn select_cells(
        &mut self,
        data: &mut GridData,
        start: CellIndex,
        end: CellIndex,
        extend: bool,
    ) -> Result<Option<SelectOutcome>> {
        let (rows, cols) = (data.display_row_count(), data.visible_column_count());
        if rows == 0 || cols == 0 {
            self.selection = None;
            return Ok(None);
        }
        let start = clamp_cell(start, rows, cols);
        let end = clamp_cell(end, rows, cols);
        let range = match self.selection {
            Some(current) if extend => {
                let anchor = clamp_cell(current.primary, rows, cols);
                SelectionRange::with_primary(anchor, anchor, end)
            }
            _ => SelectionRange::cell_range(start, end),
        };

        let flushed = self.leave_pending(data, range.primary)?;
        self.selection = Some(range);
        Ok(Some(SelectOutcome { range, flushed }))
    }

    /// Install a prepared range (whole rows, whole columns, everything).
    /// Pending edits are resolved as for [`select_cells`](Self::select_cells).
    pub fn select_range(
        &mut self,
        data: &mut GridData,
        range: SelectionRange,
    ) -> Result<Option<SelectOutcome>> {
        let (rows, cols) = (data.display_row_count(), data.visible_column_count());
        if rows == 0 || cols == 0 {
            self.selection = None;
            return Ok(None);
        }
        let range = SelectionRange {
            primary: clamp_cell(range.primary, rows, cols),
            start: clamp_cell(range.start, rows, cols),
            end: clamp_cell(range.end, rows, cols),
            ..range
        };
        let flushed = self.leave_pending(data, range.primary)?;
        self.selection = Some(range);
        Ok(Some(SelectOutcome { range, flushed }))
    }

    /// Flush the pending edit unless it belongs to `target`.
    fn leave_pending(&mut self, data: &mut GridData, target: CellIndex) -> Result<Option<CellChange>> {
        let target = data.cell_identity(target);
        let moves_away = self.pending.get().is_some_and(|edit| {
            target
                .as_ref()
                .map_or(true, |(row, column)| !edit.is_for(*row, column))
        });
        if moves_away {
            self.commit_edit(data)
        } else {
            Ok(None)
        }
    }

    /// Collapse the selection to the primary cell stepped in `direction`.
    pub fn move_selection(
        &mut self,
        data: &mut GridData,
        direction: Direction,
    ) -> Result<Option<SelectOutcome>> {
        let from = self.selection.map_or(CellIndex::new(0, 0), |s| s.primary);
        let next = step(
            from,
            direction,
            data.display_row_count(),
            data.visible_column_count(),
        );
        self.select_cells(data, next, next, false)
    }

    /// Grow or shrink the selection by moving the corner opposite the
    /// anchor.
    pub fn extend_selection(
        &mut self,
        data: &mut GridData,
        direction: Direction,
    ) -> Result<Option<SelectOutcome>> {
        let Some(current) = self.selection else {
            return self.move_selection(data, direction);
        };
        let active = CellIndex::new(
            if current.primary.row == current.start.row {
                current.end.row
            } else {
                current.start.row
            },
            if current.primary.col == current.start.col {
                current.end.col
            } else {
                current.start.col
            },
        );
        let next = step(
            active,
            direction,
            data.display_row_count(),
            data.visible_column_count(),
        );
        self.select_cells(data, current.primary, next, true)
    }

    /// Keep the selection inside the grid after rows or columns went away.
    pub fn clamp_selection(&mut self, data: &GridData) {
        let (rows, cols) = (data.display_row_count(), data.visible_column_count());
        self.selection = match self.selection {
            Some(_) if rows == 0 || cols == 0 => None,
            Some(s) => Some(SelectionRange::with_primary(
                clamp_cell(s.primary, rows, cols),
                clamp_cell(s.start, rows, cols),
                clamp_cell(s.end, rows, cols),
            )),
            None => None,
        };
    }

    /// Cells between two corners, with exclusion filters applied.
    pub fn get_cells(
        &self,
        data: &GridData,
        start: CellIndex,
        end: CellIndex,
        filter: ExcludeFilter,
    ) -> CellMatrix {
        get_cells(data, &SelectionRange::cell_range(start, end), filter, self.editable)
    }

    // ---- Pending edit ----

    /// Start editing a cell. Returns `false` for a non-editable cell.
    pub fn begin_edit(&mut self, data: &GridData, cell: CellIndex) -> Result<bool> {
        let column = data
            .column_at(cell.col)
            .ok_or_else(|| GridError::ColumnNotFound(format!("#{}", cell.col)))?;
        let row = data
            .row_at(cell.row)
            .ok_or_else(|| GridError::RowNotFound(format!("#{}", cell.row)))?;
        if !(self.editable && column.editable) {
            return Ok(false);
        }
        self.pending.acquire(PendingEdit::new(
            row.id,
            column.id.clone(),
            row.get(&column.id).cloned(),
        ))?;
        Ok(true)
    }

    /// Feed typed text into the pending edit. The value stays on the edit
    /// until commit; validation errors are kept on the edit and returned.
    pub fn input(&mut self, data: &GridData, text: &str) -> Result<Option<ValidationErrors>> {
        let column_id = self
            .pending
            .get()
            .map(|e| e.column.clone())
            .ok_or(GridError::NoPendingEdit)?;
        let column = data
            .column(&column_id)
            .ok_or_else(|| GridError::ColumnNotFound(column_id.to_string()))?;
        let value = typed_value(&column.field, text);
        self.input_value(data, value)
    }

    /// Like [`input`](Self::input) for editors that produce raw values
    /// (checkboxes, dropdowns, date pickers).
    pub fn input_value(
        &mut self,
        data: &GridData,
        value: Option<CellValue>,
    ) -> Result<Option<ValidationErrors>> {
        let edit = self.pending.get_mut().ok_or(GridError::NoPendingEdit)?;
        let errors = data
            .column(&edit.column)
            .ok_or_else(|| GridError::ColumnNotFound(edit.column.to_string()))?
            .field
            .validate(value.as_ref());
        edit.value = value;
        edit.errors.clone_from(&errors);
        Ok(errors)
    }

    /// Validate the pending edit and write it to the row.
    ///
    /// On a validation failure the edit stays pending with its errors and
    /// `GridError::Validation` is returned.
    pub fn commit_edit(&mut self, data: &mut GridData) -> Result<Option<CellChange>> {
        let mut edit = self.pending.release()?;
        let Some(column) = data.column(&edit.column) else {
            return Ok(None);
        };
        if let Some(errors) = column.field.validate(edit.value.as_ref()) {
            tracing::debug!(row = %edit.row, column = %edit.column, "pending edit rejected");
            edit.errors = Some(errors.clone());
            self.pending.acquire(edit)?;
            return Err(GridError::Validation(errors));
        }
        if column
            .field
            .compare_equals(edit.original.as_ref(), edit.value.as_ref())
        {
            return Ok(None);
        }
        data.set_value_by_id(edit.row, &edit.column, edit.value.clone())?;
        Ok(Some(CellChange {
            row: edit.row,
            column: edit.column,
            old: edit.original,
            new: edit.value,
        }))
    }

    /// Flush the pending edit if there is one.
    pub fn flush(&mut self, data: &mut GridData) -> Result<Option<CellChange>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        self.commit_edit(data)
    }

    /// Drop the pending edit. The row never saw its value.
    pub fn cancel_edit(&mut self) -> Result<()> {
        self.pending.release().map(drop)
    }

    /// Value to render at a display position: the pending value for the cell
    /// being edited, the stored value otherwise.
    pub fn display_value<'a>(&'a self, data: &'a GridData, cell: CellIndex) -> Option<&'a CellValue> {
        if let Some(edit) = self.pending.get() {
            if data
                .cell_identity(cell)
                .is_some_and(|(row, column)| row == edit.row && column == edit.column)
            {
                return edit.value.as_ref();
            }
        }
        data.value_at(cell)
    }

    /// Resolve state that referenced rows the host has removed.
    pub fn on_rows_removed(&mut self, data: &GridData, removed: &[RowId]) {
        if self.pending.get().is_some_and(|e| removed.contains(&e.row)) {
            self.discard_pending();
        }
        self.clamp_selection(data);
    }

    /// Drop a pending edit whose column changed its field.
    pub fn on_field_changed(&mut self, column: &ColumnId) {
        if self.pending.get().is_some_and(|e| &e.column == column) {
            self.discard_pending();
        }
    }

    fn discard_pending(&mut self) {
        if let Ok(edit) = self.pending.release() {
            tracing::debug!(row = %edit.row, column = %edit.column, "pending edit discarded");
        }
    }

    // ---- Fill ----

    /// Fill `target` from `source`.
    ///
    /// A target within the source's columns fills vertically with one
    /// [`FillSeries`] per column; any other target fills horizontally by
    /// tiling source columns, converting into each target field. `reverse`
    /// fills upward or leftward.
    pub fn fill(
        &mut self,
        data: &mut GridData,
        source: &SelectionRange,
        target: &SelectionRange,
        reverse: bool,
        filter: ExcludeFilter,
    ) -> Result<EditOutcome> {
        if !self.fillable {
            return Ok(EditOutcome::default());
        }
        self.flush(data)?;

        let vertical = target.start.col >= source.start.col && target.end.col <= source.end.col;
        let matrix = get_cells(data, target, filter | ExcludeFilter::NON_EDITABLE, self.editable);
        let mut outcome = EditOutcome::default();
        outcome.summary.total = matrix.included_count();

        let mut series: HashMap<usize, FillSeries> = HashMap::new();
        for cell in matrix.included() {
            let at = cell.cell;
            let value = if vertical {
                let distance = if reverse {
                    source.start.row.checked_sub(at.row)
                } else {
                    at.row.checked_sub(source.end.row)
                };
                let Some(p) = distance.filter(|p| *p > 0) else {
                    continue;
                };
                let column_series = series.entry(at.col).or_insert_with(|| {
                    let values: Vec<_> = (source.start.row..=source.end.row)
                        .map(|row| data.value_at(CellIndex::new(row, at.col)).cloned())
                        .collect();
                    FillSeries::from_values(&values, reverse)
                });
                column_series.value_at(p, reverse)
            } else {
                let distance = if reverse {
                    source.start.col.checked_sub(at.col)
                } else {
                    at.col.checked_sub(source.end.col)
                };
                let Some(p) = distance.filter(|p| *p > 0) else {
                    continue;
                };
                let offset = (p - 1) % source.column_count();
                let from = CellIndex::new(
                    at.row,
                    if reverse {
                        source.end.col - offset
                    } else {
                        source.start.col + offset
                    },
                );
                let (Some(source_column), Some(target_column)) =
                    (data.column_at(from.col), data.column_at(at.col))
                else {
                    continue;
                };
                let raw = data.value_at(from);
                let text = source_column.field.to_display_string(raw);
                let converted = convert_for(
                    &target_column.field,
                    &text,
                    raw,
                    Some(source_column.field.data_type()),
                );
                let Some(value) = converted.into_value() else {
                    continue;
                };
                value
            };
            outcome.record(apply_value(data, at, value)?);
        }

        self.selection = Some(SelectionRange::with_primary(
            source.primary,
            CellIndex::new(
                source.start.row.min(target.start.row),
                source.start.col.min(target.start.col),
            ),
            CellIndex::new(
                source.end.row.max(target.end.row),
                source.end.col.max(target.end.col),
            ),
        ));
        tracing::debug!(
            count = outcome.summary.count,
            total = outcome.summary.total,
            "fill applied"
        );
        Ok(outcome)
    }
}

fn clamp_cell(cell: CellIndex, rows: usize, cols: usize) -> CellIndex {
    CellIndex::new(
        cell.row.min(rows.saturating_sub(1)),
        cell.col.min(cols.saturating_sub(1)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::types::{Column, Row};

    fn numbers(values: &[Option<f64>]) -> GridData {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let row = Row::new(i as u64 + 1);
                match v {
                    Some(n) => row.with("num", *n),
                    None => row,
                }
            })
            .collect();
        GridData::new(
            rows,
            vec![
                Column::new("num", Field::number("Num")),
                Column::new("label", Field::text("Label")),
            ],
        )
    }

    fn editor() -> CellEditor {
        CellEditor::new(&CellConfig::default())
    }

    fn range(a: (usize, usize), b: (usize, usize)) -> SelectionRange {
        SelectionRange::cell_range(CellIndex::new(a.0, a.1), CellIndex::new(b.0, b.1))
    }

    #[test]
    fn test_select_is_symmetric_and_extend_keeps_anchor() {
        let mut data = numbers(&[Some(1.0); 6]);
        let mut editor = editor();
        let a = CellIndex::new(4, 1);
        let b = CellIndex::new(1, 0);
        let forward = editor.select_cells(&mut data, a, b, false).unwrap().unwrap();
        let backward = editor.select_cells(&mut data, b, a, false).unwrap().unwrap();
        assert_eq!((forward.range.start, forward.range.end), (backward.range.start, backward.range.end));

        let extended = editor
            .select_cells(&mut data, CellIndex::new(0, 0), CellIndex::new(5, 1), true)
            .unwrap()
            .unwrap();
        assert_eq!(extended.range.primary, b);
        assert_eq!(extended.range.start, CellIndex::new(1, 0));
        assert_eq!(extended.range.end, CellIndex::new(5, 1));
    }

    #[test]
    fn test_extend_selection_moves_far_corner() {
        let mut data = numbers(&[Some(1.0); 4]);
        let mut editor = editor();
        let cell = CellIndex::new(2, 0);
        editor.select_cells(&mut data, cell, cell, false).unwrap();
        editor.extend_selection(&mut data, Direction::Up).unwrap();
        editor.extend_selection(&mut data, Direction::Right).unwrap();
        let range = *editor.selection().unwrap();
        assert_eq!(range.primary, cell);
        assert_eq!(range.start, CellIndex::new(1, 0));
        assert_eq!(range.end, CellIndex::new(2, 1));
    }

    #[test]
    fn test_fill_single_value_repeats() {
        let mut data = numbers(&[Some(10.0), None, None, None]);
        let mut editor = editor();
        let outcome = editor
            .fill(
                &mut data,
                &range((0, 0), (0, 0)),
                &range((1, 0), (3, 0)),
                false,
                ExcludeFilter::NONE,
            )
            .unwrap();
        let filled: Vec<_> = (1..4)
            .map(|r| data.value_at(CellIndex::new(r, 0)).cloned())
            .collect();
        assert_eq!(filled, vec![Some(CellValue::Number(10.0)); 3]);
        assert_eq!(outcome.summary, OperationSummary { count: 3, total: 3 });
        assert_eq!(editor.selection().unwrap().end, CellIndex::new(3, 0));
    }

    #[test]
    fn test_fill_upward_forecast() {
        let mut data = numbers(&[None, None, Some(3.0), Some(4.0)]);
        let mut editor = editor();
        editor
            .fill(
                &mut data,
                &range((2, 0), (3, 0)),
                &range((0, 0), (1, 0)),
                true,
                ExcludeFilter::NONE,
            )
            .unwrap();
        assert_eq!(data.value_at(CellIndex::new(1, 0)), Some(&CellValue::Number(2.0)));
        assert_eq!(data.value_at(CellIndex::new(0, 0)), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_fill_horizontal_converts_to_target_field() {
        let mut data = numbers(&[Some(7.0)]);
        let mut editor = editor();
        let outcome = editor
            .fill(
                &mut data,
                &range((0, 0), (0, 0)),
                &range((0, 1), (0, 1)),
                false,
                ExcludeFilter::NONE,
            )
            .unwrap();
        assert_eq!(outcome.summary.count, 1);
        assert_eq!(data.value_at(CellIndex::new(0, 1)), Some(&CellValue::from("7")));
    }

    #[test]
    fn test_fill_disabled_is_noop() {
        let mut data = numbers(&[Some(1.0), None]);
        let mut editor = CellEditor::new(&CellConfig {
            editable: true,
            fillable: false,
        });
        let outcome = editor
            .fill(
                &mut data,
                &range((0, 0), (0, 0)),
                &range((1, 0), (1, 0)),
                false,
                ExcludeFilter::NONE,
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::default());
        assert!(data.value_at(CellIndex::new(1, 0)).is_none());
    }

    #[test]
    fn test_edit_lifecycle() {
        let mut data = numbers(&[Some(1.0), Some(2.0)]);
        let mut editor = editor();
        let cell = CellIndex::new(0, 0);
        assert!(editor.begin_edit(&data, cell).unwrap());

        let errors = editor.input(&data, "abc").unwrap();
        assert!(errors.is_some());
        assert!(matches!(
            editor.commit_edit(&mut data),
            Err(GridError::Validation(_))
        ));
        assert!(editor.pending().is_some());

        editor.input(&data, "5").unwrap();
        let change = editor.commit_edit(&mut data).unwrap().unwrap();
        assert_eq!(change.old, Some(CellValue::Number(1.0)));
        assert_eq!(change.new, Some(CellValue::Number(5.0)));
        assert!(editor.pending().is_none());
        assert_eq!(data.value_at(cell), Some(&CellValue::Number(5.0)));
    }

    #[test]
    fn test_pending_value_stays_off_the_row() {
        let mut data = numbers(&[Some(1.0), Some(2.0)]);
        let mut editor = editor();
        let cell = CellIndex::new(0, 0);
        editor.begin_edit(&data, cell).unwrap();
        assert!(editor.input(&data, "abc").unwrap().is_some());

        assert_eq!(data.value_at(cell), Some(&CellValue::Number(1.0)));
        let matrix = editor.get_cells(&data, cell, cell, ExcludeFilter::NONE);
        assert_eq!(matrix.get(0, 0).unwrap().value, Some(CellValue::Number(1.0)));
        assert_eq!(
            editor.display_value(&data, cell),
            Some(&CellValue::Text("abc".into()))
        );
        assert_eq!(
            editor.display_value(&data, CellIndex::new(1, 0)),
            Some(&CellValue::Number(2.0))
        );

        assert!(editor.commit_edit(&mut data).is_err());
        assert_eq!(data.value_at(cell), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_cancel_restores_original() {
        let data = numbers(&[Some(1.0)]);
        let mut editor = editor();
        let cell = CellIndex::new(0, 0);
        editor.begin_edit(&data, cell).unwrap();
        editor.input(&data, "9").unwrap();
        assert_eq!(editor.display_value(&data, cell), Some(&CellValue::Number(9.0)));
        editor.cancel_edit().unwrap();
        assert_eq!(editor.display_value(&data, cell), Some(&CellValue::Number(1.0)));
        assert!(matches!(editor.cancel_edit(), Err(GridError::NoPendingEdit)));
    }

    #[test]
    fn test_second_edit_requires_resolve() {
        let data = numbers(&[Some(1.0), Some(2.0)]);
        let mut editor = editor();
        editor.begin_edit(&data, CellIndex::new(0, 0)).unwrap();
        assert!(matches!(
            editor.begin_edit(&data, CellIndex::new(1, 0)),
            Err(GridError::EditInProgress)
        ));
    }

    #[test]
    fn test_moving_away_flushes_or_blocks() {
        let mut data = numbers(&[Some(1.0), Some(2.0)]);
        let mut editor = editor();
        let first = CellIndex::new(0, 0);
        editor.select_cells(&mut data, first, first, false).unwrap();
        editor.begin_edit(&data, first).unwrap();
        editor.input(&data, "oops").unwrap();

        let blocked = editor.move_selection(&mut data, Direction::Down);
        assert!(matches!(blocked, Err(GridError::Validation(_))));
        assert_eq!(editor.selection().unwrap().primary, first);

        editor.input(&data, "3").unwrap();
        let moved = editor
            .move_selection(&mut data, Direction::Down)
            .unwrap()
            .unwrap();
        assert_eq!(moved.range.primary, CellIndex::new(1, 0));
        assert_eq!(moved.flushed.unwrap().new, Some(CellValue::Number(3.0)));
    }

    #[test]
    fn test_row_removal_reverts_pending() {
        let mut data = numbers(&[Some(1.0), Some(2.0)]);
        let mut editor = editor();
        editor.begin_edit(&data, CellIndex::new(1, 0)).unwrap();
        editor.input(&data, "8").unwrap();
        editor.on_rows_removed(&data, &[RowId(2)]);
        assert!(editor.pending().is_none());
        assert_eq!(data.value_at(CellIndex::new(1, 0)), Some(&CellValue::Number(2.0)));
    }
}
